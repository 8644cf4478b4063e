use axum::{
    routing::{get, post},
    Router,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parley_api::{
    config::Config,
    media::LocalMediaStore,
    routes::{self, chat, engines, health, title},
    state::AppState,
};
use parley_persist::{MemoryStore, Tier, User};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config =
        Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    init_logging(&config);

    tracing::info!("Starting Parley API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    // Initialize storage
    let store = Arc::new(MemoryStore::new());
    seed_bootstrap_user(&store).await;

    let media = Arc::new(LocalMediaStore::new(&config.media.dir));

    // Create application state
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(
        config,
        Arc::clone(&store) as Arc<dyn parley_persist::ThreadStore>,
        Arc::clone(&store) as Arc<dyn parley_persist::UserStore>,
        store as Arc<dyn parley_persist::UsageStore>,
        media,
    ));

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Chat
        .route("/chat", post(chat::chat))
        .route("/title", post(title::title))
        // Engines
        .route("/engines", get(engines::list_engines))
        .route("/models/:engine", get(engines::list_models))
        // OpenAPI
        .route("/api-docs/openapi.json", get(routes::openapi_doc));

    Router::new()
        .merge(api_routes)
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(300))) // 5 min for streaming
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let mut cors = CorsLayer::new()
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors = cors.allow_origin(Any);
        } else {
            for origin in &config.cors.origins {
                if let Ok(parsed_origin) = origin.parse::<axum::http::HeaderValue>() {
                    cors = cors.allow_origin(parsed_origin);
                }
            }
        }

        cors
    } else {
        CorsLayer::permissive()
    }
}

/// The in-memory store starts empty; a token in PARLEY_BOOTSTRAP_TOKEN
/// seeds one pro user so the server is usable out of the box.
async fn seed_bootstrap_user(store: &MemoryStore) {
    if let Ok(token) = std::env::var("PARLEY_BOOTSTRAP_TOKEN") {
        store
            .add_user(
                &token,
                User {
                    id: 1,
                    username: "bootstrap".to_string(),
                    tier: Tier::Pro,
                    subscription_expires_at: Some(Utc::now() + Duration::days(365)),
                },
            )
            .await;
        tracing::info!("Bootstrap user seeded");
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
