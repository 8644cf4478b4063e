use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::Response;
use axum::Json;
use std::sync::Arc;

use crate::auth::AuthedUser;
use crate::chat::{ChatOrchestrator, ChatRequest, RateLimiter, RateQuota};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Streaming chat turn. The body is a sequence of JSON chunk objects
/// written back to back; the consumer parses incrementally until it sees a
/// chunk with `done: true`.
#[utoipa::path(
    post,
    path = "/chat",
    responses(
        (status = 200, description = "Chunk stream", content_type = "application/json"),
        (status = 400, description = "Invalid prompt, attachment or conversation reference"),
        (status = 401, description = "Invalid or missing token"),
        (status = 404, description = "Thread not found"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    AuthedUser(user): AuthedUser,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Response> {
    let limits = state.config.limits.for_tier(user.tier);
    let quota = RateLimiter::new(Arc::clone(&state.usage))
        .admit(&user, limits)
        .await?;

    tracing::info!(
        user_id = user.id,
        engine = %request.engine,
        model = %request.model,
        thread = request.thread.as_deref().unwrap_or("<ephemeral>"),
        "chat turn"
    );

    let stream = ChatOrchestrator::new(Arc::clone(&state))
        .run(user, request)
        .await?;

    let mut response = Response::builder().header(CONTENT_TYPE, "application/json");
    response = with_quota_headers(response, quota);

    response
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

fn with_quota_headers(
    mut response: axum::http::response::Builder,
    quota: RateQuota,
) -> axum::http::response::Builder {
    if let Some(rpm) = quota.rpm {
        response = response
            .header("X-RateLimit-Rpm-Limit", rpm.limit)
            .header("X-RateLimit-Rpm-Remaining", rpm.remaining);
    }
    if let Some(tokens) = quota.tokens_24h {
        response = response
            .header("X-RateLimit-Tokens24h-Limit", tokens.limit)
            .header("X-RateLimit-Tokens24h-Remaining", tokens.remaining);
    }
    response
}
