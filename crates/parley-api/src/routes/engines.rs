use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use parley_llm::{available_engines, ignite, Engine};

use crate::auth::AuthedUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Engines with a resolvable credential.
#[utoipa::path(
    get,
    path = "/engines",
    responses(
        (status = 200, description = "Available engines"),
        (status = 401, description = "Invalid or missing token")
    ),
    tag = "engines"
)]
pub async fn list_engines(
    State(state): State<Arc<AppState>>,
    _user: AuthedUser,
) -> Json<Vec<Engine>> {
    Json(available_engines(|id| state.config.api_key_for(id)))
}

/// Proxy the provider's chat model list.
#[utoipa::path(
    get,
    path = "/models/{engine}",
    params(
        ("engine" = String, Path, description = "Engine id")
    ),
    responses(
        (status = 200, description = "Chat model ids"),
        (status = 400, description = "Unknown engine or missing credential"),
        (status = 502, description = "Provider call failed")
    ),
    tag = "engines"
)]
pub async fn list_models(
    State(state): State<Arc<AppState>>,
    _user: AuthedUser,
    Path(engine): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    let api_key = state.config.api_key_for(&engine).ok_or_else(|| {
        ApiError::BadRequest(format!("API key for engine {} not found", engine))
    })?;

    let provider = ignite(&engine, &api_key)?;
    let models = provider
        .models()
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    Ok(Json(models))
}
