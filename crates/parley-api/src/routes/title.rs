use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use parley_llm::{EngineSession, Message, SessionOptions};

use crate::auth::AuthedUser;
use crate::chat::window::{self, WindowOptions, TITLING_INSTRUCTIONS, TITLING_PROMPT};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub engine: String,
    pub model: String,
    pub messages: Vec<Message>,
}

/// Non-streaming title generation over a caller-supplied conversation.
#[utoipa::path(
    post,
    path = "/title",
    responses(
        (status = 200, description = "Generated title"),
        (status = 400, description = "Missing engine, model or messages"),
        (status = 401, description = "Invalid or missing token")
    ),
    tag = "chat"
)]
pub async fn title(
    State(state): State<Arc<AppState>>,
    _user: AuthedUser,
    Json(request): Json<TitleRequest>,
) -> ApiResult<Json<Value>> {
    let api_key = state.config.api_key_for(&request.engine).ok_or_else(|| {
        ApiError::BadRequest(format!("API key for engine {} not found", request.engine))
    })?;
    let session = EngineSession::open(&request.engine, &api_key)?;

    let mut messages = window::build_window(
        TITLING_INSTRUCTIONS,
        &request.messages,
        false,
        WindowOptions {
            conversation_length: state.config.chat.conversation_length,
            max_attachments: state.config.chat.max_attachments,
            include_attachments: false,
        },
    );
    messages.push(Message::user(TITLING_PROMPT));

    let title = session
        .complete(&request.model, messages, SessionOptions::default())
        .await?;

    Ok(Json(json!({ "title": title.trim() })))
}
