use axum::body::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use parley_llm::{
    supports_tools, Attachment, Chunk, EngineSession, ImagePlugin, Message, PythonPlugin,
    SearchPlugin, SessionOptions, ToolPlugin,
};
use parley_persist::{Thread, User};

use crate::chat::usage::UsageRecorder;
use crate::chat::window::{self, WindowOptions, TITLING_INSTRUCTIONS, TITLING_PROMPT};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::convert::Infallible>> + Send>>;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub engine: String,
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    /// Persistent mode: load this thread, append the turn, save.
    #[serde(default)]
    pub thread: Option<String>,
    /// Ephemeral mode: caller-supplied history, never persisted.
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
}

/// Drives one chat turn: validate, resolve the conversation, stream the
/// engine's chunks to the caller, accumulate the assistant reply, title the
/// thread if it has none, and persist.
///
/// Everything before the returned stream is polled can still fail with a
/// clean HTTP status; once the first chunk is written, failures become
/// in-band terminal error chunks.
pub struct ChatOrchestrator {
    state: Arc<AppState>,
}

impl ChatOrchestrator {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn run(&self, user: User, request: ChatRequest) -> ApiResult<BodyStream> {
        validate(&request)?;
        let session = self.open_session(&user, &request).await?;
        self.run_with_session(session, user, request).await
    }

    /// Resolve the engine and attach tool capabilities. Split from `run` so
    /// tests can drive the pipeline with a scripted provider.
    async fn open_session(&self, user: &User, request: &ChatRequest) -> ApiResult<EngineSession> {
        let config = &self.state.config;

        let api_key = config.api_key_for(&request.engine).ok_or_else(|| {
            ApiError::BadRequest(format!("API key for engine {} not found", request.engine))
        })?;
        let mut session = EngineSession::open(&request.engine, &api_key)?;

        if supports_tools(&request.model) {
            if let Some(search_key) = config.search_api_key() {
                session.add_plugin(ToolPlugin::Search(SearchPlugin::new(search_key)));
            }
            session.add_plugin(ToolPlugin::Python(PythonPlugin::new()));

            if user.can_prompt(chrono::Utc::now()) && self.under_image_cap(user).await? {
                if let Some(image_model) = &config.image_model {
                    let image_key = config.api_key_for(&image_model.engine);
                    let image_url = parley_llm::base_url(&image_model.engine);
                    if let (Some(image_key), Some(image_url)) = (image_key, image_url) {
                        session.add_plugin(ToolPlugin::Image(ImagePlugin::new(
                            &config.server.public_url,
                            image_url,
                            image_key,
                            &image_model.model,
                            Arc::clone(&self.state.media),
                        )));
                    }
                }
            }
        }

        Ok(session)
    }

    /// Monthly image cap for the caller's tier; 0 means uncapped.
    async fn under_image_cap(&self, user: &User) -> ApiResult<bool> {
        let cap = self.state.config.limits.for_tier(user.tier).images_month;
        if cap == 0 {
            return Ok(true);
        }
        let used = self.state.usage.images_last_month(user.id).await?;
        Ok(used < cap)
    }

    pub async fn run_with_session(
        &self,
        session: EngineSession,
        user: User,
        request: ChatRequest,
    ) -> ApiResult<BodyStream> {
        validate(&request)?;

        // Thread mode loads and later saves; ephemeral mode runs off the
        // caller's history and never writes.
        let thread = match &request.thread {
            Some(id) => Some(
                self.state
                    .threads
                    .load_thread(id)
                    .await?
                    .ok_or_else(|| ApiError::ThreadNotFound(id.clone()))?,
            ),
            None => None,
        };
        let history = match &thread {
            Some(thread) => thread.messages.clone(),
            None => request.messages.clone().unwrap_or_default(),
        };

        let config = Arc::clone(&self.state.config);
        let mut messages = window::build_window(
            &window::instructions(),
            &history,
            request.attachment.is_some(),
            WindowOptions {
                conversation_length: config.chat.conversation_length,
                max_attachments: config.chat.max_attachments,
                include_attachments: true,
            },
        );

        let mut user_message = Message::user(&request.prompt);
        if let Some(attachment) = &request.attachment {
            user_message = user_message.with_attachment(attachment.clone());
        }
        messages.push(user_message.clone());

        let options = SessionOptions {
            idle_timeout: Duration::from_secs(config.chat.idle_timeout_secs),
            ..SessionOptions::default()
        };
        let mut chunks = session.stream(&request.model, messages, options);

        let state = Arc::clone(&self.state);
        let recorder = UsageRecorder::new(Arc::clone(&self.state.usage));
        let min_delay = Duration::from_millis(config.chat.stream_min_delay_ms);

        let body = async_stream::stream! {
            let mut assistant = Message::pending_assistant();
            let mut last_sent: Option<Instant> = None;

            while let Some(chunk) = chunks.next().await {
                assistant.append(&chunk);
                assistant.add_tool_call(&chunk);

                // Ephemeral turns leave no trace: usage is only recorded
                // against a persisted thread.
                if let Chunk::Usage { usage } = &chunk {
                    if let Some(thread_id) = request.thread.as_deref() {
                        let mut turn = history.clone();
                        turn.push(user_message.clone());
                        turn.push(assistant.clone());
                        recorder.record(
                            user.id,
                            thread_id,
                            &request.engine,
                            &request.model,
                            &turn,
                            usage,
                        );
                    }
                }

                let terminal = chunk.is_done();
                let failed = matches!(chunk, Chunk::Error { .. });

                // Completed turn: title and save before releasing the done
                // marker, so a failed save can still report in-band.
                if terminal && !failed {
                    if let Some(mut thread) = thread.clone() {
                        thread.add_message(user_message.clone());
                        thread.add_message(assistant.clone());

                        if !thread.has_title() {
                            title_thread(&session, &state, &request, &mut thread).await;
                        }

                        if let Err(e) = state.threads.save_thread(&thread).await {
                            tracing::error!(thread_id = %thread.id, "failed to save thread: {}", e);
                            yield Ok(encode(&Chunk::error("Failed to save conversation")));
                            return;
                        }
                    }
                }

                if let Some(last) = last_sent {
                    let elapsed = last.elapsed();
                    if elapsed < min_delay {
                        tokio::time::sleep(min_delay - elapsed).await;
                    }
                }
                yield Ok(encode(&chunk));
                last_sent = Some(Instant::now());

                if terminal {
                    return;
                }
            }
        };

        Ok(Box::pin(body))
    }
}

fn validate(request: &ChatRequest) -> ApiResult<()> {
    if request.prompt.is_empty() {
        return Err(ApiError::BadRequest("prompt required".to_string()));
    }
    if let Some(attachment) = &request.attachment {
        if attachment.mime_type.is_empty() || attachment.content.is_empty() {
            return Err(ApiError::BadRequest(
                "attachment requires mimeType and content".to_string(),
            ));
        }
    }
    if request.thread.is_none() && request.messages.is_none() {
        return Err(ApiError::BadRequest("thread or messages required".to_string()));
    }
    Ok(())
}

/// Generate and set a title over the updated history. Failures are logged
/// and swallowed; titling never fails the turn.
async fn title_thread(
    session: &EngineSession,
    state: &Arc<AppState>,
    request: &ChatRequest,
    thread: &mut Thread,
) {
    let mut messages = window::build_window(
        TITLING_INSTRUCTIONS,
        &thread.messages,
        false,
        WindowOptions {
            conversation_length: state.config.chat.conversation_length,
            max_attachments: state.config.chat.max_attachments,
            include_attachments: false,
        },
    );
    messages.push(Message::user(TITLING_PROMPT));

    match session
        .complete(&request.model, messages, SessionOptions::default())
        .await
    {
        Ok(title) => thread.title = title.trim().to_string(),
        Err(e) => tracing::warn!(thread_id = %thread.id, "titling failed: {}", e),
    }
}

/// Chunks go on the wire as raw JSON objects written back to back, not SSE
/// and not newline-delimited.
fn encode(chunk: &Chunk) -> Bytes {
    match serde_json::to_vec(chunk) {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) => {
            tracing::error!("failed to encode chunk: {}", e);
            Bytes::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest {
            engine: "openai".to_string(),
            model: "gpt-4o".to_string(),
            prompt: prompt.to_string(),
            attachment: None,
            thread: None,
            messages: Some(Vec::new()),
        }
    }

    #[test]
    fn empty_prompt_is_rejected() {
        assert!(matches!(
            validate(&request("")),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn attachment_needs_mime_and_content() {
        let mut req = request("hi");
        req.attachment = Some(Attachment::new("", "image/png"));
        assert!(validate(&req).is_err());

        req.attachment = Some(Attachment::new("data", ""));
        assert!(validate(&req).is_err());

        req.attachment = Some(Attachment::new("data", "image/png"));
        assert!(validate(&req).is_ok());
    }

    #[test]
    fn thread_or_messages_is_required() {
        let mut req = request("hi");
        req.messages = None;
        assert!(validate(&req).is_err());

        req.thread = Some("t1".to_string());
        assert!(validate(&req).is_ok());
    }
}
