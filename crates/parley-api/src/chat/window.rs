use chrono::Utc;

use parley_llm::Message;

const INSTRUCTIONS: &str = "You are a helpful AI assistant. You provide clear, informative, \
                            concise, and relevant responses.";

pub const TITLING_INSTRUCTIONS: &str = "You are an assistant whose task is to find the best \
                                        title for the conversation below. The title should be \
                                        just a few words.";

pub const TITLING_PROMPT: &str = "Provide a title for the conversation above. Do not return \
                                  anything other than the title. Do not wrap responses in \
                                  quotes.";

/// Chat system instructions, stamped with the current date and time.
pub fn instructions() -> String {
    format!(
        "{} Date/time: {}.",
        INSTRUCTIONS,
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}

#[derive(Debug, Clone, Copy)]
pub struct WindowOptions {
    /// Window keeps up to 2x this many history messages.
    pub conversation_length: usize,
    /// Attachment budget across the whole window.
    pub max_attachments: usize,
    /// When false every historical attachment is stripped.
    pub include_attachments: bool,
}

/// Build the message window sent to the provider: the newest
/// `2 * conversation_length` history messages plus a leading system message.
///
/// History is walked newest to oldest so the attachment budget favors recent
/// attachments; a new prompt carrying one consumes a budget slot up front.
/// Text content is always kept, only attachments are stripped. Pure: the
/// input history is never mutated.
pub fn build_window(
    system_prompt: &str,
    history: &[Message],
    new_prompt_has_attachment: bool,
    options: WindowOptions,
) -> Vec<Message> {
    let mut attachments = usize::from(new_prompt_has_attachment);

    let mut window: Vec<Message> = Vec::with_capacity(history.len() + 1);
    for message in history.iter().rev() {
        if window.len() >= 2 * options.conversation_length {
            break;
        }

        let mut message = message.clone();
        if message.has_attachment() {
            if options.include_attachments && attachments < options.max_attachments {
                attachments += 1;
            } else {
                message.attachment = None;
            }
        } else {
            // Attachments without content are dead weight either way.
            message.attachment = None;
        }
        window.push(message);
    }

    window.push(Message::system(system_prompt));
    window.reverse();
    window
}
