use crate::ChatPhase;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatViewModel {
    pub chat_id: Option<String>,
    pub phase: ChatPhase,
    pub is_polling: bool,
    pub is_streaming: bool,
    pub visible_text: String,
    pub attempts: u32,
    pub status_line: String,
    pub dirty: bool,
}
