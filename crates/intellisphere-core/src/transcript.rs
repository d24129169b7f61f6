//! Displayed conversation for the current session.

use intellisphere_protocol::Message;

/// One rendered element of the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    User(String),
    /// Markdown text from the assistant.
    Bot(String),
    Error(String),
}

/// Convert history into blocks: the user side first, then the bot side.
pub fn blocks_for(messages: &[Message]) -> Vec<Block> {
    messages
        .iter()
        .flat_map(|message| {
            let user = message.user.clone().map(Block::User);
            let bot = message.bot.clone().map(Block::Bot);
            user.into_iter().chain(bot)
        })
        .collect()
}

/// Blocks on screen plus the loading overlay.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    blocks: Vec<Block>,
    loading: bool,
    scroll_pending: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Replace everything on screen with `messages`.
    ///
    /// Clears before appending, so rendering the same history twice shows it
    /// once.
    pub fn render(&mut self, messages: &[Message]) {
        self.blocks = blocks_for(messages);
        self.loading = false;
        self.scroll_pending = true;
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.loading = false;
        self.scroll_pending = true;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Block::User(text.into()));
    }

    pub fn push_bot(&mut self, text: impl Into<String>) {
        self.push(Block::Bot(text.into()));
    }

    pub fn push_error(&mut self, text: impl Into<String>) {
        self.push(Block::Error(text.into()));
    }

    fn push(&mut self, block: Block) {
        self.blocks.push(block);
        self.scroll_pending = true;
    }

    /// Whether the view should jump to the bottom; resets the request.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn message_yields_zero_one_or_two_blocks() {
        let history = vec![
            Message::exchange("q", "a"),
            Message::default(),
            Message::bot("welcome"),
            Message::user("pending"),
        ];
        assert_eq!(
            blocks_for(&history),
            vec![
                Block::User("q".to_string()),
                Block::Bot("a".to_string()),
                Block::Bot("welcome".to_string()),
                Block::User("pending".to_string()),
            ]
        );
    }

    #[test]
    fn render_is_idempotent() {
        let history = vec![Message::exchange("q", "a")];
        let mut transcript = Transcript::new();
        transcript.push_error("old");
        transcript.set_loading(true);
        transcript.render(&history);
        let first = transcript.blocks().to_vec();
        transcript.render(&history);
        assert_eq!(transcript.blocks(), first.as_slice());
        assert!(!transcript.is_loading());
    }

    #[test]
    fn scroll_request_is_consumed() {
        let mut transcript = Transcript::new();
        assert!(!transcript.take_scroll_request());
        transcript.push_user("hi");
        assert!(transcript.take_scroll_request());
        assert!(!transcript.take_scroll_request());
    }
}
