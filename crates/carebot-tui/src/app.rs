use carebot_core::{Conversation, OutgoingQuery, RecommendClient};

pub struct App {
    // Core state
    pub should_quit: bool,
    pub conversation: Conversation,
    pub client: RecommendClient,

    // Input line
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat view
    pub chat_scroll: u16,
    pub follow_tail: bool,      // keep the newest message in view
    pub chat_height: u16,       // Height of chat area for scroll calculations
    pub total_chat_lines: u16,  // Wrapped line count from the last render

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(client: RecommendClient, greeting: &str) -> Self {
        Self {
            should_quit: false,
            conversation: Conversation::with_greeting(greeting),
            client,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            follow_tail: true,
            chat_height: 0,
            total_chat_lines: 0,

            animation_frame: 0,
        }
    }

    /// Turn the input line into an outgoing query, clearing it on success.
    ///
    /// Blank input and input typed while a reply is pending are left alone.
    pub fn submit_input(&mut self) -> Option<OutgoingQuery> {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }

        let query = self.conversation.begin_send(&text)?;
        self.input.clear();
        self.cursor = 0;
        self.follow_tail = true;
        Some(query)
    }

    pub fn retry(&mut self) -> Option<OutgoingQuery> {
        let query = self.conversation.begin_retry()?;
        self.follow_tail = true;
        Some(query)
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_awaiting_reply() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    fn max_scroll(&self) -> u16 {
        self.total_chat_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.min(self.max_scroll()).saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_tail = self.chat_scroll >= max;
    }

    pub fn half_page(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }

    /// Record the latest layout measurements and pin to the bottom if following.
    pub fn update_chat_metrics(&mut self, total_lines: u16, height: u16) {
        self.total_chat_lines = total_lines;
        self.chat_height = height;
        if self.follow_tail {
            self.chat_scroll = self.max_scroll();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_scroll());
        }
    }
}
