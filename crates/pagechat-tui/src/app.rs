use std::sync::Arc;

use pagechat_core::controller::{EntryBody, PendingCompletion};
use pagechat_core::error::Result as ChatResult;
use pagechat_core::{
    links, ActivePageExtractor, ChatController, ChatError, ExtractionRequest, ExtractionResult,
    PageSource,
};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Single-line editable text with a character cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl TextInput {
    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// Take the contents, leaving the input empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popup {
    Token(TextInput),
    OpenPage(TextInput),
}

impl Popup {
    pub fn input_mut(&mut self) -> &mut TextInput {
        match self {
            Popup::Token(input) | Popup::OpenPage(input) => input,
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub input: TextInput,
    pub popup: Option<Popup>,
    pub status: Option<String>,

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub expand_context: bool,
    pub animation_frame: u8, // 0-2 for ellipsis animation
    pub model_name: String,

    pub controller: ChatController,
    pub extractor: Arc<ActivePageExtractor>,
    pub query_task: Option<(PendingCompletion, JoinHandle<ChatResult<String>>)>,
    pub extract_task: Option<JoinHandle<ExtractionResult>>,
}

impl App {
    pub fn new(controller: ChatController, extractor: Arc<ActivePageExtractor>, model_name: &str) -> Self {
        let mut app = Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            input: TextInput::default(),
            popup: None,
            status: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            expand_context: false,
            animation_frame: 0,
            model_name: model_name.to_string(),
            controller,
            extractor,
            query_task: None,
            extract_task: None,
        };
        if !app.controller.has_credential() {
            app.status = Some("No API token yet: press Esc then t to add one".to_string());
        }
        app.scroll_to_bottom();
        app
    }

    pub fn is_busy(&self) -> bool {
        self.query_task.is_some() || self.extract_task.is_some()
    }

    /// Submit the input line as a question.
    pub fn submit_input(&mut self) {
        if self.query_task.is_some() {
            return;
        }
        let text = self.input.take();
        let Some(pending) = self.controller.begin_submit(&text) else {
            return;
        };

        let completer = self.controller.completer();
        let request = pending.clone();
        let handle = tokio::spawn(async move { request.run(completer.as_ref()).await });
        self.query_task = Some((pending, handle));
        self.scroll_to_bottom();
    }

    /// Put the `index`th quick-action question in the input and send it.
    pub fn run_quick_action(&mut self, index: usize) {
        if self.query_task.is_some() {
            return;
        }
        if let Some(action) = self.controller.quick_actions().get(index) {
            self.input = TextInput {
                value: action.question.to_string(),
                cursor: action.question.chars().count(),
            };
            self.submit_input();
        }
    }

    pub fn start_extract(&mut self) {
        if self.extract_task.is_some() || !self.controller.begin_extract() {
            return;
        }
        let extractor = self.controller.extractor();
        self.extract_task = Some(tokio::spawn(async move {
            extractor.handle(ExtractionRequest::ExtractContent).await
        }));
        self.status = Some("Extracting page content...".to_string());
    }

    /// Apply results of finished background requests.
    pub async fn poll_tasks(&mut self) {
        if self
            .query_task
            .as_ref()
            .is_some_and(|(_, handle)| handle.is_finished())
        {
            if let Some((pending, handle)) = self.query_task.take() {
                let result = handle
                    .await
                    .unwrap_or_else(|e| Err(ChatError::Interrupted(e.to_string())));
                self.controller.finish_submit(pending, result);
                self.scroll_to_bottom();
            }
        }

        if self
            .extract_task
            .as_ref()
            .is_some_and(|handle| handle.is_finished())
        {
            if let Some(handle) = self.extract_task.take() {
                let result = handle.await.unwrap_or_else(|e| {
                    ExtractionResult::failed(format!("Failed to extract content: {}", e))
                });
                self.controller.finish_extract(result);
                self.status = None;
                self.scroll_to_bottom();
            }
        }
    }

    pub fn clear_history(&mut self) {
        if self.controller.clear().is_ok() {
            self.chat_scroll = 0;
        }
    }

    pub fn save_token(&mut self, token: &str) {
        match self.controller.save_credential(token) {
            Ok(true) => self.status = None,
            Ok(false) => self.status = Some("Empty token, nothing saved".to_string()),
            Err(_) => {}
        }
        self.scroll_to_bottom();
    }

    pub fn open_page(&mut self, target: &str) {
        match PageSource::parse(target) {
            Ok(source) => {
                self.status = Some(format!("Page: {} (press e to extract)", source.display_url()));
                self.extractor.open(source);
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    pub fn open_token_page(&mut self) {
        self.status = Some(match links::open_token_settings() {
            Ok(()) => "Opened token settings in your browser".to_string(),
            Err(e) => format!("Could not open browser: {}", e),
        });
    }

    pub fn current_page(&self) -> Option<String> {
        self.extractor.current().map(|page| page.display_url())
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn page_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(self.chat_height.max(2) / 2);
    }

    pub fn page_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(self.chat_height.max(2) / 2);
    }

    /// Scroll chat to the bottom so the newest entry is visible
    pub fn scroll_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        if self.controller.display().notice().is_some() {
            total_lines += 2;
        }

        for entry in self.controller.display().entries() {
            total_lines += 1; // Role line ("You:", "AI:", ...)
            let text = match &entry.body {
                EntryBody::PageContext { preview, .. } if !self.expand_context => preview.clone(),
                _ => entry.text(),
            };
            for line in text.lines() {
                total_lines += (line.chars().count() / wrap_width) + 1;
            }
            total_lines += 1; // Blank line after entry
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        // Paragraph scroll offsets are u16; very long histories pin to the limit.
        let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}
