//! Chat controller: drives submissions, page extraction and history clearing,
//! and keeps the display surface in step with the transcript.

use std::sync::Arc;

use crate::ai::prompt::sanitize_response;
use crate::ai::Completer;
use crate::error::{ChatError, Result};
use crate::extractor::{ExtractionRequest, ExtractionResult, PageContent, PageExtractor};
use crate::session::SessionStore;
use crate::state::{ChatRole, ChatTurn, Transcript};

/// Maximum number of page-text characters embedded in a context turn.
pub const CONTEXT_EXCERPT_CHARS: usize = 500;
pub const PENDING_TEXT: &str = "Thinking...";
pub const CLEARED_NOTICE: &str = "Chat history cleared.";
pub const TOKEN_SAVED_NOTICE: &str = "API token saved.";

/// A canned question offered as a one-key shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickAction {
    /// Short name used on the command line.
    pub name: &'static str,
    pub label: &'static str,
    pub question: &'static str,
}

pub const QUICK_ACTIONS: &[QuickAction] = &[
    QuickAction {
        name: "summarize",
        label: "Summarize",
        question: "Can you summarize this page?",
    },
    QuickAction {
        name: "key-points",
        label: "Key points",
        question: "What are the key points of this page?",
    },
    QuickAction {
        name: "explain",
        label: "Explain simply",
        question: "Can you explain this page in simple terms?",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryBody {
    Text(String),
    /// Extracted page context: first line shown, full text on expand.
    PageContext { preview: String, full: String },
    /// Placeholder while a response is outstanding.
    Pending,
    /// Placeholder replaced by a failed request's error message.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayEntry {
    pub id: u64,
    pub role: ChatRole,
    pub body: EntryBody,
}

impl DisplayEntry {
    /// Text to show for this entry, fully expanded.
    pub fn text(&self) -> String {
        match &self.body {
            EntryBody::Text(text) => text.clone(),
            EntryBody::PageContext { full, .. } => full.clone(),
            EntryBody::Pending => PENDING_TEXT.to_string(),
            EntryBody::Failed(message) => format!("Error: {}", message),
        }
    }
}

/// What the user sees: an optional notice followed by role-labelled entries.
#[derive(Debug, Clone, Default)]
pub struct Display {
    notice: Option<String>,
    entries: Vec<DisplayEntry>,
    next_id: u64,
}

impl Display {
    pub fn entries(&self) -> &[DisplayEntry] {
        &self.entries
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    fn push(&mut self, role: ChatRole, body: EntryBody) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(DisplayEntry { id, role, body });
        id
    }

    fn push_turn(&mut self, turn: &ChatTurn) -> u64 {
        let body = if turn.is_page_context() {
            EntryBody::PageContext {
                preview: turn.content.lines().next().unwrap_or_default().to_string(),
                full: turn.content.clone(),
            }
        } else {
            EntryBody::Text(turn.content.clone())
        };
        self.push(turn.role, body)
    }

    fn replace(&mut self, id: u64, role: ChatRole, body: EntryBody) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.role = role;
                entry.body = body;
                true
            }
            None => false,
        }
    }

    fn reset(&mut self, notice: Option<&str>) {
        self.entries.clear();
        self.notice = notice.map(str::to_string);
    }
}

/// A submission waiting for its inference call.
///
/// Produced by [`ChatController::begin_submit`] and handed back to
/// [`ChatController::finish_submit`] with the call's result.
#[derive(Debug, Clone)]
pub struct PendingCompletion {
    placeholder: u64,
    epoch: u64,
    user_input: String,
    context: Option<String>,
    credential: Option<String>,
}

impl PendingCompletion {
    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub async fn run(&self, completer: &dyn Completer) -> Result<String> {
        completer
            .complete(
                self.credential.as_deref(),
                &self.user_input,
                self.context.as_deref(),
            )
            .await
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Input was blank, or another submission is still in flight.
    Ignored,
    Answered(String),
    Failed(ChatError),
    /// History was cleared while the request was in flight.
    Discarded,
}

#[derive(Debug)]
pub enum ExtractOutcome {
    /// An extraction is already running.
    Busy,
    Extracted(ChatTurn),
    Failed(String),
}

pub struct ChatController {
    store: SessionStore,
    completer: Arc<dyn Completer>,
    extractor: Arc<dyn PageExtractor>,
    display: Display,
    credential_override: Option<String>,
    awaiting_response: bool,
    extracting: bool,
    // Bumped by clear() so responses to pre-clear submissions are dropped.
    epoch: u64,
}

impl ChatController {
    pub fn new(
        store: SessionStore,
        completer: Arc<dyn Completer>,
        extractor: Arc<dyn PageExtractor>,
    ) -> Self {
        let mut display = Display::default();
        for turn in store.transcript() {
            display.push_turn(turn);
        }
        Self {
            store,
            completer,
            extractor,
            display,
            credential_override: None,
            awaiting_response: false,
            extracting: false,
            epoch: 0,
        }
    }

    /// Use `credential` instead of the stored one when present.
    pub fn with_credential_override(mut self, credential: Option<String>) -> Self {
        self.credential_override = credential.filter(|c| !c.is_empty());
        self
    }

    pub fn transcript(&self) -> &Transcript {
        self.store.transcript()
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential_override
            .as_deref()
            .or_else(|| self.store.load_credential())
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.awaiting_response
    }

    pub fn is_extracting(&self) -> bool {
        self.extracting
    }

    pub fn completer(&self) -> Arc<dyn Completer> {
        Arc::clone(&self.completer)
    }

    pub fn extractor(&self) -> Arc<dyn PageExtractor> {
        Arc::clone(&self.extractor)
    }

    /// Submit in one step: record the question, ask the model, record the answer.
    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        let Some(pending) = self.begin_submit(text) else {
            return SubmitOutcome::Ignored;
        };
        let result = pending.run(self.completer.as_ref()).await;
        self.finish_submit(pending, result)
    }

    pub fn quick_actions(&self) -> &'static [QuickAction] {
        QUICK_ACTIONS
    }

    /// Look up a quick action by its name.
    pub fn quick_action(name: &str) -> Option<&'static QuickAction> {
        QUICK_ACTIONS.iter().find(|action| action.name.eq_ignore_ascii_case(name))
    }

    /// Ask a quick action's question; identical to submitting it by hand.
    pub async fn submit_quick_action(&mut self, action: &QuickAction) -> SubmitOutcome {
        self.submit(action.question).await
    }

    /// Record the User turn and show the pending placeholder.
    ///
    /// Returns `None` for blank input, while another submission is in flight,
    /// or when the turn could not be persisted.
    pub fn begin_submit(&mut self, text: &str) -> Option<PendingCompletion> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if self.awaiting_response {
            tracing::debug!("submission ignored, a response is still pending");
            return None;
        }

        let turn = ChatTurn::user(text);
        if let Err(e) = self.store.append(turn.clone()) {
            self.show_error(&e);
            return None;
        }
        self.display.push_turn(&turn);
        let placeholder = self.display.push(ChatRole::Assistant, EntryBody::Pending);
        self.awaiting_response = true;

        Some(PendingCompletion {
            placeholder,
            epoch: self.epoch,
            user_input: text.to_string(),
            context: self.store.transcript().latest_context().map(str::to_string),
            credential: self.credential().map(str::to_string),
        })
    }

    /// Apply the inference result for `pending`.
    pub fn finish_submit(&mut self, pending: PendingCompletion, result: Result<String>) -> SubmitOutcome {
        if pending.epoch != self.epoch {
            tracing::debug!("dropping response for a cleared conversation");
            return SubmitOutcome::Discarded;
        }
        self.awaiting_response = false;

        let response = match result {
            Ok(raw) => sanitize_response(&raw),
            Err(e) => {
                tracing::warn!(error = %e, "inference failed");
                self.display
                    .replace(pending.placeholder, ChatRole::Assistant, EntryBody::Failed(e.to_string()));
                return SubmitOutcome::Failed(e);
            }
        };

        if let Err(e) = self.store.append(ChatTurn::assistant(response.clone())) {
            self.display
                .replace(pending.placeholder, ChatRole::Assistant, EntryBody::Failed(e.to_string()));
            return SubmitOutcome::Failed(e);
        }
        self.display
            .replace(pending.placeholder, ChatRole::Assistant, EntryBody::Text(response.clone()));
        SubmitOutcome::Answered(response)
    }

    /// Extract the active page in one step.
    pub async fn extract_content(&mut self) -> ExtractOutcome {
        if !self.begin_extract() {
            return ExtractOutcome::Busy;
        }
        let result = self.extractor.handle(ExtractionRequest::ExtractContent).await;
        self.finish_extract(result)
    }

    /// Enter the extracting state; `false` if an extraction is already running.
    pub fn begin_extract(&mut self) -> bool {
        if self.extracting {
            return false;
        }
        self.extracting = true;
        true
    }

    /// Turn an extraction reply into a persisted System turn, or a transient
    /// Error entry when it failed.
    pub fn finish_extract(&mut self, result: ExtractionResult) -> ExtractOutcome {
        self.extracting = false;

        let page = match result.into_result() {
            Ok(page) => page,
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(error = %message, "page extraction failed");
                self.display.push(ChatRole::Error, EntryBody::Text(message.clone()));
                return ExtractOutcome::Failed(message);
            }
        };

        let turn = ChatTurn::system(page_context_message(&page));
        if let Err(e) = self.store.append(turn.clone()) {
            self.show_error(&e);
            return ExtractOutcome::Failed(e.to_string());
        }
        self.display.push_turn(&turn);
        tracing::info!(url = %page.url, chars = page.text.chars().count(), "added page context");
        ExtractOutcome::Extracted(turn)
    }

    /// Empty the transcript (persisted) and reset the display.
    pub fn clear(&mut self) -> Result<()> {
        if let Err(e) = self.store.clear() {
            self.show_error(&e);
            return Err(e);
        }
        self.epoch += 1;
        self.awaiting_response = false;
        self.display.reset(Some(CLEARED_NOTICE));
        Ok(())
    }

    /// Persist a new credential. Blank input is ignored and returns `false`.
    pub fn save_credential(&mut self, token: &str) -> Result<bool> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(false);
        }
        if let Err(e) = self.store.save_credential(token) {
            self.show_error(&e);
            return Err(e);
        }
        // Display-only; the notice is not part of the transcript.
        self.display
            .push(ChatRole::System, EntryBody::Text(TOKEN_SAVED_NOTICE.to_string()));
        Ok(true)
    }

    fn show_error(&mut self, error: &ChatError) {
        tracing::warn!(%error, "session update failed");
        self.display.push(ChatRole::Error, EntryBody::Text(error.to_string()));
    }
}

/// Content of the System turn synthesized from an extracted page.
pub fn page_context_message(page: &PageContent) -> String {
    let excerpt: String = page.text.chars().take(CONTEXT_EXCERPT_CHARS).collect();
    format!(
        "Page Context - Title: {}\nURL: {}\nContent: {}...",
        page.title, page.url, excerpt
    )
}
