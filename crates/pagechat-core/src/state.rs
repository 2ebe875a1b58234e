//! UI-agnostic chat state types
//!
//! This module contains data structures that are shared between the front ends
//! (TUI, one-shot CLI) and don't depend on any specific UI framework.

use serde::{Deserialize, Serialize};

/// Marker that identifies a System turn carrying extracted page text.
pub const PAGE_CONTEXT_MARKER: &str = "Page Context";

/// A single role-tagged message in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Error, content)
    }

    /// Whether this turn holds extracted page text.
    pub fn is_page_context(&self) -> bool {
        self.role == ChatRole::System && self.content.contains(PAGE_CONTEXT_MARKER)
    }
}

/// The role of a chat message sender
///
/// Persisted with the same labels the chat view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    #[serde(rename = "You", alias = "User")]
    User,
    #[serde(rename = "AI", alias = "Assistant")]
    Assistant,
    System,
    Error,
}

impl ChatRole {
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "You",
            ChatRole::Assistant => "AI",
            ChatRole::System => "System",
            ChatRole::Error => "Error",
        }
    }
}

/// Ordered, append-only list of chat turns.
///
/// Turns can only be added through the session store, which keeps the durable
/// copy in step; front ends get read access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    /// Content of the most recent System turn, used as inference context.
    pub fn latest_context(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == ChatRole::System)
            .map(|turn| turn.content.as_str())
    }

    pub(crate) fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }
}

impl From<Vec<ChatTurn>> for Transcript {
    fn from(turns: Vec<ChatTurn>) -> Self {
        Self { turns }
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a ChatTurn;
    type IntoIter = std::slice::Iter<'a, ChatTurn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_persist_with_display_labels() {
        let json = serde_json::to_string(&ChatTurn::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"You","content":"hi"}"#);

        let json = serde_json::to_string(&ChatTurn::assistant("yo")).unwrap();
        assert_eq!(json, r#"{"role":"AI","content":"yo"}"#);
    }

    #[test]
    fn test_roles_accept_enum_names() {
        let turn: ChatTurn = serde_json::from_str(r#"{"role":"Assistant","content":"x"}"#).unwrap();
        assert_eq!(turn.role, ChatRole::Assistant);
        let turn: ChatTurn = serde_json::from_str(r#"{"role":"User","content":"x"}"#).unwrap();
        assert_eq!(turn.role, ChatRole::User);
    }

    #[test]
    fn test_latest_context_is_most_recent_system_turn() {
        let transcript = Transcript::from(vec![
            ChatTurn::system("first"),
            ChatTurn::user("q"),
            ChatTurn::system("second"),
            ChatTurn::assistant("a"),
        ]);
        assert_eq!(transcript.latest_context(), Some("second"));
    }

    #[test]
    fn test_latest_context_absent_without_system_turns() {
        let transcript = Transcript::from(vec![ChatTurn::user("q"), ChatTurn::error("boom")]);
        assert_eq!(transcript.latest_context(), None);
    }

    #[test]
    fn test_transcript_serializes_as_plain_list() {
        let transcript = Transcript::from(vec![ChatTurn::system("ctx")]);
        let json = serde_json::to_value(&transcript).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["role"], "System");
    }

    #[test]
    fn test_page_context_detection() {
        assert!(ChatTurn::system("Page Context - Title: x").is_page_context());
        assert!(!ChatTurn::system("API token saved.").is_page_context());
        assert!(!ChatTurn::user("Page Context").is_page_context());
    }
}
