use regex::Regex;
use std::sync::LazyLock;

static ROLE_ECHO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(assistant|human):\s*").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\n").expect("valid regex"));

/// Build the prompt sent as `inputs`.
///
/// An empty context counts as no context. Context is embedded verbatim.
pub fn build_prompt(user_input: &str, context: Option<&str>) -> String {
    match context.filter(|c| !c.is_empty()) {
        Some(context) => format!(
            "Context: {}\n\nHuman: {}\nAssistant: Let me help you understand this context and answer your question.",
            context, user_input
        ),
        None => format!("Human: {}\nAssistant:", user_input),
    }
}

/// Strip a leading role-label echo and blank lines from model output.
pub fn sanitize_response(raw: &str) -> String {
    let without_label = ROLE_ECHO.replace(raw, "");
    BLANK_LINES.replace_all(&without_label, "").trim().to_string()
}
