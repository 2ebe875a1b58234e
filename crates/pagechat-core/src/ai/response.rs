//! Normalization of text-generation response bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ChatError, Result};

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: String,
}

/// Accepted response shapes, tried in this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResponse {
    /// `["text", ...]`
    TextList(String),
    /// `[{"generated_text": "text"}, ...]`
    GeneratedList(String),
    /// `{"generated_text": "text"}`
    Generated(String),
}

impl GenerationResponse {
    pub fn parse(body: &Value) -> Result<Self> {
        if let Value::Array(items) = body {
            match items.first() {
                Some(Value::String(text)) if !text.is_empty() => {
                    return Ok(Self::TextList(text.clone()));
                }
                Some(first @ Value::Object(_)) => {
                    if let Some(text) = generated_text(first) {
                        return Ok(Self::GeneratedList(text));
                    }
                }
                _ => {}
            }
        }
        if body.is_object() {
            if let Some(text) = generated_text(body) {
                return Ok(Self::Generated(text));
            }
        }
        Err(ChatError::ResponseFormat)
    }

    pub fn into_text(self) -> String {
        match self {
            Self::TextList(text) | Self::GeneratedList(text) | Self::Generated(text) => text,
        }
    }
}

fn generated_text(value: &Value) -> Option<String> {
    GeneratedText::deserialize(value)
        .ok()
        .map(|g| g.generated_text)
        .filter(|text| !text.is_empty())
}

/// Parse a raw body into generated text.
pub fn normalize_body(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        tracing::warn!(error = %e, "response body is not JSON");
        ChatError::ResponseFormat
    })?;
    GenerationResponse::parse(&value).map(GenerationResponse::into_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(value: Value) -> Result<String> {
        GenerationResponse::parse(&value).map(GenerationResponse::into_text)
    }

    #[test]
    fn test_accepted_shapes() {
        assert_eq!(text(json!(["hello"])).unwrap(), "hello");
        assert_eq!(text(json!([{"generated_text": "hi"}])).unwrap(), "hi");
        assert_eq!(text(json!({"generated_text": "yo"})).unwrap(), "yo");
    }

    #[test]
    fn test_shape_is_reported() {
        assert_eq!(
            GenerationResponse::parse(&json!([{"generated_text": "hi", "score": 1}])).unwrap(),
            GenerationResponse::GeneratedList("hi".to_string())
        );
    }

    #[test]
    fn test_rejected_shapes() {
        for body in [
            json!({}),
            json!([]),
            json!([42]),
            json!([""]),
            json!({"generated_text": ""}),
            json!({"generated_text": 5}),
            json!([{"text": "nope"}]),
            json!("bare string"),
            json!(null),
        ] {
            assert!(
                matches!(text(body.clone()), Err(ChatError::ResponseFormat)),
                "expected format error for {body}"
            );
        }
    }

    #[test]
    fn test_only_first_element_is_considered() {
        assert!(text(json!([{}, "later"])).is_err());
        assert_eq!(text(json!(["first", {"generated_text": "x"}])).unwrap(), "first");
    }

    #[test]
    fn test_non_json_body() {
        assert!(matches!(normalize_body("<html>oops</html>"), Err(ChatError::ResponseFormat)));
        assert_eq!(normalize_body(r#"[{"generated_text":"ok"}]"#).unwrap(), "ok");
    }
}
