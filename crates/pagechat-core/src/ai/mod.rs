pub mod huggingface;
pub mod prompt;
pub mod response;

use async_trait::async_trait;

use crate::error::Result;

pub use huggingface::InferenceClient;

/// Something that turns a user utterance (plus optional page context) into a reply.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(
        &self,
        credential: Option<&str>,
        user_input: &str,
        context: Option<&str>,
    ) -> Result<String>;
}
