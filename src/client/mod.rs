//! Model client abstraction and the bundled OpenAI-compatible implementation.

pub mod http;
pub mod openai_compat;

pub use openai_compat::OpenAiCompatClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Usage;

/// Result of a non-streaming call.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

/// End-of-stream report.
///
/// `final_text` is the backend's canonical output when it reports one;
/// callers fall back to their own chunk concatenation otherwise.
#[derive(Debug, Clone, Default)]
pub struct StreamEnd {
    pub final_text: Option<String>,
    pub usage: Usage,
}

/// One in-flight streaming call.
#[async_trait]
pub trait ModelStream: Send {
    /// Next text fragment, `None` once the stream is finished.
    async fn next_chunk(&mut self) -> Option<Result<String>>;

    /// Consume the drained stream and report the canonical output.
    async fn finalize(self: Box<Self>) -> Result<StreamEnd>;
}

/// Opaque language-model backend.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// The model this client serves.
    fn model_id(&self) -> &str;

    /// Run a prompt to completion (non-streaming).
    async fn complete(&self, prompt: &str) -> Result<Completion>;

    /// Open a streaming call for a prompt.
    async fn open_stream(&self, prompt: &str) -> Result<Box<dyn ModelStream>>;
}
