//! Convenience re-exports for common use.

pub use crate::bridge::ToolBridge;
pub use crate::client::{Completion, ModelClient, ModelStream, OpenAiCompatClient, StreamEnd};
pub use crate::config::ServiceConfig;
pub use crate::error::{Classifier, ErrorCategory, Result, SkaldError};
pub use crate::memory::{ContextAugmenter, MemoryContext, MemoryKind, MemoryStore};
pub use crate::retry::{ErrorStats, RetryCoordinator, RetryPolicy};
pub use crate::stream::{
    ChannelSink, ChunkSink, SessionState, StreamEvent, StreamOptions, StreamService, StreamStatus,
};
pub use crate::types::{AiResponse, Usage};
