//! The single value handed back to service callers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Classified, ErrorCategory};

/// Outcome of one send. Internal failures never cross the service
/// boundary raw; they arrive here classified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiResponse {
    pub success: bool,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorCategory>,
    #[serde(default)]
    pub tokens_used: u32,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<Uuid>,
}

impl AiResponse {
    /// Successful outcome.
    pub fn success(content: impl Into<String>, tokens_used: u32, retry_count: u32) -> Self {
        Self {
            success: true,
            content: content.into(),
            error: None,
            error_type: None,
            tokens_used,
            retry_count,
            stream_id: None,
        }
    }

    /// Failed outcome carrying a classified error.
    ///
    /// `content` holds the user-facing message; `error` the raw error text.
    pub fn failure(classified: Classified, raw: impl Into<String>, retry_count: u32) -> Self {
        Self {
            success: false,
            content: classified.message,
            error: Some(raw.into()),
            error_type: Some(classified.category),
            tokens_used: 0,
            retry_count,
            stream_id: None,
        }
    }

    /// Attach the stream id.
    pub fn with_stream_id(mut self, stream_id: Uuid) -> Self {
        self.stream_id = Some(stream_id);
        self
    }
}
