//! Conversational memory: short-term history plus long-term recall.
//!
//! The storage backend is external; this module defines the trait the
//! service talks to and the prompt augmentation built on top of it.

pub mod context;

pub use context::{enhance, ContextAugmenter, MemoryContext};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::Result;

/// Speaker of a conversation turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Kind of a long-term memory record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MemoryKind {
    Preference,
    Fact,
    Lesson,
    Instruction,
    ProjectInfo,
    UserInfo,
}

/// One short-term conversation entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One long-term memory entry, scored by importance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub content: String,
    pub importance: f64,
    pub kind: MemoryKind,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(content: impl Into<String>, importance: f64, kind: MemoryKind) -> Self {
        Self {
            content: content.into(),
            importance,
            kind,
            created_at: Utc::now(),
        }
    }
}

/// External memory system. Each operation fails independently; callers
/// treat every one as best-effort.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn store_user_message(&self, content: &str) -> Result<()>;

    async fn store_assistant_message(&self, content: &str) -> Result<()>;

    async fn store_long_term_memory(
        &self,
        content: &str,
        kind: MemoryKind,
        importance: f64,
    ) -> Result<()>;

    /// Recent conversation turns, newest first.
    async fn get_conversation_context(&self, limit: usize) -> Result<Vec<ConversationTurn>>;

    /// Long-term records relevant to `query`, most relevant first.
    async fn get_long_term_memories(&self, query: &str, limit: usize)
        -> Result<Vec<MemoryRecord>>;
}
