//! Prompt augmentation from memory.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{ConversationTurn, MemoryKind, MemoryRecord, MemoryStore};

/// Self-disclosure markers that promote a message to long-term memory.
const LONG_TERM_TRIGGERS: [&str; 4] = ["my name is", "i am", "call me", "remember that"];

/// Importance assigned to trigger-matched messages.
const SELF_DISCLOSURE_IMPORTANCE: f64 = 0.9;

/// Memory gathered for one prompt.
#[derive(Debug, Clone, Default)]
pub struct MemoryContext {
    /// Conversation turns, newest first (as the store returns them).
    pub short_term: Vec<ConversationTurn>,
    /// Relevant long-term records.
    pub long_term: Vec<MemoryRecord>,
}

impl MemoryContext {
    pub fn is_empty(&self) -> bool {
        self.short_term.is_empty() && self.long_term.is_empty()
    }
}

/// Whether a message should additionally be stored long-term.
pub fn wants_long_term(message: &str) -> bool {
    let lowered = message.to_lowercase();
    LONG_TERM_TRIGGERS
        .iter()
        .any(|trigger| lowered.contains(trigger))
}

/// Render an enriched prompt: long-term memory, then conversation
/// history (chronological, so the newest-first store order is reversed),
/// then the current message. Empty context returns the message unchanged
/// rather than wasting tokens on empty scaffolding.
pub fn enhance(message: &str, context: &MemoryContext) -> String {
    if context.is_empty() {
        return message.to_string();
    }

    let mut sections = Vec::new();

    if !context.long_term.is_empty() {
        let memory_text = context
            .long_term
            .iter()
            .map(|record| {
                format!(
                    "- {} (importance: {}, type: {})",
                    record.content, record.importance, record.kind
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!(
            "=== LONG-TERM MEMORY (Persistent facts, preferences, and important information) ===\n{memory_text}"
        ));
    }

    if !context.short_term.is_empty() {
        let history_text = context
            .short_term
            .iter()
            .rev()
            .map(|turn| format!("{}: {}", turn.role, turn.content))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!(
            "=== CONVERSATION HISTORY (Recent messages in chronological order - this is your short-term memory) ===\n{history_text}"
        ));
    }

    format!(
        "=== MEMORY CONTEXT ===\n{}\n\n=== CURRENT USER MESSAGE ===\n{message}\n\n\
         Please respond to the current user message above, taking into account the \
         conversation history and any relevant long-term memories. The conversation \
         history shows the complete context of our recent discussion, so you can \
         reference previous topics and maintain continuity.",
        sections.join("\n")
    )
}

/// Builds enriched prompts and persists conversation turns, all
/// best-effort: storage failures degrade to the unaugmented message
/// instead of failing the request.
pub struct ContextAugmenter {
    store: Arc<dyn MemoryStore>,
    context_limit: usize,
    recall_limit: usize,
}

impl ContextAugmenter {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self {
            store,
            context_limit: 50,
            recall_limit: 5,
        }
    }

    pub fn with_limits(mut self, context_limit: usize, recall_limit: usize) -> Self {
        self.context_limit = context_limit;
        self.recall_limit = recall_limit;
        self
    }

    /// Persist the user message and build the enriched prompt.
    pub async fn prepare(&self, message: &str) -> String {
        if let Err(e) = self.store.store_user_message(message).await {
            warn!(error = %e, "failed to store user message");
        }

        if wants_long_term(message) {
            if let Err(e) = self
                .store
                .store_long_term_memory(message, MemoryKind::UserInfo, SELF_DISCLOSURE_IMPORTANCE)
                .await
            {
                warn!(error = %e, "failed to store long-term memory");
            }
        }

        let short_term = match self.store.get_conversation_context(self.context_limit).await {
            Ok(turns) => turns,
            Err(e) => {
                warn!(error = %e, "failed to fetch conversation context");
                Vec::new()
            }
        };
        let long_term = match self
            .store
            .get_long_term_memories(message, self.recall_limit)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "failed to fetch long-term memories");
                Vec::new()
            }
        };

        let context = MemoryContext {
            short_term,
            long_term,
        };
        if !context.is_empty() {
            debug!(
                short_term = context.short_term.len(),
                long_term = context.long_term.len(),
                "augmenting prompt with memory context"
            );
        }
        enhance(message, &context)
    }

    /// Persist the assistant's final content after a successful response.
    pub async fn record_reply(&self, content: &str) {
        if content.is_empty() {
            return;
        }
        if let Err(e) = self.store.store_assistant_message(content).await {
            warn!(error = %e, "failed to store assistant message");
        }
    }
}
