//! Stream session coordination.
//!
//! [`StreamService`] owns the whole exchange: bridge readiness, the
//! streaming call, chunk relay, cooperative interruption, and the
//! whole-call retry loop. No error crosses its boundary raw — every
//! outcome is a structured [`AiResponse`].

pub mod session;
pub mod sink;

pub use session::{InterruptFlag, SessionState, StreamSession};
pub use sink::{ChannelSink, ChunkSink, StreamEvent};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::bridge::ToolBridge;
use crate::client::ModelClient;
use crate::config::ServiceConfig;
use crate::error::{Classified, Classifier, ErrorCategory, Result, SkaldError};
use crate::memory::{ContextAugmenter, MemoryStore};
use crate::retry::{ErrorStats, RetryCoordinator, RetryPolicy, StatsSink, StatsSnapshot};
use crate::types::{AiResponse, Usage};
use crate::util::with_timeout;

/// Options for one streaming send.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Connect the tool bridge before streaming.
    pub enable_filesystem: bool,
    /// Override the policy's retry count for this call.
    pub max_retries: Option<u32>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            enable_filesystem: true,
            max_retries: None,
        }
    }
}

/// Snapshot of the streaming surface.
#[derive(Debug, Clone)]
pub struct StreamStatus {
    pub is_streaming: bool,
    pub current_stream_id: Option<Uuid>,
    pub memory_aware_enabled: bool,
}

struct ActiveStream {
    stream_id: Uuid,
    interrupt: Arc<InterruptFlag>,
}

struct AttemptOutcome {
    content: String,
    usage: Usage,
    interrupted: bool,
}

/// Orchestrates streaming exchanges with an AI backend.
///
/// At most one session may be `Starting`/`Streaming` per instance; a
/// second start fails fast without touching the live session.
pub struct StreamService {
    client: Arc<dyn ModelClient>,
    bridge: Option<Arc<dyn ToolBridge>>,
    memory: Option<ContextAugmenter>,
    classifier: Classifier,
    policy: RetryPolicy,
    stats: Arc<ErrorStats>,
    request_timeout: Duration,
    active: Mutex<Option<ActiveStream>>,
}

impl StreamService {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            bridge: None,
            memory: None,
            classifier: Classifier::new(),
            policy: RetryPolicy::default(),
            stats: Arc::new(ErrorStats::new()),
            request_timeout: Duration::from_secs(30),
            active: Mutex::new(None),
        }
    }

    /// Service wired from configuration (retry policy, hard timeout).
    pub fn from_config(client: Arc<dyn ModelClient>, config: &ServiceConfig) -> Self {
        let mut service = Self::new(client);
        service.policy = config.retry_policy();
        service.request_timeout = config.request_timeout();
        service
    }

    /// Attach a tool bridge, connected on demand before streaming.
    pub fn with_bridge(mut self, bridge: Arc<dyn ToolBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Enable memory-aware prompts backed by `store`.
    pub fn with_memory(mut self, store: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(ContextAugmenter::new(store));
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the default classifier (e.g. to add heuristic rules).
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Failure counters for this instance.
    pub fn error_statistics(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_error_statistics(&self) {
        self.stats.reset();
    }

    /// Send a message and relay the streamed response to `sink`.
    ///
    /// Every intermediate fragment is forwarded as it arrives; the sink
    /// receives a final `("", true)` call exactly once. The whole
    /// attempt — bridge connection, stream open, chunk consumption — is
    /// retried with exponential backoff on failure.
    pub async fn send_message_stream(
        &self,
        message: &str,
        sink: &dyn ChunkSink,
        options: StreamOptions,
    ) -> AiResponse {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            warn!("empty message provided to send_message_stream");
            return AiResponse::failure(
                Classified {
                    category: ErrorCategory::Validation,
                    message: "Message cannot be empty".to_string(),
                },
                "empty message",
                0,
            );
        }

        let mut session = match self.claim_session() {
            Ok(session) => session,
            Err(conflict) => return conflict,
        };

        let prompt = match &self.memory {
            Some(augmenter) => augmenter.prepare(trimmed).await,
            None => trimmed.to_string(),
        };

        let max_retries = options.max_retries.unwrap_or(self.policy.max_retries);
        let response = self
            .stream_with_retry(&prompt, sink, &options, max_retries, &mut session)
            .await;

        self.release_session(session.stream_id);

        if response.success && !response.content.is_empty() {
            if let Some(augmenter) = &self.memory {
                augmenter.record_reply(&response.content).await;
            }
        }

        response
    }

    /// Interrupt the active stream, if any. Returns whether one existed.
    pub fn interrupt_current_stream(&self) -> bool {
        let active = self.active.lock().unwrap();
        match active.as_ref() {
            Some(stream) => {
                info!(stream_id = %stream.stream_id, "interrupt requested");
                stream.interrupt.trigger();
                true
            }
            None => false,
        }
    }

    pub fn stream_status(&self) -> StreamStatus {
        let active = self.active.lock().unwrap();
        StreamStatus {
            is_streaming: active.is_some(),
            current_stream_id: active.as_ref().map(|stream| stream.stream_id),
            memory_aware_enabled: self.memory.is_some(),
        }
    }

    /// Send a message without streaming, retrying retryable failures.
    pub async fn send_message(&self, message: &str) -> AiResponse {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            warn!("empty message provided to send_message");
            return AiResponse::failure(
                Classified {
                    category: ErrorCategory::Validation,
                    message: "Message cannot be empty".to_string(),
                },
                "empty message",
                0,
            );
        }

        let coordinator = RetryCoordinator::with_sink(
            self.policy.clone(),
            self.stats.clone() as Arc<dyn StatsSink>,
        )
        .with_classifier(self.classifier.clone());

        let attempts = AtomicU32::new(0);
        let result = coordinator
            .execute_with_retry(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    let client = self.client.clone();
                    let prompt = trimmed.to_string();
                    let timeout = self.request_timeout;
                    async move {
                        with_timeout(timeout, async move { client.complete(&prompt).await }).await
                    }
                },
                None,
            )
            .await;
        let retry_count = attempts.load(Ordering::SeqCst).saturating_sub(1);

        match result {
            Ok(completion) => {
                info!(
                    chars = completion.text.len(),
                    tokens = completion.usage.total_tokens,
                    retries = retry_count,
                    "message completed"
                );
                AiResponse::success(completion.text, completion.usage.total_tokens, retry_count)
            }
            Err(err) => {
                let classified = self.classifier.classify(&err);
                let retries = match &err {
                    SkaldError::RetriesExhausted { retries, .. } => *retries,
                    _ => retry_count,
                };
                error!(category = %classified.category, "message failed: {err}");
                AiResponse::failure(classified, err.to_string(), retries)
            }
        }
    }

    fn claim_session(&self) -> std::result::Result<StreamSession, AiResponse> {
        let mut active = self.active.lock().unwrap();
        if active.is_some() {
            warn!("rejected stream start: another stream is active");
            return Err(AiResponse::failure(
                Classified {
                    category: ErrorCategory::Streaming,
                    message: "A stream is already active. Interrupt it before starting a new one."
                        .to_string(),
                },
                "stream already active",
                0,
            ));
        }

        let session = StreamSession::new();
        *active = Some(ActiveStream {
            stream_id: session.stream_id,
            interrupt: session.interrupt.clone(),
        });
        Ok(session)
    }

    fn release_session(&self, stream_id: Uuid) {
        let mut active = self.active.lock().unwrap();
        if active.as_ref().is_some_and(|s| s.stream_id == stream_id) {
            *active = None;
        }
    }

    async fn stream_with_retry(
        &self,
        prompt: &str,
        sink: &dyn ChunkSink,
        options: &StreamOptions,
        max_retries: u32,
        session: &mut StreamSession,
    ) -> AiResponse {
        loop {
            session.state = SessionState::Starting;
            match self.run_attempt(prompt, sink, options, session).await {
                Ok(outcome) => {
                    session.state = if outcome.interrupted {
                        SessionState::Interrupted
                    } else {
                        SessionState::Completed
                    };
                    info!(
                        stream_id = %session.stream_id,
                        interrupted = outcome.interrupted,
                        chars = outcome.content.len(),
                        retries = session.attempt,
                        "stream finished"
                    );
                    return AiResponse::success(
                        outcome.content,
                        outcome.usage.total_tokens,
                        session.attempt,
                    )
                    .with_stream_id(session.stream_id);
                }
                Err(err) => {
                    let classified = self.classifier.classify(&err);
                    self.stats
                        .record_error(classified.category, classified.category.is_retryable());

                    if session.attempt >= max_retries {
                        error!(
                            stream_id = %session.stream_id,
                            category = %classified.category,
                            retries = session.attempt,
                            "all stream attempts failed: {err}"
                        );
                        sink.on_error(&err);
                        session.state = SessionState::Failed;
                        return AiResponse::failure(classified, err.to_string(), session.attempt)
                            .with_stream_id(session.stream_id);
                    }

                    self.stats.record_retry();
                    let delay = self.policy.delay_for(session.attempt);
                    warn!(
                        stream_id = %session.stream_id,
                        attempt = session.attempt + 1,
                        max_attempts = max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        category = %classified.category,
                        "stream attempt failed; retrying: {err}"
                    );

                    if session.interrupt.sleep(delay).await {
                        // Interrupted during backoff: abort the retry
                        // loop without scheduling a fresh attempt.
                        info!(stream_id = %session.stream_id, "stream interrupted during retry backoff");
                        sink.on_error(&err);
                        session.state = SessionState::Interrupted;
                        return AiResponse::failure(classified, err.to_string(), session.attempt)
                            .with_stream_id(session.stream_id);
                    }
                    session.attempt += 1;
                }
            }
        }
    }

    async fn run_attempt(
        &self,
        prompt: &str,
        sink: &dyn ChunkSink,
        options: &StreamOptions,
        session: &mut StreamSession,
    ) -> Result<AttemptOutcome> {
        if options.enable_filesystem {
            if let Some(bridge) = &self.bridge {
                if !bridge.is_connected() {
                    debug!(stream_id = %session.stream_id, "connecting tool bridge");
                    bridge.ensure_connection().await?;
                }
            }
        }

        let mut stream = self.client.open_stream(prompt).await?;
        session.state = SessionState::Streaming;
        debug!(
            stream_id = %session.stream_id,
            attempt = session.attempt,
            "stream opened"
        );

        // Full restart: a retried attempt relays from scratch.
        session.accumulated.clear();
        let mut interrupted = false;
        loop {
            if session.interrupt.is_set() {
                info!(stream_id = %session.stream_id, "stream interrupted by caller");
                interrupted = true;
                break;
            }
            match stream.next_chunk().await {
                None => break,
                Some(Ok(text)) => {
                    session.accumulated.push_str(&text);
                    self.deliver(sink, &text, false);
                }
                Some(Err(err)) => return Err(err),
            }
        }

        // Deterministic completion signal, also for empty or
        // interrupted streams.
        self.deliver(sink, "", true);

        let mut content = session.accumulated.clone();
        let mut usage = Usage::default();
        if !interrupted {
            match stream.finalize().await {
                Ok(end) => {
                    usage = end.usage;
                    if let Some(final_text) = end.final_text {
                        if !final_text.is_empty() {
                            content = final_text;
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        stream_id = %session.stream_id,
                        error = %err,
                        "failed to fetch final output; using accumulated chunks"
                    );
                }
            }
        }

        Ok(AttemptOutcome {
            content,
            usage,
            interrupted,
        })
    }

    /// Relay one sink call, isolating consumer faults from the producer.
    fn deliver(&self, sink: &dyn ChunkSink, text: &str, is_final: bool) {
        if let Err(err) = sink.on_chunk(text, is_final) {
            error!(error = %err, "error in chunk callback");
            sink.on_error(&err);
        }
    }
}
