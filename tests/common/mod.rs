//! Shared test doubles for the behavioural suites.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use skald::bridge::ToolBridge;
use skald::client::{Completion, ModelClient, ModelStream, StreamEnd};
use skald::error::{Result, SkaldError};
use skald::memory::{ConversationTurn, MemoryKind, MemoryRecord, MemoryStore};
use skald::stream::ChunkSink;
use skald::types::Usage;

pub fn connection_error() -> SkaldError {
    SkaldError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "connection refused",
    ))
}

pub fn usage(total: u32) -> Usage {
    Usage {
        input_tokens: 0,
        output_tokens: total,
        total_tokens: total,
    }
}

/// One scripted streaming attempt.
pub struct ScriptedStream {
    chunks: VecDeque<Result<String>>,
    final_text: Option<String>,
    usage: Usage,
    finalize_error: bool,
    gate: Option<Arc<Notify>>,
}

impl ScriptedStream {
    pub fn of(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| Ok(c.to_string())).collect(),
            final_text: None,
            usage: Usage::default(),
            finalize_error: false,
            gate: None,
        }
    }

    /// Chunks followed by a mid-stream failure.
    pub fn failing_after(chunks: &[&str], error: SkaldError) -> Self {
        let mut stream = Self::of(chunks);
        stream.chunks.push_back(Err(error));
        stream
    }

    pub fn with_final(mut self, text: &str) -> Self {
        self.final_text = Some(text.to_string());
        self
    }

    pub fn with_usage(mut self, total: u32) -> Self {
        self.usage = usage(total);
        self
    }

    pub fn with_finalize_error(mut self) -> Self {
        self.finalize_error = true;
        self
    }

    /// Block before the first chunk until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl ModelStream for ScriptedStream {
    async fn next_chunk(&mut self) -> Option<Result<String>> {
        if let Some(gate) = self.gate.take() {
            gate.notified().await;
        }
        self.chunks.pop_front()
    }

    async fn finalize(self: Box<Self>) -> Result<StreamEnd> {
        if self.finalize_error {
            return Err(SkaldError::stream("final output unavailable"));
        }
        Ok(StreamEnd {
            final_text: self.final_text,
            usage: self.usage,
        })
    }
}

/// Scripted attempt outcome for [`ScriptedClient::open_stream`].
pub enum Script {
    FailOpen(SkaldError),
    Stream(ScriptedStream),
}

/// Model client that replays a fixed script.
pub struct ScriptedClient {
    scripts: Mutex<VecDeque<Script>>,
    completions: Mutex<VecDeque<Result<Completion>>>,
    pub open_calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            completions: Mutex::new(VecDeque::new()),
            open_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_completions(completions: Vec<Result<Completion>>) -> Self {
        let client = Self::new(Vec::new());
        *client.completions.lock().unwrap() = completions.into_iter().collect();
        client
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<Completion> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SkaldError::api(500, "no scripted completion")))
    }

    async fn open_stream(&self, prompt: &str) -> Result<Box<dyn ModelStream>> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.scripts.lock().unwrap().pop_front() {
            Some(Script::FailOpen(err)) => Err(err),
            Some(Script::Stream(stream)) => Ok(Box::new(stream)),
            None => Err(SkaldError::api(500, "no scripted attempt left")),
        }
    }
}

type ChunkHook = Box<dyn Fn() + Send + Sync>;

/// Sink recording every callback, optionally failing each `on_chunk`
/// and/or running a hook once the n-th chunk arrives.
pub struct RecordingSink {
    chunks: Mutex<Vec<(String, bool)>>,
    errors: Mutex<Vec<String>>,
    fail_chunks: AtomicBool,
    hook: Mutex<Option<(usize, ChunkHook)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            chunks: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            fail_chunks: AtomicBool::new(false),
            hook: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        let sink = Self::new();
        sink.fail_chunks.store(true, Ordering::SeqCst);
        sink
    }

    pub fn with_hook(nth: usize, hook: impl Fn() + Send + Sync + 'static) -> Self {
        let sink = Self::new();
        *sink.hook.lock().unwrap() = Some((nth, Box::new(hook)));
        sink
    }

    pub fn chunks(&self) -> Vec<(String, bool)> {
        self.chunks.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl ChunkSink for RecordingSink {
    fn on_chunk(&self, text: &str, is_final: bool) -> Result<()> {
        let count = {
            let mut chunks = self.chunks.lock().unwrap();
            chunks.push((text.to_string(), is_final));
            chunks.len()
        };
        if let Some((nth, hook)) = &*self.hook.lock().unwrap() {
            if count == *nth {
                hook();
            }
        }
        if self.fail_chunks.load(Ordering::SeqCst) {
            return Err(SkaldError::stream("sink refused chunk"));
        }
        Ok(())
    }

    fn on_error(&self, error: &SkaldError) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

/// Bridge failing a configured number of connection attempts first.
pub struct FlakyBridge {
    connected: AtomicBool,
    failures_remaining: AtomicUsize,
    pub connect_calls: AtomicUsize,
}

impl FlakyBridge {
    pub fn new(failures: usize) -> Self {
        Self {
            connected: AtomicBool::new(false),
            failures_remaining: AtomicUsize::new(failures),
            connect_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ToolBridge for FlakyBridge {
    async fn ensure_connection(&self) -> Result<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(connection_error());
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// In-memory [`MemoryStore`] recording every call.
pub struct MockMemory {
    pub user_messages: Mutex<Vec<String>>,
    pub assistant_messages: Mutex<Vec<String>>,
    pub long_term_writes: Mutex<Vec<(String, MemoryKind, f64)>>,
    context: Mutex<Vec<ConversationTurn>>,
    memories: Mutex<Vec<MemoryRecord>>,
    fail_all: AtomicBool,
}

impl MockMemory {
    pub fn new() -> Self {
        Self {
            user_messages: Mutex::new(Vec::new()),
            assistant_messages: Mutex::new(Vec::new()),
            long_term_writes: Mutex::new(Vec::new()),
            context: Mutex::new(Vec::new()),
            memories: Mutex::new(Vec::new()),
            fail_all: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let store = Self::new();
        store.fail_all.store(true, Ordering::SeqCst);
        store
    }

    /// Seed the short-term context (newest first, as a real store
    /// returns it).
    pub fn with_context(self, turns: Vec<ConversationTurn>) -> Self {
        *self.context.lock().unwrap() = turns;
        self
    }

    pub fn with_memories(self, records: Vec<MemoryRecord>) -> Self {
        *self.memories.lock().unwrap() = records;
        self
    }

    fn check(&self) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(SkaldError::MemoryStore("store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for MockMemory {
    async fn store_user_message(&self, content: &str) -> Result<()> {
        self.check()?;
        self.user_messages.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn store_assistant_message(&self, content: &str) -> Result<()> {
        self.check()?;
        self.assistant_messages
            .lock()
            .unwrap()
            .push(content.to_string());
        Ok(())
    }

    async fn store_long_term_memory(
        &self,
        content: &str,
        kind: MemoryKind,
        importance: f64,
    ) -> Result<()> {
        self.check()?;
        self.long_term_writes
            .lock()
            .unwrap()
            .push((content.to_string(), kind, importance));
        Ok(())
    }

    async fn get_conversation_context(&self, limit: usize) -> Result<Vec<ConversationTurn>> {
        self.check()?;
        let turns = self.context.lock().unwrap();
        Ok(turns.iter().take(limit).cloned().collect())
    }

    async fn get_long_term_memories(
        &self,
        _query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        self.check()?;
        let records = self.memories.lock().unwrap();
        Ok(records.iter().take(limit).cloned().collect())
    }
}
