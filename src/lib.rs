//! skald — resilient streaming relay to AI chat services.
//!
//! Sends prompts to a language-model backend and relays the streamed
//! response to a caller, tolerating transient failures (classification,
//! bounded exponential backoff, whole-call retry) and supporting
//! cooperative mid-flight interruption. Prompts can optionally be
//! enriched from short- and long-term conversational memory.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use skald::prelude::*;
//!
//! # async fn example() -> skald::error::Result<()> {
//! let config = ServiceConfig::from_env()?;
//! let client = Arc::new(OpenAiCompatClient::from_config(&config));
//! let service = StreamService::from_config(client, &config);
//!
//! let (sink, mut _events) = ChannelSink::new();
//! let response = service
//!     .send_message_stream("Hello!", &sink, StreamOptions::default())
//!     .await;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod prelude;
pub mod retry;
pub mod stream;
pub mod types;
pub mod util;
