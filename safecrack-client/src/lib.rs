#![deny(missing_docs)]
//! Streaming client for the safe-cracker solver.
//!
//! The solver reports progress on `POST /api/crack_safe/stream` as
//! newline-delimited JSON. This crate frames the chunked body into lines
//! ([`framer`]), classifies each line ([`dispatch`]) and drives one operation
//! from request to a single settlement ([`streaming`]).
//!
//! Callback style, resolving to the [`Completion`]:
//!
//! ```no_run
//! use safecrack_client::{Progress, SafeCracker};
//!
//! # async fn run() -> Result<(), safecrack_client::CrackError> {
//! let client = SafeCracker::from_env()?;
//! let done = client
//!     .stream_crack("1234567890", |p: Progress| {
//!         println!("{} -> {}/{}", p.current_attempt, p.correct_digits, p.total_digits);
//!     })
//!     .await?;
//! println!("{} attempts", done.attempts);
//! # Ok(())
//! # }
//! ```
//!
//! Pull style, with [`SafeCracker::crack_events`]:
//!
//! ```no_run
//! use futures::StreamExt;
//! use safecrack_client::{SafeCracker, StreamEvent};
//!
//! # async fn run() -> Result<(), safecrack_client::CrackError> {
//! let client = SafeCracker::new().api_key("dev-safe-cracker-key-12345");
//! let mut events = client.crack_events("1234567890").await?.receiver;
//! while let Some(event) = events.next().await {
//!     match event? {
//!         StreamEvent::Progress(p) => println!("{}", p.attempts),
//!         StreamEvent::Complete(c) => println!("done in {}", c.attempts),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod config;
pub mod dispatch;
mod error;
pub mod framer;
pub mod streaming;

pub use client::SafeCracker;
pub use config::ClientConfig;
pub use dispatch::{Dispatch, Dispatcher, ProgressSink};
pub use framer::LineFramer;
pub use streaming::{
    CrackStream, Phase, Session, Settlement, StreamOptions, drive, event_stream,
    event_stream_with_cancel,
};

pub use safecrack_types::{
    ApiKey, Completion, CrackError, MalformedLinePolicy, Progress, ProtocolError, ServiceStatus,
    StreamEvent, TransportError,
};
