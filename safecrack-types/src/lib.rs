//! # safecrack-types: wire types for the safe-cracker streaming protocol
//!
//! The solver reports its search as newline-delimited JSON. Each line is one
//! [`StreamEvent`], tagged by its `type` field:
//!
//! | Tag | Type | Meaning |
//! |-----|------|---------|
//! | `"progress"` | [`Progress`] | Intermediate report, repeated any number of times |
//! | `"complete"` | [`Completion`] | Terminal report, ends the stream |
//!
//! Failures are described by [`CrackError`], which separates transport
//! failures ([`TransportError`]) from protocol violations ([`ProtocolError`]).
//!
//! This crate has no HTTP dependency. The client lives in `safecrack-client`.

#![deny(missing_docs)]

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
