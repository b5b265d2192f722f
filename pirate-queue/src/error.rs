//! Error types for `pirate-queue`.
//!
//! Mirrors the granularity of `monocoque_core::error::MonocoqueError`: only
//! failures that genuinely abort a component are modeled here. Accept
//! failures and per-message transport errors are logged and retried or
//! dropped in place — they never need to cross a function boundary as a
//! typed error.

use std::io;
use thiserror::Error;

/// Errors that can abort a broker, worker, or client at startup.
#[derive(Error, Debug)]
pub enum PirateError {
    /// Failed to bind the frontend or backend listening socket.
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PirateError>;
