//! Paranoid Pirate reliable request-reply messaging: a broker dispatching
//! client requests to a dynamic worker pool on an LRU basis, bidirectional
//! heartbeating for failure detection, and bounded-retry clients.
//!
//! See [`broker`], [`worker`], and [`client`] for the three endpoints.

pub mod broker;
pub mod client;
pub mod error;
pub mod protocol;
pub mod worker;

pub use client::{ClientEndpoint, ClientOutcome, RetryPolicy};
pub use error::{PirateError, Result};
pub use worker::{RequestHandler, TaskHandle};
