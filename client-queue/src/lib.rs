//! StumpCast Client Queue
//!
//! Client-side offline submission buffer for delivery inputs:
//! - Buffers while disconnected rather than dropping
//! - Flushes strictly in original order on reconnect, halting on the
//!   first failure to avoid silent reordering
//! - Removes an item only after the server confirms acceptance
//! - Treats server-provided gate state as authoritative over any
//!   client-side guess

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod queue;
pub mod transport;

pub use error::{Result, SubmitError};
pub use queue::{FlushReport, OfflineQueue, QueuedSubmission};
pub use transport::SubmissionTransport;
