//! Channel abstraction over host-native byte streams.
//!
//! # Responsibilities
//! - Expose the pipeline's readable/writable channel capability over one
//!   native stream each
//! - Serialize access so channels can be shared across tasks
//! - Idempotent close in both directions
//!
//! # Design Decisions
//! - No buffering policy of its own; callers bring buffers (typically from
//!   the exchange's buffer pool)
//! - Native streams are boxed `AsyncRead`/`AsyncWrite` trait objects so the
//!   same wrapper serves the host's transport and post-upgrade duplex streams

pub mod read;
pub mod write;

pub use read::ReadChannel;
pub use write::WriteChannel;

use thiserror::Error;

/// Native input stream handed over by the host.
pub type NativeReadStream = Box<dyn tokio::io::AsyncRead + Send + Unpin>;

/// Native output stream handed over by the host.
pub type NativeWriteStream = Box<dyn tokio::io::AsyncWrite + Send + Unpin>;

/// Errors surfaced by channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel was closed before or during the operation.
    #[error("channel is closed")]
    Closed,

    /// The underlying native stream failed.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}
