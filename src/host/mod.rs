//! Contract the host container supplies to the bridge.
//!
//! # Responsibilities
//! - Hand over the native streams backing the exchange
//! - Carry the one-shot completion signal of the host's async context
//! - Accept registration of the upgrade callback (phase one of the
//!   two-phase handshake)
//!
//! # Design Decisions
//! - Traits rather than concrete host types: the bridge runs unchanged
//!   against any container that can supply these capabilities
//! - Native streams are taken, not borrowed; each is handed over at most
//!   once per exchange

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, StatusCode};
use thiserror::Error;

use crate::channel::{NativeReadStream, NativeWriteStream};
use crate::upgrade::UpgradeHandler;

/// Errors surfaced by host operations.
#[derive(Debug, Error)]
pub enum HostError {
    /// The native stream was already handed over for this exchange.
    #[error("native stream already taken")]
    StreamTaken,

    /// Flushing the host's response buffer failed.
    #[error("flush failed: {0}")]
    Flush(#[source] std::io::Error),

    /// The host refused or failed to register the upgrade handler. Fatal
    /// for the exchange; the handshake bytes are already on the wire.
    #[error("upgrade registration failed: {0}")]
    Upgrade(String),
}

/// Host-side view of the in-flight request.
pub trait HostRequest: Send + Sync {
    /// Hand over the native input stream carrying the request body.
    /// Called at most once per exchange.
    fn take_input_stream(&self) -> Result<NativeReadStream, HostError>;

    /// Fire the one-shot completion signal of the host's async context.
    /// The host reclaims the exchange's resources after this; the bridge
    /// guarantees it is called exactly once per exchange.
    fn complete(&self);

    /// Register the upgrade handler. The host invokes `init` on it, from
    /// an arbitrary task, once the transport-level handshake finishes.
    fn upgrade(&self, handler: UpgradeHandler) -> Result<(), HostError>;
}

/// Host-side view of the in-flight response.
pub trait HostResponse: Send + Sync {
    /// Set the response status line.
    fn set_status(&self, status: StatusCode);

    /// Append a header to the response; repeated names accumulate.
    fn add_header(&self, name: &HeaderName, value: &HeaderValue);

    /// Hand over the native output stream for the response body.
    /// Called at most once per exchange.
    fn take_output_stream(&self) -> Result<NativeWriteStream, HostError>;

    /// Drain the host's response buffer to the transport.
    fn flush_buffer(&self) -> Result<(), HostError>;
}

/// Allocator the pipeline borrows scratch buffers from.
///
/// Interface only; pooling policy lives in the host or a dedicated
/// allocator crate. The bridge ferries the handle to the pipeline and
/// never allocates through it itself.
pub trait BufferPool: Send + Sync {
    /// Borrow a buffer with at least `capacity` bytes available.
    fn acquire(&self, capacity: usize) -> BytesMut;

    /// Return a buffer to the pool.
    fn release(&self, buffer: BytesMut);
}
