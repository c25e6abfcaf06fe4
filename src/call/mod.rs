//! Application call adapter: single owner of exchange state.
//!
//! # Responsibilities
//! - Own the live request/response pair for one HTTP exchange
//! - Resolve "the current channel" per direction (override vs. default)
//! - Drive the protocol-upgrade handshake against the host
//! - Guarantee the host completion signal fires exactly once
//!
//! # Data Flow
//! ```text
//! pipeline → respond(message)
//!     → ResponsePipeline::execute (serialization, external)
//!     → close request / close-or-flush response
//!     → ensure_completed()           → host completion signal
//!
//! pipeline → handle_upgrade(descriptor, context)
//!     → status + headers + flush     → host response
//!     → register UpgradeHandler      → host
//!     → ensure_completed()
//! host (later, arbitrary task) → UpgradeHandler::init(duplex streams)
//!     → channel overrides installed  → upgraded body runs
//! ```

mod lazy;
mod request;
mod response;

pub use request::CallRequest;
pub use response::CallResponse;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use http::StatusCode;
use thiserror::Error;

use crate::channel::{ChannelError, ReadChannel, WriteChannel};
use crate::host::{BufferPool, HostError, HostRequest, HostResponse};
use crate::pipeline::{PipelineContext, ResponseMessage, ResponsePipeline};
use crate::upgrade::{UpgradeDescriptor, UpgradeHandler, UpgradeRequest};

/// Global atomic counter for call IDs.
/// Relaxed ordering is sufficient since we only need uniqueness.
static CALL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an exchange, used for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallId(u64);

impl CallId {
    /// Generate a new unique call ID.
    pub fn new() -> Self {
        Self(CALL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// Errors surfaced by the call adapter.
///
/// Nothing here is retriable within a single exchange; callers propagate
/// and let the host tear the transport down.
#[derive(Debug, Error)]
pub enum CallError {
    /// The host contract failed (stream handover, flush, upgrade
    /// registration).
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// A channel operation failed during the close sequence.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The response machinery rejected or failed to serialize the message.
    #[error("response pipeline failed: {0}")]
    Pipeline(String),
}

/// One in-flight HTTP exchange, bridged from the host container into the
/// pipeline's call model.
///
/// Shared as `Arc<ApplicationCall>` between the pipeline task and the
/// host's upgrade callback; all state transitions are synchronized
/// internally. See the module docs for the lifecycle.
pub struct ApplicationCall {
    id: CallId,
    host_request: Arc<dyn HostRequest>,
    host_response: Arc<dyn HostResponse>,
    request: CallRequest,
    response: CallResponse,
    respond_pipeline: Arc<dyn ResponsePipeline>,
    buffer_pool: Arc<dyn BufferPool>,
    /// Monotonic false→true; the CAS on it is the completion gate.
    completed: AtomicBool,
    /// Set once the upgrade handshake has been sent. Informational.
    upgraded: AtomicBool,
}

impl ApplicationCall {
    /// Bridge a host exchange into a new application call.
    pub fn new(
        host_request: Arc<dyn HostRequest>,
        host_response: Arc<dyn HostResponse>,
        respond_pipeline: Arc<dyn ResponsePipeline>,
        buffer_pool: Arc<dyn BufferPool>,
    ) -> Arc<Self> {
        let id = CallId::new();
        tracing::trace!(call_id = %id, "exchange opened");
        Arc::new(Self {
            id,
            request: CallRequest::new(Arc::clone(&host_request)),
            response: CallResponse::new(Arc::clone(&host_response)),
            host_request,
            host_response,
            respond_pipeline,
            buffer_pool,
            completed: AtomicBool::new(false),
            upgraded: AtomicBool::new(false),
        })
    }

    /// This exchange's correlation ID.
    pub fn id(&self) -> CallId {
        self.id
    }

    /// Inbound half of the exchange.
    pub fn request(&self) -> &CallRequest {
        &self.request
    }

    /// Outbound half of the exchange.
    pub fn response(&self) -> &CallResponse {
        &self.response
    }

    /// Allocator handle for pipeline stages that need scratch buffers.
    pub fn buffer_pool(&self) -> &Arc<dyn BufferPool> {
        &self.buffer_pool
    }

    /// Whether teardown has run.
    pub fn completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Whether the upgrade handshake has been sent.
    pub fn upgraded(&self) -> bool {
        self.upgraded.load(Ordering::Acquire)
    }

    /// Current inbound channel: the post-upgrade override if installed,
    /// otherwise the default over the host's native input stream.
    pub fn request_channel(&self) -> Result<Arc<ReadChannel>, CallError> {
        self.request.channel().map_err(Into::into)
    }

    /// Current outbound channel: the post-upgrade override if installed,
    /// otherwise the lazily realized default over the host output stream.
    /// First access realizes the default; every later caller observes the
    /// same instance.
    pub fn response_channel(&self) -> Result<Arc<WriteChannel>, CallError> {
        self.response.channel().map_err(Into::into)
    }

    /// Send the final response message and finish the exchange.
    ///
    /// Serialization is delegated to the response machinery; afterwards the
    /// request side is closed and the response channel is closed; if
    /// no channel was ever realized, the host's buffered output is flushed
    /// directly. Intended to be called once per exchange on the normal
    /// completion path.
    pub async fn respond(&self, message: ResponseMessage) -> Result<(), CallError> {
        self.respond_pipeline.execute(self, message).await?;

        self.request.close();
        if let Some(channel) = self.response.realized_default() {
            channel.close().await?;
        } else {
            self.host_response.flush_buffer()?;
        }
        tracing::debug!(call_id = %self.id, "response sent");

        self.ensure_completed().await
    }

    /// Drive the protocol-upgrade handshake.
    ///
    /// Writes the switching-protocols response (status override or 101,
    /// then every descriptor header), flushes, registers the upgrade
    /// handler with the host, flushes again so the buffer is fully drained
    /// before the transport handoff, and finishes the exchange. The host
    /// invokes the handler with the duplex streams later, on its own task.
    ///
    /// A failed registration is fatal for the exchange: the handshake
    /// bytes are already on the wire and no partial state is repaired.
    pub async fn handle_upgrade(
        self: Arc<Self>,
        descriptor: UpgradeDescriptor,
        context: PipelineContext,
    ) -> Result<(), CallError> {
        let status = descriptor.status.unwrap_or(StatusCode::SWITCHING_PROTOCOLS);
        self.host_response.set_status(status);
        for (name, value) in &descriptor.headers {
            self.host_response.add_header(name, value);
        }
        self.host_response.flush_buffer()?;

        let handler = UpgradeHandler::new(UpgradeRequest {
            response: Arc::clone(&self.host_response),
            call: Arc::clone(&self),
            descriptor,
            context,
        });
        self.host_request.upgrade(handler)?;

        self.upgraded.store(true, Ordering::Release);
        // The host requires the buffer fully drained before the
        // transport-level handoff begins.
        self.host_response.flush_buffer()?;
        tracing::debug!(call_id = %self.id, status = %status, "upgrade handshake sent");

        self.ensure_completed().await
    }

    /// Idempotent finalizer.
    ///
    /// Only the caller that wins the false→true transition runs teardown:
    /// close the request, close the realized default response channel, and
    /// fire the host completion signal. The signal fires even if a close
    /// fails; the close error is re-raised only afterwards, so the host is
    /// never left waiting on a stuck exchange. Every other caller is a
    /// no-op.
    pub async fn ensure_completed(&self) -> Result<(), CallError> {
        if self
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        // Best-effort cleanup; a failure here must not withhold the signal.
        let cleanup = self.close_streams().await;
        self.host_request.complete();
        tracing::trace!(call_id = %self.id, "exchange completed");
        cleanup
    }

    async fn close_streams(&self) -> Result<(), CallError> {
        self.request.close();
        if let Some(channel) = self.response.realized_default() {
            channel.close().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ApplicationCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationCall")
            .field("id", &self.id)
            .field("completed", &self.completed())
            .field("upgraded", &self.upgraded())
            .finish_non_exhaustive()
    }
}
