//! Protocol-upgrade handshake bridging.
//!
//! # Responsibilities
//! - Describe what the pipeline asks for when switching protocols
//! - Carry the handoff state (call, descriptor, continuation) to the
//!   host's asynchronous callback
//! - Install the duplex streams as channel overrides and start the
//!   upgraded-protocol body
//!
//! # Design Decisions
//! - Two-phase handshake: registration hands the host a self-contained
//!   message (the handler), not a live object graph to mutate; the host
//!   resolves it with the streams on an arbitrary task
//! - Lifecycle per call:
//!   Normal → respond → Completed
//!   Normal → handshake sent → init → upgraded body → Completed
//!   Completed is terminal; re-entry is a no-op

use std::sync::Arc;

use futures_util::future::BoxFuture;
use http::{HeaderName, HeaderValue, StatusCode};

use crate::call::ApplicationCall;
use crate::channel::{NativeReadStream, NativeWriteStream, ReadChannel, WriteChannel};
use crate::host::HostResponse;
use crate::pipeline::PipelineContext;

/// Body run once the transport handoff completes: receives the call, the
/// pipeline continuation saved at handshake time, and the two upgraded
/// channels.
pub type UpgradeBody = Box<
    dyn FnOnce(
            Arc<ApplicationCall>,
            PipelineContext,
            Arc<ReadChannel>,
            Arc<WriteChannel>,
        ) -> BoxFuture<'static, ()>
        + Send,
>;

/// What the pipeline asks for when switching protocols mid-exchange.
pub struct UpgradeDescriptor {
    /// Status for the handshake response; `None` means 101 Switching
    /// Protocols.
    pub status: Option<StatusCode>,
    /// Headers flattened onto the handshake response, in order.
    pub headers: Vec<(HeaderName, HeaderValue)>,
    /// The upgraded-protocol body.
    pub upgrade: UpgradeBody,
}

impl UpgradeDescriptor {
    /// Descriptor with default status and no extra headers.
    pub fn new(upgrade: UpgradeBody) -> Self {
        Self {
            status: None,
            headers: Vec::new(),
            upgrade,
        }
    }
}

impl std::fmt::Debug for UpgradeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeDescriptor")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Everything the host callback needs to finish the handoff outside the
/// original call stack.
pub struct UpgradeRequest {
    /// Host response handle the handshake was written to.
    pub response: Arc<dyn HostResponse>,
    /// The owning exchange.
    pub call: Arc<ApplicationCall>,
    /// What the pipeline asked for.
    pub descriptor: UpgradeDescriptor,
    /// Continuation of the pipeline stage that initiated the upgrade.
    pub context: PipelineContext,
}

/// Raw duplex streams the host hands over after the transport-level
/// handshake finishes.
pub struct DuplexStreams {
    /// Inbound bytes from the peer.
    pub input: NativeReadStream,
    /// Outbound bytes to the peer.
    pub output: NativeWriteStream,
}

impl std::fmt::Debug for DuplexStreams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexStreams").finish_non_exhaustive()
    }
}

/// Host callback registered during the handshake.
///
/// Phase one hands this to the host via [`crate::host::HostRequest::upgrade`];
/// phase two is the host calling [`UpgradeHandler::init`] with the duplex
/// streams once the transport handoff is done, on whatever task it likes.
pub struct UpgradeHandler {
    request: UpgradeRequest,
}

impl UpgradeHandler {
    pub(crate) fn new(request: UpgradeRequest) -> Self {
        Self { request }
    }

    /// Resolve the handshake: wrap the raw streams, install them as the
    /// call's channel overrides, and run the upgraded-protocol body to
    /// completion with the call, the saved continuation, and the two new
    /// channels.
    pub async fn init(self, streams: DuplexStreams) {
        let UpgradeRequest {
            call,
            descriptor,
            context,
            ..
        } = self.request;

        let input = Arc::new(ReadChannel::new(streams.input));
        let output = Arc::new(WriteChannel::new(streams.output));

        call.request().install_override(Arc::clone(&input));
        call.response().install_override(Arc::clone(&output));
        tracing::debug!(call_id = %call.id(), "duplex streams installed, starting upgraded protocol");

        (descriptor.upgrade)(Arc::clone(&call), context, input, output).await;
        tracing::trace!(call_id = %call.id(), "upgraded protocol body returned");
    }

    /// Teardown hook for hosts that abandon the handoff before `init`.
    /// Completion is already handled by the call's finalizer, so there is
    /// nothing to do here.
    pub fn destroy(self) {}
}

impl std::fmt::Debug for UpgradeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeHandler")
            .field("call_id", &self.request.call.id())
            .finish_non_exhaustive()
    }
}
