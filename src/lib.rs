//! Host Exchange Bridge
//!
//! Adapts a single in-flight HTTP exchange owned by a host container into
//! the request/response/channel model of an application pipeline, and
//! manages the exchange's lifecycle through to completion, including the
//! mid-flight transition into a raw bidirectional byte stream after a
//! protocol upgrade.
//!
//! # Architecture Overview
//!
//! ```text
//!   host container                         application pipeline
//!  ┌──────────────┐   HostRequest /       ┌──────────────────────┐
//!  │ native       │   HostResponse        │ respond(message)     │
//!  │ streams,     │◀─────────────────────▶│ handle_upgrade(desc) │
//!  │ async ctx,   │      call (src/call)  │ response_channel()   │
//!  │ upgrade hook │                       └──────────────────────┘
//!  └──────┬───────┘
//!         │ transport handoff (later, arbitrary task)
//!         ▼
//!  UpgradeHandler::init(duplex streams)
//!         │ installs channel overrides (src/channel)
//!         ▼
//!  upgraded-protocol body runs against the new channels
//!         ▼
//!  ensure_completed() → host completion signal (exactly once)
//! ```
//!
//! Header parsing, content negotiation, buffer pooling, and pipeline
//! execution are external collaborators reached through the traits in
//! [`host`] and [`pipeline`].

pub mod call;
pub mod channel;
pub mod host;
pub mod pipeline;
pub mod upgrade;

pub use call::{ApplicationCall, CallError, CallId, CallRequest, CallResponse};
pub use channel::{ChannelError, ReadChannel, WriteChannel};
pub use host::{BufferPool, HostError, HostRequest, HostResponse};
pub use pipeline::{PipelineContext, ResponseMessage, ResponsePipeline};
pub use upgrade::{DuplexStreams, UpgradeDescriptor, UpgradeHandler, UpgradeRequest};
