//! Pipeline-facing collaborator contracts.
//!
//! The bridge does not execute pipeline stages or serialize messages; it
//! delegates both to these interfaces and only manages the exchange's
//! lifecycle around them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;

use crate::call::{ApplicationCall, CallError};

/// Opaque continuation handle for the pipeline stage that owns the
/// exchange.
///
/// The bridge never invokes it; it is saved at handshake time and handed
/// back, untouched, to the upgraded-protocol body.
#[derive(Clone)]
pub struct PipelineContext {
    inner: Arc<dyn Any + Send + Sync>,
}

impl PipelineContext {
    /// Wrap a pipeline-defined stage value.
    pub fn new<T: Any + Send + Sync>(stage: T) -> Self {
        Self {
            inner: Arc::new(stage),
        }
    }

    /// Recover the stage value, if it is of type `T`.
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext").finish_non_exhaustive()
    }
}

/// Message handed to [`ApplicationCall::respond`].
///
/// The bridge treats the payload as opaque cargo for the response
/// machinery; content negotiation happened upstream.
#[derive(Debug, Clone)]
pub struct ResponseMessage {
    /// Status the response machinery should emit.
    pub status: StatusCode,
    /// Serialized body bytes.
    pub body: Bytes,
}

impl ResponseMessage {
    /// Build a message from a status and anything convertible to bytes.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// The pipeline's message-serialization machinery.
///
/// [`ApplicationCall::respond`] delegates here before running the close
/// sequence; implementations typically negotiate headers on the host
/// response and write the body through the call's current response
/// channel.
#[async_trait]
pub trait ResponsePipeline: Send + Sync {
    /// Serialize and emit `message` for `call`.
    async fn execute(&self, call: &ApplicationCall, message: ResponseMessage)
        -> Result<(), CallError>;
}
