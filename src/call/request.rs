//! Request-side capability object of an exchange.

use std::sync::{Arc, OnceLock};

use crate::channel::ReadChannel;
use crate::host::{HostError, HostRequest};

use super::lazy::LazyCell;

/// Inbound half of the exchange, shared with the pipeline.
///
/// The channel the pipeline reads from is the post-upgrade override once
/// one is installed, otherwise a default wrapped lazily around the host's
/// native input stream.
pub struct CallRequest {
    host: Arc<dyn HostRequest>,
    /// Installed exactly once by the upgrade handler, never cleared.
    override_channel: OnceLock<Arc<ReadChannel>>,
    default_channel: LazyCell<ReadChannel>,
}

impl CallRequest {
    pub(crate) fn new(host: Arc<dyn HostRequest>) -> Self {
        Self {
            host,
            override_channel: OnceLock::new(),
            default_channel: LazyCell::new(),
        }
    }

    /// Current inbound channel for body bytes.
    pub fn channel(&self) -> Result<Arc<ReadChannel>, HostError> {
        if let Some(channel) = self.override_channel.get() {
            return Ok(Arc::clone(channel));
        }
        self.default_channel.get_or_try_init(|| {
            let stream = self.host.take_input_stream()?;
            Ok(Arc::new(ReadChannel::new(stream)))
        })
    }

    /// Whether the upgrade handler has installed a replacement channel.
    pub fn override_installed(&self) -> bool {
        self.override_channel.get().is_some()
    }

    /// Close the inbound side. Idempotent. Only the realized default is
    /// touched; an override channel belongs to the upgraded-protocol body.
    pub fn close(&self) {
        if let Some(channel) = self.default_channel.get() {
            channel.close();
        }
    }

    pub(crate) fn install_override(&self, channel: Arc<ReadChannel>) {
        if self.override_channel.set(channel).is_err() {
            tracing::warn!("request channel override installed twice; keeping the first");
        }
    }
}

impl std::fmt::Debug for CallRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallRequest")
            .field("override_installed", &self.override_installed())
            .finish()
    }
}
