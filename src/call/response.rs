//! Response-side capability object of an exchange.

use std::sync::{Arc, OnceLock};

use crate::channel::WriteChannel;
use crate::host::{HostError, HostResponse};

use super::lazy::LazyCell;

/// Outbound half of the exchange, shared with the pipeline.
///
/// The default channel wraps the host's native output stream and is
/// realized at most once for the lifetime of the call, even under
/// concurrent first access. A post-upgrade override supersedes it
/// permanently.
pub struct CallResponse {
    host: Arc<dyn HostResponse>,
    /// Installed exactly once by the upgrade handler, never cleared.
    override_channel: OnceLock<Arc<WriteChannel>>,
    default_channel: LazyCell<WriteChannel>,
}

impl CallResponse {
    pub(crate) fn new(host: Arc<dyn HostResponse>) -> Self {
        Self {
            host,
            override_channel: OnceLock::new(),
            default_channel: LazyCell::new(),
        }
    }

    /// Current outbound channel for body bytes.
    pub fn channel(&self) -> Result<Arc<WriteChannel>, HostError> {
        if let Some(channel) = self.override_channel.get() {
            return Ok(Arc::clone(channel));
        }
        self.default_channel.get_or_try_init(|| {
            let stream = self.host.take_output_stream()?;
            Ok(Arc::new(WriteChannel::new(stream)))
        })
    }

    /// The default channel, if it was ever realized. Never constructs;
    /// the close sequence uses this to decide between closing the channel
    /// and flushing the host buffer directly.
    pub fn realized_default(&self) -> Option<Arc<WriteChannel>> {
        self.default_channel.get().cloned()
    }

    /// Whether the upgrade handler has installed a replacement channel.
    pub fn override_installed(&self) -> bool {
        self.override_channel.get().is_some()
    }

    pub(crate) fn install_override(&self, channel: Arc<WriteChannel>) {
        if self.override_channel.set(channel).is_err() {
            tracing::warn!("response channel override installed twice; keeping the first");
        }
    }
}

impl std::fmt::Debug for CallResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallResponse")
            .field("override_installed", &self.override_installed())
            .field("default_realized", &self.default_channel.get().is_some())
            .finish()
    }
}
