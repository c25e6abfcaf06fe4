//! Readable channel over a native input stream.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;

use super::{ChannelError, NativeReadStream};

/// Readable byte-stream capability wrapped around one native input stream.
///
/// Shared across tasks via `Arc`; reads are serialized on the stream mutex.
pub struct ReadChannel {
    /// The wrapped native stream.
    stream: Mutex<NativeReadStream>,
    /// Set once by `close`; later reads fail with `ChannelError::Closed`.
    closed: AtomicBool,
}

impl ReadChannel {
    /// Wrap a native input stream.
    pub fn new(stream: NativeReadStream) -> Self {
        Self {
            stream: Mutex::new(stream),
            closed: AtomicBool::new(false),
        }
    }

    /// Read up to `buf.len()` bytes. Returns 0 at end of stream.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }
        let mut stream = self.stream.lock().await;
        // Re-check under the lock: close() may have won the race.
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }
        Ok(stream.read(buf).await?)
    }

    /// Mark the channel closed. Idempotent; the native stream is released
    /// when the channel is dropped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ReadChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadChannel")
            .field("closed", &self.is_closed())
            .finish()
    }
}
