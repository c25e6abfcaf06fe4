//! Writable channel over a native output stream.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{ChannelError, NativeWriteStream};

/// Writable byte-stream capability wrapped around one native output stream.
///
/// Shared across tasks via `Arc`; writes are serialized on the stream mutex.
pub struct WriteChannel {
    /// The wrapped native stream.
    stream: Mutex<NativeWriteStream>,
    /// Set once by the first `close`; later writes fail with `Closed`.
    closed: AtomicBool,
}

impl WriteChannel {
    /// Wrap a native output stream.
    pub fn new(stream: NativeWriteStream) -> Self {
        Self {
            stream: Mutex::new(stream),
            closed: AtomicBool::new(false),
        }
    }

    /// Write the whole buffer to the native stream.
    pub async fn write(&self, buf: &[u8]) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }
        let mut stream = self.stream.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }
        stream.write_all(buf).await?;
        Ok(())
    }

    /// Flush buffered bytes through to the native stream.
    pub async fn flush(&self) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed);
        }
        let mut stream = self.stream.lock().await;
        stream.flush().await?;
        Ok(())
    }

    /// Flush and shut down the native stream. Idempotent: only the first
    /// call touches the stream, later calls return `Ok` without effect.
    pub async fn close(&self) -> Result<(), ChannelError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut stream = self.stream.lock().await;
        stream.shutdown().await?;
        Ok(())
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for WriteChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteChannel")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn writes_reach_the_peer() {
        let (tx, mut rx) = tokio::io::duplex(64);
        let channel = WriteChannel::new(Box::new(tx));

        channel.write(b"payload").await.unwrap();
        channel.close().await.unwrap();

        let mut out = Vec::new();
        rx.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"payload");
    }

    #[tokio::test]
    async fn close_is_idempotent_and_gates_writes() {
        let (tx, _rx) = tokio::io::duplex(64);
        let channel = WriteChannel::new(Box::new(tx));

        channel.close().await.unwrap();
        channel.close().await.unwrap();

        assert!(matches!(
            channel.write(b"late").await,
            Err(ChannelError::Closed)
        ));
    }
}
