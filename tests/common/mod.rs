//! Shared mock host and pipeline collaborators for integration tests.

// Each integration test binary compiles this module separately and uses a
// different subset of it.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::BytesMut;
use http::StatusCode;
use tokio::io::DuplexStream;

use exchange_bridge::channel::{NativeReadStream, NativeWriteStream};
use exchange_bridge::{
    ApplicationCall, BufferPool, CallError, HostError, HostRequest, HostResponse,
    ResponseMessage, ResponsePipeline, UpgradeHandler,
};

/// Mock of the host's request side: a duplex input stream, a completion
/// counter, and a slot holding the registered upgrade handler so tests can
/// drive phase two themselves.
pub struct MockHostRequest {
    input: Mutex<Option<NativeReadStream>>,
    pub completions: AtomicU32,
    pub registered: Mutex<Option<UpgradeHandler>>,
    fail_upgrade: bool,
}

impl MockHostRequest {
    pub fn new(input: DuplexStream) -> Self {
        Self {
            input: Mutex::new(Some(Box::new(input))),
            completions: AtomicU32::new(0),
            registered: Mutex::new(None),
            fail_upgrade: false,
        }
    }

    /// A host that refuses upgrade registration.
    pub fn refusing_upgrade(input: DuplexStream) -> Self {
        Self {
            fail_upgrade: true,
            ..Self::new(input)
        }
    }

    pub fn completion_count(&self) -> u32 {
        self.completions.load(Ordering::SeqCst)
    }

    /// Take the handler registered by the handshake, if any.
    pub fn take_handler(&self) -> Option<UpgradeHandler> {
        self.registered.lock().unwrap().take()
    }
}

impl HostRequest for MockHostRequest {
    fn take_input_stream(&self) -> Result<NativeReadStream, HostError> {
        self.input
            .lock()
            .unwrap()
            .take()
            .ok_or(HostError::StreamTaken)
    }

    fn complete(&self) {
        self.completions.fetch_add(1, Ordering::SeqCst);
    }

    fn upgrade(&self, handler: UpgradeHandler) -> Result<(), HostError> {
        if self.fail_upgrade {
            return Err(HostError::Upgrade("container refused handoff".into()));
        }
        *self.registered.lock().unwrap() = Some(handler);
        Ok(())
    }
}

/// Mock of the host's response side, recording status, headers, and flush
/// count.
pub struct MockHostResponse {
    output: Mutex<Option<NativeWriteStream>>,
    pub status: Mutex<Option<StatusCode>>,
    pub headers: Mutex<Vec<(String, String)>>,
    pub flushes: AtomicU32,
}

impl MockHostResponse {
    pub fn new(output: DuplexStream) -> Self {
        Self::from_stream(Box::new(output))
    }

    /// Build over an arbitrary native stream, e.g. one rigged to fail.
    pub fn from_stream(output: NativeWriteStream) -> Self {
        Self {
            output: Mutex::new(Some(output)),
            status: Mutex::new(None),
            headers: Mutex::new(Vec::new()),
            flushes: AtomicU32::new(0),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        *self.status.lock().unwrap()
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        self.headers.lock().unwrap().clone()
    }

    pub fn flush_count(&self) -> u32 {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl HostResponse for MockHostResponse {
    fn set_status(&self, status: StatusCode) {
        *self.status.lock().unwrap() = Some(status);
    }

    fn add_header(&self, name: &http::HeaderName, value: &http::HeaderValue) {
        self.headers.lock().unwrap().push((
            name.as_str().to_string(),
            value.to_str().unwrap_or_default().to_string(),
        ));
    }

    fn take_output_stream(&self) -> Result<NativeWriteStream, HostError> {
        self.output
            .lock()
            .unwrap()
            .take()
            .ok_or(HostError::StreamTaken)
    }

    fn flush_buffer(&self) -> Result<(), HostError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Output stream that accepts writes but fails at shutdown, for exercising
/// cleanup-failure paths.
pub struct ShutdownFailStream;

impl tokio::io::AsyncWrite for ShutdownFailStream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        std::task::Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "transport gone",
        )))
    }
}

/// Pool that allocates fresh buffers; pooling policy is out of scope here.
pub struct NoopPool;

impl BufferPool for NoopPool {
    fn acquire(&self, capacity: usize) -> BytesMut {
        BytesMut::with_capacity(capacity)
    }

    fn release(&self, _buffer: BytesMut) {}
}

/// Response machinery that only records invocations; it never touches the
/// response channel, so the default is never realized through it.
#[derive(Default)]
pub struct RecordingPipeline {
    pub executed: AtomicU32,
}

#[async_trait]
impl ResponsePipeline for RecordingPipeline {
    async fn execute(
        &self,
        _call: &ApplicationCall,
        _message: ResponseMessage,
    ) -> Result<(), CallError> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Response machinery that writes the message body through the call's
/// current response channel, realizing the default on first use.
pub struct WritingPipeline;

#[async_trait]
impl ResponsePipeline for WritingPipeline {
    async fn execute(
        &self,
        call: &ApplicationCall,
        message: ResponseMessage,
    ) -> Result<(), CallError> {
        let channel = call.response_channel()?;
        channel.write(&message.body).await?;
        Ok(())
    }
}

/// A full mock exchange: the call plus the host doubles and the peer ends
/// of both native streams.
pub struct MockExchange {
    pub call: Arc<ApplicationCall>,
    pub host_request: Arc<MockHostRequest>,
    pub host_response: Arc<MockHostResponse>,
    /// Peer end feeding the request input stream.
    pub request_peer: DuplexStream,
    /// Peer end observing bytes written to the response output stream.
    pub response_peer: DuplexStream,
}

/// Build an exchange wired to the given response machinery.
pub fn mock_exchange(pipeline: Arc<dyn ResponsePipeline>) -> MockExchange {
    let (request_peer, request_stream) = tokio::io::duplex(1024);
    let (response_stream, response_peer) = tokio::io::duplex(1024);

    let host_request = Arc::new(MockHostRequest::new(request_stream));
    let host_response = Arc::new(MockHostResponse::new(response_stream));

    let call = ApplicationCall::new(
        host_request.clone(),
        host_response.clone(),
        pipeline,
        Arc::new(NoopPool),
    );

    MockExchange {
        call,
        host_request,
        host_response,
        request_peer,
        response_peer,
    }
}
