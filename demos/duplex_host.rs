//! Minimal host container over an in-memory duplex transport.
//!
//! Shows both lifecycles end to end: a normal respond/complete exchange,
//! and a protocol upgrade where the "host" hands the duplex streams to the
//! registered handler on its own task and the upgraded body runs an echo
//! protocol against the peer.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::BytesMut;
use http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use exchange_bridge::channel::{NativeReadStream, NativeWriteStream};
use exchange_bridge::{
    ApplicationCall, BufferPool, CallError, DuplexStreams, HostError, HostRequest, HostResponse,
    PipelineContext, ResponseMessage, ResponsePipeline, UpgradeDescriptor, UpgradeHandler,
};

/// Request side of the demo host: one input stream, a completion counter,
/// and an upgrade hook that performs the transport handoff on a spawned
/// task, the way a real container would.
struct DemoHostRequest {
    input: Mutex<Option<NativeReadStream>>,
    completions: AtomicU32,
    /// Streams handed to the upgrade handler once it registers.
    handoff: Mutex<Option<DuplexStreams>>,
}

impl DemoHostRequest {
    fn new(input: DuplexStream, handoff: Option<DuplexStreams>) -> Self {
        Self {
            input: Mutex::new(Some(Box::new(input))),
            completions: AtomicU32::new(0),
            handoff: Mutex::new(handoff),
        }
    }
}

impl HostRequest for DemoHostRequest {
    fn take_input_stream(&self) -> Result<NativeReadStream, HostError> {
        self.input
            .lock()
            .unwrap()
            .take()
            .ok_or(HostError::StreamTaken)
    }

    fn complete(&self) {
        let n = self.completions.fetch_add(1, Ordering::SeqCst) + 1;
        println!("[host] completion signal received (total: {n})");
    }

    fn upgrade(&self, handler: UpgradeHandler) -> Result<(), HostError> {
        let streams = self
            .handoff
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| HostError::Upgrade("no transport available for handoff".into()))?;
        // The transport-level handshake finishes later, on the host's task.
        tokio::spawn(async move {
            handler.init(streams).await;
        });
        Ok(())
    }
}

/// Response side of the demo host: status/header log plus the output
/// stream the default response channel wraps.
struct DemoHostResponse {
    output: Mutex<Option<NativeWriteStream>>,
}

impl DemoHostResponse {
    fn new(output: DuplexStream) -> Self {
        Self {
            output: Mutex::new(Some(Box::new(output))),
        }
    }
}

impl HostResponse for DemoHostResponse {
    fn set_status(&self, status: StatusCode) {
        println!("[host] response status set to {status}");
    }

    fn add_header(&self, name: &http::HeaderName, value: &http::HeaderValue) {
        println!("[host] header {}: {}", name, value.to_str().unwrap_or("?"));
    }

    fn take_output_stream(&self) -> Result<NativeWriteStream, HostError> {
        self.output
            .lock()
            .unwrap()
            .take()
            .ok_or(HostError::StreamTaken)
    }

    fn flush_buffer(&self) -> Result<(), HostError> {
        println!("[host] response buffer flushed");
        Ok(())
    }
}

struct FreshPool;

impl BufferPool for FreshPool {
    fn acquire(&self, capacity: usize) -> BytesMut {
        BytesMut::with_capacity(capacity)
    }

    fn release(&self, _buffer: BytesMut) {}
}

/// Response machinery: writes the message body through the call's current
/// response channel.
struct BodyWriter;

#[async_trait]
impl ResponsePipeline for BodyWriter {
    async fn execute(
        &self,
        call: &ApplicationCall,
        message: ResponseMessage,
    ) -> Result<(), CallError> {
        call.response_channel()?.write(&message.body).await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    // --- Exchange 1: plain request/response ---------------------------------
    let (_client_tx, request_stream) = tokio::io::duplex(1024);
    let (response_stream, mut client_rx) = tokio::io::duplex(1024);

    let call = ApplicationCall::new(
        Arc::new(DemoHostRequest::new(request_stream, None)),
        Arc::new(DemoHostResponse::new(response_stream)),
        Arc::new(BodyWriter),
        Arc::new(FreshPool),
    );

    call.respond(ResponseMessage::new(StatusCode::OK, "hello from the pipeline"))
        .await?;

    let mut body = Vec::new();
    client_rx.read_to_end(&mut body).await?;
    println!("[client] got body: {:?}", String::from_utf8_lossy(&body));

    // --- Exchange 2: protocol upgrade to a raw echo protocol ---------------
    let (_client_tx, request_stream) = tokio::io::duplex(1024);
    let (response_stream, _client_rx) = tokio::io::duplex(1024);
    let (mut peer_in, upgraded_in) = tokio::io::duplex(1024);
    let (upgraded_out, mut peer_out) = tokio::io::duplex(1024);

    let handoff = DuplexStreams {
        input: Box::new(upgraded_in),
        output: Box::new(upgraded_out),
    };

    let call = ApplicationCall::new(
        Arc::new(DemoHostRequest::new(request_stream, Some(handoff))),
        Arc::new(DemoHostResponse::new(response_stream)),
        Arc::new(BodyWriter),
        Arc::new(FreshPool),
    );

    let descriptor = UpgradeDescriptor {
        status: None,
        headers: vec![(
            http::HeaderName::from_static("upgrade"),
            http::HeaderValue::from_static("echo/1"),
        )],
        upgrade: Box::new(|_call, _context, input, output| {
            Box::pin(async move {
                // Echo frames until the peer hangs up.
                let mut buf = [0u8; 256];
                loop {
                    match input.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if output.write(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                let _ = output.close().await;
            })
        }),
    };

    call.handle_upgrade(descriptor, PipelineContext::new("demo-stage"))
        .await?;

    // Speak the upgraded protocol from the client side.
    peer_in.write_all(b"ping over the upgraded stream").await?;
    drop(peer_in);

    let mut echoed = Vec::new();
    peer_out.read_to_end(&mut echoed).await?;
    println!("[client] echoed: {:?}", String::from_utf8_lossy(&echoed));

    Ok(())
}
