//! The client side: one connection, many concurrent calls.
//!
//! Each call gets a `seq` from the [CallRegistry](registry::CallRegistry) and is written out
//! under the send lock. A single receive task per client reads responses, matches them to their
//! call by `seq`, decodes the reply into the type the caller asked for, and completes the call
//! through its done channel.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use lark_rpc::client::dial_default;
//!
//! #[derive(serde::Serialize)]
//! struct Args {
//!     num1: i64,
//!     num2: i64,
//! }
//!
//! let client = dial_default("127.0.0.1:8080").await?;
//! let sum: i64 = client.call("Foo.Sum", &Args { num1: 3, num2: 4 }).await?;
//! assert_eq!(sum, 7);
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

mod registry;
use registry::{CallRegistry, PendingCall};

use lark_rpc_core::{
    AnyCodec, ClientConfig, Codec, CodecError, StreamLimits,
    error::{ConfigError, ConnectError, FrameError, RpcError},
    frame::{FrameReader, FrameWriter},
    proto::{HandshakeOption, Header},
    stream::{CodecReader, CodecWriter},
};
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, ops::Deref, sync::Arc};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex as AsyncMutex, mpsc, mpsc::error::TrySendError, watch};

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One invocation, handed back on its done channel once it completed.
#[derive(Debug)]
pub struct Call<A, R> {
    /// Zero when the call was rejected before registration.
    pub seq: u64,
    pub service_method: String,
    pub args: A,
    /// Set on success.
    pub reply: Option<R>,
    pub error: Option<RpcError>,
}

impl<A, R> Call<A, R> {
    pub fn result(self) -> Result<R, RpcError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.reply.ok_or_else(|| RpcError::Decode("missing reply".to_string()))
    }
}

/// The done channel of one [Client::go] call.
pub struct CallHandle<A, R> {
    rx: mpsc::Receiver<Call<A, R>>,
}

impl<A, R> CallHandle<A, R> {
    /// Wait for the call to complete.
    ///
    /// None only if the client was torn down without running its shutdown, e.g. the runtime
    /// it was spawned on was dropped.
    #[inline]
    pub async fn done(mut self) -> Option<Call<A, R>> {
        self.rx.recv().await
    }

    #[inline]
    pub fn into_receiver(self) -> mpsc::Receiver<Call<A, R>> {
        self.rx
    }
}

struct PendingEntry<A, R> {
    call: Call<A, R>,
    done: mpsc::Sender<Call<A, R>>,
}

impl<A, R> PendingEntry<A, R> {
    fn finish(self) {
        let seq = self.call.seq;
        match self.done.try_send(self.call) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("rpc client: discarding call {} reply due to insufficient done capacity", seq)
            }
            Err(TrySendError::Closed(_)) => debug!("rpc client: receiver of call {} is gone", seq),
        }
    }
}

impl<A, R> PendingCall for PendingEntry<A, R>
where
    A: Send + 'static,
    R: DeserializeOwned + Send + 'static,
{
    #[inline]
    fn set_seq(&mut self, seq: u64) {
        self.call.seq = seq;
    }

    #[inline]
    fn service_method(&self) -> &str {
        &self.call.service_method
    }

    fn complete(mut self: Box<Self>, codec: &AnyCodec, body: &[u8]) {
        match codec.decode::<R>(body) {
            Ok(reply) => self.call.reply = Some(reply),
            Err(e) => self.call.error = Some(RpcError::Decode(e.to_string())),
        }
        self.finish();
    }

    fn fail(mut self: Box<Self>, err: RpcError) {
        self.call.error = Some(err);
        self.finish();
    }
}

/// What the send lock protects.
struct SendState {
    writer: CodecWriter<BoxWriter>,
    /// reused by every request
    header: Header,
}

struct ClientInner {
    option: HandshakeOption,
    codec: AnyCodec,
    sending: AsyncMutex<SendState>,
    registry: Mutex<CallRegistry>,
    /// flips to true once, on close or when the last handle is dropped
    closed: watch::Sender<bool>,
}

/// What the user-facing clones share. The receive task holds [ClientInner] directly, so
/// dropping the last handle is what ends the connection.
struct ClientHandle(Arc<ClientInner>);

impl Deref for ClientHandle {
    type Target = ClientInner;

    #[inline]
    fn deref(&self) -> &ClientInner {
        &self.0
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        let first = self.0.registry.lock().set_closing();
        if first {
            debug!("rpc client: dropped without close, shutting down");
            self.0.closed.send_replace(true);
        }
    }
}

/// A connection to one server. Clones share the connection.
///
/// Dropping the last clone closes the connection like [Client::close].
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientHandle>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "client(codec={})", self.inner.option.codec_type)
    }
}

#[inline]
fn resolve_codec(option: &HandshakeOption) -> Result<AnyCodec, ConfigError> {
    AnyCodec::from_type(&option.codec_type).ok_or_else(|| {
        let err = ConfigError::UnsupportedCodec(option.codec_type.clone());
        warn!("rpc client: codec error: {}", err);
        err
    })
}

impl Client {
    /// Start a client over an established stream.
    ///
    /// Sends `option` as the handshake, then spawns the receive task, so this must run inside
    /// a tokio runtime. An unknown codec type fails before anything is written.
    pub async fn new<S>(
        stream: S, option: HandshakeOption, config: &ClientConfig,
    ) -> Result<Self, ConnectError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let codec = resolve_codec(&option)?;
        let limits = StreamLimits::from(config);
        let (r, w) = tokio::io::split(stream);
        let mut frames = FrameWriter::new(Box::new(w) as BoxWriter, limits);
        if let Err(e) = frames.write_option(&option).await {
            warn!("rpc client: options error: {}", e);
            return Err(e.into());
        }
        let reader = CodecReader::new(FrameReader::new(Box::new(r) as BoxReader, limits), codec);
        let inner = Arc::new(ClientInner {
            option,
            codec,
            sending: AsyncMutex::new(SendState {
                writer: CodecWriter::new(frames, codec),
                header: Header::default(),
            }),
            registry: Mutex::new(CallRegistry::new()),
            closed: watch::channel(false).0,
        });
        tokio::spawn(inner.clone().receive(reader));
        Ok(Self { inner: Arc::new(ClientHandle(inner)) })
    }

    /// Invoke `service_method` asynchronously, the completed [Call] goes to `done`.
    ///
    /// `done` may be shared by many calls. If it is full when a call completes, that call is
    /// dropped, so give it enough capacity for all calls that may complete before it is drained.
    pub async fn go_with<A, R>(
        &self, service_method: &str, args: A, done: mpsc::Sender<Call<A, R>>,
    ) where
        A: Serialize + Send + 'static,
        R: DeserializeOwned + Send + 'static,
    {
        let body = self.inner.codec.encode(&args);
        let call =
            Call { seq: 0, service_method: service_method.to_string(), args, reply: None, error: None };
        self.inner.send(Box::new(PendingEntry { call, done }), body).await;
    }

    /// Invoke `service_method` asynchronously, returning the handle to wait on.
    pub async fn go<A, R>(&self, service_method: &str, args: A) -> CallHandle<A, R>
    where
        A: Serialize + Send + 'static,
        R: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        self.go_with(service_method, args, tx).await;
        CallHandle { rx }
    }

    /// Invoke `service_method` and wait for its reply.
    pub async fn call<A, R>(&self, service_method: &str, args: &A) -> Result<R, RpcError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned + Send + 'static,
    {
        let body = self.inner.codec.encode(args);
        let (tx, mut rx) = mpsc::channel(1);
        let call: Call<(), R> =
            Call { seq: 0, service_method: service_method.to_string(), args: (), reply: None, error: None };
        self.inner.send(Box::new(PendingEntry { call, done: tx }), body).await;
        match rx.recv().await {
            Some(call) => call.result(),
            None => Err(RpcError::Shutdown),
        }
    }

    /// False once the client is closed or its connection shut down.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.inner.registry.lock().is_available()
    }

    /// Number of calls waiting for a response.
    #[inline]
    pub fn pending_calls(&self) -> usize {
        self.inner.registry.lock().len()
    }

    #[inline]
    pub fn option(&self) -> &HandshakeOption {
        &self.inner.option
    }

    /// Close the connection. Calls still pending complete with [RpcError::Shutdown], including
    /// one whose request is stuck writing to a peer that stopped reading.
    ///
    /// Returns [RpcError::Shutdown] if the client was already closed.
    pub async fn close(&self) -> Result<(), RpcError> {
        let first = self.inner.registry.lock().set_closing();
        if !first {
            return Err(RpcError::Shutdown);
        }
        self.inner.closed.send_replace(true);
        let mut sending = self.inner.sending.lock().await;
        sending.writer.close().await.map_err(|e| RpcError::Connection(e.to_string()))
    }
}

impl ClientInner {
    async fn send(&self, call: Box<dyn PendingCall>, body: Result<Vec<u8>, CodecError>) {
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                call.fail(RpcError::Encode(e.to_string()));
                return;
            }
        };
        let mut sending = self.sending.lock().await;
        let service_method = call.service_method().to_string();
        let registered = self.registry.lock().register(call);
        let seq = match registered {
            Ok(seq) => seq,
            Err(call) => {
                call.fail(RpcError::Shutdown);
                return;
            }
        };
        let SendState { writer, header } = &mut *sending;
        header.service_method = service_method;
        header.seq = seq;
        header.error.clear();
        trace!("rpc client: send {} seq={}", header.service_method, seq);
        let mut closed = self.closed.subscribe();
        let written = tokio::select! {
            r = writer.write_encoded(header, &body) => Some(r),
            _ = closed.wait_for(|closed| *closed) => None,
        };
        let err = match written {
            Some(Ok(())) => return,
            Some(Err(e)) => {
                warn!("rpc client: send {} seq={} error: {}", header.service_method, seq, e);
                RpcError::Connection(e.to_string())
            }
            None => {
                debug!("rpc client: send {} seq={} interrupted by close", header.service_method, seq);
                writer.set_broken();
                RpcError::Shutdown
            }
        };
        // None when the response already arrived and completed the call
        let call = self.registry.lock().remove(seq);
        if let Some(call) = call {
            call.fail(err);
        }
    }

    async fn receive(self: Arc<Self>, mut reader: CodecReader<BoxReader>) {
        let mut closed = self.closed.subscribe();
        let err = loop {
            let header = tokio::select! {
                r = reader.read_header() => match r {
                    Ok(header) => header,
                    Err(e) => break self.read_error(e),
                },
                _ = closed.wait_for(|closed| *closed) => break RpcError::Shutdown,
            };
            let call = self.registry.lock().remove(header.seq);
            let r = match call {
                None => {
                    debug!("rpc client: no pending call for seq={}", header.seq);
                    reader.discard_body().await
                }
                Some(call) if header.is_error() => {
                    let r = reader.discard_body().await;
                    call.fail(RpcError::Server(header.error));
                    r
                }
                Some(call) => match reader.read_body_raw().await {
                    Ok(body) => {
                        call.complete(reader.codec(), &body);
                        Ok(())
                    }
                    Err(e) => {
                        call.fail(RpcError::Connection(e.to_string()));
                        Err(e)
                    }
                },
            };
            if let Err(e) = r {
                break self.read_error(e);
            }
        };
        self.terminate_calls(err).await;
    }

    fn read_error(&self, e: FrameError) -> RpcError {
        if self.registry.lock().is_closing() {
            return RpcError::Shutdown;
        }
        if e.is_eof() {
            debug!("rpc client: connection closed by server");
            RpcError::Connection("connection closed by server".to_string())
        } else {
            warn!("rpc client: read error: {}", e);
            RpcError::Connection(e.to_string())
        }
    }

    /// Fail every pending call with `err` and shut down the write side. No call can register
    /// afterwards.
    async fn terminate_calls(&self, err: RpcError) {
        // send lock first, the same order as send(), so an in-flight send finishes before
        let mut sending = self.sending.lock().await;
        let pending = self.registry.lock().terminate();
        if !pending.is_empty() {
            debug!("rpc client: terminate {} pending calls: {}", pending.len(), err);
        }
        for call in pending {
            call.fail(err.clone());
        }
        if let Err(e) = sending.writer.close().await {
            debug!("rpc client: close connection: {}", e);
        }
    }
}

/// Connect to `addr` (`host:port`, or a unix socket path) and start a client.
pub async fn dial(
    addr: &str, option: HandshakeOption, config: &ClientConfig,
) -> Result<Client, ConnectError> {
    resolve_codec(&option)?;
    let stream = lark_rpc_tcp::connect_timeout(addr, config.connect_timeout).await?;
    Client::new(stream, option, config).await
}

/// [dial] with the default option (msgpack) and config.
pub async fn dial_default(addr: &str) -> Result<Client, ConnectError> {
    dial(addr, HandshakeOption::default(), &ClientConfig::default()).await
}
