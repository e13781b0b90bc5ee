//! The server side: a registry of services and the per-connection request pipeline.
//!
//! For each connection one task reads requests in wire order. A request that resolves to a
//! registered method is handed to its own task and the reader moves on, so requests of one
//! connection run concurrently. Responses go out through one lock per connection, in whatever
//! order the handlers finish.

mod service;
pub use service::*;

use lark_rpc_core::{
    AnyCodec, AsyncListener, Codec, ServerConfig, StreamLimits,
    error::{ConfigError, ResolveError},
    frame::{FrameReader, FrameWriter},
    proto::Header,
    stream::{CodecReader, CodecWriter},
};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, LazyLock};
use std::{fmt, io};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::{JoinError, JoinSet};

/// Body sent along with a resolution failure.
const INVALID_REQUEST: () = ();

/// One inbound request, owned by its handler task until the response is written.
struct Request {
    header: Header,
    argv: Vec<u8>,
    service: Arc<Service>,
    method: Arc<MethodType>,
}

type SharedWriter<W> = Arc<AsyncMutex<CodecWriter<W>>>;

pub struct Server {
    config: ServerConfig,
    services: RwLock<HashMap<String, Arc<Service>>>,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "server(services={:?})", self.services())
    }
}

impl Server {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self { config, services: RwLock::new(HashMap::new()) })
    }

    #[inline]
    pub fn get_config(&self) -> &ServerConfig {
        &self.config
    }

    /// Add `service`. A name already registered is rejected and the existing service kept.
    ///
    /// Registration is meant to finish before serving starts.
    pub fn register(&self, service: Service) -> Result<(), ConfigError> {
        let mut services = self.services.write();
        if services.contains_key(service.name()) {
            let err = ConfigError::DuplicateService(service.name().to_string());
            warn!("{}", err);
            return Err(err);
        }
        info!("rpc server: register service {} ({} methods)", service.name(), service.methods().count());
        services.insert(service.name().to_string(), Arc::new(service));
        Ok(())
    }

    /// Names of the registered services, sorted.
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve `"Service.Method"`, split at the last `.`.
    pub fn find_service(
        &self, service_method: &str,
    ) -> Result<(Arc<Service>, Arc<MethodType>), ResolveError> {
        let dot = match service_method.rfind('.') {
            Some(dot) if dot > 0 => dot,
            _ => return Err(ResolveError::Malformed(service_method.to_string())),
        };
        let (service_name, method_name) = (&service_method[..dot], &service_method[dot + 1..]);
        let service = self
            .services
            .read()
            .get(service_name)
            .cloned()
            .ok_or_else(|| ResolveError::ServiceNotFound(service_name.to_string()))?;
        let method = service.method(method_name).cloned().ok_or_else(|| {
            ResolveError::MethodNotFound {
                service: service_name.to_string(),
                method: method_name.to_string(),
            }
        })?;
        Ok((service, method))
    }

    /// Serve every connection `listener` yields, each on its own task.
    ///
    /// Returns on the first accept error. Connections already being served keep running.
    pub async fn accept<L: AsyncListener>(self: &Arc<Self>, listener: L) {
        loop {
            match listener.accept().await {
                Ok((conn, addr)) => {
                    debug!("rpc server: accepted connection from {}", addr);
                    let server = self.clone();
                    tokio::spawn(async move { server.serve_conn(conn).await });
                }
                Err(e) => {
                    error!("rpc server accept error: {}", e);
                    return;
                }
            }
        }
    }

    /// Bind `addr` with the tcp transport and run [accept](Self::accept) on a background task.
    ///
    /// Returns the bound address, e.g. with the real port when `addr` asked for port 0.
    pub async fn listen(self: &Arc<Self>, addr: &str) -> io::Result<String> {
        let listener = lark_rpc_tcp::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let server = self.clone();
        tokio::spawn(async move { server.accept(listener).await });
        Ok(local_addr)
    }

    /// Serve one connection until the client goes away or the stream breaks.
    pub async fn serve_conn<S>(&self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let limits = StreamLimits::from(&self.config);
        let (r, w) = tokio::io::split(stream);
        let mut frames = FrameReader::new(r, limits);
        let option = match frames.read_option().await {
            Ok(option) => option,
            Err(e) => {
                warn!("rpc server: options error: {}", e);
                return;
            }
        };
        if !option.check_magic() {
            warn!("rpc server: invalid magic number {:#x}", option.magic_number);
            return;
        }
        let Some(codec) = AnyCodec::from_type(&option.codec_type) else {
            warn!("rpc server: invalid codec type {}", option.codec_type);
            return;
        };
        let reader = CodecReader::new(frames, codec);
        let writer = CodecWriter::new(FrameWriter::new(w, limits), codec);
        self.serve_codec(reader, writer).await;
    }

    async fn serve_codec<R, W>(&self, mut reader: CodecReader<R>, writer: CodecWriter<W>)
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let codec = *reader.codec();
        let sending: SharedWriter<W> = Arc::new(AsyncMutex::new(writer));
        let mut handlers = JoinSet::new();
        loop {
            let mut header = match reader.read_header().await {
                Ok(header) => header,
                Err(e) => {
                    if e.is_eof() {
                        debug!("rpc server: connection closed by client");
                    } else {
                        warn!("rpc server: read header error: {}", e);
                    }
                    break;
                }
            };
            match self.find_service(&header.service_method) {
                Err(e) => {
                    debug!("rpc server: seq={} {}", header.seq, e);
                    if let Err(e) = reader.discard_body().await {
                        warn!("rpc server: read body error: {}", e);
                        break;
                    }
                    header.error = e.to_string();
                    send_response(&sending, &codec, &header, &INVALID_REQUEST).await;
                }
                Ok((service, method)) => {
                    let argv = match reader.read_body_raw().await {
                        Ok(argv) => argv,
                        Err(e) => {
                            warn!("rpc server: read argv err: {}", e);
                            break;
                        }
                    };
                    let req = Request { header, argv, service, method };
                    handlers.spawn(handle_request(sending.clone(), codec, req));
                }
            }
            while let Some(r) = handlers.try_join_next() {
                check_handler(r);
            }
        }
        while let Some(r) = handlers.join_next().await {
            check_handler(r);
        }
        if let Err(e) = sending.lock().await.close().await {
            debug!("rpc server: close connection: {}", e);
        }
    }
}

#[inline]
fn check_handler(r: Result<(), JoinError>) {
    if let Err(e) = r {
        warn!("rpc server: handler task failed: {}", e);
    }
}

async fn handle_request<W>(sending: SharedWriter<W>, codec: AnyCodec, req: Request)
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    let Request { mut header, argv, service, method } = req;
    trace!("rpc server: handle {}.{} seq={}", service.name(), method.name(), header.seq);
    let r = catch_unwind(AssertUnwindSafe(|| method.call(&codec, &argv)))
        .unwrap_or(Err(MethodError::Panic));
    match r {
        Ok(reply) => send_encoded(&sending, &header, &reply).await,
        Err(e) => {
            debug!("rpc server: call {}.{} error: {}", service.name(), method.name(), e);
            header.error = e.to_string();
            send_response(&sending, &codec, &header, &INVALID_REQUEST).await;
        }
    }
}

/// Encode `body` outside the lock, then [send_encoded].
async fn send_response<W, B>(
    sending: &AsyncMutex<CodecWriter<W>>, codec: &AnyCodec, header: &Header, body: &B,
) where
    W: AsyncWrite + Unpin,
    B: Serialize,
{
    match codec.encode(body) {
        Ok(body) => send_encoded(sending, header, &body).await,
        Err(e) => warn!("rpc server: encode response seq={} error: {}", header.seq, e),
    }
}

/// Write one response. Failures are logged, the sibling handlers are not affected.
async fn send_encoded<W>(sending: &AsyncMutex<CodecWriter<W>>, header: &Header, body: &[u8])
where
    W: AsyncWrite + Unpin,
{
    let mut writer = sending.lock().await;
    if let Err(e) = writer.write_encoded(header, body).await {
        warn!("rpc server: send response seq={} error: {}", header.seq, e);
    }
}

static DEFAULT_SERVER: LazyLock<Arc<Server>> =
    LazyLock::new(|| Server::new(ServerConfig::default()));

/// A process-wide server for programs that only need one.
pub fn default_server() -> &'static Arc<Server> {
    &DEFAULT_SERVER
}

/// Register `service` on [default_server].
pub fn register(service: Service) -> Result<(), ConfigError> {
    DEFAULT_SERVER.register(service)
}

/// Run [Server::accept] of [default_server].
pub async fn accept<L: AsyncListener>(listener: L) {
    DEFAULT_SERVER.accept(listener).await
}
