//! Error taxonomy.
//!
//! - [ConfigError]: mistakes at the call site (unknown codec, bad or duplicate service).
//!   Nothing on any connection is touched.
//! - [FrameError]: the byte stream can no longer be trusted, the connection is torn down.
//! - [ResolveError]: a request names something the server does not have. It is sent back
//!   in `Header.error` and the connection keeps serving.
//! - [RpcError]: what a caller of the client observes for one call.

use crate::CodecError;
use std::io;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid codec type {0:?}")]
    UnsupportedCodec(String),
    #[error("rpc server: service {0} already exists")]
    DuplicateService(String),
    #[error("rpc server: invalid service name {0:?}")]
    InvalidServiceName(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("frame too large: {len} > {max}")]
    TooLarge { len: usize, max: usize },
    #[error("frame truncated: got {got} of {len} bytes")]
    Truncated { len: usize, got: usize },
    #[error("writer is broken by an earlier failure")]
    Broken,
    #[error("handshake: {0}")]
    Handshake(String),
    #[error("decode: {0}")]
    Decode(#[from] CodecError),
    #[error("encode: {0}")]
    Encode(CodecError),
}

impl FrameError {
    /// The peer closed the stream at a frame boundary.
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("rpc server: service/method request ill-formed: {0}")]
    Malformed(String),
    #[error("rpc server: can't find service {0}")]
    ServiceNotFound(String),
    #[error("rpc server: can't find method {method} of service {service}")]
    MethodNotFound { service: String, method: String },
}

/// The error of one call as its caller sees it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    /// Reported by the server in `Header.error`: resolution failures and method errors.
    #[error("{0}")]
    Server(String),
    /// The client was closed, or the connection shut down, before the call completed.
    #[error("connection is shut down")]
    Shutdown,
    /// The connection failed while the call was in flight.
    #[error("connection error: {0}")]
    Connection(String),
    #[error("encoding args: {0}")]
    Encode(String),
    #[error("reading body: {0}")]
    Decode(String),
}

impl RpcError {
    /// Text the server put into `Header.error`, if this error came from the server.
    #[inline]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Server(msg) => Some(msg.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("rpc client: options error: {0}")]
    Handshake(#[from] FrameError),
    #[error("rpc client: connect error: {0}")]
    Io(#[from] io::Error),
}
