use std::{future::Future, io};
use tokio::io::{AsyncRead, AsyncWrite};

/// This trait is for server-side transport layer, what the accept loop pulls connections from.
///
/// The implementation can be found on:
///
/// - [lark-rpc-tcp](https://docs.rs/lark-rpc-tcp): For TCP and Unix socket
pub trait AsyncListener: Send + Sync + 'static {
    type Conn: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Wait for the next connection, return it along with a printable peer address.
    fn accept(&self) -> impl Future<Output = io::Result<(Self::Conn, String)>> + Send;
}

impl AsyncListener for tokio::net::TcpListener {
    type Conn = tokio::net::TcpStream;

    async fn accept(&self) -> io::Result<(Self::Conn, String)> {
        let (stream, addr) = tokio::net::TcpListener::accept(self).await?;
        Ok((stream, addr.to_string()))
    }
}
