use crate::{Stream, io_with_timeout, is_unix_addr};
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;

/// Connect to `addr`, a `host:port` or a unix socket path.
pub async fn connect(addr: &str) -> io::Result<Stream> {
    if is_unix_addr(addr) {
        #[cfg(unix)]
        {
            let stream = tokio::net::UnixStream::connect(addr).await?;
            return Ok(Stream::Unix(stream));
        }
        #[cfg(not(unix))]
        {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "unix socket"));
        }
    }
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(Stream::Tcp(stream))
}

/// [connect] bounded by `timeout`, zero means no bound.
pub async fn connect_timeout(addr: &str, timeout: Duration) -> io::Result<Stream> {
    let r = io_with_timeout!(timeout, connect(addr));
    if let Err(e) = &r {
        debug!("connect {} failed: {}", addr, e);
    }
    r
}
