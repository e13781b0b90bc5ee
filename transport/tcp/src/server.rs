use crate::{Stream, is_unix_addr};
use lark_rpc_core::AsyncListener;
use std::io;
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;

/// A bound listener, TCP or unix socket.
///
/// A unix socket file is removed when the listener is dropped.
#[derive(Debug)]
pub enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener, String),
}

/// Bind `addr`. A stale unix socket file at the path is removed first.
pub async fn bind(addr: &str) -> io::Result<Listener> {
    if is_unix_addr(addr) {
        #[cfg(unix)]
        {
            if let Err(e) = std::fs::remove_file(addr) {
                if e.kind() != io::ErrorKind::NotFound {
                    return Err(e);
                }
            }
            let listener = UnixListener::bind(addr)?;
            info!("listening on unix socket {}", addr);
            return Ok(Listener::Unix(listener, addr.to_string()));
        }
        #[cfg(not(unix))]
        {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "unix socket"));
        }
    }
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    Ok(Listener::Tcp(listener))
}

impl Listener {
    /// The address a client should dial, with the real port when bound to port 0.
    pub fn local_addr(&self) -> io::Result<String> {
        match self {
            Listener::Tcp(l) => Ok(l.local_addr()?.to_string()),
            #[cfg(unix)]
            Listener::Unix(_, path) => Ok(path.clone()),
        }
    }
}

impl AsyncListener for Listener {
    type Conn = Stream;

    async fn accept(&self) -> io::Result<(Stream, String)> {
        match self {
            Listener::Tcp(l) => {
                let (stream, addr) = l.accept().await?;
                stream.set_nodelay(true)?;
                Ok((Stream::Tcp(stream), addr.to_string()))
            }
            #[cfg(unix)]
            Listener::Unix(l, path) => {
                let (stream, _) = l.accept().await?;
                Ok((Stream::Unix(stream), path.clone()))
            }
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Listener::Unix(_, path) = self {
            let _ = std::fs::remove_file(path.as_str());
        }
    }
}
