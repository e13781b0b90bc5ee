use super::server::FakeServer;
use lark_rpc::ClientConfig;
use lark_rpc::codec::AnyCodec;
use lark_rpc::client::Client;
use lark_rpc::proto::{HandshakeOption, Header};
use lark_rpc::server::Server;
use lark_rpc_core::StreamLimits;
use lark_rpc_core::error::FrameError;
use lark_rpc_core::frame::{FrameReader, FrameWriter};
use lark_rpc_core::stream::{CodecReader, CodecWriter};
use serde::{Serialize, de::DeserializeOwned};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf, ReadHalf, WriteHalf, duplex};

const PIPE_SIZE: usize = 64 * 1024;

/// A real client wired to a [FakeServer] through an in-memory pipe.
pub async fn init_client(codec_type: &str) -> (Client, FakeServer) {
    let (local, remote) = duplex(PIPE_SIZE);
    let client = Client::new(local, HandshakeOption::new(codec_type), &ClientConfig::default())
        .await
        .expect("client");
    let server = FakeServer::accept(remote).await;
    (client, server)
}

/// Writes requests to a real [Server] frame by frame, no registry, no seq bookkeeping.
pub struct RawClient {
    pub reader: CodecReader<ReadHalf<DuplexStream>>,
    pub writer: CodecWriter<WriteHalf<DuplexStream>>,
}

impl RawClient {
    /// Handshake with `option` on a pipe served by `server` in the background.
    pub async fn connect(server: &Arc<Server>, option: HandshakeOption) -> Self {
        let (local, remote) = duplex(PIPE_SIZE);
        let server = server.clone();
        tokio::spawn(async move { server.serve_conn(remote).await });
        let limits = StreamLimits::default();
        let (r, w) = tokio::io::split(local);
        let mut frames = FrameWriter::new(w, limits);
        frames.write_option(&option).await.expect("write option");
        // fall back to msgpack so a rejected handshake can still be observed
        let codec = AnyCodec::from_type(&option.codec_type).unwrap_or_default();
        Self {
            reader: CodecReader::new(FrameReader::new(r, limits), codec),
            writer: CodecWriter::new(frames, codec),
        }
    }

    pub async fn request<A: Serialize>(&mut self, service_method: &str, seq: u64, args: &A) {
        let header = Header { service_method: service_method.to_string(), seq, error: String::new() };
        self.writer.write(&header, args).await.expect("write request");
    }

    pub async fn read_response<R: DeserializeOwned>(&mut self) -> (Header, R) {
        let header = self.reader.read_header().await.expect("read header");
        let reply = self.reader.read_body().await.expect("read body");
        (header, reply)
    }

    pub async fn try_read_header(&mut self) -> Result<Header, FrameError> {
        self.reader.read_header().await
    }
}

/// A client stream whose two directions are separate pipes, so a test can stall or break the
/// write direction alone.
pub struct SplitPipe {
    read: DuplexStream,
    write: DuplexStream,
}

impl AsyncRead for SplitPipe {
    fn poll_read(
        self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().read).poll_read(cx, buf)
    }
}

impl AsyncWrite for SplitPipe {
    fn poll_write(
        self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().write).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().write).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().write).poll_shutdown(cx)
    }
}

/// The far end of a [SplitPipe]. Dropping `reader` makes every later client write fail.
pub struct SplitPeer {
    pub reader: CodecReader<DuplexStream>,
    pub writer: CodecWriter<DuplexStream>,
}

impl SplitPeer {
    pub async fn reply<B: Serialize>(&mut self, service_method: &str, seq: u64, body: &B) {
        let header = Header { service_method: service_method.to_string(), seq, error: String::new() };
        self.writer.write(&header, body).await.expect("write reply");
    }
}

/// A real client over a [SplitPipe]. Its requests block once `write_capacity` bytes are
/// unread, the handshake has to fit.
pub async fn init_split_client(codec_type: &str, write_capacity: usize) -> (Client, SplitPeer) {
    let (client_read, peer_write) = duplex(PIPE_SIZE);
    let (client_write, peer_read) = duplex(write_capacity);
    let pipe = SplitPipe { read: client_read, write: client_write };
    let client = Client::new(pipe, HandshakeOption::new(codec_type), &ClientConfig::default())
        .await
        .expect("client");
    let limits = StreamLimits::default();
    let mut frames = FrameReader::new(peer_read, limits);
    let option = frames.read_option().await.expect("read option");
    let codec = AnyCodec::from_type(&option.codec_type).expect("codec");
    let peer = SplitPeer {
        reader: CodecReader::new(frames, codec),
        writer: CodecWriter::new(FrameWriter::new(peer_write, limits), codec),
    };
    (client, peer)
}
