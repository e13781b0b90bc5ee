//! A hand-driven peer for a real [Client](lark_rpc::client::Client), so tests choose exactly
//! what goes on the wire.

use lark_rpc::codec::AnyCodec;
use lark_rpc::proto::{HandshakeOption, Header};
use lark_rpc_core::StreamLimits;
use lark_rpc_core::error::FrameError;
use lark_rpc_core::frame::{FrameReader, FrameWriter};
use lark_rpc_core::stream::{CodecReader, CodecWriter};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncWrite, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

pub struct FakeServer {
    pub option: HandshakeOption,
    pub reader: CodecReader<ReadHalf<DuplexStream>>,
    pub writer: CodecWriter<WriteHalf<DuplexStream>>,
}

impl FakeServer {
    /// Read the handshake, then speak the codec it names.
    pub async fn accept(stream: DuplexStream) -> Self {
        let limits = StreamLimits::default();
        let (r, w) = tokio::io::split(stream);
        let mut frames = FrameReader::new(r, limits);
        let option = frames.read_option().await.expect("read option");
        assert!(option.check_magic());
        let codec = AnyCodec::from_type(&option.codec_type).expect("codec");
        Self {
            option,
            reader: CodecReader::new(frames, codec),
            writer: CodecWriter::new(FrameWriter::new(w, limits), codec),
        }
    }

    pub async fn read_request<A: DeserializeOwned>(&mut self) -> (Header, A) {
        let header = self.reader.read_header().await.expect("read header");
        let args = self.reader.read_body().await.expect("read body");
        (header, args)
    }

    pub async fn try_read_header(&mut self) -> Result<Header, FrameError> {
        self.reader.read_header().await
    }

    pub async fn reply<B: Serialize>(&mut self, service_method: &str, seq: u64, body: &B) {
        let header = Header { service_method: service_method.to_string(), seq, error: String::new() };
        self.writer.write(&header, body).await.expect("write reply");
    }

    pub async fn reply_error(&mut self, service_method: &str, seq: u64, error: &str) {
        let header =
            Header { service_method: service_method.to_string(), seq, error: error.to_string() };
        self.writer.write(&header, &()).await.expect("write error reply");
    }
}

/// Write raw bytes behind the codec's back, e.g. a frame cut short.
pub async fn write_raw<W: AsyncWrite + Unpin>(stream: &mut W, data: &[u8]) {
    stream.write_all(data).await.expect("write raw");
    stream.flush().await.expect("flush");
}
