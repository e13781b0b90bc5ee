//! Header and body records of a negotiated codec, on top of [frame](crate::frame).

use crate::{
    AnyCodec, Codec,
    error::FrameError,
    frame::{FrameReader, FrameWriter},
    proto::Header,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncRead, AsyncWrite};

/// The read side of a connection once the codec is known.
pub struct CodecReader<R> {
    frames: FrameReader<R>,
    codec: AnyCodec,
}

impl<R: AsyncRead + Unpin> CodecReader<R> {
    pub fn new(frames: FrameReader<R>, codec: AnyCodec) -> Self {
        Self { frames, codec }
    }

    #[inline]
    pub fn codec(&self) -> &AnyCodec {
        &self.codec
    }

    pub async fn read_header(&mut self) -> Result<Header, FrameError> {
        let buf = self.frames.read_frame().await?;
        Ok(self.codec.decode(&buf)?)
    }

    /// Decode the next body as `T`.
    pub async fn read_body<T: DeserializeOwned>(&mut self) -> Result<T, FrameError> {
        let buf = self.frames.read_frame().await?;
        Ok(self.codec.decode(&buf)?)
    }

    /// The next body still encoded, for a caller that knows its shape later.
    #[inline]
    pub async fn read_body_raw(&mut self) -> Result<Vec<u8>, FrameError> {
        self.frames.read_frame().await
    }

    /// Drop the next body, keeping the stream in frame.
    #[inline]
    pub async fn discard_body(&mut self) -> Result<(), FrameError> {
        self.frames.skip_frame().await
    }
}

/// The write side of a connection once the codec is known.
///
/// Callers sharing one writer must serialize their calls (the client and server wrap it in a
/// mutex), a message is only atomic with respect to other messages written through `&mut self`.
pub struct CodecWriter<W> {
    frames: FrameWriter<W>,
    codec: AnyCodec,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> CodecWriter<W> {
    pub fn new(frames: FrameWriter<W>, codec: AnyCodec) -> Self {
        Self { frames, codec, buf: Vec::new() }
    }

    #[inline]
    pub fn codec(&self) -> &AnyCodec {
        &self.codec
    }

    /// Encode header and body, then write both. An encode failure writes nothing.
    pub async fn write<B: Serialize>(&mut self, header: &Header, body: &B) -> Result<(), FrameError> {
        let body = self.codec.encode(body).map_err(FrameError::Encode)?;
        self.write_encoded(header, &body).await
    }

    /// Like [write](Self::write) with a body that was encoded beforehand.
    pub async fn write_encoded(&mut self, header: &Header, body: &[u8]) -> Result<(), FrameError> {
        self.buf.clear();
        self.codec.encode_into(header, &mut self.buf).map_err(FrameError::Encode)?;
        self.frames.write_frames(&self.buf, body).await
    }

    /// See [FrameWriter::set_broken].
    #[inline]
    pub fn set_broken(&mut self) {
        self.frames.set_broken();
    }

    pub async fn close(&mut self) -> Result<(), FrameError> {
        self.frames.close().await
    }
}
