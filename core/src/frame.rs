//! Length-prefixed frames over a byte stream.
//!
//! `[u32 big-endian length][payload]`, header and body each being one frame. The handshake line
//! that precedes them is read by the same buffered reader, so no byte read ahead is lost.

use crate::{StreamLimits, error::FrameError, proto::HandshakeOption};
use std::io;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter,
};

/// Upper bound of the handshake line, newline included.
pub const MAX_OPTION_SIZE: usize = 1024;

pub struct FrameReader<R> {
    inner: BufReader<R>,
    limits: StreamLimits,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, limits: StreamLimits) -> Self {
        Self { inner: BufReader::with_capacity(limits.buf_size, reader), limits }
    }

    /// Read the one JSON line a client starts the connection with.
    pub async fn read_option(&mut self) -> Result<HandshakeOption, FrameError> {
        let mut line = Vec::with_capacity(128);
        let n = (&mut self.inner).take(MAX_OPTION_SIZE as u64).read_until(b'\n', &mut line).await?;
        if n == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        if line.last() != Some(&b'\n') {
            return Err(FrameError::Handshake(format!(
                "option line not terminated within {} bytes",
                MAX_OPTION_SIZE
            )));
        }
        serde_json::from_slice(&line).map_err(|e| FrameError::Handshake(e.to_string()))
    }

    async fn read_len(&mut self) -> Result<usize, FrameError> {
        let mut prefix = [0u8; 4];
        let mut got = 0;
        while got < prefix.len() {
            let n = self.inner.read(&mut prefix[got..]).await?;
            if n == 0 {
                break;
            }
            got += n;
        }
        if got == 0 {
            // the peer closed between two frames
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        if got < prefix.len() {
            return Err(FrameError::Truncated { len: prefix.len(), got });
        }
        let len = u32::from_be_bytes(prefix) as usize;
        if len > self.limits.max_frame_size {
            return Err(FrameError::TooLarge { len, max: self.limits.max_frame_size });
        }
        Ok(len)
    }

    pub async fn read_frame(&mut self) -> Result<Vec<u8>, FrameError> {
        let len = self.read_len().await?;
        // Grow with the data actually received, a bare length prefix must not cost `len` bytes.
        let mut buf = Vec::with_capacity(len.min(self.limits.buf_size));
        let got = (&mut self.inner).take(len as u64).read_to_end(&mut buf).await?;
        if got < len {
            return Err(FrameError::Truncated { len, got });
        }
        Ok(buf)
    }

    /// Consume the next frame without keeping it.
    pub async fn skip_frame(&mut self) -> Result<(), FrameError> {
        let len = self.read_len().await?;
        let got = tokio::io::copy(&mut (&mut self.inner).take(len as u64), &mut tokio::io::sink())
            .await? as usize;
        if got < len {
            return Err(FrameError::Truncated { len, got });
        }
        Ok(())
    }
}

pub struct FrameWriter<W> {
    inner: BufWriter<W>,
    limits: StreamLimits,
    broken: bool,
    shut_down: bool,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W, limits: StreamLimits) -> Self {
        Self { inner: BufWriter::with_capacity(limits.buf_size, writer), limits, broken: false, shut_down: false }
    }

    pub async fn write_option(&mut self, option: &HandshakeOption) -> Result<(), FrameError> {
        let mut line = serde_json::to_vec(option).map_err(|e| FrameError::Handshake(e.to_string()))?;
        line.push(b'\n');
        self.inner.write_all(&line).await?;
        self.inner.flush().await?;
        Ok(())
    }

    #[inline]
    fn check_len(&self, len: usize) -> Result<u32, FrameError> {
        if len > self.limits.max_frame_size {
            return Err(FrameError::TooLarge { len, max: self.limits.max_frame_size });
        }
        u32::try_from(len).map_err(|_| FrameError::TooLarge { len, max: u32::MAX as usize })
    }

    /// Write a header frame and its body frame, then flush.
    ///
    /// Sizes are checked before the first byte goes out. Once a write fails halfway the stream
    /// is out of frame, and every later call returns [FrameError::Broken].
    pub async fn write_frames(&mut self, header: &[u8], body: &[u8]) -> Result<(), FrameError> {
        if self.broken {
            return Err(FrameError::Broken);
        }
        let header_len = self.check_len(header.len())?;
        let body_len = self.check_len(body.len())?;
        let r = self.write_raw(header_len, header, body_len, body).await;
        if r.is_err() {
            self.broken = true;
        }
        r
    }

    async fn write_raw(
        &mut self, header_len: u32, header: &[u8], body_len: u32, body: &[u8],
    ) -> Result<(), FrameError> {
        self.inner.write_u32(header_len).await?;
        self.inner.write_all(header).await?;
        self.inner.write_u32(body_len).await?;
        self.inner.write_all(body).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Give up on a write that was cancelled halfway, the stream is out of frame.
    #[inline]
    pub fn set_broken(&mut self) {
        self.broken = true;
    }

    /// Shut down the write direction. Only a writer still in frame flushes first, so closing
    /// never waits on a peer that stopped reading in the middle of a message.
    ///
    /// Closing again is a no-op.
    pub async fn close(&mut self) -> Result<(), FrameError> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        if self.broken {
            self.inner.get_mut().shutdown().await?;
        } else {
            self.broken = true;
            self.inner.shutdown().await?;
        }
        Ok(())
    }
}
