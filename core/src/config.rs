use std::time::Duration;

/// Buffer size of the socket reader and writer when the config leaves it zero.
pub const DEFAULT_BUF_SIZE: usize = 8 * 1024;

/// Largest header or body frame accepted when the config leaves it zero.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// General config for client-side
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// In bytes. when non-zero, overwrite the DEFAULT_BUF_SIZE of the connection
    pub stream_buf_size: usize,
    /// In bytes. when non-zero, overwrite DEFAULT_MAX_FRAME_SIZE
    pub max_frame_size: usize,
    /// Only bounds establishing the connection in `dial`, zero means wait forever.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { stream_buf_size: 0, max_frame_size: 0, connect_timeout: Duration::from_secs(0) }
    }
}

/// General config for server-side
#[derive(Clone, Debug, Default)]
pub struct ServerConfig {
    /// In bytes. when non-zero, overwrite the DEFAULT_BUF_SIZE of each connection
    pub stream_buf_size: usize,
    /// In bytes. when non-zero, overwrite DEFAULT_MAX_FRAME_SIZE
    pub max_frame_size: usize,
}

/// The sizing both ends apply to their connection streams.
#[derive(Clone, Copy, Debug)]
pub struct StreamLimits {
    pub buf_size: usize,
    pub max_frame_size: usize,
}

impl StreamLimits {
    #[inline]
    fn new(stream_buf_size: usize, max_frame_size: usize) -> Self {
        Self {
            buf_size: if stream_buf_size > 0 { stream_buf_size } else { DEFAULT_BUF_SIZE },
            max_frame_size: if max_frame_size > 0 { max_frame_size } else { DEFAULT_MAX_FRAME_SIZE },
        }
    }
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl From<&ClientConfig> for StreamLimits {
    fn from(config: &ClientConfig) -> Self {
        Self::new(config.stream_buf_size, config.max_frame_size)
    }
}

impl From<&ServerConfig> for StreamLimits {
    fn from(config: &ServerConfig) -> Self {
        Self::new(config.stream_buf_size, config.max_frame_size)
    }
}
