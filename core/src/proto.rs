//! Records exchanged on the wire.

use lark_rpc_codec::MSGPACK_TYPE;
use serde::{Deserialize, Serialize};

/// Marks a connection as speaking this protocol, checked by the server before anything else.
pub const MAGIC_NUMBER: u32 = 0x000001;

/// The handshake a client sends once, before any [Header].
///
/// It is always JSON, whatever codec it selects, so that both ends can agree on it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeOption {
    pub magic_number: u32,
    /// Type tag of the codec for the rest of the connection, e.g. `application/msgpack`.
    pub codec_type: String,
}

impl HandshakeOption {
    pub fn new(codec_type: &str) -> Self {
        Self { magic_number: MAGIC_NUMBER, codec_type: codec_type.to_string() }
    }

    #[inline]
    pub fn check_magic(&self) -> bool {
        self.magic_number == MAGIC_NUMBER
    }
}

impl Default for HandshakeOption {
    fn default() -> Self {
        Self::new(MSGPACK_TYPE)
    }
}

/// Envelope of every message, followed on the wire by exactly one body.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    /// "Service.Method"
    pub service_method: String,
    /// Correlates a response to its request.
    pub seq: u64,
    /// Empty on success. Otherwise the body is a placeholder, still to be read.
    pub error: String,
}

impl Header {
    #[inline]
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}
