use crate::{Codec, CodecError};
use serde::{Deserialize, Serialize};

#[cfg(not(any(feature = "msgpack", feature = "json")))]
compile_error!("lark-rpc-codec needs at least one of the `msgpack` or `json` features");

/// A codec picked at run time from the type tag a peer announced.
///
/// [Codec] has generic methods and cannot be a trait object, so the set of codecs a connection
/// may negotiate is closed over this enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnyCodec {
    #[cfg(feature = "msgpack")]
    Msgp(crate::MsgpCodec),
    #[cfg(feature = "json")]
    Json(crate::JsonCodec),
}

/// Known type tags and how to construct their codec.
static CODECS: &[(&str, fn() -> AnyCodec)] = &[
    #[cfg(feature = "msgpack")]
    (crate::MSGPACK_TYPE, new_msgp),
    #[cfg(feature = "json")]
    (crate::JSON_TYPE, new_json),
];

#[cfg(feature = "msgpack")]
fn new_msgp() -> AnyCodec {
    AnyCodec::Msgp(crate::MsgpCodec())
}

#[cfg(feature = "json")]
fn new_json() -> AnyCodec {
    AnyCodec::Json(crate::JsonCodec())
}

impl AnyCodec {
    /// Look up the codec registered for `codec_type`, None when the tag is unknown.
    pub fn from_type(codec_type: &str) -> Option<Self> {
        CODECS.iter().find(|(tag, _)| *tag == codec_type).map(|(_, new_codec)| new_codec())
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            #[cfg(feature = "msgpack")]
            Self::Msgp(_) => crate::MSGPACK_TYPE,
            #[cfg(feature = "json")]
            Self::Json(_) => crate::JSON_TYPE,
        }
    }

    /// All tags this build understands.
    pub fn supported_types() -> impl Iterator<Item = &'static str> {
        CODECS.iter().map(|(tag, _)| *tag)
    }
}

impl Default for AnyCodec {
    fn default() -> Self {
        CODECS[0].1()
    }
}

impl Codec for AnyCodec {
    #[inline]
    fn encode_into<T: Serialize + ?Sized>(&self, task: &T, buf: &mut Vec<u8>) -> Result<usize, CodecError> {
        match self {
            #[cfg(feature = "msgpack")]
            Self::Msgp(c) => c.encode_into(task, buf),
            #[cfg(feature = "json")]
            Self::Json(c) => c.encode_into(task, buf),
        }
    }

    #[inline]
    fn decode<'a, T: Deserialize<'a>>(&self, buf: &'a [u8]) -> Result<T, CodecError> {
        match self {
            #[cfg(feature = "msgpack")]
            Self::Msgp(c) => c.decode(buf),
            #[cfg(feature = "json")]
            Self::Json(c) => c.decode(buf),
        }
    }
}
