use crate::{Codec, CodecError};
use serde::{Deserialize, Serialize};

pub const MSGPACK_TYPE: &str = "application/msgpack";

/// MessagePack through `rmp-serde`. Structs are written as maps so that field order is not
/// part of the protocol.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MsgpCodec();

impl Codec for MsgpCodec {
    #[inline]
    fn encode_into<T: Serialize + ?Sized>(&self, task: &T, buf: &mut Vec<u8>) -> Result<usize, CodecError> {
        let pre_len = buf.len();
        rmp_serde::encode::write_named(buf, task).map_err(|e| CodecError(e.to_string()))?;
        Ok(buf.len() - pre_len)
    }

    #[inline]
    fn decode<'a, T: Deserialize<'a>>(&self, buf: &'a [u8]) -> Result<T, CodecError> {
        rmp_serde::from_slice(buf).map_err(|e| CodecError(e.to_string()))
    }
}
