use crate::{Codec, CodecError};
use serde::{Deserialize, Serialize};

pub const JSON_TYPE: &str = "application/json";

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsonCodec();

impl Codec for JsonCodec {
    #[inline]
    fn encode_into<T: Serialize + ?Sized>(&self, task: &T, buf: &mut Vec<u8>) -> Result<usize, CodecError> {
        let pre_len = buf.len();
        serde_json::to_writer(&mut *buf, task).map_err(|e| CodecError(e.to_string()))?;
        Ok(buf.len() - pre_len)
    }

    #[inline]
    fn decode<'a, T: Deserialize<'a>>(&self, buf: &'a [u8]) -> Result<T, CodecError> {
        serde_json::from_slice(buf).map_err(|e| CodecError(e.to_string()))
    }
}
