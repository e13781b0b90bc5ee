#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]

//! # lark-rpc-codec
//!
//! This crate provides the core codec trait and codec implementations for [`lark-rpc`](https://docs.rs/lark-rpc).
//!
//! A codec only turns values into bytes and back. Framing (length prefix, header followed by
//! body) is the job of `lark-rpc-core`, so a codec never sees the connection.
//!
//! The codec of a connection is negotiated at handshake by its type tag, see [AnyCodec::from_type].

/*
 *  Note that there's no unify output interface in each serde impl,
 *  whatever we want to serialize into (std::io::Write / Buffer/ Vec<u8>),
 *  require the codec implement to match.
 */

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CodecError(pub String);

/// The codec is immutable, if need changing (like setting up cipher), should have inner
/// mutablilty
pub trait Codec: Default + Send + Sync + Sized + 'static {
    fn encode<T: Serialize + ?Sized>(&self, task: &T) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        self.encode_into(task, &mut buf)?;
        Ok(buf)
    }

    /// sererialized the msg into the tail of buf, and return the size written
    fn encode_into<T: Serialize + ?Sized>(&self, task: &T, buf: &mut Vec<u8>) -> Result<usize, CodecError>;

    fn decode<'a, T: Deserialize<'a>>(&self, buf: &'a [u8]) -> Result<T, CodecError>;
}

#[cfg(feature = "msgpack")]
mod msgpack;
#[cfg(feature = "msgpack")]
pub use msgpack::*;

#[cfg(feature = "json")]
mod json;
#[cfg(feature = "json")]
pub use json::*;

mod any;
pub use any::*;
