//! # lark-rpc-core
//!
//! This crate provides the core utilities for [`lark-rpc`](https://docs.rs/lark-rpc).
//! It includes the wire records, the framing of a connection, configs and the error taxonomy
//! shared by the other crates in the workspace.
//!
//! ## Wire format
//!
//! A connection starts with one [HandshakeOption](crate::proto::HandshakeOption) sent by the
//! client as a single line of JSON. It selects the codec of everything that follows.
//!
//! After that, each message in either direction is a [Header](crate::proto::Header) frame
//! immediately followed by exactly one body frame. A frame is a big-endian `u32` length followed
//! by that many bytes of codec output.

pub use lark_rpc_codec::{AnyCodec, Codec, CodecError};

mod config;
pub use config::*;
pub mod error;
pub mod frame;
pub mod proto;
pub mod stream;
mod transport;
pub use transport::AsyncListener;
