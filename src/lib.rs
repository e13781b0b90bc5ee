#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]

//! # lark-rpc
//!
//! A minimal RPC framework. A [Client](crate::client::Client) issues named calls
//! (`"Service.Method"`) over one persistent connection and receives correlated replies; a
//! [Server](crate::server::Server) exposes registered services and dispatches incoming calls to
//! them.
//!
//! ## Components
//!
//! `lark-rpc` is built from a collection of crates that provide different functionalities:
//!
//! - [`lark-rpc-codec`](https://docs.rs/lark-rpc-codec): Provides codecs for serialization, `msgpack` and `json`.
//! - [`lark-rpc-core`](https://docs.rs/lark-rpc-core): Wire records, framing, configs and errors.
//! - [`lark-rpc-tcp`](https://docs.rs/lark-rpc-tcp): A TCP and unix socket transport.
//!
//! ## The Design
//!
//! Each connection is a full-duplex, multiplexed stream. The client assigns every call a
//! `seq`, strictly increasing per client, and keeps the call in a registry until the response
//! carrying the same `seq` arrives. Writes of both sides go through one lock per connection, so
//! a header and its body are never interleaved with another message, while any number of calls
//! are in flight at once.
//!
//! On the server, one task reads requests of a connection in order, and each resolved request
//! runs on its own task. Services are described once at registration with
//! [Service::builder](crate::server::Service::builder): each method is stored as an adapter that
//! decodes the argument type it declared and encodes its reply, there is no introspection at
//! call time.
//!
//! ## Protocol
//!
//! The details are described in `lark_rpc_core::proto`. The client starts a connection with a
//! JSON [HandshakeOption](crate::proto::HandshakeOption) line (magic number and codec type),
//! then every message is a [Header](crate::proto::Header) frame followed by one body frame.
//! A non-empty `Header.error` marks a failed call; its body is a placeholder that is still read.
//!
//! ## Usage
//!
//! ```no_run
//! use lark_rpc::{client::dial_default, server::{Server, Service}, ServerConfig};
//! use serde::{Deserialize, Serialize};
//!
//! struct Foo;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Args {
//!     num1: i64,
//!     num2: i64,
//! }
//!
//! impl Foo {
//!     fn sum(&self, args: Args, reply: &mut i64) -> Result<(), String> {
//!         *reply = args.num1 + args.num2;
//!         Ok(())
//!     }
//! }
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let server = Server::new(ServerConfig::default());
//! server.register(Service::builder(Foo).method("Sum", Foo::sum).build()?)?;
//! let addr = server.listen("127.0.0.1:0").await?;
//!
//! let client = dial_default(&addr).await?;
//! let reply: i64 = client.call("Foo.Sum", &Args { num1: 3, num2: 4 }).await?;
//! assert_eq!(reply, 7);
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

pub mod client;
pub mod server;

pub use lark_rpc_codec as codec;
pub use lark_rpc_core::{ClientConfig, ServerConfig, error, proto};
