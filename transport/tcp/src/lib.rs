#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]

//! # lark-rpc-tcp
//!
//! This crate provides a TCP transport implementation for [`lark-rpc`](https://docs.rs/lark-rpc).
//! It is used for both client and server communication over TCP.
//!
//! An address starting with `/` is taken as a unix socket path instead.

#[macro_use]
extern crate log;
mod client;
pub use client::*;
mod server;
pub use server::*;
mod stream;
pub use stream::Stream;

#[inline]
pub(crate) fn is_unix_addr(addr: &str) -> bool {
    addr.starts_with('/')
}

#[macro_export(local_inner_macros)]
macro_rules! io_with_timeout {
    ($timeout: expr, $f: expr) => {{
        if $timeout == std::time::Duration::from_secs(0) {
            $f.await
        } else {
            match tokio::time::timeout($timeout, $f).await {
                Ok(Ok(r)) => Ok(r),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(std::io::ErrorKind::TimedOut.into()),
            }
        }
    }};
}
