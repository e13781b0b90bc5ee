//! In-flight calls of one client, keyed by `seq`.
//!
//! A call enters with [CallRegistry::register] and leaves exactly once, through
//! [CallRegistry::remove] (a response arrived, or its send failed) or [CallRegistry::terminate]
//! (the connection is gone). Leaving hands the call back by value, so whoever removed it is the
//! only one able to complete it.

use lark_rpc_core::{AnyCodec, error::RpcError};
use std::collections::HashMap;

/// A registered call, with its reply type erased.
///
/// Completing consumes the call, so a `seq` can be delivered at most once.
pub(crate) trait PendingCall: Send {
    fn set_seq(&mut self, seq: u64);

    fn service_method(&self) -> &str;

    /// Decode `body` into the reply with the connection's codec and complete the call.
    fn complete(self: Box<Self>, codec: &AnyCodec, body: &[u8]);

    fn fail(self: Box<Self>, err: RpcError);
}

pub(crate) struct CallRegistry {
    seq: u64,
    pending: HashMap<u64, Box<dyn PendingCall>>,
    /// user has called close
    closing: bool,
    /// the connection is gone
    shutdown: bool,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self { seq: 1, pending: HashMap::new(), closing: false, shutdown: false }
    }

    /// Assign the next seq and keep the call until it is removed.
    ///
    /// The call is handed back when the client is closing or shut down.
    pub fn register(
        &mut self, mut call: Box<dyn PendingCall>,
    ) -> Result<u64, Box<dyn PendingCall>> {
        if self.closing || self.shutdown {
            return Err(call);
        }
        let seq = self.seq;
        self.seq += 1;
        call.set_seq(seq);
        self.pending.insert(seq, call);
        Ok(seq)
    }

    #[inline]
    pub fn remove(&mut self, seq: u64) -> Option<Box<dyn PendingCall>> {
        self.pending.remove(&seq)
    }

    /// Mark the client shut down and take every call still pending.
    pub fn terminate(&mut self) -> Vec<Box<dyn PendingCall>> {
        self.shutdown = true;
        self.pending.drain().map(|(_, call)| call).collect()
    }

    /// Returns false when close was already requested.
    #[inline]
    pub fn set_closing(&mut self) -> bool {
        if self.closing {
            return false;
        }
        self.closing = true;
        true
    }

    #[inline]
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        !self.closing && !self.shutdown
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
