//! Services and their methods, built once at registration.
//!
//! Every exposed method is stored as an adapter closure bound to the receiver. The adapter
//! decodes the argument into the type the method declared, runs it against a default reply,
//! and encodes the reply. Dispatching a request is a map lookup and one call of that closure.

use lark_rpc_core::{AnyCodec, Codec, error::ConfigError};
use serde::{Serialize, de::DeserializeOwned};
use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

type Handler = Box<dyn Fn(&AnyCodec, &[u8]) -> Result<Vec<u8>, MethodError> + Send + Sync>;

/// Why a method produced no reply, rendered into `Header.error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodError {
    /// The request body does not decode into the argument type.
    Args(String),
    /// The method itself returned an error.
    Call(String),
    Reply(String),
    Panic,
}

impl fmt::Display for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Args(e) => write!(f, "rpc server: read argv err: {}", e),
            Self::Call(e) => write!(f, "{}", e),
            Self::Reply(e) => write!(f, "rpc server: encode reply err: {}", e),
            Self::Panic => write!(f, "rpc server: method panicked"),
        }
    }
}

/// Only names starting with an uppercase letter are callable.
#[inline]
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

#[inline]
fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Service name of a receiver type: its last path segment, looking through references and
/// `Arc`/`Box`/`Rc`.
pub(crate) fn derive_name(full_name: &str) -> &str {
    let mut name = full_name.trim_start_matches('&');
    while let Some(start) = name.find('<') {
        let outer = last_segment(&name[..start]);
        if matches!(outer, "Arc" | "Box" | "Rc") && name.ends_with('>') {
            name = name[start + 1..name.len() - 1].trim_start_matches('&');
        } else {
            return outer;
        }
    }
    last_segment(name)
}

pub struct MethodType {
    name: String,
    arg_type: &'static str,
    reply_type: &'static str,
    num_calls: AtomicU64,
    handler: Handler,
}

impl MethodType {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn arg_type(&self) -> &'static str {
        self.arg_type
    }

    #[inline]
    pub fn reply_type(&self) -> &'static str {
        self.reply_type
    }

    #[inline]
    pub fn num_calls(&self) -> u64 {
        self.num_calls.load(Ordering::Relaxed)
    }

    /// Decode `argv`, invoke the method, return the encoded reply.
    pub fn call(&self, codec: &AnyCodec, argv: &[u8]) -> Result<Vec<u8>, MethodError> {
        self.num_calls.fetch_add(1, Ordering::Relaxed);
        (self.handler)(codec, argv)
    }
}

impl fmt::Debug for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({}, &mut {})", self.name, self.arg_type, self.reply_type)
    }
}

pub struct Service {
    name: String,
    methods: HashMap<String, Arc<MethodType>>,
}

impl Service {
    /// Start describing a service around `receiver`, named after its type.
    pub fn builder<S: Send + Sync + 'static>(receiver: S) -> ServiceBuilder<S> {
        ServiceBuilder {
            name: derive_name(type_name::<S>()).to_string(),
            receiver: Arc::new(receiver),
            methods: HashMap::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn method(&self, name: &str) -> Option<&Arc<MethodType>> {
        self.methods.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &Arc<MethodType>> {
        self.methods.values()
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Service").field("name", &self.name).field("methods", &self.methods).finish()
    }
}

pub struct ServiceBuilder<S> {
    name: String,
    receiver: Arc<S>,
    methods: HashMap<String, Arc<MethodType>>,
}

impl<S: Send + Sync + 'static> ServiceBuilder<S> {
    /// Use `name` instead of the receiver's type name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Expose `f` as method `name`.
    ///
    /// `f` fills the reply, which starts as `R::default()`, and returns `Err` to report a failure
    /// to the caller. Names not starting with an uppercase letter, or containing `.`, are not
    /// callable and are skipped. The first method added under a name wins.
    pub fn method<A, R, E, F>(mut self, name: &str, f: F) -> Self
    where
        A: DeserializeOwned + 'static,
        R: Serialize + Default + 'static,
        E: fmt::Display,
        F: Fn(&S, A, &mut R) -> Result<(), E> + Send + Sync + 'static,
    {
        if !is_exported(name) || name.contains('.') {
            debug!("rpc server: {}.{} is not exported, skipped", self.name, name);
            return self;
        }
        if self.methods.contains_key(name) {
            warn!("rpc server: {}.{} added twice, keep the first", self.name, name);
            return self;
        }
        let receiver = self.receiver.clone();
        let handler: Handler = Box::new(move |codec: &AnyCodec, argv: &[u8]| {
            let args: A = codec.decode(argv).map_err(|e| MethodError::Args(e.to_string()))?;
            let mut reply = R::default();
            f(&*receiver, args, &mut reply).map_err(|e| MethodError::Call(e.to_string()))?;
            codec.encode(&reply).map_err(|e| MethodError::Reply(e.to_string()))
        });
        let method = MethodType {
            name: name.to_string(),
            arg_type: type_name::<A>(),
            reply_type: type_name::<R>(),
            num_calls: AtomicU64::new(0),
            handler,
        };
        debug!("rpc server: register {}.{}", self.name, name);
        self.methods.insert(name.to_string(), Arc::new(method));
        self
    }

    pub fn build(self) -> Result<Service, ConfigError> {
        if !is_exported(&self.name) {
            error!("rpc server: invalid service {}", self.name);
            return Err(ConfigError::InvalidServiceName(self.name));
        }
        Ok(Service { name: self.name, methods: self.methods })
    }
}
