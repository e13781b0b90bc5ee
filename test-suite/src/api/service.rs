use lark_rpc::server::Service;
use nix::errno::Errno;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub num1: i64,
    pub num2: i64,
}

#[derive(Clone, Debug)]
pub struct Foo;

impl Foo {
    pub fn sum(&self, args: Args, reply: &mut i64) -> Result<(), String> {
        *reply = args.num1 + args.num2;
        Ok(())
    }

    pub fn div(&self, args: Args, reply: &mut i64) -> Result<(), String> {
        if args.num2 == 0 {
            return Err("divide by zero".to_string());
        }
        *reply = args.num1 / args.num2;
        Ok(())
    }

    /// Blocks its handler for `ms` milliseconds, then replies `ms`.
    pub fn sleep(&self, ms: u64, reply: &mut u64) -> Result<(), String> {
        std::thread::sleep(Duration::from_millis(ms));
        *reply = ms;
        Ok(())
    }

    // not exported
    pub fn sum_private(&self, args: Args, reply: &mut i64) -> Result<(), String> {
        self.sum(args, reply)
    }
}

pub fn foo_service() -> Service {
    Service::builder(Foo)
        .method("Sum", Foo::sum)
        .method("Div", Foo::div)
        .method("Sleep", Foo::sleep)
        .method("sum", Foo::sum_private)
        .build()
        .expect("build Foo")
}

#[derive(Debug)]
pub struct Echo;

impl Echo {
    pub fn repeat(&self, msg: String, reply: &mut String) -> Result<(), String> {
        *reply = msg;
        Ok(())
    }

    pub fn io_error(&self, _msg: String, _reply: &mut ()) -> Result<(), Errno> {
        Err(Errno::EIO)
    }

    pub fn list(&self, n: usize, reply: &mut Vec<String>) -> Result<(), String> {
        reply.extend((0..n).map(|i| format!("item {}", i)));
        Ok(())
    }

    pub fn panic(&self, _msg: String, _reply: &mut ()) -> Result<(), String> {
        panic!("echo panic");
    }
}

pub fn echo_service() -> Service {
    Service::builder(Echo)
        .method("Repeat", Echo::repeat)
        .method("IoError", Echo::io_error)
        .method("List", Echo::list)
        .method("Panic", Echo::panic)
        .build()
        .expect("build Echo")
}

/// Shared state behind the receiver, every call sees the same counter.
#[derive(Debug, Default)]
pub struct Counter {
    hits: AtomicU64,
}

impl Counter {
    pub fn incr(&self, by: u64, reply: &mut u64) -> Result<(), String> {
        *reply = self.hits.fetch_add(by, Ordering::SeqCst) + by;
        Ok(())
    }

    pub fn get(&self, _args: (), reply: &mut u64) -> Result<(), String> {
        *reply = self.hits.load(Ordering::SeqCst);
        Ok(())
    }
}

pub fn counter_service() -> Service {
    Service::builder(Counter::default())
        .method("Incr", Counter::incr)
        .method("Get", Counter::get)
        .build()
        .expect("build Counter")
}
