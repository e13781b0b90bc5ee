pub mod api;
pub mod stream;

extern crate captains_log;
#[macro_use]
extern crate log;
pub use captains_log::logfn;
use captains_log::*;
use rstest::*;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Runtime;

/// Upper bound for anything a test waits on, so a lost completion fails instead of hanging.
pub const WAIT: Duration = Duration::from_secs(10);

pub fn new_rt() -> Runtime {
    // several workers, some test methods block on purpose
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("runtime")
}

/// Unique unix socket path per call, tests run in parallel.
pub fn unix_addr() -> String {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    format!(
        "/tmp/lark-rpc-test-{}-{}.sock",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

pub fn bind_addr(is_tcp: bool) -> String {
    if is_tcp { "127.0.0.1:0".to_string() } else { unix_addr() }
}

#[fixture]
pub fn runner() -> TestRunner {
    TestRunner::new()
}

impl fmt::Debug for TestRunner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "")
    }
}

pub struct TestRunner {
    pub rt: Runtime,
}

impl TestRunner {
    pub fn new() -> Self {
        recipe::raw_file_logger("/tmp/lark_rpc_test.log", Level::Trace).test().build().expect("log");
        Self { rt: new_rt() }
    }

    pub fn block_on<F: Future<Output = ()> + Send + 'static>(&self, f: F) {
        self.rt.block_on(async move {
            if tokio::time::timeout(Duration::from_secs(60), f).await.is_err() {
                panic!("test timed out");
            }
        });
    }
}
