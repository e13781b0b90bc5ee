use super::{client::*, server::*, service::*};
use crate::*;
use lark_rpc::ServerConfig;
use lark_rpc::client::Call;
use lark_rpc::codec::{JSON_TYPE, MSGPACK_TYPE};
use lark_rpc::error::RpcError;
use std::collections::HashSet;
use tokio::sync::mpsc;

#[logfn]
#[rstest]
#[case(true, MSGPACK_TYPE)]
#[case(false, JSON_TYPE)]
fn test_concurrent_calls(runner: TestRunner, #[case] is_tcp: bool, #[case] codec_type: &'static str) {
    runner.block_on(async move {
        let server = create_api_server(ServerConfig::default());
        let addr = listen_api_server(&server, is_tcp).await;
        let client = init_client(&addr, codec_type).await;

        let mut tasks = Vec::new();
        for t in 0..8i64 {
            let client = client.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..50i64 {
                    let reply: i64 =
                        client.call("Foo.Sum", &Args { num1: i, num2: t * 1000 }).await.expect("sum");
                    assert_eq!(reply, i + t * 1000);
                    let _: u64 = client.call("Counter.Incr", &1u64).await.expect("incr");
                }
            }));
        }
        for task in tasks {
            task.await.expect("caller task");
        }
        let hits: u64 = client.call("Counter.Get", &()).await.expect("get");
        assert_eq!(hits, 400);
        assert_eq!(client.pending_calls(), 0);
    });
}

#[logfn]
#[rstest]
fn test_shared_done_channel(runner: TestRunner) {
    runner.block_on(async move {
        let server = create_api_server(ServerConfig::default());
        let addr = listen_api_server(&server, true).await;
        let client = init_client(&addr, MSGPACK_TYPE).await;

        let total = 20;
        let (tx, mut rx) = mpsc::channel::<Call<Args, i64>>(total);
        for i in 0..total as i64 {
            client.go_with("Foo.Sum", Args { num1: i, num2: i }, tx.clone()).await;
        }
        let mut seqs = HashSet::new();
        for _ in 0..total {
            let call = tokio::time::timeout(WAIT, rx.recv()).await.expect("wait").expect("done");
            assert!(seqs.insert(call.seq), "seq {} completed twice", call.seq);
            assert_eq!(call.service_method, "Foo.Sum");
            let args = call.args.clone();
            assert_eq!(call.result(), Ok(args.num1 * 2));
        }
        assert_eq!(client.pending_calls(), 0);
    });
}

#[logfn]
#[rstest]
fn test_out_of_order(runner: TestRunner) {
    runner.block_on(async move {
        let server = create_api_server(ServerConfig::default());
        let addr = listen_api_server(&server, true).await;
        let client = init_client(&addr, MSGPACK_TYPE).await;

        let slow = client.go::<_, u64>("Foo.Sleep", 300u64).await;
        // answered while the earlier request is still running
        let reply: i64 = client.call("Foo.Sum", &Args { num1: 1, num2: 1 }).await.expect("sum");
        assert_eq!(reply, 2);
        assert_eq!(client.pending_calls(), 1);

        let call = tokio::time::timeout(WAIT, slow.done()).await.expect("wait").expect("done");
        assert_eq!(call.args, 300);
        assert_eq!(call.result(), Ok(300));
        assert_eq!(client.pending_calls(), 0);
    });
}

#[logfn]
#[rstest]
#[case(true)]
#[case(false)]
fn test_close(runner: TestRunner, #[case] is_tcp: bool) {
    runner.block_on(async move {
        let server = create_api_server(ServerConfig::default());
        let addr = listen_api_server(&server, is_tcp).await;
        let client = init_client(&addr, MSGPACK_TYPE).await;
        assert!(client.is_available());

        let slow = client.go::<_, u64>("Foo.Sleep", 500u64).await;
        client.close().await.expect("close");
        assert!(!client.is_available());

        let call = tokio::time::timeout(WAIT, slow.done()).await.expect("wait").expect("done");
        assert_eq!(call.error, Some(RpcError::Shutdown));

        let r = client.call::<_, i64>("Foo.Sum", &Args { num1: 1, num2: 2 }).await;
        assert_eq!(r, Err(RpcError::Shutdown));
        // rejected calls never get a seq
        let rejected = client.go::<_, i64>("Foo.Sum", Args::default()).await;
        let call = rejected.done().await.expect("done");
        assert_eq!(call.seq, 0);
        assert_eq!(call.error, Some(RpcError::Shutdown));

        assert_eq!(client.close().await, Err(RpcError::Shutdown));
        assert_eq!(client.pending_calls(), 0);
    });
}

#[logfn]
#[rstest]
fn test_server_side_concurrency(runner: TestRunner) {
    runner.block_on(async move {
        let server = create_api_server(ServerConfig::default());
        let addr = listen_api_server(&server, true).await;
        let client = init_client(&addr, MSGPACK_TYPE).await;

        // three blocking handlers on one connection run side by side
        let start = std::time::Instant::now();
        let handles = vec![
            client.go::<_, u64>("Foo.Sleep", 400u64).await,
            client.go::<_, u64>("Foo.Sleep", 400u64).await,
            client.go::<_, u64>("Foo.Sleep", 400u64).await,
        ];
        for handle in handles {
            let call = tokio::time::timeout(WAIT, handle.done()).await.expect("wait").expect("done");
            assert_eq!(call.result(), Ok(400));
        }
        assert!(start.elapsed() < std::time::Duration::from_millis(1100));
    });
}
