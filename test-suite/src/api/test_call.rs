use super::{client::*, server::*, service::*};
use crate::*;
use lark_rpc::ServerConfig;
use lark_rpc::codec::{JSON_TYPE, MSGPACK_TYPE};
use lark_rpc::error::RpcError;

fn server_error(e: RpcError) -> String {
    match e {
        RpcError::Server(msg) => msg,
        other => panic!("expect an error reported by the server, got {:?}", other),
    }
}

#[logfn]
#[rstest]
#[case(true, MSGPACK_TYPE)]
#[case(false, MSGPACK_TYPE)]
#[case(true, JSON_TYPE)]
#[case(false, JSON_TYPE)]
fn test_sum(runner: TestRunner, #[case] is_tcp: bool, #[case] codec_type: &'static str) {
    runner.block_on(async move {
        let server = create_api_server(ServerConfig::default());
        let addr = listen_api_server(&server, is_tcp).await;
        let client = init_client(&addr, codec_type).await;

        let reply: i64 = client.call("Foo.Sum", &Args { num1: 3, num2: 4 }).await.expect("sum");
        assert_eq!(reply, 7);

        let err = client.call::<_, i64>("Foo.NoSuch", &Args { num1: 3, num2: 4 }).await.unwrap_err();
        let msg = server_error(err);
        assert!(msg.contains("can't find method NoSuch"), "{}", msg);

        // the connection survives a failed resolution
        let reply: i64 = client.call("Foo.Sum", &Args { num1: -1, num2: 1 }).await.expect("sum");
        assert_eq!(reply, 0);
        assert!(client.is_available());
        client.close().await.expect("close");
    });
}

#[logfn]
#[rstest]
fn test_resolution_errors(runner: TestRunner) {
    runner.block_on(async move {
        let server = create_api_server(ServerConfig::default());
        let addr = listen_api_server(&server, true).await;
        let client = init_client(&addr, MSGPACK_TYPE).await;
        let args = Args { num1: 1, num2: 2 };

        let msg = server_error(client.call::<_, i64>("NoSuchService.Method", &args).await.unwrap_err());
        assert_eq!(msg, "rpc server: can't find service NoSuchService");

        let msg = server_error(client.call::<_, i64>("FooSum", &args).await.unwrap_err());
        assert!(msg.contains("ill-formed"), "{}", msg);

        // registered under a lowercase name, so never exposed
        let msg = server_error(client.call::<_, i64>("Foo.sum", &args).await.unwrap_err());
        assert!(msg.contains("can't find method sum"), "{}", msg);

        assert_eq!(client.call::<_, i64>("Foo.Sum", &args).await, Ok(3));
        assert_eq!(client.pending_calls(), 0);
    });
}

#[logfn]
#[rstest]
fn test_method_errors(runner: TestRunner) {
    runner.block_on(async move {
        let server = create_api_server(ServerConfig::default());
        let addr = listen_api_server(&server, true).await;
        let client = init_client(&addr, MSGPACK_TYPE).await;

        let r = client.call::<_, i64>("Foo.Div", &Args { num1: 1, num2: 0 }).await;
        assert_eq!(r, Err(RpcError::Server("divide by zero".to_string())));
        assert_eq!(client.call::<_, i64>("Foo.Div", &Args { num1: 9, num2: 3 }).await, Ok(3));

        let r = client.call::<_, ()>("Echo.IoError", "read").await;
        let msg = server_error(r.unwrap_err());
        assert!(msg.contains("EIO"), "{}", msg);

        let r = client.call::<_, ()>("Echo.Panic", "boom").await;
        assert_eq!(r, Err(RpcError::Server("rpc server: method panicked".to_string())));

        let reply: String = client.call("Echo.Repeat", "still serving").await.expect("repeat");
        assert_eq!(reply, "still serving");
    });
}

#[logfn]
#[rstest]
fn test_shape_mismatch(runner: TestRunner) {
    runner.block_on(async move {
        let server = create_api_server(ServerConfig::default());
        let addr = listen_api_server(&server, true).await;
        let client = init_client(&addr, MSGPACK_TYPE).await;

        // the server decodes into the argument type Sum declared
        let msg = server_error(client.call::<_, i64>("Foo.Sum", "lark req 1").await.unwrap_err());
        assert!(msg.starts_with("rpc server: read argv err"), "{}", msg);

        // the reply does not fit the type the caller asked for
        let r = client.call::<_, i64>("Echo.Repeat", "not a number").await;
        assert!(matches!(r, Err(RpcError::Decode(_))), "{:?}", r);

        assert!(client.is_available());
        let reply: Vec<String> = client.call("Echo.List", &3usize).await.expect("list");
        assert_eq!(reply, vec!["item 0", "item 1", "item 2"]);
    });
}

#[logfn]
#[rstest]
fn test_num_calls(runner: TestRunner) {
    runner.block_on(async move {
        let server = create_api_server(ServerConfig::default());
        let addr = listen_api_server(&server, false).await;
        let client = init_client(&addr, JSON_TYPE).await;
        for i in 0..3 {
            let reply: i64 = client.call("Foo.Sum", &Args { num1: i, num2: i }).await.expect("sum");
            assert_eq!(reply, i * 2);
        }
        let _ = client.call::<_, i64>("Foo.Div", &Args { num1: 1, num2: 0 }).await;
        let (_, sum) = server.find_service("Foo.Sum").expect("resolve");
        assert_eq!(sum.num_calls(), 3);
        let (_, div) = server.find_service("Foo.Div").expect("resolve");
        assert_eq!(div.num_calls(), 1);
        let (_, sleep) = server.find_service("Foo.Sleep").expect("resolve");
        assert_eq!(sleep.num_calls(), 0);
    });
}

#[logfn]
#[rstest]
fn test_default_server(runner: TestRunner) {
    runner.block_on(async move {
        lark_rpc::server::register(foo_service()).expect("register");
        // the default server keeps the first Foo
        assert!(lark_rpc::server::register(foo_service()).is_err());
        let listener = lark_rpc_tcp::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(lark_rpc::server::accept(listener));

        let client = lark_rpc::client::dial_default(&addr).await.expect("dial");
        let reply: i64 = client.call("Foo.Sum", &Args { num1: 20, num2: 22 }).await.expect("sum");
        assert_eq!(reply, 42);
        assert_eq!(lark_rpc::server::default_server().services(), vec!["Foo".to_string()]);
    });
}

#[logfn]
#[rstest]
fn test_dial_errors(runner: TestRunner) {
    runner.block_on(async move {
        use lark_rpc::ClientConfig;
        use lark_rpc::client::dial;
        use lark_rpc::error::{ConfigError, ConnectError};
        use lark_rpc::proto::HandshakeOption;

        let r = dial("127.0.0.1:1", HandshakeOption::new("application/x-unknown"), &ClientConfig::default())
            .await;
        // rejected before trying to connect
        assert!(matches!(r, Err(ConnectError::Config(ConfigError::UnsupportedCodec(_)))));

        let r = dial(&unix_addr(), HandshakeOption::default(), &ClientConfig::default()).await;
        assert!(matches!(r, Err(ConnectError::Io(_))));
    });
}
