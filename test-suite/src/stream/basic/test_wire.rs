use crate::api::service::Args;
use crate::stream::{client::*, server::*};
use crate::*;
use lark_rpc::ClientConfig;
use lark_rpc::client::Client;
use lark_rpc::codec::{JSON_TYPE, MSGPACK_TYPE};
use lark_rpc::error::{ConfigError, ConnectError, RpcError};
use lark_rpc::proto::{HandshakeOption, MAGIC_NUMBER};
use tokio::io::{AsyncReadExt, duplex};

#[logfn]
#[rstest]
#[case(MSGPACK_TYPE)]
#[case(JSON_TYPE)]
fn test_handshake(runner: TestRunner, #[case] codec_type: &'static str) {
    runner.block_on(async move {
        let (client, server) = init_client(codec_type).await;
        assert_eq!(server.option.magic_number, MAGIC_NUMBER);
        assert_eq!(server.option.codec_type, codec_type);
        assert_eq!(client.option(), &server.option);
        assert!(client.is_available());
    });
}

#[logfn]
#[rstest]
fn test_unknown_codec(runner: TestRunner) {
    runner.block_on(async move {
        let (local, mut remote) = duplex(1024);
        let r =
            Client::new(local, HandshakeOption::new("application/x-unknown"), &ClientConfig::default()).await;
        match r {
            Err(ConnectError::Config(ConfigError::UnsupportedCodec(tag))) => {
                assert_eq!(tag, "application/x-unknown")
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
        // the pipe was dropped without a byte written
        let mut buf = Vec::new();
        assert_eq!(remote.read_to_end(&mut buf).await.expect("read"), 0);
    });
}

#[logfn]
#[rstest]
fn test_write_atomicity(runner: TestRunner) {
    runner.block_on(async move {
        let (client, mut server) = init_client(MSGPACK_TYPE).await;
        let callers = 16i64;
        let mut tasks = Vec::new();
        for k in 0..callers {
            let client = client.clone();
            tasks.push(tokio::spawn(async move {
                let method = format!("Task{}.Sum", k);
                let reply: i64 = client.call(&method, &Args { num1: k, num2: k }).await.expect("call");
                assert_eq!(reply, k * 2);
            }));
        }
        let mut requests = Vec::new();
        let mut last_seq = 0;
        for _ in 0..callers {
            let (header, args): (_, Args) = server.read_request().await;
            // every header is followed by its own body
            assert_eq!(header.service_method, format!("Task{}.Sum", args.num1));
            assert!(header.seq > last_seq, "seq {} after {}", header.seq, last_seq);
            assert!(header.error.is_empty());
            last_seq = header.seq;
            requests.push((header, args));
        }
        // answer newest first, each caller still gets its own reply
        for (header, args) in requests.into_iter().rev() {
            server.reply(&header.service_method, header.seq, &(args.num1 + args.num2)).await;
        }
        for task in tasks {
            task.await.expect("caller");
        }
        assert_eq!(client.pending_calls(), 0);
    });
}

#[logfn]
#[rstest]
fn test_unknown_seq(runner: TestRunner) {
    runner.block_on(async move {
        let (client, mut server) = init_client(JSON_TYPE).await;
        let handle = client.go::<_, String>("Echo.Repeat", "hello".to_string()).await;
        let (header, msg): (_, String) = server.read_request().await;
        assert_eq!(msg, "hello");

        // responses nobody waits for are read and dropped
        server.reply("Echo.Repeat", header.seq + 100, &"stray".to_string()).await;
        server.reply_error("Echo.Repeat", header.seq + 101, "stray error").await;
        server.reply("Echo.Repeat", header.seq, &msg).await;

        let call = tokio::time::timeout(WAIT, handle.done()).await.expect("wait").expect("done");
        assert_eq!(call.seq, header.seq);
        assert_eq!(call.result(), Ok("hello".to_string()));
        assert!(client.is_available());
    });
}

#[logfn]
#[rstest]
fn test_error_header(runner: TestRunner) {
    runner.block_on(async move {
        let (client, mut server) = init_client(MSGPACK_TYPE).await;
        let handle = client.go::<_, i64>("Foo.Div", Args { num1: 1, num2: 0 }).await;
        let (header, _): (_, Args) = server.read_request().await;
        server.reply_error("Foo.Div", header.seq, "divide by zero").await;
        let call = tokio::time::timeout(WAIT, handle.done()).await.expect("wait").expect("done");
        assert_eq!(call.reply, None);
        assert_eq!(call.error, Some(RpcError::Server("divide by zero".to_string())));

        // the placeholder body was consumed, the stream is still in frame
        let handle = client.go::<_, i64>("Foo.Div", Args { num1: 8, num2: 2 }).await;
        let (header, args): (_, Args) = server.read_request().await;
        server.reply("Foo.Div", header.seq, &(args.num1 / args.num2)).await;
        let call = tokio::time::timeout(WAIT, handle.done()).await.expect("wait").expect("done");
        assert_eq!(call.result(), Ok(4));
    });
}

#[logfn]
#[rstest]
fn test_reply_decode_error(runner: TestRunner) {
    runner.block_on(async move {
        let (client, mut server) = init_client(MSGPACK_TYPE).await;
        let handle = client.go::<_, i64>("Foo.Sum", Args { num1: 1, num2: 2 }).await;
        let (header, _): (_, Args) = server.read_request().await;
        server.reply("Foo.Sum", header.seq, &"three".to_string()).await;
        let call = tokio::time::timeout(WAIT, handle.done()).await.expect("wait").expect("done");
        assert!(matches!(call.error, Some(RpcError::Decode(_))), "{:?}", call.error);
        // only that call failed
        assert!(client.is_available());
    });
}
