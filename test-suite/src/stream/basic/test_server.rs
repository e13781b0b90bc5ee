use crate::api::server::create_api_server;
use crate::api::service::Args;
use crate::stream::client::*;
use crate::*;
use lark_rpc::ServerConfig;
use lark_rpc::codec::{JSON_TYPE, MSGPACK_TYPE};
use lark_rpc::proto::HandshakeOption;
use std::collections::HashMap;

#[logfn]
#[rstest]
#[case(MSGPACK_TYPE)]
#[case(JSON_TYPE)]
fn test_resolution_failure_in_pipeline(runner: TestRunner, #[case] codec_type: &'static str) {
    runner.block_on(async move {
        let server = create_api_server(ServerConfig::default());
        let mut client = RawClient::connect(&server, HandshakeOption::new(codec_type)).await;
        client.request("Foo.Sum", 1, &Args { num1: 1, num2: 2 }).await;
        client.request("FooSum", 2, &Args { num1: 3, num2: 4 }).await;
        client.request("Foo.Sum", 3, &Args { num1: 5, num2: 6 }).await;
        client.writer.close().await.expect("close");

        let mut replies = HashMap::new();
        for _ in 0..3 {
            let header = client.try_read_header().await.expect("header");
            if header.is_error() {
                let _: () = client.reader.read_body().await.expect("placeholder body");
                replies.insert(header.seq, Err(header.error));
            } else {
                let sum: i64 = client.reader.read_body().await.expect("body");
                replies.insert(header.seq, Ok(sum));
            }
        }
        assert_eq!(replies[&1], Ok(3));
        assert_eq!(replies[&3], Ok(11));
        let err = replies[&2].clone().unwrap_err();
        assert!(err.contains("ill-formed"), "{}", err);

        // everything answered before the server closes its side
        let e = client.try_read_header().await.unwrap_err();
        assert!(e.is_eof(), "{}", e);
    });
}

#[logfn]
#[rstest]
fn test_bad_magic(runner: TestRunner) {
    runner.block_on(async move {
        let server = create_api_server(ServerConfig::default());
        let option = HandshakeOption { magic_number: 0x3bef5c, codec_type: MSGPACK_TYPE.to_string() };
        let mut client = RawClient::connect(&server, option).await;
        // dropped without an answer
        let e = client.try_read_header().await.unwrap_err();
        assert!(e.is_eof(), "{}", e);
    });
}

#[logfn]
#[rstest]
fn test_unknown_codec_rejected(runner: TestRunner) {
    runner.block_on(async move {
        let server = create_api_server(ServerConfig::default());
        let mut client = RawClient::connect(&server, HandshakeOption::new("application/x-unknown")).await;
        let e = client.try_read_header().await.unwrap_err();
        assert!(e.is_eof(), "{}", e);
    });
}

#[logfn]
#[rstest]
fn test_oversized_frame(runner: TestRunner) {
    runner.block_on(async move {
        let config = ServerConfig { max_frame_size: 64, ..Default::default() };
        let server = create_api_server(config);
        let mut client = RawClient::connect(&server, HandshakeOption::default()).await;
        client.request("Echo.Repeat", 1, &"x".repeat(10)).await;
        let (header, reply): (_, String) = client.read_response().await;
        assert_eq!(header.seq, 1);
        assert_eq!(reply, "x".repeat(10));

        // a body over the limit breaks the connection
        client.request("Echo.Repeat", 2, &"x".repeat(200)).await;
        let e = client.try_read_header().await.unwrap_err();
        assert!(e.is_eof(), "{}", e);
    });
}
