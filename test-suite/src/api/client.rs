use lark_rpc::ClientConfig;
use lark_rpc::client::{Client, dial};
use lark_rpc::proto::HandshakeOption;

pub async fn init_client(addr: &str, codec_type: &str) -> Client {
    dial(addr, HandshakeOption::new(codec_type), &ClientConfig::default())
        .await
        .expect("connect client")
}
