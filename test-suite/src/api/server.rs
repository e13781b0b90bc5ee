use super::service::*;
use lark_rpc::ServerConfig;
use lark_rpc::server::Server;
use std::sync::Arc;

/// A server with Foo, Echo and Counter registered.
pub fn create_api_server(config: ServerConfig) -> Arc<Server> {
    let server = Server::new(config);
    server.register(foo_service()).expect("register Foo");
    server.register(echo_service()).expect("register Echo");
    server.register(counter_service()).expect("register Counter");
    server
}

/// Start serving on a fresh address, return the address to dial.
pub async fn listen_api_server(server: &Arc<Server>, is_tcp: bool) -> String {
    let addr = crate::bind_addr(is_tcp);
    let actual_addr = server.listen(&addr).await.expect("server listen");
    debug!("server listening on {}", actual_addr);
    actual_addr
}
