//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use hash_service::config::ServiceConfig;
use hash_service::{HashServer, Shutdown, SubmissionStore};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const PASSWORD_DIGEST: &str = "YjEwOWYzYmJiYzI0NGViODI0NDE5MTdlZDA2ZDYxOGI5MDA4ZGQwOWIzYmVmZDFiNWUwNzM5NGM3MDZhOGJiOTgwYjFkNzc4NWU1OTc2ZWMwNDliNDZkZjVmMTMyNmFmNWEyZWE2ZDEwM2ZkMDdjOTUzODVmZmFiMGNhY2JjODY=";

/// A server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub store: SubmissionStore,
    pub task: JoinHandle<Result<(), hash_service::http::ServerError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a hash server whose digests are computed after `delay`.
pub async fn start_server(delay: Duration) -> TestServer {
    let mut config = ServiceConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.hashing.delay_ms = delay.as_millis() as u64;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HashServer::new(&config).unwrap();
    let shutdown = server.shutdown_handle();
    let store = server.store().clone();
    let task = tokio::spawn(server.run(listener));

    TestServer {
        addr,
        shutdown,
        store,
        task,
    }
}

/// A client that never reuses connections, so shutdown is not held up by idle sockets.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[allow(dead_code)]
pub async fn post_password(client: &reqwest::Client, server: &TestServer, password: &str) -> reqwest::Response {
    client
        .post(server.url("/hash"))
        .form(&[("password", password)])
        .send()
        .await
        .expect("server unreachable")
}
