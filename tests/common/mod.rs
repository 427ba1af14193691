//! Shared utilities for integration tests.

#![allow(dead_code)]

use anyon_proxy::assets::{AssetName, AssetStore};
use anyon_proxy::config::ProxyConfig;
use anyon_proxy::http::HttpServer;
use anyon_proxy::lifecycle::Shutdown;
use axum::body::Bytes;
use axum::Router;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start an axum app as the upstream dev server.
pub async fn start_upstream(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start an upstream that answers every connection with `response` verbatim.
pub async fn start_raw_upstream(response: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let _ = socket.write_all(response).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// A port nothing is listening on.
pub async fn dead_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Asset body used for `name` in tests: `/*<file name>*/`.
pub fn marker(name: AssetName) -> String {
    format!("/*{}*/", name.file_name())
}

/// Store with every asset loaded except `missing`.
pub fn assets_without(missing: &[AssetName]) -> AssetStore {
    AssetStore::from_contents(
        AssetName::ALL
            .into_iter()
            .filter(|n| !missing.contains(n))
            .map(|n| (n, Bytes::from(marker(n)))),
    )
}

pub fn all_assets() -> AssetStore {
    assets_without(&[])
}

/// A running proxy on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_proxy(upstream: Option<SocketAddr>, assets: AssetStore) -> TestProxy {
    let mut config = ProxyConfig::default();
    config.upstream.origin = upstream.map(|addr| format!("http://{}", addr));
    start_proxy_with(config, assets).await
}

pub async fn start_proxy_with(config: ProxyConfig, assets: AssetStore) -> TestProxy {
    let server = HttpServer::new(config, assets).expect("valid config");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Send raw bytes to `addr` and read until the server closes.
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut socket = tokio::net::TcpStream::connect(addr).await.unwrap();
    socket.write_all(request.as_bytes()).await.unwrap();
    let mut out = Vec::new();
    let _ = socket.read_to_end(&mut out).await;
    String::from_utf8_lossy(&out).into_owned()
}
