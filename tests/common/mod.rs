//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use heimdall::{Config, EndpointConfig, Gateway, GatewayConfig, MiddlewareRegistry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Read a request head (request line + headers) off the socket.
async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).trim_end().to_string()
}

async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a backend that answers every request after `delay` with a body made
/// of the request head it received: the request line, then one
/// `name: value` line per header.
pub async fn start_echo_backend(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                tokio::time::sleep(delay).await;
                respond(&mut socket, "200 OK", &head).await;
            });
        }
    });

    addr
}

/// Start a backend that writes `response` verbatim to every connection.
pub async fn start_raw_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_head(&mut socket).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a backend that reads requests and never answers.
pub async fn start_stalling_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_head(&mut socket).await;
                tokio::time::sleep(Duration::from_secs(3600)).await;
                drop(socket);
            });
        }
    });

    addr
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn endpoint(path: &str, method: &str, target: String) -> EndpointConfig {
    EndpointConfig {
        path: path.into(),
        target,
        method: method.into(),
        ..Default::default()
    }
}

pub fn config(endpoints: Vec<EndpointConfig>, shutdown_timeout_secs: u64) -> Config {
    Config {
        gateway: GatewayConfig {
            port: 0,
            read_timeout_secs: 5,
            write_timeout_secs: 10,
            shutdown_timeout_secs,
            middlewares: Vec::new(),
        },
        endpoints,
    }
}

pub fn gateway(config: Config, registry: Arc<MiddlewareRegistry>) -> Arc<Gateway> {
    Arc::new(Gateway::with_registry(config, registry).unwrap())
}

/// A gateway serving on an ephemeral port.
pub struct RunningGateway {
    pub addr: SocketAddr,
    pub gateway: Arc<Gateway>,
    pub lifecycle: CancellationToken,
    pub handle: JoinHandle<Result<(), heimdall::http::ServerError>>,
}

impl RunningGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn spawn_gateway(gateway: Arc<Gateway>) -> RunningGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let lifecycle = CancellationToken::new();

    let handle = {
        let gateway = gateway.clone();
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move { gateway.serve(listener, lifecycle).await })
    };

    RunningGateway {
        addr,
        gateway,
        lifecycle,
        handle,
    }
}
