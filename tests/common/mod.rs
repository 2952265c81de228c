//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use submission_guard::lifecycle::Shutdown;
use submission_guard::{GuardConfig, GuardServer, Record};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A server bound to an ephemeral port.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a guard server on `127.0.0.1:0`.
pub async fn start_server(config: GuardConfig) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = GuardServer::new(config);
    let server_shutdown = shutdown.subscribe();

    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    RunningServer {
        addr,
        shutdown,
        handle,
    }
}

/// Build a record from a JSON object literal.
pub fn record(value: Value) -> Record {
    Record::try_from(value).unwrap()
}
