//! An in-process stand-in for the search index, recording every document
//! posted to `/{index}/_doc`.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json,
    Router,
};
use serde_json::Value;
use tokio::{net::TcpListener, task::JoinHandle};

use crate::LogShipperConfig;

const TEST_INDEX: &str = "test-logs";

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    documents: Arc<Mutex<Vec<(String, Value)>>>,
}

pub struct MockSearchIndex {
    addr: SocketAddr,
    documents: Arc<Mutex<Vec<(String, Value)>>>,
    server: JoinHandle<()>,
}

impl Drop for MockSearchIndex {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl MockSearchIndex {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with_status(StatusCode::CREATED).await
    }

    /// Accepts every document but answers with `status`.
    pub async fn start_with_status(status: StatusCode) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let documents = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/{index}/_doc", post(index_document))
            .with_state(MockState {
                status,
                documents: documents.clone(),
            });
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            documents,
            server,
        })
    }

    pub fn config(&self) -> LogShipperConfig {
        LogShipperConfig {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            index: TEST_INDEX.to_string(),
            ..Default::default()
        }
    }

    pub fn documents(&self) -> Vec<Value> {
        self.lock().iter().map(|(_, doc)| doc.clone()).collect()
    }

    /// Index names documents were posted to, in arrival order.
    pub fn indices(&self) -> Vec<String> {
        self.lock().iter().map(|(index, _)| index.clone()).collect()
    }

    /// Polls until at least `count` documents arrived or `timeout` elapsed.
    pub async fn wait_for_documents(&self, count: usize, timeout: Duration) -> Vec<Value> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let documents = self.documents();
            if documents.len() >= count || tokio::time::Instant::now() >= deadline {
                return documents;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Value)>> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn index_document(
    State(state): State<MockState>,
    Path(index): Path<String>,
    Json(document): Json<Value>,
) -> StatusCode {
    state
        .documents
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .push((index, document));
    state.status
}

/// Config pointing at a local port nothing listens on.
pub async fn unreachable_config() -> LogShipperConfig {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind probe listener");
    let port = listener
        .local_addr()
        .expect("probe listener has no address")
        .port();
    drop(listener);
    LogShipperConfig {
        host: "127.0.0.1".to_string(),
        port,
        timeout_ms: 500,
        ..Default::default()
    }
}

/// A listener that accepts connections at the socket level but never answers,
/// so requests hang until the client times out. Keep the listener alive for
/// as long as the config is used.
pub async fn stalled_index() -> (TcpListener, LogShipperConfig) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind stalled listener");
    let port = listener
        .local_addr()
        .expect("stalled listener has no address")
        .port();
    let config = LogShipperConfig {
        host: "127.0.0.1".to_string(),
        port,
        ..Default::default()
    };
    (listener, config)
}
