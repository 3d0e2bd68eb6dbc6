use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use blob_store::BlobStorageConfig;
use log_shipper::testing::MockSearchIndex;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use tracing::subscriber;
use tracing_subscriber::{layer::SubscriberExt, Layer};

use crate::{
    config::{ServerConfig, ServiceKind},
    service::Service,
};

const BOUNDARY: &str = "dataflow-test-boundary";

/// A `Service` backed by a temporary blob store, shipping logs to an
/// in-process search index.
pub struct TestService {
    pub service: Service,
    pub search_index: MockSearchIndex,
    router: Router,
    _temp_dir: TempDir,
}

impl TestService {
    pub async fn new() -> Result<Self> {
        Self::with_config(ServiceKind::All, |_| {}).await
    }

    pub async fn with_config(
        kind: ServiceKind,
        customize: impl FnOnce(&mut ServerConfig),
    ) -> Result<Self> {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
        let _ = subscriber::set_global_default(
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_filter(env_filter)),
        );

        let temp_dir = tempfile::tempdir()?;
        let search_index = MockSearchIndex::start().await?;

        let mut cfg = ServerConfig {
            blob_storage: BlobStorageConfig::new(
                temp_dir.path().join("blob_store").to_str().unwrap(),
            ),
            log_shipper: search_index.config(),
            ..Default::default()
        };
        customize(&mut cfg);
        let service = Service::new(cfg, kind).await?;
        let router = service.router();

        Ok(Self {
            service,
            search_index,
            router,
            _temp_dir: temp_dir,
        })
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// Posts `contents` as the `file` part of a multipart upload.
    pub async fn upload(&self, filename: &str, contents: &str) -> (StatusCode, Value) {
        self.upload_part("file", Some(filename), contents).await
    }

    pub async fn upload_part(
        &self,
        field: &str,
        filename: Option<&str>,
        contents: &str,
    ) -> (StatusCode, Value) {
        let request = Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(field, filename, contents)))
            .unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
        (status, value)
    }
}

fn multipart_body(field: &str, filename: Option<&str>, contents: &str) -> String {
    let disposition = match filename {
        Some(filename) => format!("form-data; name=\"{field}\"; filename=\"{filename}\""),
        None => format!("form-data; name=\"{field}\""),
    };
    format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: {disposition}\r\n\
         Content-Type: text/csv\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    )
}
