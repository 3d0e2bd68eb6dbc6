use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use chrono::Utc;
use serde_json::Value;
use tokio::{
    sync::mpsc::{self, error::TrySendError, Receiver, Sender},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::LogShipperConfig,
    error::ShipError,
    record::{Level, LogDocument, LogRecord},
};

#[derive(Debug, Default)]
struct Counters {
    shipped: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Delivery counters since the shipper was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShipperStats {
    pub shipped: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// Forwards log records to a search index.
///
/// Delivery is best effort and at most once: records are queued without
/// blocking the caller, posted by a single background task, and lost when the
/// queue is full or the index can't be reached. Nothing is ever reported back
/// to the code that logged the record.
pub struct LogShipper {
    logger: String,
    tx: Option<Sender<LogRecord>>,
    counters: Arc<Counters>,
    cancellation_token: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for LogShipper {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

impl LogShipper {
    /// Starts the delivery task; must be called inside a tokio runtime.
    pub fn new(config: &LogShipperConfig, logger: &str) -> Result<Self, ShipError> {
        if !config.enabled {
            return Ok(Self::disabled(logger));
        }

        let exporter = SearchIndexExporter::new(config)?;
        let counters = Arc::new(Counters::default());
        let cancellation_token = CancellationToken::new();
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let worker = tokio::spawn(Self::run_collector(
            cancellation_token.clone(),
            rx,
            exporter,
            logger.to_string(),
            counters.clone(),
            config.drain_timeout(),
        ));
        info!(endpoint = %config.endpoint(), logger, "shipping logs to search index");

        Ok(Self {
            logger: logger.to_string(),
            tx: Some(tx),
            counters,
            cancellation_token,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// A shipper that only writes records to the local log.
    pub fn disabled(logger: &str) -> Self {
        Self {
            logger: logger.to_string(),
            tx: None,
            counters: Arc::new(Counters::default()),
            cancellation_token: CancellationToken::new(),
            worker: Mutex::new(None),
        }
    }

    pub fn log(&self, record: LogRecord) {
        self.trace_locally(&record);

        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(event = %record.event, "log shipping queue is full, dropping record");
            }
            Err(TrySendError::Closed(record)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(event = %record.event, "log shipper stopped, dropping record");
            }
        }
    }

    pub fn stats(&self) -> ShipperStats {
        ShipperStats {
            shipped: self.counters.shipped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stops accepting new records, delivers the ones already queued until
    /// the drain timeout and waits for the delivery task to exit.
    pub async fn shutdown(&self) {
        self.cancellation_token.cancel();
        let worker = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(worker) = worker {
            if let Err(err) = worker.await {
                error!(?err, "log shipper task failed");
            }
        }
    }

    fn trace_locally(&self, record: &LogRecord) {
        let fields = Value::Object(record.fields.clone());
        let logger = self.logger.as_str();
        let event = record.event.as_str();
        match record.level {
            Level::Debug => debug!(logger, event, %fields, "{event}"),
            Level::Info => info!(logger, event, %fields, "{event}"),
            Level::Warning => warn!(logger, event, %fields, "{event}"),
            Level::Error => error!(logger, event, %fields, "{event}"),
        }
    }

    async fn run_collector(
        cancel: CancellationToken,
        mut rx: Receiver<LogRecord>,
        exporter: SearchIndexExporter,
        logger: String,
        counters: Arc<Counters>,
        drain_timeout: Duration,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                record = rx.recv() => match record {
                    Some(record) => exporter.ship(&record, &logger, &counters).await,
                    None => break,
                }
            }
        }

        rx.close();
        let drain = async {
            while let Ok(record) = rx.try_recv() {
                exporter.ship(&record, &logger, &counters).await;
            }
        };
        if tokio::time::timeout(drain_timeout, drain).await.is_err() {
            // one record was in flight when the deadline hit
            let mut abandoned = 1;
            while rx.try_recv().is_ok() {
                abandoned += 1;
            }
            counters.dropped.fetch_add(abandoned, Ordering::Relaxed);
            warn!(abandoned, "log shipper drain timed out, dropping queued records");
        }
    }
}

struct SearchIndexExporter {
    client: reqwest::Client,
    endpoint: String,
}

impl SearchIndexExporter {
    fn new(config: &LogShipperConfig) -> Result<Self, ShipError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|source| ShipError::Client { source })?;
        Ok(Self {
            client,
            endpoint: config.endpoint(),
        })
    }

    async fn ship(&self, record: &LogRecord, logger: &str, counters: &Counters) {
        let document = record.to_document(logger, Utc::now());
        match self.send(&document).await {
            Ok(()) => {
                counters.shipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(%err, event = %record.event, "failed to send log to search index");
            }
        }
    }

    async fn send(&self, document: &LogDocument) -> Result<(), ShipError> {
        self.client
            .post(&self.endpoint)
            .json(document)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
