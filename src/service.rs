use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use axum_server::Handle;
use blob_store::BlobStorage;
use log_shipper::LogShipper;
use tokio::signal;
use tracing::{error, info};

use crate::{
    config::{ServerConfig, ServiceKind},
    routes::{create_routes, RouteState},
};

#[derive(Clone)]
pub struct Service {
    pub config: ServerConfig,
    pub kind: ServiceKind,
    pub blob_storage: Arc<BlobStorage>,
    pub log_shipper: Arc<LogShipper>,
}

impl Service {
    pub async fn new(config: ServerConfig, kind: ServiceKind) -> Result<Self> {
        let blob_storage = Arc::new(
            BlobStorage::new(config.blob_storage.clone())
                .context("error initializing BlobStorage")?,
        );
        let log_shipper = Arc::new(
            LogShipper::new(&config.log_shipper, &config.service_name(kind))
                .context("error initializing LogShipper")?,
        );

        Ok(Self {
            config,
            kind,
            blob_storage,
            log_shipper,
        })
    }

    pub fn route_state(&self) -> RouteState {
        RouteState {
            blob_storage: self.blob_storage.clone(),
            log_shipper: self.log_shipper.clone(),
            columns: Arc::new(self.config.columns.clone()),
            error_responses: self.config.api.error_responses,
        }
    }

    pub fn router(&self) -> Router {
        create_routes(self.route_state(), self.kind, self.config.max_upload_bytes)
    }

    pub async fn start(&self) -> Result<()> {
        let handle = Handle::new();
        let handle_sh = handle.clone();
        tokio::spawn(async move {
            shutdown_signal(handle_sh).await;
            info!("graceful shutdown signal received, shutting down server gracefully");
        });

        let addr: SocketAddr = self.config.listen_addr.parse()?;
        info!(service = %self.kind, "server api listening on {}", self.config.listen_addr);
        axum_server::bind(addr)
            .handle(handle)
            .serve(self.router().into_make_service())
            .await?;

        self.log_shipper.shutdown().await;
        let stats = self.log_shipper.stats();
        info!(
            shipped = stats.shipped,
            failed = stats.failed,
            dropped = stats.dropped,
            "log shipper stopped"
        );
        Ok(())
    }
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {:?}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {:?}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
        },
        _ = terminate => {
        },
    }
    handle.graceful_shutdown(None);
    info!("signal received, shutting down server gracefully");
}
