use std::{env, fmt, net::SocketAddr, path::Path};

use anyhow::{anyhow, Context, Result};
use blob_store::{AzureCredentials, BlobStorageConfig};
use clap::ValueEnum;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use insights::ColumnNames;
use log_shipper::LogShipperConfig;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "DATAFLOW_";
const DEFAULT_CONTAINER: &str = "dataflow";

/// Which HTTP API a process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceKind {
    Upload,
    Query,
    All,
}

impl ServiceKind {
    pub fn serves_upload(self) -> bool {
        matches!(self, Self::Upload | Self::All)
    }

    pub fn serves_query(self) -> bool {
        matches!(self, Self::Query | Self::All)
    }

    /// Logger name used when `service_name` isn't configured.
    pub fn default_service_name(self) -> &'static str {
        match self {
            Self::Upload => "data-upload",
            Self::Query => "data-query",
            Self::All => "dataflow",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Upload => "upload",
            Self::Query => "query",
            Self::All => "all",
        };
        f.write_str(name)
    }
}

/// How failed requests are reported. Both keep the `{"error": ...}` body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorResponses {
    /// Always answer `200 OK`; callers check for the `error` key.
    #[default]
    Embedded,
    /// Answer with a status code matching the error kind.
    StatusCodes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub error_responses: ErrorResponses,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub service_name: Option<String>,
    pub structured_logging: bool,
    pub max_upload_bytes: usize,
    pub blob_storage: BlobStorageConfig,
    pub log_shipper: LogShipperConfig,
    pub columns: ColumnNames,
    pub api: ApiConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: "0.0.0.0:8900".to_string(),
            service_name: None,
            structured_logging: false,
            max_upload_bytes: 64 * 1024 * 1024,
            blob_storage: Default::default(),
            log_shipper: Default::default(),
            columns: Default::default(),
            api: Default::default(),
        }
    }
}

impl ServerConfig {
    /// Layers, later wins: defaults, the YAML file, `DATAFLOW_*` variables
    /// (`__` separates nested keys) and the deployment's legacy variables.
    pub fn load(path: Option<&Path>) -> Result<ServerConfig> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            let config_str = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            figment = figment.merge(Yaml::string(&config_str));
        }
        let mut config: ServerConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.apply_legacy_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `STORAGE_ACCOUNT_NAME`, `STORAGE_ACCOUNT_KEY`, `CONTAINER_NAME`,
    /// `ELASTIC_HOST` and `ELASTIC_PORT`. Empty values count as unset.
    pub fn apply_legacy_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        let lookup = |key: &str| var(key).filter(|value| !value.trim().is_empty());

        if let (Some(account_name), Some(account_key)) =
            (lookup("STORAGE_ACCOUNT_NAME"), lookup("STORAGE_ACCOUNT_KEY"))
        {
            let container =
                lookup("CONTAINER_NAME").unwrap_or_else(|| DEFAULT_CONTAINER.to_string());
            self.blob_storage = BlobStorageConfig::azure(
                &container,
                AzureCredentials {
                    account_name,
                    account_key,
                },
            );
        }
        if let Some(host) = lookup("ELASTIC_HOST") {
            self.log_shipper.host = host;
        }
        if let Some(port) = lookup("ELASTIC_PORT") {
            self.log_shipper.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid ELASTIC_PORT: {port}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(anyhow!("invalid listen address: {}", self.listen_addr));
        }
        if url::Url::parse(&self.blob_storage.path).is_err() {
            return Err(anyhow!(
                "invalid blob storage url: {}",
                self.blob_storage.path
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than zero"));
        }
        let shipper = &self.log_shipper;
        if shipper.enabled {
            if shipper.host.trim().is_empty() || shipper.index.trim().is_empty() {
                return Err(anyhow!("log_shipper host and index must not be empty"));
            }
            if shipper.queue_capacity == 0 || shipper.timeout_ms == 0 {
                return Err(anyhow!(
                    "log_shipper queue_capacity and timeout_ms must be greater than zero"
                ));
            }
        }
        Ok(())
    }

    pub fn service_name(&self, kind: ServiceKind) -> String {
        self.service_name
            .clone()
            .unwrap_or_else(|| kind.default_service_name().to_string())
    }
}
