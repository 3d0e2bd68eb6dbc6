use std::{path::PathBuf, process::ExitCode};

use ::tracing::{error, info_span};
use clap::Parser;
use config::{ServerConfig, ServiceKind};
use service::Service;

mod config;
mod http_objects;
mod routes;
mod service;
#[cfg(test)]
mod testing;
mod tracing;
use tracing::setup_tracing;

#[derive(Parser)]
#[command(version, about = "Sales data upload and query server", long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "config file", help = "Path to config file")]
    config: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_enum,
        default_value_t = ServiceKind::All,
        help = "Which API to serve"
    )]
    service: ServiceKind,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match ServerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading config: {:?}", err);
            return ExitCode::FAILURE;
        }
    };

    setup_tracing(&config);

    let root_span = info_span!(
        "dataflow",
        service = %cli.service,
        logger = %config.service_name(cli.service)
    );
    let _guard = root_span.enter();

    let service = match Service::new(config, cli.service).await {
        Ok(service) => service,
        Err(err) => {
            error!("Error creating service: {:?}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = service.start().await {
        error!("Error starting service: {:?}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
