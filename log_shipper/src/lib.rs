//! Best-effort forwarding of structured log records to a search index.
//!
//! Each [`LogRecord`] becomes one JSON document posted to
//! `{scheme}://{host}:{port}/{index}/_doc`. See [`LogShipper`] for the
//! delivery guarantees.

mod config;
mod error;
mod record;
mod shipper;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::LogShipperConfig;
pub use error::ShipError;
pub use record::{Level, LogDocument, LogRecord};
pub use shipper::{LogShipper, ShipperStats};
