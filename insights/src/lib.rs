//! Sales aggregations over CSV files.
//!
//! A file is parsed once into a [`Table`] and then either aggregated for a
//! query ([`aggregate`]: total plus per-date sums, optionally restricted to a
//! [`DateRange`]) or summarized after an upload ([`summarize`]: total plus
//! the top grossing product).

mod aggregate;
mod date;
mod error;
mod summarize;
mod table;

pub use aggregate::{aggregate, QueryInsights};
pub use date::{parse_calendar_date, DateRange};
pub use error::{InsightsError, Result};
pub use summarize::{summarize, UploadInsights};
pub use table::{ColumnNames, Row, Table};

