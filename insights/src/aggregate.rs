use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    date::DateRange,
    error::Result,
    table::{ColumnNames, Table},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryInsights {
    pub total_sales: f64,
    /// Amount per calendar date, `None` when the file has no date column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_by_date: Option<BTreeMap<String, f64>>,
}

/// Sums the amount column over the rows between the raw `start` and `end`
/// bounds, overall and per date.
///
/// The bounds are only parsed when the file has a date column; without one
/// every row is summed. Every amount and date cell is validated, including
/// rows the range filters out.
pub fn aggregate(
    table: &Table,
    columns: &ColumnNames,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<QueryInsights> {
    let amount_column = table.require_column(&columns.amount)?;

    let Some(date_column) = table.column(&columns.date) else {
        let mut total_sales = 0.0;
        for row in table.rows() {
            total_sales += row.amount(amount_column)?.unwrap_or_default();
        }
        return Ok(QueryInsights {
            total_sales,
            sales_by_date: None,
        });
    };

    let range = DateRange::from_params(start, end)?;
    let mut total_sales = 0.0;
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in table.rows() {
        let amount = row.amount(amount_column)?.unwrap_or_default();
        let date = row.date(date_column)?;
        if range.is_some_and(|range| !range.contains(date)) {
            continue;
        }
        total_sales += amount;
        *by_date.entry(date).or_default() += amount;
    }

    Ok(QueryInsights {
        total_sales,
        sales_by_date: Some(
            by_date
                .into_iter()
                .map(|(date, amount)| (date.format("%Y-%m-%d").to_string(), amount))
                .collect(),
        ),
    })
}
