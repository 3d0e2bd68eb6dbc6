use chrono::NaiveDate;
use csv::StringRecord;
use serde::{Deserialize, Serialize};

use crate::{
    date::parse_calendar_date,
    error::{InsightsError, Result},
};

/// Header names of the columns the aggregations read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub amount: String,
    pub date: String,
    pub product: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            amount: "Amount".to_string(),
            date: "Date".to_string(),
            product: "Product".to_string(),
        }
    }
}

/// A parsed CSV file: the header row plus every data record.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl Table {
    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::Headers)
            .from_reader(data);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(InsightsError::EmptyTable);
        }
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        Ok(Self { headers, records })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column(name)
            .ok_or_else(|| InsightsError::MissingColumn {
                column: name.to_string(),
            })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records.iter().enumerate().map(|(i, record)| Row {
            record,
            // header occupies line 1
            line: record
                .position()
                .map(|p| p.line())
                .unwrap_or(i as u64 + 2),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    record: &'a StringRecord,
    line: u64,
}

impl<'a> Row<'a> {
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn text(&self, column: usize) -> &'a str {
        self.record.get(column).unwrap_or_default()
    }

    /// Numeric value of an amount cell. Empty and `NaN` cells are missing
    /// values and yield `None`.
    pub fn amount(&self, column: usize) -> Result<Option<f64>> {
        let raw = self.text(column).trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let value: f64 = raw.parse().map_err(|_| InsightsError::InvalidAmount {
            line: self.line,
            value: raw.to_string(),
        })?;
        Ok((!value.is_nan()).then_some(value))
    }

    pub fn date(&self, column: usize) -> Result<NaiveDate> {
        let raw = self.text(column);
        parse_calendar_date(raw).ok_or_else(|| InsightsError::InvalidDateValue {
            line: self.line,
            value: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_header_and_rows() {
        let table = Table::from_csv(b"Product, Amount ,Date\nWidgetA,100,2024-01-01\n").unwrap();

        assert_eq!(table.headers(), ["Product", "Amount", "Date"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.column("Amount"), Some(1));
        assert_eq!(table.column("Region"), None);

        let row = table.rows().next().unwrap();
        assert_eq!(row.line(), 2);
        assert_eq!(row.text(0), "WidgetA");
        assert_eq!(row.amount(1).unwrap(), Some(100.0));
        assert_eq!(
            row.date(2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_empty_input_is_empty_table() {
        assert!(matches!(
            Table::from_csv(b"").unwrap_err(),
            InsightsError::EmptyTable
        ));
    }

    #[test]
    fn test_header_only_has_no_rows() {
        let table = Table::from_csv(b"Product,Amount\n").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let err = Table::from_csv(b"Product,Amount\nWidgetA,100,extra\n").unwrap_err();
        assert!(matches!(err, InsightsError::Csv { .. }));
    }

    #[test]
    fn test_missing_and_invalid_amounts() {
        let table = Table::from_csv(b"Amount\n\"\"\nNaN\n12.5\nabc\n").unwrap();
        let amounts: Vec<_> = table.rows().map(|r| r.amount(0)).collect();

        assert_eq!(amounts[0].as_ref().unwrap(), &None);
        assert_eq!(amounts[1].as_ref().unwrap(), &None);
        assert_eq!(amounts[2].as_ref().unwrap(), &Some(12.5));
        match amounts[3].as_ref().unwrap_err() {
            InsightsError::InvalidAmount { line, value } => {
                assert_eq!(*line, 5);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_require_column_names_the_column() {
        let table = Table::from_csv(b"Product\nWidgetA\n").unwrap();
        let err = table.require_column("Amount").unwrap_err();
        assert_eq!(err.to_string(), "missing required column 'Amount'");
    }
}
