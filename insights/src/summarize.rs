use std::collections::HashMap;

use serde::Serialize;

use crate::{
    error::{InsightsError, Result},
    table::{ColumnNames, Table},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadInsights {
    pub total_sales: f64,
    pub top_product: String,
}

/// Total sales of the whole file and the product with the highest summed
/// amount. Among equal sums the product that appears first in the file wins.
pub fn summarize(table: &Table, columns: &ColumnNames) -> Result<UploadInsights> {
    let amount_column = table.require_column(&columns.amount)?;
    let product_column = table.require_column(&columns.product)?;
    if table.is_empty() {
        return Err(InsightsError::EmptyTable);
    }

    let mut total_sales = 0.0;
    // first-appearance order, so ties resolve deterministically
    let mut products: Vec<(&str, f64)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for row in table.rows() {
        let amount = row.amount(amount_column)?.unwrap_or_default();
        total_sales += amount;

        let product = row.text(product_column);
        if product.trim().is_empty() {
            continue;
        }
        let position = *positions.entry(product).or_insert_with(|| {
            products.push((product, 0.0));
            products.len() - 1
        });
        products[position].1 += amount;
    }

    let top_product = products
        .iter()
        .fold(None, |best: Option<&(&str, f64)>, candidate| match best {
            Some(best) if best.1 >= candidate.1 => Some(best),
            _ => Some(candidate),
        })
        .map(|(product, _)| product.to_string())
        .ok_or(InsightsError::NoProducts)?;

    Ok(UploadInsights {
        total_sales,
        top_product,
    })
}
