use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path,
        Query,
        State,
    },
    Json,
};
use insights::{aggregate, Table};
use log_shipper::LogRecord;

use super::RouteState;
use crate::http_objects::{ApiError, ErrorResponse, QueryParams, QueryResponse};

/// Total and per-date sales of a stored CSV file
#[utoipa::path(
    get,
    path = "/query/{filename}",
    tag = "dataflow",
    params(
        ("filename" = String, Path, description = "Name of a previously uploaded file"),
        QueryParams,
    ),
    responses(
        (status = 200, description = "Sales insights, or an error body", body = QueryResponse),
        (status = BAD_REQUEST, description = "Invalid date range", body = ErrorResponse),
        (status = NOT_FOUND, description = "No such file", body = ErrorResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "File can't be aggregated",
            body = ErrorResponse
        ),
    ),
)]
#[tracing::instrument(skip_all)]
pub async fn query_sales_data(
    State(state): State<RouteState>,
    path: Result<Path<String>, PathRejection>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let filename = path.as_ref().ok().map(|Path(filename)| filename.clone());

    match query(&state, path, params).await {
        Ok((response, params)) => {
            state.log_shipper.log(
                LogRecord::info("FileQueried")
                    .field("filename", response.filename.as_str())
                    .field("total_sales", response.total_sales)
                    .field("start_date", params.start_date)
                    .field("end_date", params.end_date),
            );
            Ok(Json(response))
        }
        Err(err) => {
            let mut record = LogRecord::error("QueryError");
            if let Some(filename) = filename {
                record = record.field("filename", filename);
            }
            state.log_shipper.log(record.field("error", err.message()));
            Err(err.with_policy(state.error_responses))
        }
    }
}

async fn query(
    state: &RouteState,
    path: Result<Path<String>, PathRejection>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Result<(QueryResponse, QueryParams), ApiError> {
    let Path(filename) = path?;
    let Query(params) = params?;
    let data = state.blob_storage.get(&filename).await?;
    let table = Table::from_csv(&data)?;
    let insights = aggregate(
        &table,
        &state.columns,
        params.start_date.as_deref(),
        params.end_date.as_deref(),
    )?;
    Ok((QueryResponse::new(&filename, insights), params))
}
