use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        State,
    },
    Json,
};
use blob_store::PutResult;
use insights::{summarize, Table};
use log_shipper::LogRecord;
use tracing::info;
use utoipa::ToSchema;

use super::RouteState;
use crate::http_objects::{ApiError, ErrorResponse, UploadResponse};

const FILE_FIELD: &str = "file";

#[allow(dead_code)]
#[derive(ToSchema)]
struct UploadSalesFile {
    #[schema(format = "binary")]
    file: String,
}

/// Store a CSV file and summarize its sales
#[utoipa::path(
    post,
    path = "/upload",
    tag = "dataflow",
    request_body(content_type = "multipart/form-data", content = inline(UploadSalesFile)),
    responses(
        (status = 200, description = "Upload insights, or an error body", body = UploadResponse),
        (
            status = BAD_REQUEST,
            description = "Missing file or invalid filename",
            body = ErrorResponse
        ),
        (
            status = PAYLOAD_TOO_LARGE,
            description = "File exceeds the upload limit",
            body = ErrorResponse
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Stored file can't be summarized",
            body = ErrorResponse
        ),
    ),
)]
#[tracing::instrument(skip_all)]
pub async fn upload_sales_data(
    State(state): State<RouteState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut filename = None;
    match upload(&state, multipart, &mut filename).await {
        Ok((response, put_result)) => {
            state.log_shipper.log(
                LogRecord::info("FileUploaded")
                    .field("filename", response.filename.as_str())
                    .field("total_sales", response.insights.total_sales)
                    .field("top_product", response.insights.top_product.as_str())
                    .field("location", response.location.as_str())
                    .field("size_bytes", put_result.size_bytes)
                    .field("sha256", put_result.sha256_hash.as_str()),
            );
            Ok(Json(response))
        }
        Err(err) => {
            let mut record = LogRecord::error("UploadError");
            if let Some(filename) = filename {
                record = record.field("filename", filename);
            }
            state.log_shipper.log(record.field("error", err.message()));
            Err(err.with_policy(state.error_responses))
        }
    }
}

/// Stores the `file` field, then summarizes it. `filename` is filled in as
/// soon as it's known so failures can still be attributed.
async fn upload(
    state: &RouteState,
    multipart: Result<Multipart, MultipartRejection>,
    filename: &mut Option<String>,
) -> Result<(UploadResponse, PutResult), ApiError> {
    let mut multipart = multipart?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::bad_request("the file part must carry a filename"))?;
        *filename = Some(name.clone());
        upload = Some((name, field.bytes().await?));
        break;
    }
    let Some((name, data)) = upload else {
        return Err(ApiError::bad_request("missing multipart field 'file'"));
    };

    let put_result = state.blob_storage.put(&name, data.clone()).await?;
    info!(
        filename = %name,
        size_bytes = put_result.size_bytes,
        "stored uploaded file"
    );

    let table = Table::from_csv(&data)?;
    let insights = summarize(&table, &state.columns)?;
    let response = UploadResponse {
        filename: name,
        insights: insights.into(),
        location: put_result.url.clone(),
    };
    Ok((response, put_result))
}
