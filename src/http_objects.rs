use std::collections::BTreeMap;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blob_store::BlobError;
use insights::{InsightsError, QueryInsights, UploadInsights};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

use crate::config::ErrorResponses;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A column the computation needs is absent from the file.
    MissingColumn,
    /// The file contents can't be parsed or aggregated.
    Parse,
    BadRequest,
    /// The upload exceeds `max_upload_bytes`.
    PayloadTooLarge,
    NotFound,
    Storage,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::MissingColumn | ErrorKind::Parse => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Storage => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    status_code: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code: kind.status_code(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Applies the configured reporting policy to the response status.
    pub fn with_policy(mut self, policy: ErrorResponses) -> Self {
        if policy == ErrorResponses::Embedded {
            self.status_code = StatusCode::OK;
        }
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(kind = ?self.kind(), status = %self.status_code, "API Error: {}", self.message);
        (
            self.status_code,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<InsightsError> for ApiError {
    fn from(err: InsightsError) -> Self {
        let kind = if err.is_bad_request() {
            ErrorKind::BadRequest
        } else if err.is_missing_column() {
            ErrorKind::MissingColumn
        } else {
            ErrorKind::Parse
        };
        Self::new(kind, err.to_string())
    }
}

impl From<BlobError> for ApiError {
    fn from(err: BlobError) -> Self {
        let kind = match &err {
            BlobError::NotFound { .. } => ErrorKind::NotFound,
            BlobError::InvalidKey { .. } => ErrorKind::BadRequest,
            _ => ErrorKind::Storage,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let kind = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ErrorKind::PayloadTooLarge
        } else {
            ErrorKind::BadRequest
        };
        Self::new(kind, err.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(err: MultipartRejection) -> Self {
        Self::bad_request(err.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(err: PathRejection) -> Self {
        Self::bad_request(err.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        Self::bad_request(err.body_text())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QueryParams {
    /// First date to include, `YYYY-MM-DD`. Ignored unless `end_date` is set.
    pub start_date: Option<String>,
    /// Last date to include, `YYYY-MM-DD`. Ignored unless `start_date` is set.
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryResponse {
    pub filename: String,
    pub total_sales: f64,
    /// Sales per `YYYY-MM-DD` date; absent when the file has no date column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_by_date: Option<BTreeMap<String, f64>>,
}

impl QueryResponse {
    pub fn new(filename: &str, insights: QueryInsights) -> Self {
        Self {
            filename: filename.to_string(),
            total_sales: insights.total_sales,
            sales_by_date: insights.sales_by_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Insights {
    pub total_sales: f64,
    pub top_product: String,
}

impl From<UploadInsights> for Insights {
    fn from(insights: UploadInsights) -> Self {
        Self {
            total_sales: insights.total_sales,
            top_product: insights.top_product,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub filename: String,
    pub insights: Insights,
    /// URL of the stored file.
    pub location: String,
}
