use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Json,
    Router,
};
use blob_store::BlobStorage;
use insights::ColumnNames;
use log_shipper::LogShipper;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    config::{ErrorResponses, ServiceKind},
    http_objects::{ErrorResponse, Insights, QueryResponse, UploadResponse},
};

mod query;
mod upload;

use query::query_sales_data;
use upload::upload_sales_data;

#[derive(OpenApi)]
#[openapi(
        paths(
            query::query_sales_data,
            upload::upload_sales_data,
        ),
        components(
            schemas(
                ErrorResponse,
                QueryResponse,
                UploadResponse,
                Insights,
            )
        ),
        tags(
            (name = "dataflow", description = "Sales data upload and query API")
        )
    )]
struct ApiDoc;

#[derive(Clone)]
pub struct RouteState {
    pub blob_storage: Arc<BlobStorage>,
    pub log_shipper: Arc<LogShipper>,
    pub columns: Arc<ColumnNames>,
    pub error_responses: ErrorResponses,
}

pub fn create_routes(
    route_state: RouteState,
    kind: ServiceKind,
    max_upload_bytes: usize,
) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/", get(index))
        .route("/docs/openapi.json", get(openapi));

    if kind.serves_query() {
        router = router.route(
            "/query/{filename}",
            get(query_sales_data).with_state(route_state.clone()),
        );
    }
    if kind.serves_upload() {
        router = router.route(
            "/upload",
            post(upload_sales_data)
                .with_state(route_state.clone())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        );
    }

    router.layer(cors).layer(TraceLayer::new_for_http())
}

async fn index() -> &'static str {
    "Dataflow Server"
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
