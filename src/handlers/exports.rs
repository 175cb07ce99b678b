/*!
 * # Export Handlers
 *
 * - `POST /api/v1/labels` - Label batch plan for a selection
 * - `POST /api/v1/labels/:batch` - One label CSV batch for a selection
 * - `POST /api/v1/csv` - Shift_JIS CSV from an array of flat records
 */

use axum::{
    extract::{Path, State},
    response::Response,
    routing::post,
    Json, Router,
};
use metrics::counter;
use serde_json::Value;

use super::common::{csv_attachment, JsonBody};
use crate::{
    auth::Session,
    errors::ServiceError,
    services::{
        csv_export::{encode_shift_jis, records_to_csv},
        labels::{LabelPlan, LabelSelectionRequest},
    },
    ApiResponse, ApiResult, AppState,
};

pub fn label_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(selection_label_plan))
        .route("/:batch", post(selection_label_batch))
}

pub fn csv_routes() -> Router<AppState> {
    Router::new().route("/", post(export_csv))
}

/// Label batches for a selection
#[utoipa::path(
    post,
    path = "/api/v1/labels",
    request_body = LabelSelectionRequest,
    responses(
        (status = 200, description = "Batch plan", body = ApiResponse<LabelPlan>),
        (status = 400, description = "Empty selection", body = crate::errors::ErrorResponse)
    ),
    tag = "labels"
)]
pub async fn selection_label_plan(
    State(state): State<AppState>,
    session: Session,
    JsonBody(request): JsonBody<LabelSelectionRequest>,
) -> ApiResult<LabelPlan> {
    let orders = state
        .services
        .orders
        .resolve_orders(&session, &request.selection)
        .await?;
    Ok(Json(ApiResponse::success(state.services.labels.plan(&orders))))
}

/// Download one label batch for a selection
#[utoipa::path(
    post,
    path = "/api/v1/labels/{batch}",
    params(("batch" = usize, Path, description = "1-based batch number")),
    request_body = LabelSelectionRequest,
    responses(
        (status = 200, description = "Shift_JIS CSV", content_type = "text/csv"),
        (status = 404, description = "Batch out of range", body = crate::errors::ErrorResponse)
    ),
    tag = "labels"
)]
pub async fn selection_label_batch(
    State(state): State<AppState>,
    session: Session,
    Path(batch): Path<usize>,
    JsonBody(request): JsonBody<LabelSelectionRequest>,
) -> Result<Response, ServiceError> {
    let orders = state
        .services
        .orders
        .resolve_orders(&session, &request.selection)
        .await?;
    let file = state.services.labels.render_batch(
        &orders,
        batch,
        request.describe_contents,
        "labels",
    )?;
    Ok(csv_attachment(&file.file_name, file.bytes))
}

/// Generic CSV download
#[utoipa::path(
    post,
    path = "/api/v1/csv",
    request_body(
        content_type = "application/json",
        description = "Array of flat records; columns are the union of their keys"
    ),
    responses(
        (status = 200, description = "Shift_JIS CSV", content_type = "text/csv"),
        (status = 400, description = "Invalid data or no headers", body = crate::errors::ErrorResponse)
    ),
    tag = "exports"
)]
pub async fn export_csv(JsonBody(data): JsonBody<Value>) -> Result<Response, ServiceError> {
    let text = records_to_csv(&data)?;
    counter!("order_desk.csv.exports", 1);
    Ok(csv_attachment("data.csv", encode_shift_jis(&text)))
}
