/*!
 * # Sheet Handlers
 *
 * - `GET /api/v1/sheets` - All sheets with item counts
 * - `POST /api/v1/sheets` - Create a sheet from a selection
 * - `GET /api/v1/sheets/:id` - Order cards for a sheet
 * - `DELETE /api/v1/sheets/:id` - Delete a sheet and its links
 * - `POST /api/v1/sheets/:id/items` - Add orders to a sheet
 * - `DELETE /api/v1/sheets/:id/items/:item_id` - Remove one order
 * - `GET /api/v1/sheets/:id/summary` - Quantities per product category
 * - `POST /api/v1/sheets/:id/mails/:kind` - Send status mails for the sheet
 * - `GET /api/v1/sheets/:id/labels` - Label batch plan
 * - `GET /api/v1/sheets/:id/labels/:batch` - One label CSV batch
 */

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common::{csv_attachment, no_content_response, JsonBody};
use crate::{
    auth::Session,
    errors::ServiceError,
    models::MailKind,
    services::{
        labels::LabelPlan,
        mail::MailOutcome,
        sheets::{
            AddItemsRequest, CreateSheetRequest, CreatedSheet, OrderCard, SheetView, SummaryBucket,
        },
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct AddedItems {
    pub added: Vec<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(default)]
pub struct LabelQuery {
    /// Use product names for the contents column when they fit
    pub describe_contents: bool,
}

pub fn sheet_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sheets).post(create_sheet))
        .route("/:id", get(get_sheet).delete(delete_sheet))
        .route("/:id/items", post(add_items))
        .route("/:id/items/:item_id", delete(remove_item))
        .route("/:id/summary", get(sheet_summary))
        .route("/:id/mails/:kind", post(send_sheet_mails))
        .route("/:id/labels", get(label_plan))
        .route("/:id/labels/:batch", get(label_batch))
}

/// List sheets
#[utoipa::path(
    get,
    path = "/api/v1/sheets",
    responses((status = 200, description = "Sheets, newest first", body = ApiResponse<Vec<SheetView>>)),
    tag = "sheets"
)]
pub async fn list_sheets(State(state): State<AppState>) -> ApiResult<Vec<SheetView>> {
    Ok(Json(ApiResponse::success(state.services.sheets.list().await?)))
}

/// Create a sheet
#[utoipa::path(
    post,
    path = "/api/v1/sheets",
    request_body = CreateSheetRequest,
    responses(
        (status = 201, description = "Sheet created", body = ApiResponse<CreatedSheet>),
        (status = 200, description = "Idempotent replay of an earlier creation", body = ApiResponse<CreatedSheet>),
        (status = 400, description = "Empty selection", body = crate::errors::ErrorResponse)
    ),
    tag = "sheets"
)]
pub async fn create_sheet(
    State(state): State<AppState>,
    session: Session,
    JsonBody(request): JsonBody<CreateSheetRequest>,
) -> Result<Response, ServiceError> {
    let created = state.services.sheets.create(&session, request).await?;
    let status = if created.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiResponse::success(created))).into_response())
}

/// Order cards of a sheet
#[utoipa::path(
    get,
    path = "/api/v1/sheets/{id}",
    params(("id" = i32, Path, description = "Sheet id")),
    responses(
        (status = 200, description = "Cards in sheet order", body = ApiResponse<Vec<OrderCard>>),
        (status = 404, description = "Sheet not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sheets"
)]
pub async fn get_sheet(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> ApiResult<Vec<OrderCard>> {
    Ok(Json(ApiResponse::success(
        state.services.sheets.cards(&session, id).await?,
    )))
}

/// Delete a sheet
#[utoipa::path(
    delete,
    path = "/api/v1/sheets/{id}",
    params(("id" = i32, Path, description = "Sheet id")),
    responses(
        (status = 204, description = "Sheet deleted"),
        (status = 404, description = "Sheet not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sheets"
)]
pub async fn delete_sheet(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    state.services.sheets.delete(id).await?;
    Ok(no_content_response())
}

/// Add orders to a sheet
#[utoipa::path(
    post,
    path = "/api/v1/sheets/{id}/items",
    params(("id" = i32, Path, description = "Sheet id")),
    request_body = AddItemsRequest,
    responses(
        (status = 200, description = "Ids newly linked; ones already on the sheet are skipped", body = ApiResponse<AddedItems>),
        (status = 404, description = "Sheet not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sheets"
)]
pub async fn add_items(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    JsonBody(request): JsonBody<AddItemsRequest>,
) -> ApiResult<AddedItems> {
    let added = state.services.sheets.add_items(&session, id, request).await?;
    Ok(Json(ApiResponse::success(AddedItems { added })))
}

/// Remove one order from a sheet
#[utoipa::path(
    delete,
    path = "/api/v1/sheets/{id}/items/{item_id}",
    params(
        ("id" = i32, Path, description = "Sheet id"),
        ("item_id" = i64, Path, description = "Shop order id")
    ),
    responses(
        (status = 204, description = "Order removed"),
        (status = 404, description = "Order is not on the sheet", body = crate::errors::ErrorResponse)
    ),
    tag = "sheets"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i32, i64)>,
) -> Result<Response, ServiceError> {
    state.services.sheets.remove_item(id, item_id).await?;
    Ok(no_content_response())
}

/// Product totals for packing
#[utoipa::path(
    get,
    path = "/api/v1/sheets/{id}/summary",
    params(("id" = i32, Path, description = "Sheet id")),
    responses(
        (status = 200, description = "Buckets in category order", body = ApiResponse<Vec<SummaryBucket>>),
        (status = 404, description = "Sheet not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sheets"
)]
pub async fn sheet_summary(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> ApiResult<Vec<SummaryBucket>> {
    Ok(Json(ApiResponse::success(
        state.services.sheets.summary(&session, id).await?,
    )))
}

/// Send status mails for a sheet
#[utoipa::path(
    post,
    path = "/api/v1/sheets/{id}/mails/{kind}",
    params(
        ("id" = i32, Path, description = "Sheet id"),
        ("kind" = MailKind, Path, description = "accepted or delivered")
    ),
    responses(
        (status = 200, description = "Mails sent or nothing to send", body = ApiResponse<MailOutcome>),
        (status = 400, description = "Unknown mail kind", body = crate::errors::ErrorResponse),
        (status = 502, description = "A mail could not be sent", body = crate::errors::ErrorResponse)
    ),
    tag = "sheets"
)]
pub async fn send_sheet_mails(
    State(state): State<AppState>,
    session: Session,
    Path((id, kind)): Path<(i32, String)>,
) -> ApiResult<MailOutcome> {
    let kind: MailKind = kind
        .parse()
        .map_err(|_| ServiceError::BadRequest(format!("unknown mail kind: {}", kind)))?;
    let orders = state.services.sheets.orders(&session, id).await?;
    let outcome = state.services.mail.dispatch(&session, &orders, kind).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Label batches for a sheet
#[utoipa::path(
    get,
    path = "/api/v1/sheets/{id}/labels",
    params(("id" = i32, Path, description = "Sheet id")),
    responses(
        (status = 200, description = "Batch plan", body = ApiResponse<LabelPlan>),
        (status = 404, description = "Sheet not found", body = crate::errors::ErrorResponse)
    ),
    tag = "labels"
)]
pub async fn label_plan(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> ApiResult<LabelPlan> {
    let orders = state.services.sheets.orders(&session, id).await?;
    Ok(Json(ApiResponse::success(state.services.labels.plan(&orders))))
}

/// Download one label batch
#[utoipa::path(
    get,
    path = "/api/v1/sheets/{id}/labels/{batch}",
    params(
        ("id" = i32, Path, description = "Sheet id"),
        ("batch" = usize, Path, description = "1-based batch number"),
        LabelQuery
    ),
    responses(
        (status = 200, description = "Shift_JIS CSV", content_type = "text/csv"),
        (status = 404, description = "Sheet or batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "labels"
)]
pub async fn label_batch(
    State(state): State<AppState>,
    session: Session,
    Path((id, batch)): Path<(i32, usize)>,
    Query(query): Query<LabelQuery>,
) -> Result<Response, ServiceError> {
    let orders = state.services.sheets.orders(&session, id).await?;
    let file = state.services.labels.render_batch(
        &orders,
        batch,
        query.describe_contents,
        &format!("labels-{}", id),
    )?;
    Ok(csv_attachment(&file.file_name, file.bytes))
}
