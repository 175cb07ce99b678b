/*!
 * # Order Handlers
 *
 * Orders live on the shop platform; these endpoints browse them and act on them.
 *
 * - `GET /api/v1/orders` - One page of orders with upstream and local filters
 * - `POST /api/v1/orders/mails` - Send a status mail to the selected orders
 * - `PUT /api/v1/orders/:id/slip-number` - Set the tracking number of the first delivery
 */

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};

use super::common::JsonBody;
use crate::{
    auth::Session,
    services::{
        mail::{MailOutcome, SendMailsRequest},
        orders::{OrderFilter, OrderListing},
        tracking::{SlipNumberRequest, SlipNumberUpdate},
    },
    ApiResponse, ApiResult, AppState,
};

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/mails", post(send_mails))
        .route("/:id/slip-number", put(update_slip_number))
}

/// List orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(OrderFilter),
    responses(
        (status = 200, description = "Orders page", body = ApiResponse<OrderListing>),
        (status = 401, description = "No shop session", body = crate::errors::ErrorResponse),
        (status = 502, description = "Shop API failed", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<OrderFilter>,
) -> ApiResult<OrderListing> {
    let listing = state.services.orders.list(&session, &filter).await?;
    Ok(Json(ApiResponse::success(listing)))
}

/// Send accepted or delivered mails to a selection
#[utoipa::path(
    post,
    path = "/api/v1/orders/mails",
    request_body = SendMailsRequest,
    responses(
        (status = 200, description = "Mails sent or nothing to send", body = ApiResponse<MailOutcome>),
        (status = 400, description = "Empty selection", body = crate::errors::ErrorResponse),
        (status = 502, description = "A mail could not be sent", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn send_mails(
    State(state): State<AppState>,
    session: Session,
    JsonBody(request): JsonBody<SendMailsRequest>,
) -> ApiResult<MailOutcome> {
    let orders = state
        .services
        .orders
        .resolve_orders(&session, &request.selection)
        .await?;
    let outcome = state
        .services
        .mail
        .dispatch(&session, &orders, request.kind)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Update the tracking number
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/slip-number",
    params(("id" = i64, Path, description = "Shop order id")),
    request_body = SlipNumberRequest,
    responses(
        (status = 200, description = "Tracking number saved", body = ApiResponse<SlipNumberUpdate>),
        (status = 400, description = "Empty or unchanged value", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn update_slip_number(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<SlipNumberRequest>,
) -> ApiResult<SlipNumberUpdate> {
    let update = state
        .services
        .tracking
        .update_slip_number(&session, id, &request.slip_number)
        .await?;
    Ok(Json(ApiResponse::success(update)))
}
