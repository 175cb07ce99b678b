/*!
 * # Listing Handlers
 *
 * - `GET /api/v1/listings` - Listings, newest first
 * - `POST /api/v1/listings` - Create a listing with image URLs
 * - `DELETE /api/v1/listings/:id` - Delete a listing
 * - `GET /api/v1/listings/export` - Marketplace upload file
 */

use axum::{
    extract::{Path, State},
    response::Response,
    routing::{delete, get},
    Json, Router,
};

use super::common::{created_response, json_attachment, no_content_response, JsonBody};
use crate::{
    errors::ServiceError,
    services::listings::{CreateListingRequest, ListingView},
    ApiResponse, ApiResult, AppState,
};

const EXPORT_FILE_NAME: &str = "yahoo_list.json";

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_listings).post(create_listing))
        .route("/export", get(export_listings))
        .route("/:id", delete(delete_listing))
}

#[utoipa::path(
    get,
    path = "/api/v1/listings",
    responses((status = 200, description = "Listings", body = ApiResponse<Vec<ListingView>>)),
    tag = "listings"
)]
pub async fn list_listings(State(state): State<AppState>) -> ApiResult<Vec<ListingView>> {
    Ok(Json(ApiResponse::success(
        state.services.listings.list().await?,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/listings",
    request_body = CreateListingRequest,
    responses(
        (status = 201, description = "Listing created", body = ApiResponse<ListingView>),
        (status = 400, description = "Invalid listing", body = crate::errors::ErrorResponse)
    ),
    tag = "listings"
)]
pub async fn create_listing(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateListingRequest>,
) -> Result<Response, ServiceError> {
    Ok(created_response(
        state.services.listings.create(request).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/listings/{id}",
    params(("id" = i32, Path, description = "Listing id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Listing not found", body = crate::errors::ErrorResponse)
    ),
    tag = "listings"
)]
pub async fn delete_listing(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    state.services.listings.delete(id).await?;
    Ok(no_content_response())
}

/// Download every listing as JSON
#[utoipa::path(
    get,
    path = "/api/v1/listings/export",
    responses((status = 200, description = "JSON attachment", content_type = "application/json")),
    tag = "listings"
)]
pub async fn export_listings(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let rows = state.services.listings.export().await?;
    json_attachment(EXPORT_FILE_NAME, &rows)
}
