/*!
 * # Subtitle Handlers
 *
 * - `GET /api/v1/subtitles/languages` - Supported languages
 * - `POST /api/v1/subtitles/translate` - Translate SRT files, one result per file
 * - `POST /api/v1/subtitles/estimate` - Character count and cost estimate
 * - `GET /api/v1/sub-words` - Replacement dictionary
 * - `POST /api/v1/sub-words` - Add a replacement
 * - `DELETE /api/v1/sub-words/:id` - Remove a replacement
 */

use axum::{
    extract::{Path, State},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};

use super::common::{created_response, no_content_response, JsonBody};
use crate::{
    errors::ServiceError,
    services::{
        sub_words::{CreateSubWordRequest, SubWordView},
        subtitles::{
            language_options, Estimate, EstimateRequest, FileResult, LanguageOption,
            TranslateRequest,
        },
    },
    ApiResponse, ApiResult, AppState,
};

pub fn subtitle_routes() -> Router<AppState> {
    Router::new()
        .route("/languages", get(list_languages))
        .route("/translate", post(translate_subtitles))
        .route("/estimate", post(estimate_cost))
}

pub fn sub_word_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sub_words).post(create_sub_word))
        .route("/:id", delete(delete_sub_word))
}

/// Supported languages
#[utoipa::path(
    get,
    path = "/api/v1/subtitles/languages",
    responses((status = 200, description = "Language codes with display names", body = ApiResponse<Vec<LanguageOption>>)),
    tag = "subtitles"
)]
pub async fn list_languages() -> ApiResult<Vec<LanguageOption>> {
    Ok(Json(ApiResponse::success(language_options())))
}

/// Translate subtitle files
#[utoipa::path(
    post,
    path = "/api/v1/subtitles/translate",
    request_body = TranslateRequest,
    responses(
        (status = 200, description = "Per-file results; failed files carry a reason", body = ApiResponse<Vec<FileResult>>),
        (status = 400, description = "No files, unknown language or same source and target", body = crate::errors::ErrorResponse),
        (status = 503, description = "Translator not configured", body = crate::errors::ErrorResponse)
    ),
    tag = "subtitles"
)]
pub async fn translate_subtitles(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<TranslateRequest>,
) -> ApiResult<Vec<FileResult>> {
    let results = state.services.subtitles.translate_files(request).await?;
    Ok(Json(ApiResponse::success(results)))
}

/// Estimate translation cost
#[utoipa::path(
    post,
    path = "/api/v1/subtitles/estimate",
    request_body = EstimateRequest,
    responses(
        (status = 200, description = "Characters and estimated cost", body = ApiResponse<Estimate>),
        (status = 400, description = "Unparseable subtitle file", body = crate::errors::ErrorResponse)
    ),
    tag = "subtitles"
)]
pub async fn estimate_cost(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<EstimateRequest>,
) -> ApiResult<Estimate> {
    Ok(Json(ApiResponse::success(
        state.services.subtitles.estimate(&request)?,
    )))
}

/// Dictionary in registration order
#[utoipa::path(
    get,
    path = "/api/v1/sub-words",
    responses((status = 200, description = "Replacements", body = ApiResponse<Vec<SubWordView>>)),
    tag = "subtitles"
)]
pub async fn list_sub_words(State(state): State<AppState>) -> ApiResult<Vec<SubWordView>> {
    Ok(Json(ApiResponse::success(
        state.services.sub_words.list().await?,
    )))
}

/// Add a replacement
#[utoipa::path(
    post,
    path = "/api/v1/sub-words",
    request_body = CreateSubWordRequest,
    responses(
        (status = 201, description = "Replacement added", body = ApiResponse<SubWordView>),
        (status = 400, description = "Blank start or end", body = crate::errors::ErrorResponse)
    ),
    tag = "subtitles"
)]
pub async fn create_sub_word(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateSubWordRequest>,
) -> Result<Response, ServiceError> {
    let word = state.services.sub_words.create(request).await?;
    Ok(created_response(word))
}

/// Remove a replacement
#[utoipa::path(
    delete,
    path = "/api/v1/sub-words/{id}",
    params(("id" = i32, Path, description = "Dictionary word id")),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "No such word", body = crate::errors::ErrorResponse)
    ),
    tag = "subtitles"
)]
pub async fn delete_sub_word(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    state.services.sub_words.delete(id).await?;
    Ok(no_content_response())
}
