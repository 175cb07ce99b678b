use crate::{errors::ServiceError, services::csv_export::CSV_CONTENT_TYPE, ApiResponse};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Shift_JIS CSV download
pub fn csv_attachment(file_name: &str, bytes: Vec<u8>) -> Response {
    attachment(CSV_CONTENT_TYPE, file_name, bytes)
}

/// JSON file download
pub fn json_attachment<T: Serialize>(file_name: &str, data: &T) -> Result<Response, ServiceError> {
    let bytes = serde_json::to_vec_pretty(data)?;
    Ok(attachment("application/json", file_name, bytes))
}

fn attachment(content_type: &'static str, file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// `Json` whose rejections are plain 400s in the service's error shape
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ServiceError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}
