/*!
 * # Shop OAuth Handlers
 *
 * - `GET /auth/login` - Redirect to the platform's consent screen
 * - `GET /auth/callback` - Exchange the code and store the session cookie
 * - `POST /auth/logout` - Drop the session cookie
 */

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::IntoParams;

use crate::{
    auth::{expired_session_cookie, Session},
    config::AppConfig,
    errors::ServiceError,
    AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", post(logout))
}

/// `302 Found` to `location`
fn found(location: &str) -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())])
}

/// Builds the platform consent URL for this client
pub fn authorize_url(config: &AppConfig) -> Result<String, ServiceError> {
    let (client_id, _) = config.commerce_credentials().ok_or_else(|| {
        ServiceError::ServiceUnavailable("commerce OAuth client is not configured".into())
    })?;

    let mut url = reqwest::Url::parse(&format!(
        "{}/oauth/authorize",
        config.commerce_api_base_url.trim_end_matches('/')
    ))
    .map_err(|e| ServiceError::InternalError(format!("invalid commerce_api_base_url: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", &config.commerce_redirect_url)
        .append_pair("response_type", "code")
        .append_pair("scope", &config.commerce_scopes);

    Ok(url.into())
}

/// Start the OAuth flow
#[utoipa::path(
    get,
    path = "/auth/login",
    responses(
        (status = 302, description = "Redirect to the platform consent screen or the front end"),
        (status = 503, description = "OAuth client not configured", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ServiceError> {
    if Session::from_headers(&headers).is_some() {
        return Ok(found(&state.config.frontend_url).into_response());
    }
    Ok(found(&authorize_url(&state.config)?).into_response())
}

/// OAuth redirect target
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Session cookie set, redirect to the front end"),
        (status = 400, description = "Missing authorization code", body = crate::errors::ErrorResponse),
        (status = 502, description = "Token exchange failed", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ServiceError> {
    if let Some(error) = query.error.as_deref() {
        warn!(error = %error, "OAuth callback returned an error");
        return Err(ServiceError::BadRequest(format!(
            "authorization was not granted: {}",
            error
        )));
    }

    let code = query
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ServiceError::BadRequest("missing authorization code".into()))?;

    let access_token = state.commerce.exchange_code(&code).await?;
    let session = Session::new(&access_token).ok_or_else(|| {
        ServiceError::ExternalServiceError("token endpoint returned an empty token".into())
    })?;

    info!("Shop session established");

    Ok((
        [(header::SET_COOKIE, session.cookie())],
        found(&state.config.frontend_url),
    )
        .into_response())
}

/// Sign out
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Session cookie cleared")),
    tag = "auth"
)]
pub async fn logout() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_session_cookie())],
    )
}
