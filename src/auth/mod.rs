//! Shop platform session handling.
//!
//! The platform's OAuth access token is the only credential this service
//! knows about. It lives in the `token` cookie (or an `Authorization` header
//! for API clients) and is handed explicitly to every upstream call.

use crate::errors::ServiceError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::fmt;

/// Name of the cookie holding `Bearer <access token>`
pub const SESSION_COOKIE: &str = "token";

const BEARER_PREFIX: &str = "Bearer ";

/// Authorization for calls made on behalf of the signed-in shop
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    authorization: String,
}

impl Session {
    /// Wraps a raw access token or an already prefixed `Bearer` value
    pub fn new(token: impl AsRef<str>) -> Option<Self> {
        let token = token.as_ref().trim();
        let bare = match token.split_once(char::is_whitespace) {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
            // A scheme with nothing after it carries no token
            None if token.eq_ignore_ascii_case("bearer") => "",
            _ => token,
        };
        if bare.is_empty() {
            return None;
        }
        Some(Self {
            authorization: format!("{}{}", BEARER_PREFIX, bare),
        })
    }

    /// Value for the upstream `Authorization` header
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    /// `Set-Cookie` value storing this session in the browser
    pub fn cookie(&self) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            self.authorization.replace(' ', "%20")
        )
    }

    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let from_header = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(Session::new);
        from_header.or_else(|| cookie_value(headers, SESSION_COOKIE).and_then(Session::new))
    }
}

// Tokens stay out of logs
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Session(..)")
    }
}

/// `Set-Cookie` value removing the session cookie
pub fn expired_session_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    )
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').replace("%20", " "))
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Session::from_headers(&parts.headers)
            .ok_or_else(|| ServiceError::Unauthorized("sign in to the shop first".into()))
    }
}
