mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};

use tower::ServiceExt;

use common::{json_body, TestApp, SESSION_COOKIE};

#[tokio::test]
async fn callback_stores_the_session_cookie() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/auth/callback?code=abc", None, false)
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token=Bearer%20token-for-abc;"));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn callback_without_code_is_rejected() {
    let app = TestApp::new().await;
    let missing = app.request(Method::GET, "/auth/callback", None, false).await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let denied = app
        .request(Method::GET, "/auth/callback?error=access_denied", None, false)
        .await;
    assert_eq!(denied.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_needs_a_configured_client() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/auth/login", None, false).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let signed_in = app.request(Method::GET, "/auth/login", None, true).await;
    assert_eq!(signed_in.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn logout_expires_the_cookie() {
    let app = TestApp::new().await;
    let response = app.request(Method::POST, "/auth/logout", None, true).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn bearer_header_works_without_cookie() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/orders")
        .header(header::AUTHORIZATION, "Bearer api-client")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn errors_echo_the_request_id() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/sheets/999")
        .header(header::COOKIE, SESSION_COOKIE)
        .header("x-request-id", "trace-42")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-request-id"], "trace-42");
    let body = json_body(response).await;
    assert_eq!(body["request_id"], "trace-42");
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn health_reports_missing_upstream_credentials() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, false).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["checks"]["database"], "healthy");
    assert_eq!(body["data"]["checks"]["commerce_oauth"], "missing");
    assert_eq!(body["data"]["checks"]["translator"], "missing");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, false)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["info"]["title"], "Order Desk API");
}

#[tokio::test]
async fn credentialed_cors_mirrors_the_preflight() {
    let app = TestApp::new().await;
    let mut cfg = app.state.config.clone();
    cfg.cors_allowed_origins = Some("https://shop.example.com".into());
    cfg.cors_allow_credentials = true;

    let cors = order_desk::cors_layer(&cfg).unwrap();
    let router = order_desk::app_router(app.state.clone()).layer(cors);

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/sheets")
        .header(header::ORIGIN, "https://shop.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(preflight).await.unwrap();

    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://shop.example.com"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "content-type");
}

#[test]
fn production_without_origins_has_no_cors_policy() {
    let cfg = order_desk::config::AppConfig::new(
        "sqlite::memory:".into(),
        "127.0.0.1".into(),
        8080,
        "production".into(),
    );
    assert!(order_desk::cors_layer(&cfg).is_err());
}
