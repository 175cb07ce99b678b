mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use order_desk::{translation::PapagoClient, AppState};
use serde_json::json;
use tower::ServiceExt;

use common::{expect_data, json_body, TestApp, SESSION_COOKIE};

const TWO_CUES: &str =
    "1\r\n00:00:01,000 --> 00:00:02,000\r\nHello\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nWorld\r\n";

#[tokio::test]
async fn languages_are_listed_with_display_names() {
    let app = TestApp::new().await;
    let languages = expect_data(app.get("/api/v1/subtitles/languages").await, StatusCode::OK).await;
    let codes: Vec<&str> = languages
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["code"].as_str().unwrap())
        .collect();
    assert!(codes.contains(&"ja"));
    assert!(codes.contains(&"zh-CN"));
    assert_eq!(languages[0]["name"], "한국어");
}

#[tokio::test]
async fn translation_keeps_timing_and_applies_dictionary() {
    let app = TestApp::new().await;
    expect_data(
        app.post("/api/v1/sub-words", json!({ "start": "[World]", "end": "[Earth]" }))
            .await,
        StatusCode::CREATED,
    )
    .await;

    let results = expect_data(
        app.post(
            "/api/v1/subtitles/translate",
            json!({
                "source": "en",
                "target": "ko",
                "files": [
                    { "name": "ep01.srt", "content": TWO_CUES },
                    { "name": "broken.srt", "content": "not a subtitle" }
                ]
            }),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    assert_eq!(results[0]["status"], "translated");
    assert_eq!(results[0]["file_name"], "ep01.srt");
    assert_eq!(results[0]["entries"], 2);
    assert_eq!(
        results[0]["content"],
        "1\n00:00:01,000 --> 00:00:02,000\n[Hello]\n\n2\n00:00:03,000 --> 00:00:04,000\n[Earth]\n\n"
    );
    assert_eq!(results[1]["status"], "failed");
    assert_eq!(results[1]["file_name"], "broken.srt");
    assert_eq!(app.translator.calls(), 1);
}

#[tokio::test]
async fn dictionary_can_be_skipped() {
    let app = TestApp::new().await;
    app.post("/api/v1/sub-words", json!({ "start": "[Hello]", "end": "[Hi]" }))
        .await;

    let results = expect_data(
        app.post(
            "/api/v1/subtitles/translate",
            json!({
                "source": "en",
                "target": "ja",
                "apply_dictionary": false,
                "files": [{ "name": "a.srt", "content": TWO_CUES }]
            }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert!(results[0]["content"].as_str().unwrap().contains("[Hello]"));
}

#[tokio::test]
async fn translate_rejects_bad_languages_and_empty_batches() {
    let app = TestApp::new().await;
    let file = json!([{ "name": "a.srt", "content": TWO_CUES }]);

    for body in [
        json!({ "source": "en", "target": "xx", "files": file }),
        json!({ "source": "ja", "target": "ja", "files": file }),
        json!({ "source": "en", "target": "ko", "files": [] }),
    ] {
        let response = app.post("/api/v1/subtitles/translate", body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(app.translator.calls(), 0);
}

#[tokio::test]
async fn estimate_counts_joined_characters() {
    let app = TestApp::new().await;
    let estimate = expect_data(
        app.post(
            "/api/v1/subtitles/estimate",
            json!({ "files": [
                { "name": "a.srt", "content": TWO_CUES },
                { "name": "b.srt", "content": TWO_CUES }
            ] }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    // "Hello" + "\n\n" + "World" per file
    assert_eq!(estimate["characters"], 24);

    let broken = app
        .post(
            "/api/v1/subtitles/estimate",
            json!({ "files": [{ "name": "x.srt", "content": "1\nno timing\ntext" }] }),
        )
        .await;
    assert_eq!(broken.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sub_words_are_managed_in_registration_order() {
    let app = TestApp::new().await;
    let first = expect_data(
        app.post("/api/v1/sub-words", json!({ "start": "a", "end": "b" }))
            .await,
        StatusCode::CREATED,
    )
    .await;
    expect_data(
        app.post("/api/v1/sub-words", json!({ "start": "c", "end": "d" }))
            .await,
        StatusCode::CREATED,
    )
    .await;

    let blank = app
        .post("/api/v1/sub-words", json!({ "start": "", "end": "d" }))
        .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let words = expect_data(app.get("/api/v1/sub-words").await, StatusCode::OK).await;
    let starts: Vec<&str> = words
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["start"].as_str().unwrap())
        .collect();
    assert_eq!(starts, vec!["a", "c"]);

    let id = first["id"].as_i64().unwrap();
    let response = app.delete(&format!("/api/v1/sub-words/{}", id)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let missing = app.delete(&format!("/api/v1/sub-words/{}", id)).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unconfigured_translator_fails_the_whole_request() {
    let app = TestApp::new().await;
    let cfg = app.state.config.clone();
    assert!(cfg.translator_credentials().is_none());

    let state = AppState::new(
        app.state.db.clone(),
        cfg.clone(),
        app.commerce.clone(),
        Arc::new(PapagoClient::new(&cfg).unwrap()),
    );
    let body = json!({
        "source": "en",
        "target": "ko",
        "files": [
            { "name": "ep01.srt", "content": TWO_CUES },
            { "name": "ep02.srt", "content": TWO_CUES }
        ]
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/subtitles/translate")
        .header(header::COOKIE, SESSION_COOKIE)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = order_desk::app_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Service Unavailable");
    assert!(body.get("data").is_none());
}
