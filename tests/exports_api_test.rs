mod common;

use axum::http::{header, StatusCode};
use encoding_rs::SHIFT_JIS;
use serde_json::json;

use common::{body_bytes, expect_data, json_body, sample_order, TestApp};

fn shop_orders() -> Vec<order_desk::models::Order> {
    vec![
        sample_order(1, "山田太郎", &[("A-001", "1st Album", 1)]),
        sample_order(2, "佐藤花子", &[("G-001", "Towel", 2)]),
        sample_order(3, "鈴木一郎", &[("D-001", "Live DVD", 1)]),
    ]
}

fn decode(bytes: &[u8]) -> String {
    let (text, _, had_errors) = SHIFT_JIS.decode(bytes);
    assert!(!had_errors, "response is not valid Shift_JIS");
    text.into_owned()
}

#[tokio::test]
async fn label_plan_splits_rows_into_batches() {
    let app = TestApp::with_orders(shop_orders()).await;
    let plan = expect_data(
        app.post(
            "/api/v1/labels",
            json!({ "selection": { "kind": "ids", "ids": [1, 2, 3] } }),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    assert_eq!(plan["total_rows"], 3);
    assert_eq!(plan["batch_size"], 2);
    assert_eq!(
        plan["batches"],
        json!([{ "index": 1, "rows": 2 }, { "index": 2, "rows": 1 }])
    );
}

#[tokio::test]
async fn label_batch_is_a_shift_jis_attachment() {
    let app = TestApp::with_orders(shop_orders()).await;
    let response = app
        .post(
            "/api/v1/labels/2",
            json!({ "selection": { "kind": "ids", "ids": [1, 2, 3] }, "describe_contents": true }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=Shift_JIS"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"labels-2.csv\""
    );

    let text = decode(&body_bytes(response).await);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("お届け先郵便番号,お届け先氏名,お届け先敬称"));
    assert!(lines[1].contains("鈴木一郎,様,東京都渋谷区神宮前1-2-3"));
    assert!(lines[1].ends_with("LiveDVD"));
}

#[tokio::test]
async fn label_batch_out_of_range_is_not_found() {
    let app = TestApp::with_orders(shop_orders()).await;
    let response = app
        .post(
            "/api/v1/labels/3",
            json!({ "selection": { "kind": "ids", "ids": [1, 2, 3] } }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sheet_labels_use_the_sheet_orders() {
    let app = TestApp::with_orders(shop_orders()).await;
    let created = expect_data(
        app.post(
            "/api/v1/sheets",
            json!({ "selection": { "kind": "ids", "ids": [2] } }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let id = created["sheet"]["id"].as_i64().unwrap();

    let plan = expect_data(
        app.get(&format!("/api/v1/sheets/{}/labels", id)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(plan["total_rows"], 1);

    let response = app.get(&format!("/api/v1/sheets/{}/labels/1", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"labels-{}-1.csv\"", id).as_str()
    );
    let text = decode(&body_bytes(response).await);
    assert!(text.lines().nth(1).unwrap().ends_with(",CD"));
}

#[tokio::test]
async fn generic_csv_export() {
    let app = TestApp::new().await;
    let response = app
        .post(
            "/api/v1/csv",
            json!([{ "name": "様", "qty": 1 }, { "name": "テスト", "qty": 2 }]),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"data.csv\""
    );
    assert_eq!(
        decode(&body_bytes(response).await),
        "name,qty\n様,1\nテスト,2\n"
    );

    let invalid = app.post("/api/v1/csv", json!({ "not": "an array" })).await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(invalid).await["message"], "Bad request: Invalid data");
}

#[tokio::test]
async fn listings_round_trip_through_export() {
    let app = TestApp::new().await;
    let created = expect_data(
        app.post(
            "/api/v1/listings",
            json!({
                "title": "Album set",
                "description": "Two discs",
                "price": 3500,
                "image_urls": ["https://img.example.com/a.jpg", "https://img.example.com/b.jpg"]
            }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(created["image_urls"].as_array().map(Vec::len), Some(2));

    let bad_url = app
        .post(
            "/api/v1/listings",
            json!({ "title": "x", "price": 1, "image_urls": ["ftp://nope"] }),
        )
        .await;
    assert_eq!(bad_url.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/api/v1/listings/export").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"yahoo_list.json\""
    );
    let exported: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(exported[0]["title"], "Album set");
    assert_eq!(exported[0]["imageUrls"][1], "https://img.example.com/b.jpg");

    let id = created["id"].as_i64().unwrap();
    let deleted = app.delete(&format!("/api/v1/listings/{}", id)).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    let listings = expect_data(app.get("/api/v1/listings").await, StatusCode::OK).await;
    assert_eq!(listings, json!([]));
}
