#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use order_desk::{
    auth::Session,
    commerce::{CommerceApi, OrderQuery},
    config::AppConfig,
    db,
    errors::ServiceError,
    models::{Customer, MailKind, MailState, Order, OrderPage, OrderUpdate, PageMeta, SaleDelivery, SaleDetail},
    translation::{Language, Translator},
    AppState,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const SESSION_COOKIE: &str = "token=Bearer%20test-token";

/// Shop platform stand-in holding orders in memory
#[derive(Default)]
pub struct FakeCommerce {
    orders: Mutex<BTreeMap<i64, Order>>,
    mails: Mutex<Vec<(i64, MailKind)>>,
}

impl FakeCommerce {
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let fake = Self::default();
        {
            let mut map = fake.orders.lock().unwrap();
            for order in orders {
                map.insert(order.id, order);
            }
        }
        fake
    }

    pub fn order(&self, id: i64) -> Option<Order> {
        self.orders.lock().unwrap().get(&id).cloned()
    }

    pub fn mails(&self) -> Vec<(i64, MailKind)> {
        self.mails.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommerceApi for FakeCommerce {
    async fn list_orders(
        &self,
        _session: &Session,
        query: &OrderQuery,
    ) -> Result<OrderPage, ServiceError> {
        let all: Vec<Order> = self.orders.lock().unwrap().values().cloned().collect();
        let limit = query.limit.unwrap_or(100) as usize;
        let offset = query.offset.unwrap_or(0) as usize;
        Ok(OrderPage {
            meta: PageMeta {
                total: all.len() as u64,
                limit: limit as u64,
                offset: offset as u64,
            },
            sales: all.into_iter().skip(offset).take(limit).collect(),
        })
    }

    async fn fetch_orders(
        &self,
        _session: &Session,
        ids: &[i64],
    ) -> Result<Vec<Order>, ServiceError> {
        let orders = self.orders.lock().unwrap();
        Ok(ids.iter().filter_map(|id| orders.get(id).cloned()).collect())
    }

    async fn update_order(
        &self,
        _session: &Session,
        id: i64,
        update: &OrderUpdate,
    ) -> Result<Order, ServiceError> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("order {}", id)))?;
        if let Some(deliveries) = &update.sale_deliveries {
            order.sale_deliveries = deliveries.clone();
        }
        Ok(order.clone())
    }

    async fn send_mail(
        &self,
        _session: &Session,
        id: i64,
        kind: MailKind,
    ) -> Result<(), ServiceError> {
        let mut orders = self.orders.lock().unwrap();
        if let Some(order) = orders.get_mut(&id) {
            match kind {
                MailKind::Accepted => order.accepted_mail_state = MailState::Sent,
                MailKind::Delivered => order.delivered_mail_state = MailState::Sent,
            }
        }
        self.mails.lock().unwrap().push((id, kind));
        Ok(())
    }

    async fn exchange_code(&self, code: &str) -> Result<String, ServiceError> {
        Ok(format!("token-for-{}", code))
    }
}

/// Wraps every segment in brackets, keeping the separators
#[derive(Default)]
pub struct FakeTranslator {
    calls: Mutex<usize>,
}

impl FakeTranslator {
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(
        &self,
        _source: Language,
        _target: Language,
        text: &str,
    ) -> Result<String, ServiceError> {
        *self.calls.lock().unwrap() += 1;
        Ok(text
            .split("\n\n")
            .map(|segment| format!("[{}]", segment))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

pub fn sample_order(id: i64, name: &str, products: &[(&str, &str, i64)]) -> Order {
    Order {
        id,
        make_date: 1_700_000_000,
        paid: true,
        customer: Customer {
            id: id * 10,
            name: name.to_string(),
            furigana: "ヤマダ".to_string(),
            postal: "1500001".to_string(),
            pref_name: "東京都".to_string(),
            address1: "渋谷区神宮前1-2-3".to_string(),
            ..Default::default()
        },
        details: products
            .iter()
            .enumerate()
            .map(|(i, (code, product, qty))| SaleDetail {
                id: id * 100 + i as i64,
                sale_delivery_id: id,
                product_model_number: code.to_string(),
                product_name: product.to_string(),
                product_num: *qty,
                ..Default::default()
            })
            .collect(),
        sale_deliveries: vec![SaleDelivery {
            id,
            name: name.to_string(),
            postal: "1500001".to_string(),
            pref_name: "東京都".to_string(),
            address1: "渋谷区神宮前1-2-3".to_string(),
            tel: Some("03-0000-0000".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// Application wired to a throwaway SQLite file and in-memory fakes
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub commerce: Arc<FakeCommerce>,
    pub translator: Arc<FakeTranslator>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_orders(Vec::new()).await
    }

    pub async fn with_orders(orders: Vec<Order>) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let db_path = dir.path().join("order_desk_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.label_batch_size = 2;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let commerce = Arc::new(FakeCommerce::with_orders(orders));
        let translator = Arc::new(FakeTranslator::default());
        let state = AppState::new(
            Arc::new(pool),
            cfg,
            commerce.clone(),
            translator.clone(),
        );
        let router = order_desk::app_router(state.clone());

        Self {
            router,
            state,
            commerce,
            translator,
            _dir: dir,
        }
    }

    /// Send a request, optionally signed in and with a JSON body
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        signed_in: bool,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if signed_in {
            builder = builder.header(header::COOKIE, SESSION_COOKIE);
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("build request")).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None, true).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.request(Method::POST, uri, Some(body), true).await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        self.request(Method::DELETE, uri, None, true).await
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body")
        .to_vec()
}

pub async fn json_body(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("parse response body")
}

/// Asserts the status and returns the `data` field of the envelope
pub async fn expect_data(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    let body = json_body(response).await;
    assert_eq!(body["success"], true, "unexpected body: {}", body);
    body["data"].clone()
}
