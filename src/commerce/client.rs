use super::{CommerceApi, OrderQuery, MAX_PAGE_SIZE};
use crate::{
    auth::Session,
    config::AppConfig,
    errors::ServiceError,
    models::{MailKind, Order, OrderPage, OrderUpdate},
};
use async_trait::async_trait;
use chrono::{Months, NaiveDate, Utc};
use metrics::counter;
use reqwest::{header::AUTHORIZATION, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tracing::{debug, instrument, warn};

/// Longest upstream error body kept in logs
const MAX_LOGGED_BODY: usize = 512;

/// `reqwest` client for the ColorMe shop API
#[derive(Clone)]
pub struct ColorMeClient {
    http: reqwest::Client,
    base_url: String,
    lookback_months: u32,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_url: String,
}

#[derive(Deserialize)]
struct SaleEnvelope {
    sale: Order,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ColorMeClient {
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .user_agent(concat!("order-desk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;

        let (client_id, client_secret) = match config.commerce_credentials() {
            Some((id, secret)) => (Some(id.to_string()), Some(secret.to_string())),
            None => (None, None),
        };

        Ok(Self {
            http,
            base_url: config.commerce_api_base_url.trim_end_matches('/').to_string(),
            lookback_months: config.order_lookback_months,
            client_id,
            client_secret,
            redirect_url: config.commerce_redirect_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Oldest order date the back office looks at
    fn default_after(&self) -> NaiveDate {
        let today = Utc::now().date_naive();
        today
            .checked_sub_months(Months::new(self.lookback_months))
            .unwrap_or(today)
    }

    fn query_pairs(&self, query: &OrderQuery) -> Vec<(&'static str, String)> {
        let limit = query.limit.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let after = query.after.unwrap_or_else(|| self.default_after());

        let mut pairs = vec![
            ("canceled", "false".to_string()),
            ("limit", limit.to_string()),
            ("offset", query.offset.unwrap_or(0).to_string()),
            ("after", after.format("%Y-%m-%d").to_string()),
        ];
        if let Some(state) = query.accepted_mail_state {
            pairs.push(("accepted_mail_state", state.to_string()));
        }
        if let Some(state) = query.delivered_mail_state {
            pairs.push(("delivered_mail_state", state.to_string()));
        }
        if let Some(paid) = query.paid {
            pairs.push(("paid", paid.to_string()));
        }
        if let Some(before) = query.before {
            pairs.push(("before", before.format("%Y-%m-%d").to_string()));
        }
        if let Some(name) = query
            .product_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            pairs.push(("product_name", name.to_string()));
        }
        pairs
    }

    async fn get_page(
        &self,
        session: &Session,
        pairs: &[(&'static str, String)],
    ) -> Result<OrderPage, ServiceError> {
        let response = self
            .http
            .get(self.url("/v1/sales"))
            .header(AUTHORIZATION, session.authorization())
            .query(pairs)
            .send()
            .await
            .map_err(transport_error)?;
        decode(check(response, "list_orders").await?).await
    }
}

#[async_trait]
impl CommerceApi for ColorMeClient {
    #[instrument(skip(self, session))]
    async fn list_orders(
        &self,
        session: &Session,
        query: &OrderQuery,
    ) -> Result<OrderPage, ServiceError> {
        let pairs = self.query_pairs(query);
        let page = self.get_page(session, &pairs).await?;
        debug!(
            returned = page.sales.len(),
            total = page.meta.total,
            "Fetched order page"
        );
        Ok(page)
    }

    #[instrument(skip(self, session, ids), fields(count = ids.len()))]
    async fn fetch_orders(
        &self,
        session: &Session,
        ids: &[i64],
    ) -> Result<Vec<Order>, ServiceError> {
        let mut orders = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_PAGE_SIZE as usize) {
            let joined = chunk
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let mut pairs = self.query_pairs(&OrderQuery {
                limit: Some(MAX_PAGE_SIZE),
                ..Default::default()
            });
            pairs.push(("ids", joined));
            let page = self.get_page(session, &pairs).await?;
            orders.extend(page.sales);
        }
        Ok(orders)
    }

    #[instrument(skip(self, session, update))]
    async fn update_order(
        &self,
        session: &Session,
        id: i64,
        update: &OrderUpdate,
    ) -> Result<Order, ServiceError> {
        let response = self
            .http
            .put(self.url(&format!("/v1/sales/{}", id)))
            .header(AUTHORIZATION, session.authorization())
            .json(&json!({ "sale": update }))
            .send()
            .await
            .map_err(transport_error)?;
        let envelope: SaleEnvelope = decode(check(response, "update_order").await?).await?;
        Ok(envelope.sale)
    }

    #[instrument(skip(self, session))]
    async fn send_mail(
        &self,
        session: &Session,
        id: i64,
        kind: MailKind,
    ) -> Result<(), ServiceError> {
        let response = self
            .http
            .post(self.url(&format!("/v1/sales/{}/mails", id)))
            .header(AUTHORIZATION, session.authorization())
            .json(&json!({ "mail": { "type": kind } }))
            .send()
            .await
            .map_err(transport_error)?;
        check(response, "send_mail").await?;
        counter!("order_desk.mails.sent", 1, "kind" => kind.to_string());
        Ok(())
    }

    #[instrument(skip(self, code))]
    async fn exchange_code(&self, code: &str) -> Result<String, ServiceError> {
        let (client_id, client_secret) = match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => (id.as_str(), secret.as_str()),
            _ => {
                return Err(ServiceError::ServiceUnavailable(
                    "commerce OAuth client is not configured".into(),
                ))
            }
        };

        let form = [
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", self.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self
            .http
            .post(self.url("/oauth/token"))
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;
        let token: TokenResponse = decode(check(response, "exchange_code").await?).await?;
        Ok(token.access_token)
    }
}

fn transport_error(err: reqwest::Error) -> ServiceError {
    warn!(error = %err, "Commerce API request failed");
    counter!("order_desk.commerce.errors", 1, "kind" => "transport");
    ServiceError::ExternalServiceError(format!("commerce API unreachable: {}", err))
}

async fn check(response: Response, operation: &'static str) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(MAX_LOGGED_BODY).collect();
    warn!(operation, status = status.as_u16(), body = %snippet, "Commerce API returned an error");
    counter!("order_desk.commerce.errors", 1, "kind" => "status");

    if status == StatusCode::UNAUTHORIZED {
        return Err(ServiceError::Unauthorized(
            "shop session expired or was revoked".into(),
        ));
    }
    Err(ServiceError::ExternalServiceError(format!(
        "commerce API {} returned {}",
        operation, status
    )))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    response.json::<T>().await.map_err(|e| {
        warn!(error = %e, "Commerce API response could not be decoded");
        ServiceError::ExternalServiceError(format!("unexpected commerce API response: {}", e))
    })
}
