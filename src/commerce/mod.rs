//! Access to the shop platform's REST API.

mod client;

pub use client::ColorMeClient;

use crate::{
    auth::Session,
    errors::ServiceError,
    models::{MailKind, MailState, Order, OrderPage, OrderUpdate},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Largest page the upstream API serves, also its cap on ids per lookup
pub const MAX_PAGE_SIZE: u32 = 100;

/// Server-side filters understood by `GET /v1/sales`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, IntoParams)]
#[serde(default)]
pub struct OrderQuery {
    pub accepted_mail_state: Option<MailState>,
    pub delivered_mail_state: Option<MailState>,
    pub paid: Option<bool>,
    /// Earliest order date; defaults to the configured lookback window
    #[schema(value_type = Option<String>, format = Date)]
    #[param(value_type = Option<String>, format = Date)]
    pub after: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date)]
    #[param(value_type = Option<String>, format = Date)]
    pub before: Option<NaiveDate>,
    /// Free-text product name search
    pub product_name: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommerceApi: Send + Sync {
    /// One page of non-canceled orders
    async fn list_orders(
        &self,
        session: &Session,
        query: &OrderQuery,
    ) -> Result<OrderPage, ServiceError>;

    /// Looks orders up by id, in pages of [`MAX_PAGE_SIZE`]
    async fn fetch_orders(&self, session: &Session, ids: &[i64])
        -> Result<Vec<Order>, ServiceError>;

    async fn update_order(
        &self,
        session: &Session,
        id: i64,
        update: &OrderUpdate,
    ) -> Result<Order, ServiceError>;

    async fn send_mail(&self, session: &Session, id: i64, kind: MailKind)
        -> Result<(), ServiceError>;

    /// Trades an OAuth authorization code for an access token
    async fn exchange_code(&self, code: &str) -> Result<String, ServiceError>;
}
