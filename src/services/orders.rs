use crate::{
    auth::Session,
    commerce::{CommerceApi, OrderQuery, MAX_PAGE_SIZE},
    errors::ServiceError,
    models::{MailState, Order},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

/// Product-name keyword marking pre-orders
pub const RESERVATION_KEYWORD: &str = "予約";

/// Rows shown per "load more" step
pub const DEFAULT_PAGE_SIZE: u32 = 60;

/// Filters for the order list: forwarded upstream plus local-only ones
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, IntoParams)]
#[serde(default)]
pub struct OrderFilter {
    pub accepted_mail_state: Option<MailState>,
    pub delivered_mail_state: Option<MailState>,
    pub paid: Option<bool>,
    #[schema(value_type = Option<String>, format = Date)]
    #[param(value_type = Option<String>, format = Date)]
    pub after: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date)]
    #[param(value_type = Option<String>, format = Date)]
    pub before: Option<NaiveDate>,
    /// Server-side product name search
    pub product_name: Option<String>,
    /// Shorthand for `accepted_mail_state=not_yet`
    pub unaccepted_only: bool,
    /// Shorthand for `delivered_mail_state=not_yet`
    pub undelivered_only: bool,
    /// Drop orders containing reserved products
    pub exclude_reservations: bool,
    pub paid_only: bool,
    /// Case-insensitive search over id, customer and product names
    pub q: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl OrderFilter {
    fn upstream(&self, limit: u32, offset: u32) -> OrderQuery {
        OrderQuery {
            accepted_mail_state: self
                .accepted_mail_state
                .or(self.unaccepted_only.then_some(MailState::NotYet)),
            delivered_mail_state: self
                .delivered_mail_state
                .or(self.undelivered_only.then_some(MailState::NotYet)),
            paid: self.paid,
            after: self.after,
            before: self.before,
            product_name: self.product_name.clone(),
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// Local filters applied on top of what upstream returned
    pub fn matches(&self, order: &Order) -> bool {
        if self.exclude_reservations && order.mentions_product(RESERVATION_KEYWORD) {
            return false;
        }
        if self.paid_only && !order.paid {
            return false;
        }
        match self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => matches_text(order, q),
            None => true,
        }
    }
}

fn matches_text(order: &Order, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    let hit = |s: &str| s.to_lowercase().contains(&needle);
    hit(&order.id.to_string())
        || hit(&order.customer.name)
        || hit(&order.customer.furigana)
        || order.details.iter().any(|d| hit(&d.product_name))
}

/// Which orders a bulk action applies to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    None,
    Ids { ids: Vec<i64> },
    AllMatchingFilter { filter: OrderFilter },
}

/// One line of the order list
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderRow {
    pub id: i64,
    pub customer_name: String,
    /// `YYYY-MM-DD`, shop-local
    pub ordered_on: String,
    /// Contains a reserved product
    pub reservation: bool,
    pub paid: bool,
    pub accepted_mail_state: MailState,
    pub delivered_mail_state: MailState,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            customer_name: order.customer.name.clone(),
            ordered_on: order.ordered_on(),
            reservation: order.mentions_product(RESERVATION_KEYWORD),
            paid: order.paid,
            accepted_mail_state: order.accepted_mail_state,
            delivered_mail_state: order.delivered_mail_state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderListing {
    pub rows: Vec<OrderRow>,
    /// Upstream total before local filters
    pub total: u64,
    /// Offset for the next "load more", absent on the last page
    pub next_offset: Option<u64>,
}

/// Order browsing and selection resolution
#[derive(Clone)]
pub struct OrderService {
    commerce: Arc<dyn CommerceApi>,
}

impl OrderService {
    pub fn new(commerce: Arc<dyn CommerceApi>) -> Self {
        Self { commerce }
    }

    /// One page of the order list
    #[instrument(skip(self, session))]
    pub async fn list(
        &self,
        session: &Session,
        filter: &OrderFilter,
    ) -> Result<OrderListing, ServiceError> {
        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = filter.offset.unwrap_or(0);

        let page = self
            .commerce
            .list_orders(session, &filter.upstream(limit, offset))
            .await?;

        let rows = page
            .sales
            .iter()
            .filter(|o| filter.matches(o))
            .map(OrderRow::from)
            .collect();

        Ok(OrderListing {
            rows,
            total: page.meta.total,
            next_offset: next_offset(offset, limit, page.meta.total),
        })
    }

    /// Orders a selection refers to, in selection order
    #[instrument(skip(self, session, selection))]
    pub async fn resolve_orders(
        &self,
        session: &Session,
        selection: &Selection,
    ) -> Result<Vec<Order>, ServiceError> {
        let orders = match selection {
            Selection::None => Vec::new(),
            Selection::Ids { ids } => {
                let ids = dedup_ids(ids);
                let mut orders = self.commerce.fetch_orders(session, &ids).await?;
                sort_by_ids(&mut orders, &ids);
                orders
            }
            Selection::AllMatchingFilter { filter } => self.all_matching(session, filter).await?,
        };

        if orders.is_empty() {
            return Err(ServiceError::BadRequest("no orders selected".into()));
        }
        Ok(orders)
    }

    /// Order ids a selection refers to, without fetching ids that are already known
    #[instrument(skip(self, session, selection))]
    pub async fn resolve_ids(
        &self,
        session: &Session,
        selection: &Selection,
    ) -> Result<Vec<i64>, ServiceError> {
        let ids = match selection {
            Selection::None => Vec::new(),
            Selection::Ids { ids } => dedup_ids(ids),
            Selection::AllMatchingFilter { filter } => self
                .all_matching(session, filter)
                .await?
                .iter()
                .map(|o| o.id)
                .collect(),
        };

        if ids.is_empty() {
            return Err(ServiceError::BadRequest("no orders selected".into()));
        }
        Ok(ids)
    }

    /// Looks up orders by id, keeping the given order
    pub async fn fetch(&self, session: &Session, ids: &[i64]) -> Result<Vec<Order>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut orders = self.commerce.fetch_orders(session, ids).await?;
        sort_by_ids(&mut orders, ids);
        Ok(orders)
    }

    async fn all_matching(
        &self,
        session: &Session,
        filter: &OrderFilter,
    ) -> Result<Vec<Order>, ServiceError> {
        let mut matched = Vec::new();
        let mut offset = 0u32;
        loop {
            let page = self
                .commerce
                .list_orders(session, &filter.upstream(MAX_PAGE_SIZE, offset))
                .await?;
            let fetched = page.sales.len() as u32;
            matched.extend(page.sales.into_iter().filter(|o| filter.matches(o)));

            if fetched == 0 || u64::from(offset + fetched) >= page.meta.total {
                break;
            }
            offset += fetched;
        }
        debug!(matched = matched.len(), "Resolved filter selection");
        Ok(matched)
    }
}

/// Offset of the following page, if there is one
pub fn next_offset(offset: u32, limit: u32, total: u64) -> Option<u64> {
    let next = u64::from(offset) + u64::from(limit);
    (next < total).then_some(next)
}

fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn sort_by_ids(orders: &mut [Order], ids: &[i64]) {
    orders.sort_by_key(|o| ids.iter().position(|id| *id == o.id).unwrap_or(usize::MAX));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commerce::MockCommerceApi,
        models::{Customer, OrderPage, PageMeta, SaleDetail},
    };
    use mockall::predicate::always;

    fn order(id: i64, product: &str, paid: bool) -> Order {
        Order {
            id,
            paid,
            customer: Customer {
                name: format!("Customer {}", id),
                ..Default::default()
            },
            details: vec![SaleDetail {
                product_name: product.into(),
                product_num: 1,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn session() -> Session {
        Session::new("token").unwrap()
    }

    #[test]
    fn local_filters_compose() {
        let filter = OrderFilter {
            exclude_reservations: true,
            paid_only: true,
            ..Default::default()
        };
        assert!(filter.matches(&order(1, "Album", true)));
        assert!(!filter.matches(&order(2, "【予約】Album", true)));
        assert!(!filter.matches(&order(3, "Album", false)));
    }

    #[test]
    fn text_filter_is_case_insensitive() {
        let filter = OrderFilter {
            q: Some("album".into()),
            ..Default::default()
        };
        assert!(filter.matches(&order(1, "New ALBUM", false)));
        assert!(!filter.matches(&order(2, "Poster", false)));

        let by_id = OrderFilter {
            q: Some("4242".into()),
            ..Default::default()
        };
        assert!(by_id.matches(&order(4242, "Poster", false)));
    }

    #[test]
    fn shorthand_flags_map_to_not_yet() {
        let filter = OrderFilter {
            unaccepted_only: true,
            ..Default::default()
        };
        let q = filter.upstream(60, 0);
        assert_eq!(q.accepted_mail_state, Some(MailState::NotYet));
        assert_eq!(q.delivered_mail_state, None);
    }

    #[test]
    fn next_offset_stops_at_total() {
        assert_eq!(next_offset(0, 60, 130), Some(60));
        assert_eq!(next_offset(60, 60, 130), Some(120));
        assert_eq!(next_offset(120, 60, 130), None);
        assert_eq!(next_offset(0, 60, 60), None);
    }

    #[test]
    fn selection_uses_tagged_json() {
        let parsed: Selection =
            serde_json::from_str(r#"{"kind":"ids","ids":[3,1,3]}"#).unwrap();
        assert_eq!(parsed, Selection::Ids { ids: vec![3, 1, 3] });
        let all: Selection = serde_json::from_str(
            r#"{"kind":"all_matching_filter","filter":{"paid_only":true}}"#,
        )
        .unwrap();
        assert!(matches!(all, Selection::AllMatchingFilter { filter } if filter.paid_only));
        let none: Selection = serde_json::from_str(r#"{"kind":"none"}"#).unwrap();
        assert_eq!(none, Selection::None);
    }

    #[tokio::test]
    async fn empty_selection_is_rejected_without_upstream_calls() {
        let service = OrderService::new(Arc::new(MockCommerceApi::new()));
        let err = service
            .resolve_ids(&session(), &Selection::None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let err = service
            .resolve_ids(&session(), &Selection::Ids { ids: vec![] })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn id_selection_dedups_in_first_seen_order() {
        let service = OrderService::new(Arc::new(MockCommerceApi::new()));
        let ids = service
            .resolve_ids(&session(), &Selection::Ids { ids: vec![5, 2, 5, 9, 2] })
            .await
            .unwrap();
        assert_eq!(ids, vec![5, 2, 9]);
    }

    #[tokio::test]
    async fn filter_selection_pages_until_exhausted() {
        let mut mock = MockCommerceApi::new();
        mock.expect_list_orders()
            .with(always(), always())
            .times(2)
            .returning(|_, query| {
                let offset = query.offset.unwrap_or(0);
                let sales = if offset == 0 {
                    (1..=100).map(|id| order(id, "Album", id % 2 == 0)).collect()
                } else {
                    vec![order(101, "Album", true), order(102, "予約 DVD", true)]
                };
                Ok(OrderPage {
                    sales,
                    meta: PageMeta {
                        total: 102,
                        limit: 100,
                        offset: offset as u64,
                    },
                })
            });

        let service = OrderService::new(Arc::new(mock));
        let filter = OrderFilter {
            paid_only: true,
            exclude_reservations: true,
            ..Default::default()
        };
        let ids = service
            .resolve_ids(&session(), &Selection::AllMatchingFilter { filter })
            .await
            .unwrap();
        assert_eq!(ids.len(), 51);
        assert_eq!(ids.first(), Some(&2));
        assert_eq!(ids.last(), Some(&101));
    }

    #[tokio::test]
    async fn list_applies_local_filters_to_loaded_page() {
        let mut mock = MockCommerceApi::new();
        mock.expect_list_orders().times(1).returning(|_, query| {
            assert_eq!(query.limit, Some(60));
            Ok(OrderPage {
                sales: vec![order(1, "Album", true), order(2, "予約 Album", true)],
                meta: PageMeta {
                    total: 200,
                    limit: 60,
                    offset: 0,
                },
            })
        });
        let service = OrderService::new(Arc::new(mock));
        let listing = service
            .list(
                &session(),
                &OrderFilter {
                    exclude_reservations: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(listing.rows.len(), 1);
        assert_eq!(listing.total, 200);
        assert_eq!(listing.next_offset, Some(60));
    }
}
