//! Order records as served by the shop platform's `/v1/sales` API.
//!
//! Only the fields the back office reads are modelled; everything else is
//! ignored on the way in. Deliveries keep their unknown fields so an update
//! can send the whole sub-object back unchanged.

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Notification state of one mail kind on an order
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MailState {
    #[default]
    NotYet,
    Sent,
    Pass,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub furigana: String,
    pub postal: String,
    pub pref_name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub tel: Option<String>,
}

/// One product line of an order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleDetail {
    pub id: i64,
    pub sale_delivery_id: i64,
    pub product_id: i64,
    pub product_model_number: String,
    pub product_name: String,
    pub product_num: i64,
    pub product_thumbnail_image_url: String,
}

/// Shipping destination of (part of) an order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleDelivery {
    pub id: i64,
    pub name: String,
    pub furigana: String,
    pub postal: String,
    pub pref_name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub tel: Option<String>,
    pub slip_number: Option<String>,
    pub memo: Option<String>,
    pub delivered: bool,
    pub detail_ids: Vec<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub id: i64,
    /// Unix seconds
    pub make_date: i64,
    pub memo: Option<String>,
    pub paid: bool,
    pub delivered: bool,
    pub canceled: bool,
    pub accepted_mail_state: MailState,
    pub paid_mail_state: MailState,
    pub delivered_mail_state: MailState,
    pub customer: Customer,
    pub details: Vec<SaleDetail>,
    pub sale_deliveries: Vec<SaleDelivery>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PageMeta {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Body of `GET /v1/sales`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderPage {
    pub sales: Vec<Order>,
    pub meta: PageMeta,
}

/// Partial order sent to `PUT /v1/sales/{id}`
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_deliveries: Option<Vec<SaleDelivery>>,
}

/// Shop-local UTC offset; Japan has no daylight saving.
const SHOP_UTC_OFFSET_SECS: i32 = 9 * 3600;

impl Order {
    /// Order timestamp in shop-local time
    pub fn ordered_at(&self) -> Option<DateTime<FixedOffset>> {
        FixedOffset::east_opt(SHOP_UTC_OFFSET_SECS)
            .and_then(|tz| tz.timestamp_opt(self.make_date, 0).single())
    }

    /// `YYYY-MM-DD` of the order in shop-local time
    pub fn ordered_on(&self) -> String {
        self.ordered_at()
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    pub fn first_delivery(&self) -> Option<&SaleDelivery> {
        self.sale_deliveries.first()
    }

    /// Whether any product name carries the given keyword
    pub fn mentions_product(&self, keyword: &str) -> bool {
        self.details.iter().any(|d| d.product_name.contains(keyword))
    }

    pub fn mail_state(&self, kind: MailKind) -> MailState {
        match kind {
            MailKind::Accepted => self.accepted_mail_state,
            MailKind::Delivered => self.delivered_mail_state,
        }
    }

    /// Product lines shipped with `delivery`; all lines when none are linked.
    pub fn details_for(&self, delivery: &SaleDelivery) -> Vec<&SaleDetail> {
        let linked: Vec<&SaleDetail> = self
            .details
            .iter()
            .filter(|d| d.sale_delivery_id == delivery.id || delivery.detail_ids.contains(&d.id))
            .collect();
        if linked.is_empty() {
            self.details.iter().collect()
        } else {
            linked
        }
    }
}

/// Kind of status mail the platform can send
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MailKind {
    Accepted,
    Delivered,
}

impl SaleDelivery {
    /// `pref_name + address1 + " " + address2`
    pub fn full_address(&self) -> String {
        format!(
            "{}{} {}",
            self.pref_name,
            self.address1,
            self.address2.as_deref().unwrap_or("")
        )
    }
}

impl Customer {
    pub fn full_address(&self) -> String {
        format!(
            "{}{} {}",
            self.pref_name,
            self.address1,
            self.address2.as_deref().unwrap_or("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "id": 123,
            "make_date": 1_700_000_000,
            "paid": true,
            "accepted_mail_state": "sent",
            "delivered_mail_state": "not_yet",
            "paid_mail_state": "pass",
            "total_price": 4400,
            "customer": {"id": 1, "name": "山田 太郎", "pref_name": "東京都", "address1": "港区1-2-3"},
            "details": [{"id": 9, "sale_delivery_id": 5, "product_name": "Album A", "product_num": 2}],
            "sale_deliveries": [{
                "id": 5, "name": "山田 太郎", "postal": "1000001", "pref_name": "東京都",
                "address1": "港区1-2-3", "slip_number": null, "preferred_date": "2024-01-01"
            }]
        })
    }

    #[test]
    fn decodes_upstream_order_ignoring_unknown_fields() {
        let order: Order = serde_json::from_value(sample()).unwrap();
        assert_eq!(order.id, 123);
        assert_eq!(order.accepted_mail_state, MailState::Sent);
        assert_eq!(order.delivered_mail_state, MailState::NotYet);
        assert_eq!(order.paid_mail_state, MailState::Pass);
        assert_eq!(order.details[0].product_num, 2);
    }

    #[test]
    fn delivery_keeps_unmodelled_fields_for_updates() {
        let order: Order = serde_json::from_value(sample()).unwrap();
        let delivery = order.first_delivery().unwrap();
        assert_eq!(delivery.extra.get("preferred_date"), Some(&json!("2024-01-01")));

        let back = serde_json::to_value(delivery).unwrap();
        assert_eq!(back["preferred_date"], json!("2024-01-01"));
        assert_eq!(back["postal"], json!("1000001"));
    }

    #[test]
    fn ordered_on_uses_japan_time() {
        // 2023-12-31T15:30:00Z is already New Year's Day in Tokyo
        let order = Order {
            make_date: 1_704_036_600,
            ..Default::default()
        };
        assert_eq!(order.ordered_on(), "2024-01-01");
    }

    #[test]
    fn details_for_falls_back_to_all_lines() {
        let mut order: Order = serde_json::from_value(sample()).unwrap();
        let other = SaleDelivery {
            id: 77,
            ..Default::default()
        };
        assert_eq!(order.details_for(&other).len(), 1);
        order.details.push(SaleDetail {
            id: 10,
            sale_delivery_id: 77,
            ..Default::default()
        });
        assert_eq!(order.details_for(&other).len(), 1);
        assert_eq!(order.details_for(&other)[0].id, 10);
    }

    #[test]
    fn mail_kind_parses_from_path_segment() {
        assert_eq!("accepted".parse::<MailKind>().unwrap(), MailKind::Accepted);
        assert_eq!(MailKind::Delivered.to_string(), "delivered");
        assert!("paid".parse::<MailKind>().is_err());
    }
}
