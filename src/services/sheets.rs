use crate::{
    auth::Session,
    entities::{order_item, order_sheet},
    errors::ServiceError,
    models::{MailState, Order},
    services::orders::{OrderService, Selection},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSheetRequest {
    pub selection: Selection,
    /// Replaying a request with the same key returns the sheet created first
    #[validate(length(min = 1, max = 128))]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddItemsRequest {
    pub selection: Selection,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SheetView {
    pub id: i32,
    pub created_at: DateTime<Utc>,
    pub item_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CreatedSheet {
    pub sheet: SheetView,
    pub item_ids: Vec<i64>,
    /// False when an earlier request with the same key already made the sheet
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CardLine {
    pub name: String,
    pub quantity: i64,
    pub thumbnail_url: String,
    /// Quantity other than one, worth a second look when packing
    pub multiple: bool,
}

/// Everything a packer needs for one order
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderCard {
    pub id: i64,
    pub customer_name: String,
    pub customer_furigana: String,
    pub ordered_on: String,
    pub recipient_name: String,
    pub delivery_address: String,
    pub address_has_house_number: bool,
    pub address_matches_customer: bool,
    pub memo: Option<String>,
    pub lines: Vec<CardLine>,
    pub paid: bool,
    pub accepted_mail_state: MailState,
    pub delivered_mail_state: MailState,
    pub slip_number: Option<String>,
}

impl From<&Order> for OrderCard {
    fn from(order: &Order) -> Self {
        let delivery = order.first_delivery();
        let delivery_address = delivery.map(|d| d.full_address()).unwrap_or_default();
        let customer_address = order.customer.full_address();

        Self {
            id: order.id,
            customer_name: order.customer.name.clone(),
            customer_furigana: order.customer.furigana.clone(),
            ordered_on: order.ordered_on(),
            recipient_name: delivery.map(|d| d.name.clone()).unwrap_or_default(),
            address_has_house_number: has_house_number(&delivery_address),
            address_matches_customer: delivery.is_some()
                && same_ignoring_whitespace(&customer_address, &delivery_address),
            delivery_address,
            memo: delivery
                .and_then(|d| d.memo.clone())
                .filter(|m| !m.trim().is_empty()),
            lines: order
                .details
                .iter()
                .map(|d| CardLine {
                    name: d.product_name.clone(),
                    quantity: d.product_num,
                    thumbnail_url: d.product_thumbnail_image_url.clone(),
                    multiple: d.product_num != 1,
                })
                .collect(),
            paid: order.paid,
            accepted_mail_state: order.accepted_mail_state,
            delivered_mail_state: order.delivered_mail_state,
            slip_number: delivery.and_then(|d| d.slip_number.clone()),
        }
    }
}

/// ASCII or full-width digit anywhere in the address
pub fn has_house_number(address: &str) -> bool {
    address
        .chars()
        .any(|c| c.is_ascii_digit() || ('０'..='９').contains(&c))
}

fn same_ignoring_whitespace(a: &str, b: &str) -> bool {
    a.chars()
        .filter(|c| !c.is_whitespace())
        .eq(b.chars().filter(|c| !c.is_whitespace()))
}

/// Fulfillment bucket keyed by the first letter of a product code
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr, EnumIter, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductCategory {
    Album,
    Dvd,
    Bluray,
    Goods,
    Photobook,
    Magazine,
    Other,
}

impl ProductCategory {
    pub fn from_model_number(code: &str) -> Self {
        match code.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('A') => Self::Album,
            Some('D') => Self::Dvd,
            Some('B') => Self::Bluray,
            Some('G') => Self::Goods,
            Some('P') => Self::Photobook,
            Some('M') => Self::Magazine,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProductTally {
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SummaryBucket {
    pub category: ProductCategory,
    pub total_quantity: i64,
    pub products: Vec<ProductTally>,
}

/// Quantities per product name, bucketed by category in table order
pub fn summarize(orders: &[Order]) -> Vec<SummaryBucket> {
    let mut buckets: HashMap<ProductCategory, BTreeMap<String, i64>> = HashMap::new();
    for detail in orders.iter().flat_map(|o| o.details.iter()) {
        let category = ProductCategory::from_model_number(&detail.product_model_number);
        *buckets
            .entry(category)
            .or_default()
            .entry(detail.product_name.trim().to_string())
            .or_default() += detail.product_num;
    }

    ProductCategory::iter()
        .filter_map(|category| {
            let products = buckets.remove(&category)?;
            let products: Vec<ProductTally> = products
                .into_iter()
                .map(|(name, quantity)| ProductTally { name, quantity })
                .collect();
            Some(SummaryBucket {
                category,
                total_quantity: products.iter().map(|p| p.quantity).sum(),
                products,
            })
        })
        .collect()
}

/// Sheets of orders persisted locally
#[derive(Clone)]
pub struct SheetService {
    db: Arc<DatabaseConnection>,
    orders: Arc<OrderService>,
}

impl SheetService {
    pub fn new(db: Arc<DatabaseConnection>, orders: Arc<OrderService>) -> Self {
        Self { db, orders }
    }

    /// Creates a sheet for the selected orders in one transaction
    #[instrument(skip(self, session, request))]
    pub async fn create(
        &self,
        session: &Session,
        request: CreateSheetRequest,
    ) -> Result<CreatedSheet, ServiceError> {
        request.validate()?;

        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(existing) = self.replay(key).await? {
                return Ok(existing);
            }
        }

        let item_ids = self.orders.resolve_ids(session, &request.selection).await?;
        let key = request.idempotency_key.clone();
        let ids = item_ids.clone();

        let result = self
            .db
            .transaction::<_, order_sheet::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let sheet = order_sheet::ActiveModel {
                        idempotency_key: Set(key),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    order_item::Entity::insert_many(ids.iter().map(|item_id| {
                        order_item::ActiveModel {
                            sheet_id: Set(sheet.id),
                            item_id: Set(*item_id),
                            created_at: Set(sheet.created_at),
                            ..Default::default()
                        }
                    }))
                    .exec(txn)
                    .await?;

                    Ok(sheet)
                })
            })
            .await;

        let sheet = match result {
            Ok(sheet) => sheet,
            Err(err) => {
                // A concurrent request with the same key may have won the insert
                if let Some(key) = request.idempotency_key.as_deref() {
                    if let Some(existing) = self.replay(key).await? {
                        return Ok(existing);
                    }
                }
                return Err(err.into());
            }
        };

        info!(sheet_id = sheet.id, items = item_ids.len(), "Sheet created");

        Ok(CreatedSheet {
            sheet: SheetView {
                id: sheet.id,
                created_at: sheet.created_at,
                item_count: item_ids.len() as u64,
            },
            item_ids,
            created: true,
        })
    }

    async fn replay(&self, key: &str) -> Result<Option<CreatedSheet>, ServiceError> {
        let Some(sheet) = order_sheet::Entity::find()
            .filter(order_sheet::Column::IdempotencyKey.eq(key))
            .one(&*self.db)
            .await?
        else {
            return Ok(None);
        };
        let item_ids = self.item_ids(sheet.id).await?;
        info!(sheet_id = sheet.id, "Replayed sheet creation");
        Ok(Some(CreatedSheet {
            sheet: SheetView {
                id: sheet.id,
                created_at: sheet.created_at,
                item_count: item_ids.len() as u64,
            },
            item_ids,
            created: false,
        }))
    }

    /// All sheets, newest first
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<SheetView>, ServiceError> {
        let sheets = order_sheet::Entity::find()
            .order_by_desc(order_sheet::Column::CreatedAt)
            .order_by_desc(order_sheet::Column::Id)
            .all(&*self.db)
            .await?;

        let counts: HashMap<i32, i64> = order_item::Entity::find()
            .select_only()
            .column(order_item::Column::SheetId)
            .column_as(Expr::col(order_item::Column::Id).count(), "item_count")
            .group_by(order_item::Column::SheetId)
            .into_tuple::<(i32, i64)>()
            .all(&*self.db)
            .await?
            .into_iter()
            .collect();

        Ok(sheets
            .into_iter()
            .map(|s| SheetView {
                item_count: counts.get(&s.id).copied().unwrap_or(0).max(0) as u64,
                id: s.id,
                created_at: s.created_at,
            })
            .collect())
    }

    async fn find_sheet(&self, id: i32) -> Result<order_sheet::Model, ServiceError> {
        order_sheet::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sheet {} not found", id)))
    }

    /// Linked order ids in insertion order
    pub async fn item_ids(&self, sheet_id: i32) -> Result<Vec<i64>, ServiceError> {
        Ok(order_item::Entity::find()
            .filter(order_item::Column::SheetId.eq(sheet_id))
            .order_by_asc(order_item::Column::Id)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|item| item.item_id)
            .collect())
    }

    /// Upstream orders linked to a sheet
    #[instrument(skip(self, session))]
    pub async fn orders(&self, session: &Session, id: i32) -> Result<Vec<Order>, ServiceError> {
        self.find_sheet(id).await?;
        let ids = self.item_ids(id).await?;
        let orders = self.orders.fetch(session, &ids).await?;
        if orders.len() < ids.len() {
            warn!(
                sheet_id = id,
                linked = ids.len(),
                found = orders.len(),
                "Some linked orders were not returned upstream"
            );
        }
        Ok(orders)
    }

    pub async fn cards(&self, session: &Session, id: i32) -> Result<Vec<OrderCard>, ServiceError> {
        Ok(self
            .orders(session, id)
            .await?
            .iter()
            .map(OrderCard::from)
            .collect())
    }

    pub async fn summary(
        &self,
        session: &Session,
        id: i32,
    ) -> Result<Vec<SummaryBucket>, ServiceError> {
        Ok(summarize(&self.orders(session, id).await?))
    }

    /// Links more orders to a sheet, skipping ones already on it; returns the new ids
    #[instrument(skip(self, session, request))]
    pub async fn add_items(
        &self,
        session: &Session,
        id: i32,
        request: AddItemsRequest,
    ) -> Result<Vec<i64>, ServiceError> {
        self.find_sheet(id).await?;
        let requested = self.orders.resolve_ids(session, &request.selection).await?;
        let existing: HashSet<i64> = self.item_ids(id).await?.into_iter().collect();
        let added: Vec<i64> = requested
            .into_iter()
            .filter(|item_id| !existing.contains(item_id))
            .collect();

        if added.is_empty() {
            return Ok(added);
        }

        let ids = added.clone();
        let now = Utc::now();
        self.db
            .transaction::<_, (), ServiceError>(|txn| {
                Box::pin(async move {
                    order_item::Entity::insert_many(ids.iter().map(|item_id| {
                        order_item::ActiveModel {
                            sheet_id: Set(id),
                            item_id: Set(*item_id),
                            created_at: Set(now),
                            ..Default::default()
                        }
                    }))
                    .exec(txn)
                    .await?;
                    Ok(())
                })
            })
            .await?;

        info!(sheet_id = id, added = added.len(), "Orders added to sheet");
        Ok(added)
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, id: i32, item_id: i64) -> Result<(), ServiceError> {
        let result = order_item::Entity::delete_many()
            .filter(order_item::Column::SheetId.eq(id))
            .filter(order_item::Column::ItemId.eq(item_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Order {} is not on sheet {}",
                item_id, id
            )));
        }
        info!(sheet_id = id, item_id, "Order removed from sheet");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let deleted = self
            .db
            .transaction::<_, u64, ServiceError>(|txn| {
                Box::pin(async move {
                    order_item::Entity::delete_many()
                        .filter(order_item::Column::SheetId.eq(id))
                        .exec(txn)
                        .await?;
                    Ok(order_sheet::Entity::delete_by_id(id)
                        .exec(txn)
                        .await?
                        .rows_affected)
                })
            })
            .await?;

        if deleted == 0 {
            return Err(ServiceError::NotFound(format!("Sheet {} not found", id)));
        }
        info!(sheet_id = id, "Sheet deleted");
        Ok(())
    }
}
