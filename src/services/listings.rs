use crate::{
    entities::{listing, listing_image},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

fn validate_image_urls(urls: &[String]) -> Result<(), ValidationError> {
    let valid = urls.iter().all(|u| {
        matches!(reqwest::Url::parse(u), Ok(url) if matches!(url.scheme(), "http" | "https"))
    });
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("image_url"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateListingRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0))]
    pub price: i64,
    /// Already-uploaded image URLs, in display order
    #[serde(default)]
    #[validate(custom = "validate_image_urls")]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ListingView {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Row of the marketplace upload file
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ListingExport {
    pub title: String,
    pub description: String,
    pub price: i64,
    #[serde(rename = "imageUrls")]
    pub image_urls: Vec<String>,
}

impl From<ListingView> for ListingExport {
    fn from(view: ListingView) -> Self {
        Self {
            title: view.title,
            description: view.description,
            price: view.price,
            image_urls: view.image_urls,
        }
    }
}

/// Product listings prepared for cross-posting to another marketplace
#[derive(Clone)]
pub struct ListingService {
    db: Arc<DatabaseConnection>,
}

impl ListingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Newest first
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<ListingView>, ServiceError> {
        let rows = listing::Entity::find()
            .order_by_desc(listing::Column::CreatedAt)
            .order_by_desc(listing::Column::Id)
            .find_with_related(listing_image::Entity)
            .order_by_asc(listing_image::Column::Id)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(model, images)| ListingView {
                id: model.id,
                title: model.title,
                description: model.description,
                price: model.price,
                image_urls: images.into_iter().map(|i| i.url).collect(),
                created_at: model.created_at,
            })
            .collect())
    }

    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn create(&self, request: CreateListingRequest) -> Result<ListingView, ServiceError> {
        request.validate()?;

        let CreateListingRequest {
            title,
            description,
            price,
            image_urls,
        } = request;
        let urls = image_urls.clone();

        let model = self
            .db
            .transaction::<_, listing::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let model = listing::ActiveModel {
                        title: Set(title),
                        description: Set(description),
                        price: Set(price),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    if !urls.is_empty() {
                        listing_image::Entity::insert_many(urls.into_iter().map(|url| {
                            listing_image::ActiveModel {
                                listing_id: Set(model.id),
                                url: Set(url),
                                ..Default::default()
                            }
                        }))
                        .exec(txn)
                        .await?;
                    }
                    Ok(model)
                })
            })
            .await?;

        info!(listing_id = model.id, images = image_urls.len(), "Listing created");

        Ok(ListingView {
            id: model.id,
            title: model.title,
            description: model.description,
            price: model.price,
            image_urls,
            created_at: model.created_at,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let deleted = self
            .db
            .transaction::<_, u64, ServiceError>(|txn| {
                Box::pin(async move {
                    listing_image::Entity::delete_many()
                        .filter(listing_image::Column::ListingId.eq(id))
                        .exec(txn)
                        .await?;
                    Ok(listing::Entity::delete_by_id(id)
                        .exec(txn)
                        .await?
                        .rows_affected)
                })
            })
            .await?;

        if deleted == 0 {
            return Err(ServiceError::NotFound(format!("Listing {} not found", id)));
        }
        info!(listing_id = id, "Listing deleted");
        Ok(())
    }

    pub async fn export(&self) -> Result<Vec<ListingExport>, ServiceError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .map(ListingExport::from)
            .collect())
    }
}
