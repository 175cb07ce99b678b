use crate::{entities::sub_word, errors::ServiceError};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSubWordRequest {
    #[validate(length(min = 1, max = 500))]
    pub start: String,
    #[validate(length(min = 1, max = 500))]
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SubWordView {
    pub id: i32,
    pub start: String,
    pub end: String,
}

impl From<sub_word::Model> for SubWordView {
    fn from(model: sub_word::Model) -> Self {
        Self {
            id: model.id,
            start: model.start,
            end: model.end,
        }
    }
}

/// Applies every `(start, end)` pair in order, replacing all occurrences
pub fn apply_substitutions(text: &str, words: &[SubWordView]) -> String {
    words
        .iter()
        .filter(|w| !w.start.is_empty())
        .fold(text.to_string(), |acc, w| acc.replace(&w.start, &w.end))
}

/// Dictionary of replacements for translated subtitles
#[derive(Clone)]
pub struct SubWordService {
    db: Arc<DatabaseConnection>,
}

impl SubWordService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All words in registration order
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<SubWordView>, ServiceError> {
        Ok(sub_word::Entity::find()
            .order_by_asc(sub_word::Column::Id)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(SubWordView::from)
            .collect())
    }

    #[instrument(skip(self, request))]
    pub async fn create(&self, request: CreateSubWordRequest) -> Result<SubWordView, ServiceError> {
        request.validate()?;
        let model = sub_word::ActiveModel {
            start: Set(request.start),
            end: Set(request.end),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;
        info!(sub_word_id = model.id, "Dictionary word added");
        Ok(model.into())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = sub_word::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Dictionary word {} not found", id)));
        }
        info!(sub_word_id = id, "Dictionary word deleted");
        Ok(())
    }
}
