pub mod auth;
pub mod common;
pub mod exports;
pub mod listings;
pub mod orders;
pub mod sheets;
pub mod subtitles;

use crate::{
    commerce::CommerceApi,
    config::AppConfig,
    db::DbPool,
    services::{
        labels::LabelService, listings::ListingService, mail::MailService, orders::OrderService,
        sheets::SheetService, sub_words::SubWordService, subtitles::SubtitleService,
        tracking::TrackingService,
    },
    translation::Translator,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub sheets: Arc<SheetService>,
    pub mail: Arc<MailService>,
    pub tracking: Arc<TrackingService>,
    pub labels: Arc<LabelService>,
    pub subtitles: Arc<SubtitleService>,
    pub sub_words: Arc<SubWordService>,
    pub listings: Arc<ListingService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        commerce: Arc<dyn CommerceApi>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        let orders = Arc::new(OrderService::new(commerce.clone()));
        let sheets = Arc::new(SheetService::new(db_pool.clone(), orders.clone()));
        let sub_words = Arc::new(SubWordService::new(db_pool.clone()));
        let subtitles = Arc::new(SubtitleService::new(
            translator,
            sub_words.clone(),
            config.translation_chunk_size,
            config.translation_rate_per_char,
        ));

        Self {
            orders,
            sheets,
            mail: Arc::new(MailService::new(commerce.clone())),
            tracking: Arc::new(TrackingService::new(commerce)),
            labels: Arc::new(LabelService::from_config(config)),
            subtitles,
            sub_words,
            listings: Arc::new(ListingService::new(db_pool)),
        }
    }
}
