//! Machine translation used by the subtitle pipeline.

mod papago;

pub use papago::PapagoClient;

use crate::errors::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;

/// Languages offered for subtitle translation
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
    EnumIter,
    AsRefStr,
    ToSchema,
)]
pub enum Language {
    #[serde(rename = "ko")]
    #[strum(serialize = "ko")]
    Korean,
    #[serde(rename = "en")]
    #[strum(serialize = "en")]
    English,
    #[serde(rename = "ja")]
    #[strum(serialize = "ja")]
    Japanese,
    #[serde(rename = "zh-CN")]
    #[strum(serialize = "zh-CN")]
    SimplifiedChinese,
    #[serde(rename = "zh-TW")]
    #[strum(serialize = "zh-TW")]
    TraditionalChinese,
}

impl Language {
    /// Label shown to operators
    pub fn display_name(self) -> &'static str {
        match self {
            Language::Korean => "한국어",
            Language::English => "영어",
            Language::Japanese => "일본어",
            Language::SimplifiedChinese => "중국어 간체",
            Language::TraditionalChinese => "중국어 번체",
        }
    }

    pub fn all() -> Vec<Language> {
        Language::iter().collect()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        source: Language,
        target: Language,
        text: &str,
    ) -> Result<String, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_codes_match_translator_api() {
        assert_eq!(Language::SimplifiedChinese.to_string(), "zh-CN");
        assert_eq!("zh-TW".parse::<Language>().unwrap(), Language::TraditionalChinese);
        assert_eq!(
            serde_json::to_string(&Language::Japanese).unwrap(),
            "\"ja\""
        );
        assert_eq!(Language::all().len(), 5);
    }
}
