use super::{Language, Translator};
use crate::{config::AppConfig, errors::ServiceError};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use tracing::{instrument, warn};

const KEY_ID_HEADER: &str = "X-NCP-APIGW-API-KEY-ID";
const KEY_HEADER: &str = "X-NCP-APIGW-API-KEY";

/// Papago NMT client
#[derive(Clone)]
pub struct PapagoClient {
    http: reqwest::Client,
    api_url: String,
    credentials: Option<(String, String)>,
}

#[derive(Deserialize)]
struct PapagoResponse {
    message: PapagoMessage,
}

#[derive(Deserialize)]
struct PapagoMessage {
    result: PapagoResult,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PapagoResult {
    translated_text: String,
}

impl PapagoClient {
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            api_url: config.translator_api_url.clone(),
            credentials: config
                .translator_credentials()
                .map(|(id, secret)| (id.to_string(), secret.to_string())),
        })
    }
}

#[async_trait]
impl Translator for PapagoClient {
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn translate(
        &self,
        source: Language,
        target: Language,
        text: &str,
    ) -> Result<String, ServiceError> {
        let (key_id, key) = self.credentials.as_ref().ok_or_else(|| {
            ServiceError::ServiceUnavailable("translator keys are not configured".into())
        })?;

        let form = [
            ("source", source.as_ref()),
            ("target", target.as_ref()),
            ("text", text),
        ];
        let response = self
            .http
            .post(&self.api_url)
            .header(KEY_ID_HEADER, key_id)
            .header(KEY_HEADER, key)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Translator request failed");
                ServiceError::ExternalServiceError(format!("translator unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(512).collect();
            warn!(status = status.as_u16(), body = %snippet, "Translator returned an error");
            counter!("order_desk.translation.errors", 1);
            return Err(ServiceError::ExternalServiceError(format!(
                "translator returned {}",
                status
            )));
        }

        let parsed: PapagoResponse = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("unexpected translator response: {}", e))
        })?;
        counter!("order_desk.translation.calls", 1);
        Ok(parsed.message.result.translated_text)
    }
}
