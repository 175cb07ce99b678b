use crate::{
    auth::Session,
    commerce::CommerceApi,
    errors::ServiceError,
    models::{MailKind, MailState, OrderUpdate, SaleDelivery},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SlipNumberRequest {
    pub slip_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SlipNumberUpdate {
    pub order_id: i64,
    pub slip_number: String,
    pub delivered_mail_sent: bool,
}

/// Tracking-number edits on the first delivery of an order
#[derive(Clone)]
pub struct TrackingService {
    commerce: Arc<dyn CommerceApi>,
}

impl TrackingService {
    pub fn new(commerce: Arc<dyn CommerceApi>) -> Self {
        Self { commerce }
    }

    #[instrument(skip(self, session))]
    pub async fn update_slip_number(
        &self,
        session: &Session,
        order_id: i64,
        slip_number: &str,
    ) -> Result<SlipNumberUpdate, ServiceError> {
        let slip_number = slip_number.trim();
        if slip_number.is_empty() {
            return Err(ServiceError::BadRequest("slip number is empty".into()));
        }

        let order = self
            .commerce
            .fetch_orders(session, &[order_id])
            .await?
            .into_iter()
            .find(|o| o.id == order_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let delivery = order.first_delivery().ok_or_else(|| {
            ServiceError::BadRequest(format!("order {} has no delivery", order_id))
        })?;
        if delivery.slip_number.as_deref().map(str::trim) == Some(slip_number) {
            return Err(ServiceError::BadRequest("slip number is unchanged".into()));
        }

        let update = OrderUpdate {
            sale_deliveries: Some(vec![SaleDelivery {
                slip_number: Some(slip_number.to_string()),
                ..delivery.clone()
            }]),
        };
        self.commerce.update_order(session, order_id, &update).await?;
        info!(order_id, "Slip number updated");

        let delivered_mail_sent = order.delivered_mail_state == MailState::NotYet;
        if delivered_mail_sent {
            self.commerce
                .send_mail(session, order_id, MailKind::Delivered)
                .await?;
        }

        Ok(SlipNumberUpdate {
            order_id,
            slip_number: slip_number.to_string(),
            delivered_mail_sent,
        })
    }
}
