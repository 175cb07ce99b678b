use crate::{
    auth::Session,
    commerce::CommerceApi,
    errors::ServiceError,
    models::{MailKind, MailState, Order},
    services::orders::Selection,
};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendMailsRequest {
    pub kind: MailKind,
    pub selection: Selection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MailOutcome {
    /// Every order already had this mail
    NothingToSend,
    Sent { order_ids: Vec<i64> },
}

/// Orders still waiting for a mail of `kind`
pub fn pending_for(orders: &[Order], kind: MailKind) -> Vec<i64> {
    orders
        .iter()
        .filter(|o| o.mail_state(kind) == MailState::NotYet)
        .map(|o| o.id)
        .collect()
}

#[derive(Clone)]
pub struct MailService {
    commerce: Arc<dyn CommerceApi>,
}

impl MailService {
    pub fn new(commerce: Arc<dyn CommerceApi>) -> Self {
        Self { commerce }
    }

    /// Sends `kind` to every order that has not had it yet. The first failure fails the batch.
    #[instrument(skip(self, session, orders), fields(orders = orders.len()))]
    pub async fn dispatch(
        &self,
        session: &Session,
        orders: &[Order],
        kind: MailKind,
    ) -> Result<MailOutcome, ServiceError> {
        let pending = pending_for(orders, kind);
        if pending.is_empty() {
            info!(%kind, "No orders waiting for mail");
            return Ok(MailOutcome::NothingToSend);
        }

        try_join_all(
            pending
                .iter()
                .map(|id| self.commerce.send_mail(session, *id, kind)),
        )
        .await?;

        info!(%kind, sent = pending.len(), "Status mails sent");
        Ok(MailOutcome::Sent { order_ids: pending })
    }
}
