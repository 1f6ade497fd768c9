use crate::domain::membership::MembershipOrder;
use crate::domain::order::Order;
use crate::domain::ports::Notifier;
use crate::domain::wallet::OwnerId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

/// Notifier that records every notification as a structured log event.
/// Stands in for the mail/PDF pipeline; fire-and-forget by contract.
#[derive(Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_receipt(&self, order: &Order) {
        info!(order = %order.id, buyer = %order.buyer.id, total = %order.total, "receipt sent");
    }

    async fn send_membership_confirmation(&self, order: &MembershipOrder) {
        info!(order = %order.id, instructor = %order.instructor, "membership confirmation sent");
    }

    async fn send_expiry_reminder(&self, instructor: OwnerId, expires_at: DateTime<Utc>) {
        info!(%instructor, %expires_at, "membership expiry reminder sent");
    }
}
