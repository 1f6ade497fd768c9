use crate::domain::money::Amount;
use crate::domain::wallet::OwnerId;
use crate::domain::withdrawal::BankAccount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(Uuid);

impl PlanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A purchasable instructor membership plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipPlan {
    pub id: PlanId,
    pub name: String,
    pub price: Amount,
    pub duration_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MembershipOrderId(Uuid);

impl MembershipOrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MembershipOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MembershipOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

impl MembershipStatus {
    /// Statuses that count against the one-active-order-per-{instructor, plan}
    /// uniqueness constraint.
    pub fn occupies_slot(&self) -> bool {
        matches!(self, MembershipStatus::Pending | MembershipStatus::Paid)
    }
}

/// An instructor membership purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipOrder {
    pub id: MembershipOrderId,
    pub instructor: OwnerId,
    pub plan_id: PlanId,
    pub price: Amount,
    pub status: MembershipStatus,
    pub gateway_order_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MembershipOrder {
    pub fn pending(instructor: OwnerId, plan: &MembershipPlan, gateway_order_id: String) -> Self {
        Self {
            id: MembershipOrderId::new(),
            instructor,
            plan_id: plan.id,
            price: plan.price,
            status: MembershipStatus::Pending,
            gateway_order_id: Some(gateway_order_id),
            start_date: None,
            end_date: None,
            created_at: Utc::now(),
        }
    }

    /// A wallet purchase is persisted directly as `Paid`, after both transfer
    /// legs have succeeded.
    pub fn paid(
        instructor: OwnerId,
        plan: &MembershipPlan,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MembershipOrderId::new(),
            instructor,
            plan_id: plan.id,
            price: plan.price,
            status: MembershipStatus::Paid,
            gateway_order_id: None,
            start_date: Some(start),
            end_date: Some(end),
            created_at: Utc::now(),
        }
    }
}

/// Instructor state the membership and withdrawal workflows depend on.
///
/// Membership overlap is checked against `membership_expiry` here, not
/// against orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructorProfile {
    pub id: OwnerId,
    pub mentor: bool,
    pub membership_expiry: Option<DateTime<Utc>>,
    pub bank_account: Option<BankAccount>,
}

impl InstructorProfile {
    pub fn new(id: OwnerId) -> Self {
        Self {
            id,
            mentor: false,
            membership_expiry: None,
            bank_account: None,
        }
    }

    pub fn has_active_membership(&self, now: DateTime<Utc>) -> bool {
        self.membership_expiry.is_some_and(|expiry| expiry > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_active_membership_window() {
        let now = Utc::now();
        let mut profile = InstructorProfile::new(OwnerId::new());
        assert!(!profile.has_active_membership(now));

        profile.membership_expiry = Some(now + Duration::days(10));
        assert!(profile.has_active_membership(now));

        profile.membership_expiry = Some(now - Duration::days(1));
        assert!(!profile.has_active_membership(now));
    }

    #[test]
    fn test_slot_occupancy() {
        assert!(MembershipStatus::Pending.occupies_slot());
        assert!(MembershipStatus::Paid.occupies_slot());
        assert!(!MembershipStatus::Failed.occupies_slot());
        assert!(!MembershipStatus::Cancelled.occupies_slot());
    }
}
