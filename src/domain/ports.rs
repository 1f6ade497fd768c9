//! Port boundaries between the workflows and their collaborators.
//!
//! The wallet store is the only place balances change, and its operations are
//! atomic: the balance guard, the idempotency dedup and the mutation happen
//! under a single lock acquisition inside the adapter. Order-like stores
//! expose compare-and-set transitions so a lost race surfaces as `Conflict`
//! instead of a double effect.

use crate::domain::membership::{InstructorProfile, MembershipOrder, MembershipOrderId, MembershipPlan, PlanId};
use crate::domain::money::Amount;
use crate::domain::order::{CourseId, Order, OrderId, OrderStatus};
use crate::domain::wallet::{LedgerEntry, Owner, OwnerId, Wallet};
use crate::domain::withdrawal::{WithdrawalId, WithdrawalRequest, WithdrawalStatus};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Creates a zero-balance wallet if none exists. Idempotent.
    async fn initialize(&self, owner: Owner) -> Result<Wallet>;

    async fn get(&self, owner: OwnerId) -> Result<Option<Wallet>>;

    /// Appends a credit, creating the wallet lazily. A duplicate
    /// `external_ref` within the wallet's log is a no-op returning the
    /// current wallet.
    async fn apply_credit(&self, owner: Owner, entry: LedgerEntry) -> Result<Wallet>;

    /// Appends a debit as one atomic conditional update: the balance check
    /// and the balance change are indivisible. Fails with
    /// `InsufficientFunds` when the balance cannot cover the amount and
    /// `NotFound` when the wallet does not exist. Duplicate `external_ref`
    /// is a no-op.
    async fn apply_debit(&self, owner: OwnerId, entry: LedgerEntry) -> Result<Wallet>;

    async fn list_all(&self) -> Result<Vec<Wallet>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<()>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Replaces the order only while its stored status equals `expected`;
    /// returns `Conflict` otherwise. All status transitions go through this.
    async fn update_if(&self, expected: OrderStatus, order: Order) -> Result<Order>;

    /// Orders still `Pending` from before `cutoff`, for the external
    /// reconciliation sweep.
    async fn list_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>>;
}

#[async_trait]
pub trait MembershipOrderStore: Send + Sync {
    /// Inserts the order, enforcing that at most one order per
    /// {instructor, plan} is simultaneously `Pending` or `Paid`.
    async fn insert(&self, order: MembershipOrder) -> Result<()>;

    async fn get(&self, id: MembershipOrderId) -> Result<Option<MembershipOrder>>;

    /// Compare-and-set transition, as [`OrderStore::update_if`].
    async fn update_if(
        &self,
        expected: crate::domain::membership::MembershipStatus,
        order: MembershipOrder,
    ) -> Result<MembershipOrder>;

    /// The order currently occupying the {instructor, plan} slot, if any.
    async fn find_occupying(
        &self,
        instructor: OwnerId,
        plan: PlanId,
    ) -> Result<Option<MembershipOrder>>;
}

#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    async fn insert(&self, request: WithdrawalRequest) -> Result<()>;

    async fn get(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>>;

    /// Compare-and-set transition, as [`OrderStore::update_if`].
    async fn update_if(
        &self,
        expected: WithdrawalStatus,
        request: WithdrawalRequest,
    ) -> Result<WithdrawalRequest>;
}

/// A freshly minted remote payment intent.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntent {
    pub intent_id: String,
    pub amount: Amount,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Mints a new intent. Each call creates a fresh intent id, so retries
    /// never collide.
    async fn create_intent(&self, amount: Amount) -> Result<PaymentIntent>;

    /// Deterministic keyed-hash verification over `intent_id|payment_id`.
    /// `false` always means reject, never "unknown".
    fn verify_signature(&self, intent_id: &str, payment_id: &str, signature: &str) -> bool;
}

/// Catalog pricing as snapshotted at order creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoursePricing {
    pub list_price: Amount,
    pub offer_price: Option<Amount>,
}

#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn course_pricing(&self, course: CourseId) -> Result<Option<CoursePricing>>;
}

#[async_trait]
pub trait Enrollments: Send + Sync {
    async fn is_enrolled(&self, buyer: OwnerId, course: CourseId) -> Result<bool>;
    async fn enroll(&self, buyer: OwnerId, courses: &[CourseId]) -> Result<()>;
}

/// Fire-and-forget notifications. Methods return `()` so a notifier failure
/// can never roll back a financial transition already committed.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_receipt(&self, order: &Order);
    async fn send_membership_confirmation(&self, order: &MembershipOrder);
    async fn send_expiry_reminder(&self, instructor: OwnerId, expires_at: DateTime<Utc>);
}

#[async_trait]
pub trait InstructorDirectory: Send + Sync {
    async fn get(&self, id: OwnerId) -> Result<Option<InstructorProfile>>;

    /// Flips the instructor to mentor status with the given membership expiry.
    async fn set_mentor(&self, id: OwnerId, expiry: DateTime<Utc>) -> Result<()>;

    /// Clears mentor status and the stored expiry.
    async fn clear_mentor(&self, id: OwnerId) -> Result<()>;

    /// Profiles whose membership expiry falls in `(now, until]`.
    async fn list_expiring_within(&self, until: DateTime<Utc>) -> Result<Vec<InstructorProfile>>;
}

#[async_trait]
pub trait PlanCatalog: Send + Sync {
    async fn get(&self, id: PlanId) -> Result<Option<MembershipPlan>>;
}

pub type WalletStoreRef = Arc<dyn WalletStore>;
pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type MembershipOrderStoreRef = Arc<dyn MembershipOrderStore>;
pub type WithdrawalStoreRef = Arc<dyn WithdrawalStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type CatalogReaderRef = Arc<dyn CatalogReader>;
pub type EnrollmentsRef = Arc<dyn Enrollments>;
pub type NotifierRef = Arc<dyn Notifier>;
pub type InstructorDirectoryRef = Arc<dyn InstructorDirectory>;
pub type PlanCatalogRef = Arc<dyn PlanCatalog>;
