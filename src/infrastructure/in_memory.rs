//! Thread-safe in-memory adapters for every store and collaborator port.
//!
//! Each store holds one `Arc<RwLock<HashMap>>`; guard checks, idempotency
//! dedup and mutation all happen under a single write-lock acquisition, which
//! is what makes wallet debits an atomic conditional update.

use crate::domain::membership::{
    InstructorProfile, MembershipOrder, MembershipOrderId, MembershipPlan, MembershipStatus, PlanId,
};
use crate::domain::order::{CourseId, Order, OrderId, OrderStatus};
use crate::domain::ports::{
    CatalogReader, CoursePricing, Enrollments, InstructorDirectory, MembershipOrderStore,
    OrderStore, PlanCatalog, WalletStore, WithdrawalStore,
};
use crate::domain::wallet::{LedgerEntry, Owner, OwnerId, Wallet};
use crate::domain::withdrawal::{WithdrawalId, WithdrawalRequest, WithdrawalStatus};
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory wallet store. The single shared mutable resource of the core.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    wallets: Arc<RwLock<HashMap<OwnerId, Wallet>>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn initialize(&self, owner: Owner) -> Result<Wallet> {
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .entry(owner.id)
            .or_insert_with(|| Wallet::new(owner.id, owner.kind));
        Ok(wallet.clone())
    }

    async fn get(&self, owner: OwnerId) -> Result<Option<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.get(&owner).cloned())
    }

    async fn apply_credit(&self, owner: Owner, entry: LedgerEntry) -> Result<Wallet> {
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .entry(owner.id)
            .or_insert_with(|| Wallet::new(owner.id, owner.kind));
        wallet.credit(entry);
        Ok(wallet.clone())
    }

    async fn apply_debit(&self, owner: OwnerId, entry: LedgerEntry) -> Result<Wallet> {
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .get_mut(&owner)
            .ok_or_else(|| CoreError::not_found("wallet", owner))?;
        let requested = entry.amount.value();
        match wallet.debit(entry) {
            Ok(_) => Ok(wallet.clone()),
            Err(available) => Err(CoreError::InsufficientFunds {
                requested,
                available: available.value(),
            }),
        }
    }

    async fn list_all(&self) -> Result<Vec<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(CoreError::conflict(format!("order {} already exists", order.id)));
        }
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).cloned())
    }

    async fn update_if(&self, expected: OrderStatus, order: Order) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(&order.id)
            .ok_or_else(|| CoreError::not_found("order", order.id))?;
        if stored.status != expected {
            return Err(CoreError::conflict(format!(
                "order {} is {}, expected {}",
                order.id, stored.status, expected
            )));
        }
        *stored = order.clone();
        Ok(order)
    }

    async fn list_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut stale: Vec<Order> = orders
            .values()
            .filter(|o| o.status == OrderStatus::Pending && o.created_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|o| o.created_at);
        Ok(stale)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryMembershipOrderStore {
    orders: Arc<RwLock<HashMap<MembershipOrderId, MembershipOrder>>>,
}

impl InMemoryMembershipOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipOrderStore for InMemoryMembershipOrderStore {
    async fn insert(&self, order: MembershipOrder) -> Result<()> {
        let mut orders = self.orders.write().await;
        // Uniqueness over {instructor, plan} filtered to Pending | Paid.
        let occupied = orders.values().any(|o| {
            o.instructor == order.instructor
                && o.plan_id == order.plan_id
                && o.status.occupies_slot()
        });
        if occupied {
            return Err(CoreError::conflict(format!(
                "instructor {} already has a pending or paid order for plan {}",
                order.instructor, order.plan_id
            )));
        }
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: MembershipOrderId) -> Result<Option<MembershipOrder>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).cloned())
    }

    async fn update_if(
        &self,
        expected: MembershipStatus,
        order: MembershipOrder,
    ) -> Result<MembershipOrder> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(&order.id)
            .ok_or_else(|| CoreError::not_found("membership order", order.id))?;
        if stored.status != expected {
            return Err(CoreError::conflict(format!(
                "membership order {} is {:?}, expected {:?}",
                order.id, stored.status, expected
            )));
        }
        *stored = order.clone();
        Ok(order)
    }

    async fn find_occupying(
        &self,
        instructor: OwnerId,
        plan: PlanId,
    ) -> Result<Option<MembershipOrder>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| o.instructor == instructor && o.plan_id == plan && o.status.occupies_slot())
            .cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryWithdrawalStore {
    requests: Arc<RwLock<HashMap<WithdrawalId, WithdrawalRequest>>>,
}

impl InMemoryWithdrawalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WithdrawalStore for InMemoryWithdrawalStore {
    async fn insert(&self, request: WithdrawalRequest) -> Result<()> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id).cloned())
    }

    async fn update_if(
        &self,
        expected: WithdrawalStatus,
        request: WithdrawalRequest,
    ) -> Result<WithdrawalRequest> {
        let mut requests = self.requests.write().await;
        let stored = requests
            .get_mut(&request.id)
            .ok_or_else(|| CoreError::not_found("withdrawal request", request.id))?;
        if stored.status != expected {
            return Err(CoreError::conflict(format!(
                "withdrawal request {} is {:?}, expected {:?}",
                request.id, stored.status, expected
            )));
        }
        *stored = request.clone();
        Ok(request)
    }
}

/// In-memory plan catalog, seeded through [`InMemoryPlanCatalog::upsert`].
#[derive(Default, Clone)]
pub struct InMemoryPlanCatalog {
    plans: Arc<RwLock<HashMap<PlanId, MembershipPlan>>>,
}

impl InMemoryPlanCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, plan: MembershipPlan) {
        let mut plans = self.plans.write().await;
        plans.insert(plan.id, plan);
    }
}

#[async_trait]
impl PlanCatalog for InMemoryPlanCatalog {
    async fn get(&self, id: PlanId) -> Result<Option<MembershipPlan>> {
        let plans = self.plans.read().await;
        Ok(plans.get(&id).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryInstructorDirectory {
    profiles: Arc<RwLock<HashMap<OwnerId, InstructorProfile>>>,
}

impl InMemoryInstructorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, profile: InstructorProfile) {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.id, profile);
    }
}

#[async_trait]
impl InstructorDirectory for InMemoryInstructorDirectory {
    async fn get(&self, id: OwnerId) -> Result<Option<InstructorProfile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&id).cloned())
    }

    async fn set_mentor(&self, id: OwnerId, expiry: DateTime<Utc>) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("instructor", id))?;
        profile.mentor = true;
        profile.membership_expiry = Some(expiry);
        Ok(())
    }

    async fn clear_mentor(&self, id: OwnerId) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("instructor", id))?;
        profile.mentor = false;
        profile.membership_expiry = None;
        Ok(())
    }

    async fn list_expiring_within(&self, until: DateTime<Utc>) -> Result<Vec<InstructorProfile>> {
        let now = Utc::now();
        let profiles = self.profiles.read().await;
        let mut expiring: Vec<InstructorProfile> = profiles
            .values()
            .filter(|p| {
                p.membership_expiry
                    .is_some_and(|expiry| expiry > now && expiry <= until)
            })
            .cloned()
            .collect();
        expiring.sort_by_key(|p| p.membership_expiry);
        Ok(expiring)
    }
}

/// In-memory course catalog, seeded through [`InMemoryCatalog::put_course`].
#[derive(Default, Clone)]
pub struct InMemoryCatalog {
    courses: Arc<RwLock<HashMap<CourseId, CoursePricing>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_course(&self, course: CourseId, pricing: CoursePricing) {
        let mut courses = self.courses.write().await;
        courses.insert(course, pricing);
    }
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn course_pricing(&self, course: CourseId) -> Result<Option<CoursePricing>> {
        let courses = self.courses.read().await;
        Ok(courses.get(&course).copied())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryEnrollments {
    enrolled: Arc<RwLock<HashSet<(OwnerId, CourseId)>>>,
}

impl InMemoryEnrollments {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Enrollments for InMemoryEnrollments {
    async fn is_enrolled(&self, buyer: OwnerId, course: CourseId) -> Result<bool> {
        let enrolled = self.enrolled.read().await;
        Ok(enrolled.contains(&(buyer, course)))
    }

    async fn enroll(&self, buyer: OwnerId, courses: &[CourseId]) -> Result<()> {
        let mut enrolled = self.enrolled.write().await;
        for course in courses {
            enrolled.insert((buyer, *course));
        }
        Ok(())
    }
}
