//! Composition root: builds each component once at startup and injects
//! shared references, instead of ambient global service instances.

use crate::application::checkout::OrderWorkflow;
use crate::application::ledger::WalletLedger;
use crate::application::membership::MembershipWorkflow;
use crate::application::withdrawal::WithdrawalWorkflow;
use crate::domain::ports::{
    CatalogReaderRef, EnrollmentsRef, InstructorDirectoryRef, MembershipOrderStoreRef, NotifierRef,
    OrderStoreRef, PaymentGatewayRef, PlanCatalogRef, WalletStoreRef, WithdrawalStoreRef,
};
use crate::domain::wallet::Owner;
use std::sync::Arc;

/// Everything the platform needs injected, gathered in one place.
pub struct PlatformDeps {
    pub wallet_store: WalletStoreRef,
    pub order_store: OrderStoreRef,
    pub membership_store: MembershipOrderStoreRef,
    pub withdrawal_store: WithdrawalStoreRef,
    pub plan_catalog: PlanCatalogRef,
    pub instructor_directory: InstructorDirectoryRef,
    pub catalog: CatalogReaderRef,
    pub enrollments: EnrollmentsRef,
    pub notifier: NotifierRef,
    pub gateway: PaymentGatewayRef,
    /// The wallet every sale's proceeds land on.
    pub platform_owner: Owner,
}

/// The wired money core: one ledger, three workflows, all sharing the same
/// wallet store.
pub struct PaymentPlatform {
    pub ledger: Arc<WalletLedger>,
    pub orders: OrderWorkflow,
    pub memberships: MembershipWorkflow,
    pub withdrawals: WithdrawalWorkflow,
}

impl PaymentPlatform {
    pub fn new(deps: PlatformDeps) -> Self {
        let ledger = Arc::new(WalletLedger::new(deps.wallet_store));

        let orders = OrderWorkflow::new(
            deps.order_store,
            Arc::clone(&ledger),
            Arc::clone(&deps.gateway),
            deps.catalog,
            deps.enrollments,
            Arc::clone(&deps.notifier),
            deps.platform_owner,
        );

        let memberships = MembershipWorkflow::new(
            deps.membership_store,
            deps.plan_catalog,
            Arc::clone(&deps.instructor_directory),
            Arc::clone(&ledger),
            deps.gateway,
            deps.notifier,
            deps.platform_owner,
        );

        let withdrawals = WithdrawalWorkflow::new(
            deps.withdrawal_store,
            deps.instructor_directory,
            Arc::clone(&ledger),
        );

        Self {
            ledger,
            orders,
            memberships,
            withdrawals,
        }
    }
}
