#![allow(dead_code)]

use coursepay::application::platform::{PaymentPlatform, PlatformDeps};
use coursepay::domain::membership::{InstructorProfile, MembershipPlan, PlanId};
use coursepay::domain::money::Amount;
use coursepay::domain::ports::{CoursePricing, WalletStoreRef};
use coursepay::domain::order::CourseId;
use coursepay::domain::wallet::{Owner, OwnerId, OwnerKind};
use coursepay::domain::withdrawal::BankAccount;
use coursepay::infrastructure::gateway::HmacGateway;
use coursepay::infrastructure::in_memory::{
    InMemoryCatalog, InMemoryEnrollments, InMemoryInstructorDirectory,
    InMemoryMembershipOrderStore, InMemoryOrderStore, InMemoryPlanCatalog, InMemoryWalletStore,
    InMemoryWithdrawalStore,
};
use coursepay::infrastructure::notifier::LogNotifier;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

pub const GATEWAY_SECRET: &str = "test-gateway-secret";

/// A fully wired in-memory platform plus handles to the seedable adapters.
pub struct TestEnv {
    pub platform: PaymentPlatform,
    pub platform_owner: Owner,
    pub catalog: InMemoryCatalog,
    pub enrollments: InMemoryEnrollments,
    pub plans: InMemoryPlanCatalog,
    pub instructors: InMemoryInstructorDirectory,
    pub gateway: Arc<HmacGateway>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_wallet_store(Arc::new(InMemoryWalletStore::new()))
    }

    /// Builds the environment around a caller-supplied wallet store, so
    /// tests can inject failure behavior into the transfer legs.
    pub fn with_wallet_store(wallet_store: WalletStoreRef) -> Self {
        let platform_owner = Owner::new(OwnerId::from_label("platform"), OwnerKind::Admin);
        let catalog = InMemoryCatalog::new();
        let enrollments = InMemoryEnrollments::new();
        let plans = InMemoryPlanCatalog::new();
        let instructors = InMemoryInstructorDirectory::new();
        let gateway = Arc::new(HmacGateway::new(GATEWAY_SECRET));

        let platform = PaymentPlatform::new(PlatformDeps {
            wallet_store,
            order_store: Arc::new(InMemoryOrderStore::new()),
            membership_store: Arc::new(InMemoryMembershipOrderStore::new()),
            withdrawal_store: Arc::new(InMemoryWithdrawalStore::new()),
            plan_catalog: Arc::new(plans.clone()),
            instructor_directory: Arc::new(instructors.clone()),
            catalog: Arc::new(catalog.clone()),
            enrollments: Arc::new(enrollments.clone()),
            notifier: Arc::new(LogNotifier::new()),
            gateway: Arc::clone(&gateway) as _,
            platform_owner,
        });

        Self {
            platform,
            platform_owner,
            catalog,
            enrollments,
            plans,
            instructors,
            gateway,
        }
    }

    pub async fn seed_course(&self, list_price: Decimal, offer_price: Option<Decimal>) -> CourseId {
        let course = CourseId::new();
        self.catalog
            .put_course(
                course,
                CoursePricing {
                    list_price: amount(list_price),
                    offer_price: offer_price.map(amount),
                },
            )
            .await;
        course
    }

    pub async fn seed_plan(&self, price: Decimal, duration_days: i64) -> PlanId {
        let plan = MembershipPlan {
            id: PlanId::new(),
            name: "pro".into(),
            price: amount(price),
            duration_days,
        };
        let id = plan.id;
        self.plans.upsert(plan).await;
        id
    }

    /// Registers an instructor profile, optionally with a complete
    /// bank-account profile.
    pub async fn seed_instructor(&self, with_bank_account: bool) -> OwnerId {
        let id = OwnerId::new();
        let mut profile = InstructorProfile::new(id);
        if with_bank_account {
            profile.bank_account = Some(bank_account());
        }
        self.instructors.upsert(profile).await;
        id
    }

    /// Credits the owner's wallet with a fresh idempotency key.
    pub async fn fund(&self, owner: Owner, value: Decimal) {
        self.platform
            .ledger
            .credit(
                owner,
                amount(value),
                "test funding",
                &format!("fund-{}", Uuid::new_v4().simple()),
            )
            .await
            .unwrap();
    }

    /// The signature the gateway would attach to a completion callback.
    pub fn sign(&self, intent_id: &str, payment_id: &str) -> String {
        self.gateway.sign(intent_id, payment_id)
    }
}

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

pub fn student() -> Owner {
    Owner::new(OwnerId::new(), OwnerKind::Student)
}

pub fn instructor_owner(id: OwnerId) -> Owner {
    Owner::new(id, OwnerKind::Instructor)
}

pub fn bank_account() -> BankAccount {
    BankAccount {
        holder_name: "Test Instructor".into(),
        account_number: "0011223344".into(),
        bank_name: "Unit Bank".into(),
        routing_code: "UNIT0001".into(),
    }
}
