mod common;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{amount, student, TestEnv};
use coursepay::application::checkout::OrderWorkflow;
use coursepay::application::ledger::WalletLedger;
use coursepay::domain::money::Balance;
use coursepay::domain::order::{CourseId, Order, OrderId, OrderStatus, PaymentMethod};
use coursepay::domain::ports::{CoursePricing, Enrollments, OrderStore, WalletStoreRef};
use coursepay::domain::wallet::{Owner, OwnerId, OwnerKind};
use coursepay::error::{CoreError, Result};
use coursepay::infrastructure::gateway::HmacGateway;
use coursepay::infrastructure::in_memory::{
    InMemoryCatalog, InMemoryEnrollments, InMemoryOrderStore, InMemoryWalletStore,
};
use coursepay::infrastructure::notifier::LogNotifier;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn test_wallet_checkout_settles_synchronously() {
    let env = TestEnv::new();
    let buyer = student();
    env.fund(buyer, dec!(1000)).await;
    let course = env.seed_course(dec!(600), Some(dec!(500))).await;

    let order = env
        .platform
        .orders
        .initiate_checkout(buyer, &[course], None, PaymentMethod::Wallet)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Success);
    assert_eq!(order.total, amount(dec!(500)));
    assert!(order.wallet_debit_ref.is_some());
    assert_eq!(
        env.platform.ledger.balance(buyer.id).await.unwrap(),
        Balance::new(dec!(500))
    );
    assert_eq!(
        env.platform
            .ledger
            .balance(env.platform_owner.id)
            .await
            .unwrap(),
        Balance::new(dec!(500))
    );
    assert!(env.enrollments.is_enrolled(buyer.id, course).await.unwrap());
}

#[tokio::test]
async fn test_wallet_checkout_applies_coupon_across_items() {
    let env = TestEnv::new();
    let buyer = student();
    env.fund(buyer, dec!(1000)).await;
    let a = env.seed_course(dec!(600), None).await;
    let b = env.seed_course(dec!(400), None).await;

    let order = env
        .platform
        .orders
        .initiate_checkout(
            buyer,
            &[a, b],
            Some(amount(dec!(100))),
            PaymentMethod::Wallet,
        )
        .await
        .unwrap();

    assert_eq!(order.total, amount(dec!(900)));
    assert_eq!(
        env.platform.ledger.balance(buyer.id).await.unwrap(),
        Balance::new(dec!(100))
    );
}

#[tokio::test]
async fn test_wallet_checkout_insufficient_funds_fails_order() {
    let env = TestEnv::new();
    let buyer = student();
    env.fund(buyer, dec!(100)).await;
    let course = env.seed_course(dec!(500), None).await;

    let result = env
        .platform
        .orders
        .initiate_checkout(buyer, &[course], None, PaymentMethod::Wallet)
        .await;

    assert!(matches!(result, Err(CoreError::InsufficientFunds { .. })));
    // The buyer keeps their money and the course.
    assert_eq!(
        env.platform.ledger.balance(buyer.id).await.unwrap(),
        Balance::new(dec!(100))
    );
    assert!(!env.enrollments.is_enrolled(buyer.id, course).await.unwrap());
    // Nothing is left dangling in Pending.
    assert!(env
        .platform
        .orders
        .list_stale_pending(Duration::zero())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_already_owned_course_rejected() {
    let env = TestEnv::new();
    let buyer = student();
    env.fund(buyer, dec!(1000)).await;
    let course = env.seed_course(dec!(200), None).await;
    env.enrollments.enroll(buyer.id, &[course]).await.unwrap();

    let result = env
        .platform
        .orders
        .initiate_checkout(buyer, &[course], None, PaymentMethod::Wallet)
        .await;

    assert!(matches!(result, Err(CoreError::Conflict(_))));
    assert_eq!(
        env.platform.ledger.balance(buyer.id).await.unwrap(),
        Balance::new(dec!(1000))
    );
}

#[tokio::test]
async fn test_unknown_course_rejected() {
    let env = TestEnv::new();
    let buyer = student();

    let result = env
        .platform
        .orders
        .initiate_checkout(buyer, &[CourseId::new()], None, PaymentMethod::Wallet)
        .await;
    assert!(matches!(result, Err(CoreError::NotFound { .. })));
}

#[tokio::test]
async fn test_gateway_checkout_stays_pending_until_confirmed() {
    let env = TestEnv::new();
    let buyer = student();
    let course = env.seed_course(dec!(750), None).await;

    let order = env
        .platform
        .orders
        .initiate_checkout(buyer, &[course], None, PaymentMethod::Gateway)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.gateway_order_id.is_some());
    assert!(!env.enrollments.is_enrolled(buyer.id, course).await.unwrap());
    assert_eq!(
        env.platform
            .ledger
            .balance(env.platform_owner.id)
            .await
            .unwrap(),
        Balance::ZERO
    );
}

#[tokio::test]
async fn test_gateway_confirmation_completes_the_order() {
    let env = TestEnv::new();
    let buyer = student();
    let course = env.seed_course(dec!(750), None).await;

    let order = env
        .platform
        .orders
        .initiate_checkout(buyer, &[course], None, PaymentMethod::Gateway)
        .await
        .unwrap();
    let intent_id = order.gateway_order_id.clone().unwrap();
    let signature = env.sign(&intent_id, "pay_1");

    let completed = env
        .platform
        .orders
        .complete_checkout(order.id, "pay_1", &signature)
        .await
        .unwrap();

    assert_eq!(completed.status, OrderStatus::Success);
    assert_eq!(
        env.platform
            .ledger
            .balance(env.platform_owner.id)
            .await
            .unwrap(),
        Balance::new(dec!(750))
    );
    assert!(env.enrollments.is_enrolled(buyer.id, course).await.unwrap());
}

#[tokio::test]
async fn test_duplicate_confirmation_is_a_noop() {
    let env = TestEnv::new();
    let buyer = student();
    let course = env.seed_course(dec!(750), None).await;

    let order = env
        .platform
        .orders
        .initiate_checkout(buyer, &[course], None, PaymentMethod::Gateway)
        .await
        .unwrap();
    let intent_id = order.gateway_order_id.clone().unwrap();
    let signature = env.sign(&intent_id, "pay_1");

    env.platform
        .orders
        .complete_checkout(order.id, "pay_1", &signature)
        .await
        .unwrap();
    let again = env
        .platform
        .orders
        .complete_checkout(order.id, "pay_1", &signature)
        .await
        .unwrap();

    assert_eq!(again.status, OrderStatus::Success);
    // The platform was credited exactly once for this payment.
    assert_eq!(
        env.platform
            .ledger
            .balance(env.platform_owner.id)
            .await
            .unwrap(),
        Balance::new(dec!(750))
    );
}

#[tokio::test]
async fn test_bad_signature_leaves_order_pending() {
    let env = TestEnv::new();
    let buyer = student();
    let course = env.seed_course(dec!(750), None).await;

    let order = env
        .platform
        .orders
        .initiate_checkout(buyer, &[course], None, PaymentMethod::Gateway)
        .await
        .unwrap();

    let result = env
        .platform
        .orders
        .complete_checkout(order.id, "pay_1", "not-a-signature")
        .await;

    assert!(matches!(result, Err(CoreError::SignatureMismatch)));
    let stored = env.platform.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(
        env.platform
            .ledger
            .balance(env.platform_owner.id)
            .await
            .unwrap(),
        Balance::ZERO
    );
}

#[tokio::test]
async fn test_cancel_pending_gateway_order() {
    let env = TestEnv::new();
    let buyer = student();
    let course = env.seed_course(dec!(300), None).await;

    let order = env
        .platform
        .orders
        .initiate_checkout(buyer, &[course], None, PaymentMethod::Gateway)
        .await
        .unwrap();

    let cancelled = env
        .platform
        .orders
        .cancel_pending_order(order.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    // Terminal states only transition once.
    let again = env.platform.orders.cancel_pending_order(order.id).await;
    assert!(matches!(again, Err(CoreError::Conflict(_))));

    // And a cancelled order can no longer be confirmed.
    let intent_id = order.gateway_order_id.unwrap();
    let signature = env.sign(&intent_id, "pay_1");
    let confirm = env
        .platform
        .orders
        .complete_checkout(order.id, "pay_1", &signature)
        .await;
    assert!(matches!(confirm, Err(CoreError::Conflict(_))));
}

#[tokio::test]
async fn test_mark_order_as_failed() {
    let env = TestEnv::new();
    let buyer = student();
    let course = env.seed_course(dec!(300), None).await;

    let order = env
        .platform
        .orders
        .initiate_checkout(buyer, &[course], None, PaymentMethod::Gateway)
        .await
        .unwrap();

    let failed = env
        .platform
        .orders
        .mark_order_as_failed(order.id)
        .await
        .unwrap();
    assert_eq!(failed.status, OrderStatus::Failed);
}

#[tokio::test]
async fn test_wallet_checkout_without_a_wallet_fails_the_order() {
    let env = TestEnv::new();
    let buyer = student();
    let course = env.seed_course(dec!(200), None).await;

    let result = env
        .platform
        .orders
        .initiate_checkout(buyer, &[course], None, PaymentMethod::Wallet)
        .await;
    assert!(matches!(result, Err(CoreError::NotFound { .. })));

    // The order is closed out as Failed, not stranded Pending.
    assert!(env
        .platform
        .orders
        .list_stale_pending(Duration::zero())
        .await
        .unwrap()
        .is_empty());
}

/// Order store that cancels the stored order the first time a confirmation
/// tries to transition it, as a concurrent `cancel_pending_order` would.
struct CancelRacingOrderStore {
    inner: InMemoryOrderStore,
    fired: AtomicBool,
}

#[async_trait]
impl OrderStore for CancelRacingOrderStore {
    async fn insert(&self, order: Order) -> Result<()> {
        self.inner.insert(order).await
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        self.inner.get(id).await
    }

    async fn update_if(&self, expected: OrderStatus, order: Order) -> Result<Order> {
        if order.status == OrderStatus::Success && !self.fired.swap(true, Ordering::SeqCst) {
            let mut cancelled = self.inner.get(order.id).await?.unwrap();
            cancelled.status = OrderStatus::Cancelled;
            self.inner.update_if(OrderStatus::Pending, cancelled).await?;
        }
        self.inner.update_if(expected, order).await
    }

    async fn list_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>> {
        self.inner.list_stale_pending(cutoff).await
    }
}

#[tokio::test]
async fn test_confirmation_losing_to_cancel_reverses_the_credit() {
    let wallet_store: WalletStoreRef = Arc::new(InMemoryWalletStore::new());
    let ledger = Arc::new(WalletLedger::new(wallet_store));
    let catalog = InMemoryCatalog::new();
    let course = CourseId::new();
    catalog
        .put_course(
            course,
            CoursePricing {
                list_price: amount(dec!(750)),
                offer_price: None,
            },
        )
        .await;
    let gateway = Arc::new(HmacGateway::new("race-secret"));
    let platform_owner = Owner::new(OwnerId::from_label("platform"), OwnerKind::Admin);
    let orders = OrderWorkflow::new(
        Arc::new(CancelRacingOrderStore {
            inner: InMemoryOrderStore::new(),
            fired: AtomicBool::new(false),
        }),
        Arc::clone(&ledger),
        Arc::clone(&gateway) as _,
        Arc::new(catalog),
        Arc::new(InMemoryEnrollments::new()),
        Arc::new(LogNotifier::new()),
        platform_owner,
    );

    let buyer = student();
    let order = orders
        .initiate_checkout(buyer, &[course], None, PaymentMethod::Gateway)
        .await
        .unwrap();
    let intent_id = order.gateway_order_id.clone().unwrap();
    let signature = gateway.sign(&intent_id, "pay_5");

    let result = orders.complete_checkout(order.id, "pay_5", &signature).await;
    assert!(matches!(result, Err(CoreError::Conflict(_))));

    // The cancel won and the payment credit was taken back out.
    let stored = orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Cancelled);
    assert_eq!(
        ledger.balance(platform_owner.id).await.unwrap(),
        Balance::ZERO
    );
}

#[tokio::test]
async fn test_stale_pending_sweep_window() {
    let env = TestEnv::new();
    let buyer = student();
    let course = env.seed_course(dec!(300), None).await;

    let order = env
        .platform
        .orders
        .initiate_checkout(buyer, &[course], None, PaymentMethod::Gateway)
        .await
        .unwrap();

    let stale_now = env
        .platform
        .orders
        .list_stale_pending(Duration::zero())
        .await
        .unwrap();
    assert_eq!(stale_now.len(), 1);
    assert_eq!(stale_now[0].id, order.id);

    // Orders younger than the window are not stale.
    assert!(env
        .platform
        .orders
        .list_stale_pending(Duration::hours(1))
        .await
        .unwrap()
        .is_empty());
}
