use crate::application::ledger::WalletLedger;
use crate::domain::money::Amount;
use crate::domain::order::{CourseId, LineItem, Order, OrderId, OrderStatus, PaymentMethod};
use crate::domain::ports::{
    CatalogReaderRef, EnrollmentsRef, NotifierRef, OrderStoreRef, PaymentGatewayRef,
};
use crate::domain::wallet::Owner;
use crate::error::{CoreError, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// State machine for course-purchase orders.
///
/// `Pending` transitions exactly once to `Success`, `Failed` or `Cancelled`;
/// every transition is a compare-and-set on the order store.
pub struct OrderWorkflow {
    orders: OrderStoreRef,
    ledger: Arc<WalletLedger>,
    gateway: PaymentGatewayRef,
    catalog: CatalogReaderRef,
    enrollments: EnrollmentsRef,
    notifier: NotifierRef,
    platform: Owner,
}

impl OrderWorkflow {
    pub fn new(
        orders: OrderStoreRef,
        ledger: Arc<WalletLedger>,
        gateway: PaymentGatewayRef,
        catalog: CatalogReaderRef,
        enrollments: EnrollmentsRef,
        notifier: NotifierRef,
        platform: Owner,
    ) -> Self {
        Self {
            orders,
            ledger,
            gateway,
            catalog,
            enrollments,
            notifier,
            platform,
        }
    }

    /// Validates ownership, snapshots prices and creates a `Pending` order.
    ///
    /// Gateway payment mints an intent and leaves the order `Pending` until
    /// the confirmation callback arrives. Wallet payment settles
    /// synchronously: debit the buyer, credit the platform, `Success`.
    pub async fn initiate_checkout(
        &self,
        buyer: Owner,
        courses: &[CourseId],
        coupon_discount: Option<Amount>,
        method: PaymentMethod,
    ) -> Result<Order> {
        let mut line_items = Vec::with_capacity(courses.len());
        for course in courses {
            if self.enrollments.is_enrolled(buyer.id, *course).await? {
                return Err(CoreError::conflict(format!(
                    "buyer already owns course {course}"
                )));
            }
            let pricing = self
                .catalog
                .course_pricing(*course)
                .await?
                .ok_or_else(|| CoreError::not_found("course", course))?;
            line_items.push(LineItem {
                course_id: *course,
                list_price: pricing.list_price,
                offer_price: pricing.offer_price,
            });
        }

        let mut order = Order::new(buyer, line_items, coupon_discount, method)?;

        match method {
            PaymentMethod::Gateway => {
                let intent = self.gateway.create_intent(order.total).await?;
                order.gateway_order_id = Some(intent.intent_id);
                self.orders.insert(order.clone()).await?;
                info!(order = %order.id, total = %order.total, "gateway checkout initiated");
                Ok(order)
            }
            PaymentMethod::Wallet => {
                self.orders.insert(order.clone()).await?;
                self.settle_with_wallet(order).await
            }
        }
    }

    /// The wallet-to-platform transfer for a wallet checkout: debit the
    /// buyer, credit the platform, compensate the debit if the credit leg
    /// fails.
    async fn settle_with_wallet(&self, mut order: Order) -> Result<Order> {
        let debit_ref = format!("order-{}-debit", order.id);
        match self
            .ledger
            .debit(order.buyer.id, order.total, "course purchase", &debit_ref)
            .await
        {
            Ok(_) => order.wallet_debit_ref = Some(debit_ref),
            Err(err) => {
                // Insufficient funds or a missing wallet: either way the
                // order is closed out rather than stranded `Pending`.
                order.status = OrderStatus::Failed;
                self.orders.update_if(OrderStatus::Pending, order).await?;
                return Err(err);
            }
        }

        let credit_ref = format!("order-{}-platform", order.id);
        if let Err(err) = self
            .ledger
            .credit(self.platform, order.total, "course sale", &credit_ref)
            .await
        {
            warn!(order = %order.id, %err, "platform credit leg failed, refunding buyer");
            let refund_ref = format!("order-{}-refund", order.id);
            self.ledger
                .credit(
                    order.buyer,
                    order.total,
                    "refund: checkout rolled back",
                    &refund_ref,
                )
                .await
                .map_err(|refund_err| {
                    error!(order = %order.id, %refund_err, "compensation failed");
                    CoreError::Internal(format!(
                        "checkout transfer failed and compensation also failed: {refund_err}"
                    ))
                })?;
            order.status = OrderStatus::Failed;
            self.orders.update_if(OrderStatus::Pending, order).await?;
            return Err(CoreError::TransferFailed(
                "platform credit failed; buyer debit was refunded".into(),
            ));
        }

        order.status = OrderStatus::Success;
        let order = self.orders.update_if(OrderStatus::Pending, order).await?;
        let split = order.revenue_split()?;
        info!(
            order = %order.id,
            total = %order.total,
            platform_share = %split.platform_total,
            "wallet checkout settled"
        );

        let courses: Vec<CourseId> = order.line_items.iter().map(|i| i.course_id).collect();
        self.enrollments.enroll(order.buyer.id, &courses).await?;
        self.notifier.send_receipt(&order).await;
        Ok(order)
    }

    /// Confirms a gateway payment. Only valid on a `Pending` order; a repeat
    /// call on an already-`Success` order is a no-op returning the existing
    /// result, and the platform credit is keyed by `payment_id` so it cannot
    /// double-apply.
    pub async fn complete_checkout(
        &self,
        id: OrderId,
        payment_id: &str,
        signature: &str,
    ) -> Result<Order> {
        let mut order = self
            .orders
            .get(id)
            .await?
            .ok_or_else(|| CoreError::not_found("order", id))?;

        match order.status {
            OrderStatus::Success => return Ok(order),
            OrderStatus::Failed | OrderStatus::Cancelled => {
                return Err(CoreError::conflict(format!(
                    "order {id} already {}",
                    order.status
                )));
            }
            OrderStatus::Pending => {}
        }

        let intent_id = order
            .gateway_order_id
            .clone()
            .ok_or_else(|| CoreError::validation("order was not initiated for gateway payment"))?;

        if !self
            .gateway
            .verify_signature(&intent_id, payment_id, signature)
        {
            return Err(CoreError::SignatureMismatch);
        }

        self.ledger
            .credit(self.platform, order.total, "course sale", payment_id)
            .await?;

        let total = order.total;
        order.status = OrderStatus::Success;
        let order = match self.orders.update_if(OrderStatus::Pending, order).await {
            Ok(order) => order,
            Err(CoreError::Conflict(_)) => {
                // Lost the race against a concurrent confirmation; if that
                // one won cleanly this call is a no-op.
                let current = self
                    .orders
                    .get(id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("order", id))?;
                if current.status == OrderStatus::Success {
                    return Ok(current);
                }
                // A cancel or failure won instead; take the payment credit
                // back out so the platform keeps no money for a dead order.
                warn!(order = %id, status = %current.status, "confirmation raced a terminal transition, reversing credit");
                self.ledger
                    .debit(
                        self.platform.id,
                        total,
                        "reversal: confirmation raced a terminal transition",
                        &format!("{payment_id}-reversal"),
                    )
                    .await
                    .map_err(|comp_err| {
                        error!(order = %id, %comp_err, "failed to reverse platform credit");
                        CoreError::Internal(format!(
                            "confirmation raced and the credit reversal also failed: {comp_err}"
                        ))
                    })?;
                return Err(CoreError::conflict(format!(
                    "order {id} moved to {} during confirmation",
                    current.status
                )));
            }
            Err(err) => return Err(err),
        };
        let split = order.revenue_split()?;
        info!(
            order = %order.id,
            total = %order.total,
            platform_share = %split.platform_total,
            "gateway checkout completed"
        );

        let courses: Vec<CourseId> = order.line_items.iter().map(|i| i.course_id).collect();
        self.enrollments.enroll(order.buyer.id, &courses).await?;
        self.notifier.send_receipt(&order).await;
        Ok(order)
    }

    /// Cancels a `Pending` order, reversing any wallet debit already taken.
    pub async fn cancel_pending_order(&self, id: OrderId) -> Result<Order> {
        self.terminate(id, OrderStatus::Cancelled).await
    }

    /// Fails a `Pending` order (e.g. after a caller-side gateway timeout),
    /// reversing any wallet debit already taken.
    pub async fn mark_order_as_failed(&self, id: OrderId) -> Result<Order> {
        self.terminate(id, OrderStatus::Failed).await
    }

    async fn terminate(&self, id: OrderId, target: OrderStatus) -> Result<Order> {
        let mut order = self
            .orders
            .get(id)
            .await?
            .ok_or_else(|| CoreError::not_found("order", id))?;
        if order.status != OrderStatus::Pending {
            return Err(CoreError::conflict(format!(
                "order {id} already {}",
                order.status
            )));
        }

        if order.wallet_debit_ref.is_some() {
            let refund_ref = format!("order-{}-refund", order.id);
            self.ledger
                .credit(order.buyer, order.total, "refund: order reversed", &refund_ref)
                .await?;
        }

        order.status = target;
        let order = self.orders.update_if(OrderStatus::Pending, order).await?;
        info!(order = %order.id, status = %order.status, "order terminated");
        Ok(order)
    }

    pub async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        self.orders.get(id).await
    }

    /// Orders stuck `Pending` for longer than `older_than`; input for the
    /// external reconciliation sweep that chases lost confirmations.
    pub async fn list_stale_pending(&self, older_than: Duration) -> Result<Vec<Order>> {
        self.orders.list_stale_pending(Utc::now() - older_than).await
    }
}
