use crate::application::ledger::WalletLedger;
use crate::domain::membership::{
    InstructorProfile, MembershipOrder, MembershipOrderId, MembershipPlan, MembershipStatus, PlanId,
};
use crate::domain::ports::{
    InstructorDirectoryRef, MembershipOrderStoreRef, NotifierRef, PaymentGatewayRef, PlanCatalogRef,
};
use crate::domain::wallet::{Owner, OwnerId, OwnerKind};
use crate::error::{CoreError, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// State machine for instructor membership purchases, including the
/// wallet-to-wallet transfer saga.
pub struct MembershipWorkflow {
    orders: MembershipOrderStoreRef,
    plans: PlanCatalogRef,
    instructors: InstructorDirectoryRef,
    ledger: Arc<WalletLedger>,
    gateway: PaymentGatewayRef,
    notifier: NotifierRef,
    platform: Owner,
}

impl MembershipWorkflow {
    pub fn new(
        orders: MembershipOrderStoreRef,
        plans: PlanCatalogRef,
        instructors: InstructorDirectoryRef,
        ledger: Arc<WalletLedger>,
        gateway: PaymentGatewayRef,
        notifier: NotifierRef,
        platform: Owner,
    ) -> Self {
        Self {
            orders,
            plans,
            instructors,
            ledger,
            gateway,
            notifier,
            platform,
        }
    }

    /// Gateway purchase path, step 1: mint an intent sized to the plan price
    /// and persist a `Pending` membership order.
    pub async fn initiate_checkout(
        &self,
        instructor: OwnerId,
        plan_id: PlanId,
    ) -> Result<MembershipOrder> {
        self.ensure_no_active_membership(instructor).await?;
        let plan = self.require_plan(plan_id).await?;

        let intent = self.gateway.create_intent(plan.price).await?;
        let order = MembershipOrder::pending(instructor, &plan, intent.intent_id);
        self.orders.insert(order.clone()).await?;
        info!(order = %order.id, %instructor, plan = %plan_id, "membership checkout initiated");
        Ok(order)
    }

    /// Gateway purchase path, step 2: verify the confirmation signature and
    /// activate. A duplicate callback on an already-`Paid` order is a no-op
    /// returning the existing order.
    pub async fn verify_and_activate(
        &self,
        order_id: MembershipOrderId,
        payment_id: &str,
        signature: &str,
    ) -> Result<MembershipOrder> {
        let mut order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("membership order", order_id))?;

        match order.status {
            MembershipStatus::Paid => return Ok(order),
            MembershipStatus::Failed | MembershipStatus::Cancelled => {
                return Err(CoreError::conflict(format!(
                    "membership order {order_id} is no longer payable"
                )));
            }
            MembershipStatus::Pending => {}
        }

        let intent_id = order
            .gateway_order_id
            .clone()
            .ok_or_else(|| CoreError::validation("membership order has no gateway intent"))?;
        if !self
            .gateway
            .verify_signature(&intent_id, payment_id, signature)
        {
            return Err(CoreError::SignatureMismatch);
        }

        let plan = self.require_plan(order.plan_id).await?;

        // Credit before the status transition: if the credit fails the order
        // stays `Pending` and the retried callback re-attempts it, while the
        // payment-id key keeps a duplicate from double-applying.
        self.ledger
            .credit(self.platform, order.price, "membership sale", payment_id)
            .await?;

        let start = Utc::now();
        let end = start + Duration::days(plan.duration_days);
        order.status = MembershipStatus::Paid;
        order.start_date = Some(start);
        order.end_date = Some(end);

        let order = match self.orders.update_if(MembershipStatus::Pending, order).await {
            Ok(order) => order,
            Err(CoreError::Conflict(_)) => {
                let current = self
                    .orders
                    .get(order_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("membership order", order_id))?;
                if current.status == MembershipStatus::Paid {
                    return Ok(current);
                }
                return Err(CoreError::conflict(format!(
                    "membership order {order_id} changed during confirmation"
                )));
            }
            Err(err) => return Err(err),
        };

        self.instructors.set_mentor(order.instructor, end).await?;
        info!(order = %order.id, instructor = %order.instructor, "membership activated");
        self.notifier.send_membership_confirmation(&order).await;
        Ok(order)
    }

    /// Wallet purchase path: a two-leg transfer saga.
    ///
    /// Leg 1 debits the instructor; leg 2 credits the platform. If leg 2
    /// fails, leg 1 is compensated before any error surfaces, so the net
    /// observable wallet state returns exactly to the pre-purchase balance
    /// and no membership order is persisted.
    pub async fn purchase_with_wallet(
        &self,
        instructor: OwnerId,
        plan_id: PlanId,
    ) -> Result<MembershipOrder> {
        self.ensure_no_active_membership(instructor).await?;
        let plan = self.require_plan(plan_id).await?;
        if let Some(existing) = self.orders.find_occupying(instructor, plan_id).await? {
            return Err(CoreError::conflict(format!(
                "membership order {} already {:?} for this plan",
                existing.id, existing.status
            )));
        }

        let instructor_owner = Owner::new(instructor, OwnerKind::Instructor);
        let token = Uuid::new_v4().simple().to_string();

        self.ledger
            .debit(
                instructor,
                plan.price,
                "membership purchase",
                &format!("memb-{token}-debit"),
            )
            .await?;

        if let Err(err) = self
            .ledger
            .credit(
                self.platform,
                plan.price,
                "membership sale",
                &format!("memb-{token}-credit"),
            )
            .await
        {
            warn!(%instructor, %err, "platform credit leg failed, compensating instructor debit");
            self.ledger
                .credit(
                    instructor_owner,
                    plan.price,
                    "refund: membership purchase rolled back",
                    &format!("memb-{token}-reversal"),
                )
                .await
                .map_err(|comp_err| {
                    error!(%instructor, %comp_err, "compensation failed");
                    CoreError::Internal(format!(
                        "membership transfer failed and compensation also failed: {comp_err}"
                    ))
                })?;
            return Err(CoreError::TransferFailed(
                "platform credit failed; instructor debit was refunded".into(),
            ));
        }

        let start = Utc::now();
        let end = start + Duration::days(plan.duration_days);
        let order = MembershipOrder::paid(instructor, &plan, start, end);
        if let Err(err) = self.orders.insert(order.clone()).await {
            // Both legs are committed; unwind them before surfacing the
            // conflict so no money is stranded on the platform wallet.
            warn!(%instructor, %err, "membership insert failed after transfer, unwinding");
            if let Err(unwind_err) = self
                .ledger
                .debit(
                    self.platform.id,
                    plan.price,
                    "reversal: duplicate membership purchase",
                    &format!("memb-{token}-unwind"),
                )
                .await
            {
                error!(%unwind_err, "failed to reverse platform credit");
            }
            if let Err(unwind_err) = self
                .ledger
                .credit(
                    instructor_owner,
                    plan.price,
                    "refund: membership purchase rolled back",
                    &format!("memb-{token}-reversal"),
                )
                .await
            {
                error!(%unwind_err, "failed to refund instructor debit");
            }
            return Err(err);
        }

        self.instructors.set_mentor(instructor, end).await?;
        info!(order = %order.id, %instructor, "membership purchased from wallet");
        self.notifier.send_membership_confirmation(&order).await;
        Ok(order)
    }

    pub async fn get(&self, id: MembershipOrderId) -> Result<Option<MembershipOrder>> {
        self.orders.get(id).await
    }

    /// Profiles whose membership expires within the next `window_days`.
    /// Exposed for the external expiry scheduler; the core owns no timer.
    pub async fn list_expiring_soon(&self, window_days: i64) -> Result<Vec<InstructorProfile>> {
        let until = Utc::now() + Duration::days(window_days);
        self.instructors.list_expiring_within(until).await
    }

    /// Sends a fire-and-forget reminder to every instructor expiring within
    /// the window. Returns how many reminders went out.
    pub async fn send_expiry_reminders(&self, window_days: i64) -> Result<usize> {
        let expiring = self.list_expiring_soon(window_days).await?;
        let mut sent = 0;
        for profile in &expiring {
            if let Some(expiry) = profile.membership_expiry {
                self.notifier.send_expiry_reminder(profile.id, expiry).await;
                sent += 1;
            }
        }
        Ok(sent)
    }

    /// Clears mentor status once the membership has lapsed. A future expiry
    /// is a `Conflict`; an instructor with no membership is a no-op.
    pub async fn expire_membership(&self, instructor: OwnerId) -> Result<()> {
        let profile = self
            .instructors
            .get(instructor)
            .await?
            .ok_or_else(|| CoreError::not_found("instructor", instructor))?;

        match profile.membership_expiry {
            None => Ok(()),
            Some(expiry) if expiry > Utc::now() => Err(CoreError::conflict(format!(
                "membership of instructor {instructor} has not expired yet"
            ))),
            Some(_) => {
                self.instructors.clear_mentor(instructor).await?;
                info!(%instructor, "membership expired");
                Ok(())
            }
        }
    }

    async fn ensure_no_active_membership(&self, instructor: OwnerId) -> Result<InstructorProfile> {
        let profile = self
            .instructors
            .get(instructor)
            .await?
            .ok_or_else(|| CoreError::not_found("instructor", instructor))?;
        if profile.has_active_membership(Utc::now()) {
            return Err(CoreError::conflict(format!(
                "instructor {instructor} already holds an active membership"
            )));
        }
        Ok(profile)
    }

    async fn require_plan(&self, plan_id: PlanId) -> Result<MembershipPlan> {
        self.plans
            .get(plan_id)
            .await?
            .ok_or_else(|| CoreError::not_found("membership plan", plan_id))
    }
}
