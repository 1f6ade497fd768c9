use crate::application::ledger::WalletLedger;
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::{InstructorDirectoryRef, WithdrawalStoreRef};
use crate::domain::wallet::{Owner, OwnerId, OwnerKind};
use crate::domain::withdrawal::{WithdrawalId, WithdrawalRequest, WithdrawalStatus};
use crate::error::{CoreError, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// State machine for instructor payout requests.
///
/// `Pending → {Approved, Rejected}`; a `Rejected` request can be reopened
/// into a fresh `Pending` cycle via [`WithdrawalWorkflow::retry`].
pub struct WithdrawalWorkflow {
    requests: WithdrawalStoreRef,
    instructors: InstructorDirectoryRef,
    ledger: Arc<WalletLedger>,
}

impl WithdrawalWorkflow {
    pub fn new(
        requests: WithdrawalStoreRef,
        instructors: InstructorDirectoryRef,
        ledger: Arc<WalletLedger>,
    ) -> Self {
        Self {
            requests,
            instructors,
            ledger,
        }
    }

    /// Creates a `Pending` request. Requires a complete bank-account profile
    /// (snapshotted onto the request) and a covering balance. The balance
    /// check is advisory only: nothing is held, and it is re-checked at
    /// approval time.
    pub async fn create(&self, instructor: OwnerId, amount: Amount) -> Result<WithdrawalRequest> {
        let profile = self
            .instructors
            .get(instructor)
            .await?
            .ok_or_else(|| CoreError::not_found("instructor", instructor))?;
        let bank_account = profile.bank_account.ok_or_else(|| {
            CoreError::validation("a complete bank-account profile is required for withdrawal")
        })?;

        let balance = self.ledger.balance(instructor).await?;
        if balance < Balance::from(amount) {
            return Err(CoreError::InsufficientFunds {
                requested: amount.value(),
                available: balance.value(),
            });
        }

        let request = WithdrawalRequest::pending(instructor, amount, bank_account);
        self.requests.insert(request.clone()).await?;
        info!(request = %request.id, %instructor, %amount, "withdrawal requested");
        Ok(request)
    }

    /// Approves a `Pending` request: re-checks the balance by debiting the
    /// wallet atomically, then transitions to `Approved`. If the balance has
    /// dropped since creation the request stays `Pending` and
    /// `InsufficientFunds` is returned for the admin to reconsider.
    pub async fn approve(
        &self,
        id: WithdrawalId,
        admin: OwnerId,
        remarks: Option<String>,
    ) -> Result<WithdrawalRequest> {
        let mut request = self.require_in(id, WithdrawalStatus::Pending).await?;
        let instructor = request.instructor;
        let amount = request.amount;

        self.ledger
            .debit(instructor, amount, "withdrawal payout", &format!("wd-{id}"))
            .await?;

        request.status = WithdrawalStatus::Approved;
        request.admin = Some(admin);
        request.remarks = remarks;
        let request = match self
            .requests
            .update_if(WithdrawalStatus::Pending, request)
            .await
        {
            Ok(request) => request,
            Err(err @ CoreError::Conflict(_)) => {
                // A concurrent transition won between the debit and the
                // status change; give the payout back before surfacing it.
                warn!(request = %id, "approval lost a race, refunding the payout debit");
                self.ledger
                    .credit(
                        Owner::new(instructor, OwnerKind::Instructor),
                        amount,
                        "refund: withdrawal approval raced",
                        &format!("wd-{id}-reversal"),
                    )
                    .await
                    .map_err(|comp_err| {
                        error!(request = %id, %comp_err, "failed to refund payout debit");
                        CoreError::Internal(format!(
                            "withdrawal approval raced and the refund also failed: {comp_err}"
                        ))
                    })?;
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        info!(request = %request.id, %admin, "withdrawal approved");
        Ok(request)
    }

    /// Rejects a `Pending` request. No wallet effect.
    pub async fn reject(
        &self,
        id: WithdrawalId,
        admin: OwnerId,
        remarks: Option<String>,
    ) -> Result<WithdrawalRequest> {
        let mut request = self.require_in(id, WithdrawalStatus::Pending).await?;

        request.status = WithdrawalStatus::Rejected;
        request.admin = Some(admin);
        request.remarks = remarks;
        let request = self
            .requests
            .update_if(WithdrawalStatus::Pending, request)
            .await?;
        info!(request = %request.id, %admin, "withdrawal rejected");
        Ok(request)
    }

    /// Reopens a `Rejected` request into a new `Pending` cycle, optionally
    /// with a new amount, re-validating the balance.
    pub async fn retry(
        &self,
        id: WithdrawalId,
        new_amount: Option<Amount>,
    ) -> Result<WithdrawalRequest> {
        let mut request = self.require_in(id, WithdrawalStatus::Rejected).await?;
        let amount = new_amount.unwrap_or(request.amount);

        let balance = self.ledger.balance(request.instructor).await?;
        if balance < Balance::from(amount) {
            return Err(CoreError::InsufficientFunds {
                requested: amount.value(),
                available: balance.value(),
            });
        }

        request.amount = amount;
        request.status = WithdrawalStatus::Pending;
        request.admin = None;
        request.remarks = None;
        let request = self
            .requests
            .update_if(WithdrawalStatus::Rejected, request)
            .await?;
        info!(request = %request.id, %amount, "withdrawal reopened");
        Ok(request)
    }

    pub async fn get(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        self.requests.get(id).await
    }

    async fn require_in(
        &self,
        id: WithdrawalId,
        expected: WithdrawalStatus,
    ) -> Result<WithdrawalRequest> {
        let request = self
            .requests
            .get(id)
            .await?
            .ok_or_else(|| CoreError::not_found("withdrawal request", id))?;
        if request.status != expected {
            return Err(CoreError::conflict(format!(
                "withdrawal request {id} is {:?}, expected {:?}",
                request.status, expected
            )));
        }
        Ok(request)
    }
}
