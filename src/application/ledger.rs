use crate::domain::money::{Amount, Balance};
use crate::domain::ports::WalletStoreRef;
use crate::domain::wallet::{LedgerEntry, Owner, OwnerId, Wallet};
use crate::error::Result;
use tracing::info;

/// The wallet ledger: the only component allowed to mutate balances.
///
/// Atomicity of the balance guard lives in the store; this service shapes the
/// entries, carries the idempotency keys through and logs every mutation.
pub struct WalletLedger {
    store: WalletStoreRef,
}

impl WalletLedger {
    pub fn new(store: WalletStoreRef) -> Self {
        Self { store }
    }

    /// Creates a zero-balance wallet if none exists. Idempotent.
    pub async fn initialize(&self, owner: Owner) -> Result<Wallet> {
        self.store.initialize(owner).await
    }

    /// Credits the owner's wallet, creating it lazily. Safe to call twice
    /// with the same `external_ref` without double-crediting.
    pub async fn credit(
        &self,
        owner: Owner,
        amount: Amount,
        description: &str,
        external_ref: &str,
    ) -> Result<Wallet> {
        let entry = LedgerEntry::credit(amount, description, external_ref);
        let wallet = self.store.apply_credit(owner, entry).await?;
        info!(owner = %owner.id, %amount, external_ref, "wallet credited");
        Ok(wallet)
    }

    /// Debits the owner's wallet in one atomic conditional update.
    pub async fn debit(
        &self,
        owner: OwnerId,
        amount: Amount,
        description: &str,
        external_ref: &str,
    ) -> Result<Wallet> {
        let entry = LedgerEntry::debit(amount, description, external_ref);
        let wallet = self.store.apply_debit(owner, entry).await?;
        info!(owner = %owner, %amount, external_ref, "wallet debited");
        Ok(wallet)
    }

    /// Current balance; zero for an owner that was never credited.
    pub async fn balance(&self, owner: OwnerId) -> Result<Balance> {
        Ok(self
            .store
            .get(owner)
            .await?
            .map(|w| w.balance)
            .unwrap_or(Balance::ZERO))
    }

    /// A page of the owner's entries, newest first.
    pub async fn entries(
        &self,
        owner: OwnerId,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let wallet = self.store.get(owner).await?;
        let Some(wallet) = wallet else {
            return Ok(Vec::new());
        };
        Ok(wallet
            .entries
            .iter()
            .rev()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect())
    }

    pub async fn wallet(&self, owner: OwnerId) -> Result<Option<Wallet>> {
        self.store.get(owner).await
    }

    /// Every wallet in the store. Used by the replay CLI's final dump.
    pub async fn list_wallets(&self) -> Result<Vec<Wallet>> {
        self.store.list_all().await
    }
}
