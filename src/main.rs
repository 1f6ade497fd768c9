use clap::Parser;
use coursepay::application::ledger::WalletLedger;
use coursepay::domain::money::Amount;
use coursepay::domain::ports::WalletStoreRef;
use coursepay::domain::wallet::{Owner, OwnerId};
use coursepay::error::CoreError;
use coursepay::infrastructure::in_memory::InMemoryWalletStore;
use coursepay::interfaces::csv::balance_writer::{BalanceRow, BalanceWriter};
use coursepay::interfaces::csv::entry_reader::{LedgerOp, LedgerOpReader, OpKind};
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Replays a ledger-operations CSV through the wallet ledger and prints the
/// final balances. Reconciliation tooling; the CSV carries
/// `op, owner, kind, amount, ref` rows with op ∈ {init, credit, debit}.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input ledger operations CSV file
    input: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let store: WalletStoreRef = Arc::new(InMemoryWalletStore::new());
    let ledger = WalletLedger::new(store);

    // Labels in the file map to deterministic owner ids; remember the
    // mapping so the output can use labels again.
    let mut labels: BTreeMap<String, OwnerId> = BTreeMap::new();

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = LedgerOpReader::new(file);
    for op_result in reader.operations() {
        match op_result {
            Ok(op) => {
                if let Err(e) = apply_op(&ledger, &mut labels, op).await {
                    eprintln!("Error applying operation: {e}");
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {e}");
            }
        }
    }

    let wallets = ledger.list_wallets().await.into_diagnostic()?;
    let by_owner: BTreeMap<OwnerId, _> = wallets.into_iter().map(|w| (w.owner, w)).collect();
    let rows: Vec<BalanceRow> = labels
        .iter()
        .filter_map(|(label, id)| {
            by_owner.get(id).map(|wallet| BalanceRow {
                owner: label.clone(),
                kind: wallet.owner_kind,
                balance: wallet.balance,
            })
        })
        .collect();

    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_balances(&rows).into_diagnostic()?;

    Ok(())
}

async fn apply_op(
    ledger: &WalletLedger,
    labels: &mut BTreeMap<String, OwnerId>,
    op: LedgerOp,
) -> coursepay::error::Result<()> {
    let owner_id = *labels
        .entry(op.owner.clone())
        .or_insert_with(|| OwnerId::from_label(&op.owner));

    match op.op {
        OpKind::Init => {
            let kind = op
                .kind
                .ok_or_else(|| CoreError::validation("init requires an owner kind"))?;
            ledger.initialize(Owner::new(owner_id, kind)).await?;
        }
        OpKind::Credit => {
            let kind = op
                .kind
                .ok_or_else(|| CoreError::validation("credit requires an owner kind"))?;
            let amount = required_amount(op.amount)?;
            let external_ref = required_ref(op.external_ref)?;
            ledger
                .credit(
                    Owner::new(owner_id, kind),
                    amount,
                    "replayed credit",
                    &external_ref,
                )
                .await?;
        }
        OpKind::Debit => {
            let amount = required_amount(op.amount)?;
            let external_ref = required_ref(op.external_ref)?;
            ledger
                .debit(owner_id, amount, "replayed debit", &external_ref)
                .await?;
        }
    }
    Ok(())
}

fn required_amount(amount: Option<rust_decimal::Decimal>) -> coursepay::error::Result<Amount> {
    let value = amount.ok_or_else(|| CoreError::validation("operation requires an amount"))?;
    Amount::new(value)
}

fn required_ref(external_ref: Option<String>) -> coursepay::error::Result<String> {
    external_ref
        .filter(|r| !r.is_empty())
        .ok_or_else(|| CoreError::validation("operation requires an idempotency ref"))
}
