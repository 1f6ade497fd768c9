//! Application layer: the workflow services that orchestrate the ports.
//!
//! Every monetary mutation funnels through [`ledger::WalletLedger`]; the
//! order, membership and withdrawal workflows own their state machines and
//! call the ledger for the wallet legs. [`platform::PaymentPlatform`] is the
//! composition root that wires everything once at startup.

pub mod checkout;
pub mod ledger;
pub mod membership;
pub mod platform;
pub mod withdrawal;
