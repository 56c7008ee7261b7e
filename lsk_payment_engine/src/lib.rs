//! Landsale.lk Payment Reconciliation Engine
//!
//! This library contains the core logic for reconciling asynchronous payment notifications from the PayHere gateway
//! against the marketplace's document store. It is transport-agnostic: the HTTP surface lives in
//! `lsk_payment_server`, which hands this engine pre-verified payment events.
//!
//! The library is divided into three main sections:
//! 1. Storage ([`mod@traits`] and [`mod@store`]). The backing store is an Appwrite-style hosted document database,
//!    modelled by the [`traits::DocumentStore`] trait. It offers no multi-document transactions and no unique-key
//!    enforcement, which shapes everything else: the ledger narrows the duplicate-write race with a check-then-create,
//!    and every side-effect applier is independently idempotent against the stored state of its target resource.
//! 2. The ledger ([`TransactionLedger`]), an append-only record of completed financial events keyed by the gateway's
//!    payment id. It is the audit source of truth and the idempotency anchor for the whole subsystem.
//! 3. The flow API ([`PaymentFlowApi`]), which classifies each event by its payment purpose and dispatches to the
//!    matching side-effect applier (wallet credit or escrow release).
pub mod appliers;
pub mod db_types;
pub mod helpers;
pub mod router;
pub mod store;
pub mod traits;

mod api;
mod ledger;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{PaymentFlowApi, PaymentFlowError, ProcessingOutcome, SideEffect};
pub use appliers::{ApplierError, EscrowReleaser, ReleaseOutcome, WalletUpdater};
pub use ledger::{LedgerError, TransactionLedger};
pub use store::AppwriteStore;
