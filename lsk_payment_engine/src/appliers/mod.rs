//! Side-effect appliers: the components that translate one ledger event into mutations of other domain state.
//!
//! All appliers share two rules. They only ever run *after* a transaction record for the same payment id has been
//! durably written (write-ahead-record discipline), and they decide idempotency from the **current stored state** of
//! their target resource, never from caller-supplied "have I done this before" flags. That makes a retry after a
//! partial failure safe: the ledger row survives, and re-applying converges instead of double-crediting.

mod escrow;
mod wallet;

pub use escrow::{EscrowReleaser, ReleaseOutcome};
use thiserror::Error;
pub use wallet::WalletUpdater;

use crate::traits::DocumentStoreError;

#[derive(Debug, Clone, Error)]
pub enum ApplierError {
    /// An existing wallet holds a different currency than the incoming deposit. Silently coercing would corrupt the
    /// balance, so this is fatal and a human must reconcile.
    #[error("Wallet for user {owner_user_id} is denominated in {wallet_currency}, but the payment is in {payment_currency}")]
    CurrencyMismatch { owner_user_id: String, wallet_currency: String, payment_currency: String },
    #[error("Listing {0} does not exist")]
    ListingNotFound(String),
    #[error("Listing {id} is in state '{state}', which cannot be escrow-released")]
    IllegalListingState { id: String, state: String },
    #[error(transparent)]
    StoreError(#[from] DocumentStoreError),
}
