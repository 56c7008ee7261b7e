use log::{debug, info};
use lsk_common::Money;
use serde_json::json;

use crate::{
    appliers::ApplierError,
    db_types::Wallet,
    store::collections,
    traits::{to_document_fields, DocumentStore, Filter},
};

/// Credits a user's stored-value balance, creating the wallet lazily on first deposit.
pub struct WalletUpdater<B> {
    store: B,
}

impl<B> WalletUpdater<B> {
    pub fn new(store: B) -> Self {
        Self { store }
    }
}

impl<B> WalletUpdater<B>
where B: DocumentStore
{
    /// Increase `balance` and `lifetime_deposits` by `amount`, or create a wallet holding `amount` if the user has
    /// none yet. A currency mismatch against an existing wallet is fatal and never coerced.
    ///
    /// The store only offers single-document read-modify-write here, so two racing credits for *different* payment
    /// ids can still interleave; the ledger's per-payment-id dedup is what keeps the same payment from being
    /// credited twice.
    pub async fn credit(
        &self,
        owner_user_id: &str,
        amount: Money,
        currency_code: &str,
    ) -> Result<Wallet, ApplierError> {
        let docs =
            self.store.find(collections::WALLETS, &[Filter::equal("owner_user_id", owner_user_id)]).await?;
        match docs.first() {
            Some(doc) => {
                let wallet = doc.parse::<Wallet>()?;
                if wallet.currency_code != currency_code {
                    return Err(ApplierError::CurrencyMismatch {
                        owner_user_id: owner_user_id.to_string(),
                        wallet_currency: wallet.currency_code,
                        payment_currency: currency_code.to_string(),
                    });
                }
                let updated = Wallet {
                    balance: wallet.balance + amount,
                    lifetime_deposits: wallet.lifetime_deposits + amount,
                    ..wallet
                };
                self.store
                    .update(
                        collections::WALLETS,
                        &doc.id,
                        json!({ "balance": updated.balance, "lifetime_deposits": updated.lifetime_deposits }),
                    )
                    .await?;
                debug!("💰️ Credited {amount} {currency_code} to user {owner_user_id}. New balance: {}", updated.balance);
                Ok(updated)
            },
            None => {
                let wallet = Wallet {
                    owner_user_id: owner_user_id.to_string(),
                    balance: amount,
                    lifetime_deposits: amount,
                    currency_code: currency_code.to_string(),
                    is_active: true,
                };
                self.store.create(collections::WALLETS, None, to_document_fields(&wallet)?).await?;
                info!("💰️ Created a new {currency_code} wallet for user {owner_user_id} with opening balance {amount}");
                Ok(wallet)
            },
        }
    }
}
