use chrono::Utc;
use log::{debug, info};
use thiserror::Error;

use crate::{
    db_types::{NewTransaction, PaymentId, TransactionRecord, TransactionStatus},
    store::collections,
    traits::{to_document_fields, DocumentStore, DocumentStoreError, Filter},
};

/// The append-only ledger of completed payment events.
///
/// The single correctness anchor of the subsystem is that `gateway_payment_id` appears at most once in the
/// `transactions` collection. The store cannot enforce that for us, so [`TransactionLedger::append`] re-checks
/// before creating. This narrows the duplicate-write race to the window between the check and the create; it does
/// not close it. Under truly concurrent duplicate delivery a second row can still slip in, which degrades to a
/// duplicate *audit* row only: the side-effect appliers key their own idempotency off the stored state of their
/// target resources, so a visible double-credit is still prevented downstream.
pub struct TransactionLedger<B> {
    store: B,
}

impl<B> TransactionLedger<B> {
    pub fn new(store: B) -> Self {
        Self { store }
    }
}

impl<B> TransactionLedger<B>
where B: DocumentStore
{
    /// Advisory idempotency check: has a record for this gateway payment id already been written?
    ///
    /// This exists to make the common case (the gateway re-delivers after a slow ack) cheap and side-effect-free.
    /// It is not sufficient on its own; `append` re-checks.
    pub async fn already_processed(&self, payment_id: &PaymentId) -> Result<bool, DocumentStoreError> {
        Ok(self.fetch_by_payment_id(payment_id).await?.is_some())
    }

    pub async fn fetch_by_payment_id(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<TransactionRecord>, DocumentStoreError> {
        let docs = self
            .store
            .find(collections::TRANSACTIONS, &[Filter::equal("gateway_payment_id", payment_id.as_str())])
            .await?;
        docs.first().map(|doc| doc.parse::<TransactionRecord>()).transpose()
    }

    /// Append a new transaction record, exactly once per gateway payment id (up to the race documented on the
    /// struct). A detected duplicate returns [`LedgerError::DuplicatePayment`], which callers treat as a
    /// success-no-op. Records are never updated or deleted.
    pub async fn append(&self, tx: NewTransaction) -> Result<TransactionRecord, LedgerError> {
        if self.already_processed(&tx.payment_id).await? {
            info!("📒️ Payment {} is already on the ledger. Nothing to do.", tx.payment_id);
            return Err(LedgerError::DuplicatePayment(tx.payment_id));
        }
        let record = TransactionRecord {
            raw_reference: tx.raw_reference(),
            gateway_payment_id: tx.payment_id,
            gateway_order_id: tx.order_id,
            owner_user_id: tx.owner_user_id,
            purpose: tx.purpose,
            amount: tx.amount,
            currency_code: tx.currency_code,
            status: TransactionStatus::Completed,
            recorded_at: Utc::now(),
        };
        self.store.create(collections::TRANSACTIONS, None, to_document_fields(&record)?).await?;
        debug!(
            "📒️ Recorded {} payment {} of {} {} for user {}",
            record.purpose, record.gateway_payment_id, record.amount, record.currency_code, record.owner_user_id
        );
        Ok(record)
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("A transaction for payment id {0} has already been recorded")]
    DuplicatePayment(PaymentId),
    #[error(transparent)]
    StoreError(#[from] DocumentStoreError),
}
