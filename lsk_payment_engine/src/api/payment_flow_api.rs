use std::fmt::Debug;

use log::{info, warn};
use thiserror::Error;

use crate::{
    appliers::{ApplierError, EscrowReleaser, ReleaseOutcome, WalletUpdater},
    db_types::{AgentPaymentRecord, NewTransaction, PaymentEvent, PaymentId, TransactionRecord, Wallet},
    ledger::{LedgerError, TransactionLedger},
    router,
    router::Route,
    traits::{DocumentStore, DocumentStoreError},
};

/// `PaymentFlowApi` is the engine's single entry point for handling a verified payment notification: dedup against
/// the ledger, append the write-ahead record, then apply the purpose-specific side effects.
///
/// Every path through [`PaymentFlowApi::process_payment`] is replay-tolerant. The server maps a `Err(_)` to a
/// retryable HTTP 500, and re-delivery drives the flow to completion: the ledger suppresses a second record, and
/// escrow releases are re-dispatched on re-delivery so a failure between the ledger write and the listing
/// transition is finished by the retry. The releaser converges on the listing's stored state, so a release that did
/// complete degrades to a no-op.
pub struct PaymentFlowApi<B> {
    ledger: TransactionLedger<B>,
    wallets: WalletUpdater<B>,
    escrow: EscrowReleaser<B>,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

/// The terminal state of one notification, as far as the engine is concerned. All four are acknowledged with a 200
/// by the endpoint; only errors produce a retryable status.
#[derive(Debug, Clone)]
pub enum ProcessingOutcome {
    /// The payment was recorded and its side effects applied.
    Applied { record: TransactionRecord, effect: SideEffect },
    /// A record for this payment id already exists. Deliberate idempotent no-op, not an error.
    DuplicateDelivery { payment_id: PaymentId },
    /// The purpose tag matched nothing we know. Nothing was written; the gateway must not retry.
    UnrecognizedPurpose { payment_id: PaymentId, tag: String },
}

#[derive(Debug, Clone)]
pub enum SideEffect {
    WalletCredited(Wallet),
    EscrowReleased { payment: AgentPaymentRecord, listing_id: String },
    /// A duplicate ledger row slipped past the check-then-create race, but the listing was already active, so the
    /// release degraded to a no-op. The funds were split exactly once.
    EscrowAlreadyReleased { payment: Option<AgentPaymentRecord>, listing_id: String },
}

impl<B> PaymentFlowApi<B>
where B: DocumentStore
{
    pub fn new(store: B, platform_fee_bps: u32) -> Self {
        Self {
            ledger: TransactionLedger::new(store.clone()),
            wallets: WalletUpdater::new(store.clone()),
            escrow: EscrowReleaser::new(store, platform_fee_bps),
        }
    }

    /// Process one verified payment event to its terminal outcome.
    ///
    /// Classification happens before anything is written, so an unrecognized purpose leaves no trace beyond a log
    /// line. For recognised purposes the ledger record is written first (write-ahead), then exactly one applier
    /// runs. Failures after the ledger write surface as errors and are resolved by gateway retry, not rollback.
    pub async fn process_payment(&self, event: PaymentEvent) -> Result<ProcessingOutcome, PaymentFlowError> {
        let route = router::classify(&event.purpose_tag, &event.order_id);
        let purpose = match route.purpose() {
            Some(p) => p,
            None => {
                warn!(
                    "🔄️ Payment {} has unrecognized purpose '{}' (order {}). Acknowledging without side effects.",
                    event.payment_id, event.purpose_tag, event.order_id
                );
                return Ok(ProcessingOutcome::UnrecognizedPurpose {
                    payment_id: event.payment_id,
                    tag: event.purpose_tag,
                });
            },
        };

        if let Some(record) = self.ledger.fetch_by_payment_id(&event.payment_id).await? {
            return self.replay(&route, record).await;
        }

        let tx = NewTransaction {
            payment_id: event.payment_id,
            order_id: event.order_id,
            owner_user_id: event.owner_user_id,
            purpose,
            amount: event.amount,
            currency_code: event.currency_code,
        };
        let record = match self.ledger.append(tx).await {
            Ok(record) => record,
            // Lost the narrow race between the advisory check and the write. Treat it as the re-delivery it is.
            Err(LedgerError::DuplicatePayment(payment_id)) => {
                return match self.ledger.fetch_by_payment_id(&payment_id).await? {
                    Some(record) => self.replay(&route, record).await,
                    None => Ok(ProcessingOutcome::DuplicateDelivery { payment_id }),
                };
            },
            Err(LedgerError::StoreError(e)) => return Err(e.into()),
        };

        let effect = self.apply(&route, &record).await?;
        info!("🔄️ Payment {} fully processed.", record.gateway_payment_id);
        Ok(ProcessingOutcome::Applied { record, effect })
    }

    /// Handle a payment id that is already on the ledger.
    ///
    /// An escrow release is re-dispatched: the previous delivery may have failed between the ledger write and the
    /// listing transition, and the releaser decides off the listing's stored state, so finishing the release and
    /// acknowledging a completed one are the same call. Wallet credits leave no per-payment marker on the wallet
    /// itself, so they are never re-applied; a re-delivered deposit is acknowledged as a duplicate.
    async fn replay(&self, route: &Route, record: TransactionRecord) -> Result<ProcessingOutcome, PaymentFlowError> {
        if let Route::EscrowRelease { listing_id } = route {
            match self.escrow.release(listing_id, record.amount, &record.raw_reference).await? {
                ReleaseOutcome::Released { payment, listing_id } => {
                    info!(
                        "🔄️ Re-delivery of payment {} completed an interrupted escrow release on listing \
                         {listing_id}.",
                        record.gateway_payment_id
                    );
                    return Ok(ProcessingOutcome::Applied {
                        record,
                        effect: SideEffect::EscrowReleased { payment, listing_id },
                    });
                },
                ReleaseOutcome::AlreadyReleased { .. } => {},
            }
        }
        info!("🔄️ Payment {} was already processed. Acknowledging the re-delivery.", record.gateway_payment_id);
        Ok(ProcessingOutcome::DuplicateDelivery { payment_id: record.gateway_payment_id })
    }

    /// Dispatch the routed purpose to its applier. Extension point: new purposes add an arm here.
    async fn apply(&self, route: &Route, record: &TransactionRecord) -> Result<SideEffect, PaymentFlowError> {
        match route {
            Route::WalletDeposit => {
                let wallet =
                    self.wallets.credit(&record.owner_user_id, record.amount, &record.currency_code).await?;
                Ok(SideEffect::WalletCredited(wallet))
            },
            Route::EscrowRelease { listing_id } => {
                let outcome = self.escrow.release(listing_id, record.amount, &record.raw_reference).await?;
                Ok(match outcome {
                    ReleaseOutcome::Released { payment, listing_id } => {
                        SideEffect::EscrowReleased { payment, listing_id }
                    },
                    ReleaseOutcome::AlreadyReleased { payment, listing_id } => {
                        SideEffect::EscrowAlreadyReleased { payment, listing_id }
                    },
                })
            },
            // process_payment returns early for unrecognized purposes; nothing reaches the appliers without one.
            Route::Unrecognized { .. } => unreachable!("unrecognized purposes are filtered before dispatch"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("The document store request failed. {0}")]
    StoreError(#[from] DocumentStoreError),
    #[error(transparent)]
    ApplierError(#[from] ApplierError),
}

#[cfg(test)]
mod test {
    use lsk_common::Money;
    use serde_json::json;

    use super::*;
    use crate::{db_types::PaymentPurpose, store::collections, test_utils::MemoryStore};

    fn deposit_event(payment_id: &str, amount: &str) -> PaymentEvent {
        PaymentEvent {
            payment_id: payment_id.into(),
            order_id: "ORDER_2024_001".into(),
            owner_user_id: "user_42".to_string(),
            purpose_tag: "wallet_deposit".to_string(),
            amount: amount.parse().unwrap(),
            currency_code: "LKR".to_string(),
        }
    }

    fn hire_event(payment_id: &str, listing_id: &str, amount: &str) -> PaymentEvent {
        PaymentEvent {
            payment_id: payment_id.into(),
            order_id: format!("HIRE_{listing_id}_1712000000").into(),
            owner_user_id: "user_42".to_string(),
            purpose_tag: String::new(),
            amount: amount.parse().unwrap(),
            currency_code: "LKR".to_string(),
        }
    }

    #[tokio::test]
    async fn wallet_deposit_end_to_end_with_replay() {
        let _ = env_logger::try_init();
        let store = MemoryStore::new();
        let api = PaymentFlowApi::new(store.clone(), 2000);

        let outcome = api.process_payment(deposit_event("pay_100", "5000.00")).await.unwrap();
        match outcome {
            ProcessingOutcome::Applied { effect: SideEffect::WalletCredited(wallet), .. } => {
                assert_eq!(wallet.balance, Money::from_major_units(5_000));
                assert_eq!(wallet.lifetime_deposits, Money::from_major_units(5_000));
            },
            other => panic!("expected a wallet credit, got {other:?}"),
        }

        // Replaying the identical notification changes nothing
        let replay = api.process_payment(deposit_event("pay_100", "5000.00")).await.unwrap();
        assert!(matches!(replay, ProcessingOutcome::DuplicateDelivery { .. }));
        assert_eq!(store.count(collections::TRANSACTIONS).await, 1);
        let wallets = store.find(collections::WALLETS, &[]).await.unwrap();
        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0].fields["balance"], json!(500_000));
    }

    #[tokio::test]
    async fn escrow_release_end_to_end_with_replay() {
        let store = MemoryStore::new();
        store
            .insert(
                collections::LISTINGS,
                "lst500",
                json!({ "status": "pending_payment", "assigned_agent_id": "agent_3", "escrow_token": "tok" }),
            )
            .await;
        store.insert(collections::AGENTS, "agent_3", json!({ "total_earnings": 0, "listings_uploaded": 0 })).await;
        let api = PaymentFlowApi::new(store.clone(), 2000);

        let outcome = api.process_payment(hire_event("pay_200", "lst500", "9999.99")).await.unwrap();
        match outcome {
            ProcessingOutcome::Applied { effect: SideEffect::EscrowReleased { payment, .. }, record } => {
                assert_eq!(payment.platform_fee + payment.agent_share, record.amount);
                assert_eq!(payment.agent_share, "7999.99".parse().unwrap());
            },
            other => panic!("expected an escrow release, got {other:?}"),
        }

        let replay = api.process_payment(hire_event("pay_200", "lst500", "9999.99")).await.unwrap();
        assert!(matches!(replay, ProcessingOutcome::DuplicateDelivery { .. }));
        assert_eq!(store.count(collections::TRANSACTIONS).await, 1);
        assert_eq!(store.count(collections::AGENT_PAYMENTS).await, 1);
    }

    #[tokio::test]
    async fn duplicate_ledger_row_still_cannot_double_release() {
        // Simulate the check-then-create race having already lost: the listing is active, but a second, distinct
        // payment id arrives for the same listing.
        let store = MemoryStore::new();
        store.insert(collections::LISTINGS, "lst501", json!({ "status": "pending_payment" })).await;
        let api = PaymentFlowApi::new(store.clone(), 2000);
        api.process_payment(hire_event("pay_300", "lst501", "1000.00")).await.unwrap();
        let outcome = api.process_payment(hire_event("pay_301", "lst501", "1000.00")).await.unwrap();
        match outcome {
            ProcessingOutcome::Applied { effect: SideEffect::EscrowAlreadyReleased { .. }, .. } => {},
            other => panic!("expected the second release to degrade to a no-op, got {other:?}"),
        }
        // Two audit rows (distinct payment ids), but the funds were split exactly once
        assert_eq!(store.count(collections::TRANSACTIONS).await, 2);
        assert_eq!(store.count(collections::AGENT_PAYMENTS).await, 1);
    }

    #[tokio::test]
    async fn unrecognized_purpose_writes_nothing() {
        let store = MemoryStore::new();
        let api = PaymentFlowApi::new(store.clone(), 2000);
        let mut event = deposit_event("pay_400", "100.00");
        event.purpose_tag = "listing_boost".to_string();
        event.order_id = "ORDER_X".into();
        let outcome = api.process_payment(event).await.unwrap();
        assert!(matches!(outcome, ProcessingOutcome::UnrecognizedPurpose { ref tag, .. } if tag == "listing_boost"));
        assert_eq!(store.count(collections::TRANSACTIONS).await, 0);
        assert_eq!(store.count(collections::WALLETS).await, 0);
    }

    #[tokio::test]
    async fn currency_mismatch_surfaces_as_an_error() {
        let store = MemoryStore::new();
        let api = PaymentFlowApi::new(store.clone(), 2000);
        api.process_payment(deposit_event("pay_500", "100.00")).await.unwrap();
        let mut event = deposit_event("pay_501", "100.00");
        event.currency_code = "USD".to_string();
        let err = api.process_payment(event).await.unwrap_err();
        assert!(matches!(err, PaymentFlowError::ApplierError(ApplierError::CurrencyMismatch { .. })));
        // The write-ahead record remains as the audit trail. Deposits are never re-applied on re-delivery, so the
        // credit itself has to be reconciled by hand from that record.
        assert_eq!(store.count(collections::TRANSACTIONS).await, 2);
    }

    #[tokio::test]
    async fn redelivery_completes_an_interrupted_escrow_release() {
        // Aftermath of a partial failure: the ledger row was written, but the applier never touched the listing
        let store = MemoryStore::new();
        store
            .insert(collections::LISTINGS, "lst777", json!({ "status": "pending_payment", "assigned_agent_id": "agent_9" }))
            .await;
        store.insert(collections::AGENTS, "agent_9", json!({ "total_earnings": 0, "listings_uploaded": 0 })).await;
        let event = hire_event("pay_777", "lst777", "1000.00");
        let tx = NewTransaction {
            payment_id: event.payment_id.clone(),
            order_id: event.order_id.clone(),
            owner_user_id: event.owner_user_id.clone(),
            purpose: PaymentPurpose::EscrowRelease,
            amount: event.amount,
            currency_code: event.currency_code.clone(),
        };
        TransactionLedger::new(store.clone()).append(tx).await.unwrap();

        // The gateway retries after the 500. The retry must finish the release, not stop at the dedup check.
        let api = PaymentFlowApi::new(store.clone(), 2000);
        let outcome = api.process_payment(event).await.unwrap();
        match outcome {
            ProcessingOutcome::Applied { effect: SideEffect::EscrowReleased { .. }, .. } => {},
            other => panic!("expected the retry to finish the release, got {other:?}"),
        }
        let listing = store.get(collections::LISTINGS, "lst777").await.unwrap();
        assert_eq!(listing.fields["status"], json!("active"));
        assert_eq!(store.count(collections::TRANSACTIONS).await, 1);
        assert_eq!(store.count(collections::AGENT_PAYMENTS).await, 1);

        // A further re-delivery is a plain acknowledgement
        let replay = api.process_payment(hire_event("pay_777", "lst777", "1000.00")).await.unwrap();
        assert!(matches!(replay, ProcessingOutcome::DuplicateDelivery { .. }));
        assert_eq!(store.count(collections::AGENT_PAYMENTS).await, 1);
    }
}
