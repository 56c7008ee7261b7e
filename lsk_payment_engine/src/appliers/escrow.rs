use chrono::Utc;
use log::{info, warn};
use lsk_common::Money;
use serde_json::{json, Value};

use crate::{
    appliers::ApplierError,
    db_types::{AgentPaymentRecord, AgentProfile, ListingStatus},
    helpers::split_platform_fee,
    store::collections,
    traits::{to_document_fields, DocumentStore, DocumentStoreError, Filter},
};

/// Written into agent payment records when a pending listing carries no assigned agent.
const UNASSIGNED_AGENT: &str = "unknown";

/// Activates a payment-pending listing and splits the facilitation payment between the platform and the assigned
/// agent.
pub struct EscrowReleaser<B> {
    store: B,
    platform_fee_bps: u32,
}

#[derive(Debug, Clone)]
pub enum ReleaseOutcome {
    Released { payment: AgentPaymentRecord, listing_id: String },
    /// The listing was already active when we looked: a duplicate delivery beat us here. The existing breakdown for
    /// this transaction reference is returned when one can be found.
    AlreadyReleased { payment: Option<AgentPaymentRecord>, listing_id: String },
}

impl<B> EscrowReleaser<B> {
    /// `platform_fee_bps` is the platform's cut in basis points (2000 = 20%).
    pub fn new(store: B, platform_fee_bps: u32) -> Self {
        Self { store, platform_fee_bps }
    }
}

impl<B> EscrowReleaser<B>
where B: DocumentStore
{
    /// Release the escrowed listing `listing_id` against a gross payment of `gross`.
    ///
    /// Steps, each idempotent against re-invocation with the same `source_ref`:
    /// 1. Load the listing. `active` means a previous delivery already completed the release; short-circuit.
    /// 2. Split the gross amount into platform fee and agent share.
    /// 3. Create the agent payment record.
    /// 4. Transition the listing to `active` and clear its escrow token.
    /// 5. Best-effort bump of the agent's denormalized counters. A failure here is logged and dropped: the counters
    ///    are rebuildable from `agent_payments` and must not roll back steps 1-4.
    pub async fn release(
        &self,
        listing_id: &str,
        gross: Money,
        source_ref: &str,
    ) -> Result<ReleaseOutcome, ApplierError> {
        let doc = self.store.get(collections::LISTINGS, listing_id).await.map_err(|e| match e {
            DocumentStoreError::NotFound { .. } => ApplierError::ListingNotFound(listing_id.to_string()),
            other => ApplierError::StoreError(other),
        })?;
        let listing = doc.parse::<crate::db_types::Listing>()?;
        match listing.status {
            ListingStatus::Active => {
                info!("🏠️ Listing {listing_id} is already active; treating escrow release as a no-op.");
                let payment = self.fetch_payment_by_source_ref(source_ref).await?;
                return Ok(ReleaseOutcome::AlreadyReleased { payment, listing_id: listing_id.to_string() });
            },
            ListingStatus::PendingPayment => {},
            ListingStatus::Other => {
                return Err(ApplierError::IllegalListingState {
                    id: listing_id.to_string(),
                    state: listing.status.to_string(),
                })
            },
        }

        let (platform_fee, agent_share) = split_platform_fee(gross, self.platform_fee_bps);
        let agent_id = listing.assigned_agent_id.clone().unwrap_or_else(|| UNASSIGNED_AGENT.to_string());
        let payment = AgentPaymentRecord {
            agent_id,
            listing_id: listing_id.to_string(),
            gross_amount: gross,
            platform_fee,
            agent_share,
            source_transaction_ref: source_ref.to_string(),
            paid_at: Utc::now(),
        };
        self.store.create(collections::AGENT_PAYMENTS, None, to_document_fields(&payment)?).await?;

        self.store
            .update(collections::LISTINGS, listing_id, json!({ "status": "active", "escrow_token": Value::Null }))
            .await?;
        info!(
            "🏠️ Listing {listing_id} released: gross {gross}, platform fee {platform_fee}, agent share {agent_share}"
        );

        if let Some(agent_id) = &listing.assigned_agent_id {
            if let Err(e) = self.bump_agent_counters(agent_id, agent_share).await {
                warn!("🏠️ Could not update counters for agent {agent_id}: {e}. They can be rebuilt from agent_payments.");
            }
        }
        Ok(ReleaseOutcome::Released { payment, listing_id: listing_id.to_string() })
    }

    async fn fetch_payment_by_source_ref(
        &self,
        source_ref: &str,
    ) -> Result<Option<AgentPaymentRecord>, ApplierError> {
        let docs = self
            .store
            .find(collections::AGENT_PAYMENTS, &[Filter::equal("source_transaction_ref", source_ref)])
            .await?;
        // A stored breakdown that no longer deserializes is a data-integrity problem, not a missing record.
        docs.first().map(|doc| doc.parse::<AgentPaymentRecord>()).transpose().map_err(ApplierError::from)
    }

    async fn bump_agent_counters(&self, agent_id: &str, agent_share: Money) -> Result<(), ApplierError> {
        let doc = self.store.get(collections::AGENTS, agent_id).await?;
        let profile = doc.parse::<AgentProfile>()?;
        self.store
            .update(
                collections::AGENTS,
                agent_id,
                json!({
                    "total_earnings": profile.total_earnings + agent_share,
                    "listings_uploaded": profile.listings_uploaded + 1,
                }),
            )
            .await?;
        Ok(())
    }
}
