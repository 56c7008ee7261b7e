use std::fmt::Display;

use chrono::{DateTime, Utc};
use lsk_common::Money;
use serde::{Deserialize, Serialize};

//--------------------------------------      PaymentId      ---------------------------------------------------------
/// The gateway's globally unique payment identifier. This is the primary idempotency key for the entire subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub String);

impl Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for PaymentId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl PaymentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       OrderId       ---------------------------------------------------------
/// The gateway order id. It is a business correlation value: escrow-release payments encode the listing id in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl<S: Into<String>> From<S> for OrderId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    PaymentPurpose    --------------------------------------------------------
/// The recognised payment purposes. Unrecognised purpose tags never reach the ledger, so there is no variant for
/// them here; see [`crate::router::Route`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPurpose {
    WalletDeposit,
    EscrowRelease,
}

impl Display for PaymentPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentPurpose::WalletDeposit => write!(f, "wallet_deposit"),
            PaymentPurpose::EscrowRelease => write!(f, "escrow_release"),
        }
    }
}

//--------------------------------------   TransactionStatus   -------------------------------------------------------
/// Only final-success gateway callbacks are ever written to the ledger, so `Completed` is the only status a
/// transaction record can carry. Failed and cancelled callbacks are acknowledged without being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
}

//--------------------------------------     PaymentEvent     --------------------------------------------------------
/// A verified, well-formed payment notification, as handed to the engine by the server layer.
///
/// By the time one of these exists, the gateway signature has been checked and the amount parsed; the engine never
/// sees unverified input.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub owner_user_id: String,
    /// The raw purpose tag from the notification (`custom_2` on the wire), e.g. "wallet_deposit".
    pub purpose_tag: String,
    pub amount: Money,
    pub currency_code: String,
}

//--------------------------------------    NewTransaction    --------------------------------------------------------
/// A transaction about to be appended to the ledger.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub owner_user_id: String,
    pub purpose: PaymentPurpose,
    pub amount: Money,
    pub currency_code: String,
}

impl NewTransaction {
    /// The audit reference stored alongside the record. It embeds both gateway identifiers so that a human can
    /// trace the record back to the gateway's own books.
    pub fn raw_reference(&self) -> String {
        format!("PayHere ID: {} | Order: {}", self.payment_id, self.order_id.as_str())
    }
}

//--------------------------------------  TransactionRecord   --------------------------------------------------------
/// An immutable, append-only fact representing one successfully completed payment event.
///
/// Created exactly once per gateway payment id by the [`crate::TransactionLedger`]; never updated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub gateway_payment_id: PaymentId,
    pub gateway_order_id: OrderId,
    pub owner_user_id: String,
    pub purpose: PaymentPurpose,
    pub amount: Money,
    pub currency_code: String,
    pub status: TransactionStatus,
    pub recorded_at: DateTime<Utc>,
    pub raw_reference: String,
}

//--------------------------------------        Wallet        --------------------------------------------------------
/// A per-user stored-value account. Created lazily on first deposit; mutated only by the wallet applier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub owner_user_id: String,
    pub balance: Money,
    pub lifetime_deposits: Money,
    pub currency_code: String,
    pub is_active: bool,
}

//--------------------------------------    ListingStatus     --------------------------------------------------------
/// The listing states this subsystem cares about. Listings move `pending_payment → active` and never revert through
/// this code path. Any other marketplace status (drafts and so on) deserializes to `Other` and is refused by the
/// escrow releaser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    PendingPayment,
    Active,
    #[serde(other)]
    Other,
}

impl Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingStatus::PendingPayment => write!(f, "pending_payment"),
            ListingStatus::Active => write!(f, "active"),
            ListingStatus::Other => write!(f, "other"),
        }
    }
}

//--------------------------------------       Listing        --------------------------------------------------------
/// The slice of a marketplace listing relevant to escrow release. The document id in the `listings` collection is
/// the listing id itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub status: ListingStatus,
    #[serde(default)]
    pub assigned_agent_id: Option<String>,
    /// Opaque token handed to the seller while payment is pending. Cleared when the listing goes live.
    #[serde(default)]
    pub escrow_token: Option<String>,
}

//--------------------------------------  AgentPaymentRecord  --------------------------------------------------------
/// The purpose-specific breakdown of an escrow-release transaction.
///
/// Invariant: `platform_fee + agent_share == gross_amount`, exactly. The fee is rounded and the share computed by
/// subtraction, so the invariant holds by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPaymentRecord {
    pub agent_id: String,
    pub listing_id: String,
    pub gross_amount: Money,
    pub platform_fee: Money,
    pub agent_share: Money,
    /// The `raw_reference` of the ledger record this breakdown derives from. Used to detect re-delivery.
    pub source_transaction_ref: String,
    pub paid_at: DateTime<Utc>,
}

//--------------------------------------     AgentProfile     --------------------------------------------------------
/// Denormalized agent counters. Not authoritative: they can be rebuilt from `agent_payments` and are updated
/// best-effort only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    #[serde(default)]
    pub total_earnings: Money,
    #[serde(default)]
    pub listings_uploaded: i64,
}
