//! Classification of payment notifications by their encoded purpose.
//!
//! Dispatch is driven by two wire fields: the purpose tag (`custom_2`) and the gateway order id. A `wallet_deposit`
//! tag always wins; failing that, an order id carrying the escrow prefix selects the escrow releaser. Everything
//! else is [`Route::Unrecognized`], which must be acknowledged without side effects so the gateway does not retry a
//! notification we intentionally ignore. New purposes are added here as a new variant plus an applier arm in
//! [`crate::PaymentFlowApi`], without touching the verifier, guard or ledger.

use crate::db_types::{OrderId, PaymentPurpose};

/// Order ids of the form `HIRE_<listingId>_<timestamp>` identify escrow-release (agent hire) payments.
pub const ESCROW_ORDER_PREFIX: &str = "HIRE_";
/// The purpose tag carried in `custom_2` for stored-value deposits.
pub const WALLET_DEPOSIT_TAG: &str = "wallet_deposit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    WalletDeposit,
    EscrowRelease { listing_id: String },
    Unrecognized { tag: String },
}

impl Route {
    /// The ledger purpose for this route, if it is a recognised one.
    pub fn purpose(&self) -> Option<PaymentPurpose> {
        match self {
            Route::WalletDeposit => Some(PaymentPurpose::WalletDeposit),
            Route::EscrowRelease { .. } => Some(PaymentPurpose::EscrowRelease),
            Route::Unrecognized { .. } => None,
        }
    }
}

pub fn classify(purpose_tag: &str, order_id: &OrderId) -> Route {
    if purpose_tag == WALLET_DEPOSIT_TAG {
        return Route::WalletDeposit;
    }
    if let Some(listing_id) = parse_escrow_listing_id(order_id.as_str()) {
        return Route::EscrowRelease { listing_id: listing_id.to_string() };
    }
    Route::Unrecognized { tag: purpose_tag.to_string() }
}

/// Extract the listing id from an escrow order id. A malformed id (missing or empty listing segment) yields `None`
/// and the notification degrades to an unrecognized purpose rather than an error.
pub fn parse_escrow_listing_id(order_id: &str) -> Option<&str> {
    order_id.strip_prefix(ESCROW_ORDER_PREFIX)?.split('_').next().filter(|id| !id.is_empty())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wallet_deposit_tag_routes_to_wallet() {
        let route = classify("wallet_deposit", &"ORDER_551".into());
        assert_eq!(route, Route::WalletDeposit);
        assert_eq!(route.purpose(), Some(PaymentPurpose::WalletDeposit));
    }

    #[test]
    fn hire_order_routes_to_escrow() {
        let route = classify("", &"HIRE_lst0042_1712345678".into());
        assert_eq!(route, Route::EscrowRelease { listing_id: "lst0042".to_string() });
        assert_eq!(route.purpose(), Some(PaymentPurpose::EscrowRelease));
    }

    #[test]
    fn wallet_tag_wins_over_escrow_order_id() {
        let route = classify("wallet_deposit", &"HIRE_lst0042_1712345678".into());
        assert_eq!(route, Route::WalletDeposit);
    }

    #[test]
    fn unknown_tag_is_unrecognized() {
        let route = classify("listing_boost", &"ORDER_99".into());
        assert_eq!(route, Route::Unrecognized { tag: "listing_boost".to_string() });
        assert_eq!(route.purpose(), None);
    }

    #[test]
    fn malformed_hire_order_is_unrecognized() {
        assert_eq!(parse_escrow_listing_id("HIRE_"), None);
        assert_eq!(parse_escrow_listing_id("HIRE__1712345678"), None);
        assert_eq!(parse_escrow_listing_id("HIREX_abc"), None);
        assert_eq!(parse_escrow_listing_id("HIRE_abc"), Some("abc"));
        let route = classify("", &"HIRE_".into());
        assert!(matches!(route, Route::Unrecognized { .. }));
    }
}
