use actix_web::http::StatusCode;
use lsk_payment_engine::{store::collections, test_utils::MemoryStore, traits::DocumentStore};
use serde_json::json;

use super::helpers::{get, post_form, post_json, signed_params};
use crate::data_objects::JsonResponse;

fn assert_success_body(body: &str) {
    let response: JsonResponse = serde_json::from_str(body).unwrap();
    assert!(response.success, "expected a success body, got: {body}");
}

#[actix_web::test]
async fn health_check() {
    let store = MemoryStore::new();
    let (status, body) = get(&store, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn wallet_deposit_end_to_end_with_replay() {
    let _ = env_logger::try_init();
    let store = MemoryStore::new();
    let params = signed_params("320010001", "ORDER_2024_001", "5000.00", "2", "user_42", "wallet_deposit");

    let (status, body) = post_form(&store, &params).await;
    assert_eq!(status, StatusCode::OK);
    assert_success_body(&body);

    // PayHere re-delivers the identical notification. Same 200, no new state.
    let (status, body) = post_form(&store, &params).await;
    assert_eq!(status, StatusCode::OK);
    assert_success_body(&body);

    assert_eq!(store.count(collections::TRANSACTIONS).await, 1);
    let wallets = store.find(collections::WALLETS, &[]).await.unwrap();
    assert_eq!(wallets.len(), 1);
    assert_eq!(wallets[0].fields["balance"], json!(500_000));
    assert_eq!(wallets[0].fields["owner_user_id"], json!("user_42"));
}

#[actix_web::test]
async fn json_bodies_are_accepted_too() {
    let store = MemoryStore::new();
    let params = signed_params("320010002", "ORDER_2024_002", "250.50", "2", "user_7", "wallet_deposit");
    let (status, body) = post_json(&store, &params).await;
    assert_eq!(status, StatusCode::OK);
    assert_success_body(&body);
    let wallets = store.find(collections::WALLETS, &[]).await.unwrap();
    assert_eq!(wallets[0].fields["balance"], json!(25_050));
}

#[actix_web::test]
async fn escrow_release_with_redelivery() {
    let store = MemoryStore::new();
    store
        .insert(
            collections::LISTINGS,
            "lst900",
            json!({ "status": "pending_payment", "assigned_agent_id": "agent_5", "escrow_token": "tok_900" }),
        )
        .await;
    store.insert(collections::AGENTS, "agent_5", json!({ "total_earnings": 0, "listings_uploaded": 3 })).await;

    let params = signed_params("320010003", "HIRE_lst900_1712000000", "10000.00", "2", "user_42", "");
    let (status, _) = post_form(&store, &params).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_form(&store, &params).await;
    assert_eq!(status, StatusCode::OK);

    // One ledger row, one payout breakdown, and the listing went live exactly once
    assert_eq!(store.count(collections::TRANSACTIONS).await, 1);
    assert_eq!(store.count(collections::AGENT_PAYMENTS).await, 1);
    let listing = store.get(collections::LISTINGS, "lst900").await.unwrap();
    assert_eq!(listing.fields["status"], json!("active"));
    assert_eq!(listing.fields["escrow_token"], json!(null));
    let payments = store.find(collections::AGENT_PAYMENTS, &[]).await.unwrap();
    assert_eq!(payments[0].fields["platform_fee"], json!(200_000));
    assert_eq!(payments[0].fields["agent_share"], json!(800_000));
}

#[actix_web::test]
async fn tampered_amount_is_rejected_and_writes_nothing() {
    let store = MemoryStore::new();
    let mut params = signed_params("320010004", "ORDER_2024_004", "100.00", "2", "user_42", "wallet_deposit");
    params.iter_mut().find(|(k, _)| *k == "payhere_amount").unwrap().1 = "99999.00".to_string();

    let (status, body) = post_form(&store, &params).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(!response.success);
    assert_eq!(store.count(collections::TRANSACTIONS).await, 0);
    assert_eq!(store.count(collections::WALLETS).await, 0);
}

#[actix_web::test]
async fn foreign_merchant_id_is_rejected() {
    let store = MemoryStore::new();
    let mut params = signed_params("320010005", "ORDER_2024_005", "100.00", "2", "user_42", "wallet_deposit");
    params.iter_mut().find(|(k, _)| *k == "merchant_id").unwrap().1 = "999999".to_string();
    let (status, _) = post_form(&store, &params).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn missing_signature_is_a_bad_request() {
    let store = MemoryStore::new();
    let mut params = signed_params("320010006", "ORDER_2024_006", "100.00", "2", "user_42", "wallet_deposit");
    params.retain(|(k, _)| *k != "md5sig");
    let (status, _) = post_form(&store, &params).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(store.count(collections::TRANSACTIONS).await, 0);
}

#[actix_web::test]
async fn non_success_statuses_are_acknowledged_and_ignored() {
    let store = MemoryStore::new();
    // -2 is a failed payment; correctly signed, so this is a genuine gateway delivery
    let params = signed_params("320010007", "ORDER_2024_007", "100.00", "-2", "user_42", "wallet_deposit");
    let (status, body) = post_form(&store, &params).await;
    assert_eq!(status, StatusCode::OK);
    assert_success_body(&body);
    assert_eq!(store.count(collections::TRANSACTIONS).await, 0);
    assert_eq!(store.count(collections::WALLETS).await, 0);
}

#[actix_web::test]
async fn unknown_purpose_is_acknowledged_without_writes() {
    let store = MemoryStore::new();
    let params = signed_params("320010008", "ORDER_2024_008", "100.00", "2", "user_42", "listing_boost");
    let (status, body) = post_form(&store, &params).await;
    assert_eq!(status, StatusCode::OK);
    assert_success_body(&body);
    assert_eq!(store.count(collections::TRANSACTIONS).await, 0);
}

#[actix_web::test]
async fn unparseable_amount_is_a_bad_request() {
    let store = MemoryStore::new();
    // The signature covers the raw string, so this is correctly signed but still malformed
    let params = signed_params("320010009", "ORDER_2024_009", "12.345", "2", "user_42", "wallet_deposit");
    let (status, _) = post_form(&store, &params).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(store.count(collections::TRANSACTIONS).await, 0);
}

#[actix_web::test]
async fn missing_owner_is_a_bad_request() {
    let store = MemoryStore::new();
    let params = signed_params("320010010", "ORDER_2024_010", "100.00", "2", "", "wallet_deposit");
    let (status, _) = post_form(&store, &params).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(store.count(collections::TRANSACTIONS).await, 0);
}

#[actix_web::test]
async fn backend_invariant_violations_map_to_500() {
    let store = MemoryStore::new();
    // Seed a USD wallet, then deliver an LKR deposit for the same user
    store
        .insert(
            collections::WALLETS,
            "w1",
            json!({
                "owner_user_id": "user_42",
                "balance": 1000,
                "lifetime_deposits": 1000,
                "currency_code": "USD",
                "is_active": true
            }),
        )
        .await;
    let params = signed_params("320010011", "ORDER_2024_011", "100.00", "2", "user_42", "wallet_deposit");
    let (status, _) = post_form(&store, &params).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    // The write-ahead ledger record remains as the audit trail for manual reconciliation
    assert_eq!(store.count(collections::TRANSACTIONS).await, 1);
}
