use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use lsk_common::Secret;
use lsk_payment_engine::{test_utils::MemoryStore, PaymentFlowApi};

use crate::{
    integrations::payhere::SignatureVerifier,
    routes::{health, PayhereWebhookRoute},
};

// Test credentials only. DO NOT re-use these anywhere.
pub const MERCHANT_ID: &str = "1220001";
pub const MERCHANT_SECRET: &str = "endpoint-test-merchant-secret";
pub const FEE_BPS: u32 = 2000;

pub fn verifier() -> SignatureVerifier {
    SignatureVerifier::new(MERCHANT_ID, Secret::new(MERCHANT_SECRET.to_string()))
}

/// Build the full notify parameter set, signed the way PayHere would sign it. Currency is always LKR.
pub fn signed_params(
    payment_id: &str,
    order_id: &str,
    amount: &str,
    status_code: &str,
    custom_1: &str,
    custom_2: &str,
) -> Vec<(&'static str, String)> {
    let md5sig = verifier().expected_signature(order_id, amount, "LKR", status_code);
    vec![
        ("merchant_id", MERCHANT_ID.to_string()),
        ("order_id", order_id.to_string()),
        ("payment_id", payment_id.to_string()),
        ("payhere_amount", amount.to_string()),
        ("payhere_currency", "LKR".to_string()),
        ("status_code", status_code.to_string()),
        ("md5sig", md5sig),
        ("custom_1", custom_1.to_string()),
        ("custom_2", custom_2.to_string()),
    ]
}

async fn call(store: &MemoryStore, req: TestRequest) -> (StatusCode, String) {
    let app = App::new()
        .app_data(web::Data::new(PaymentFlowApi::new(store.clone(), FEE_BPS)))
        .app_data(web::Data::new(verifier()))
        .service(health)
        .service(PayhereWebhookRoute::<MemoryStore>::new());
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&test::read_body(res).await).into_owned();
    (status, body)
}

/// Deliver a notification the way PayHere does it: an urlencoded form POST.
pub async fn post_form(store: &MemoryStore, params: &[(&'static str, String)]) -> (StatusCode, String) {
    let body = serde_urlencoded::to_string(params).unwrap();
    let req = TestRequest::post()
        .uri("/payhere/notify")
        .insert_header(("Content-Type", "application/x-www-form-urlencoded"))
        .set_payload(body);
    call(store, req).await
}

/// Deliver a notification as JSON, the way a relaying proxy re-posts it.
pub async fn post_json(store: &MemoryStore, params: &[(&'static str, String)]) -> (StatusCode, String) {
    let object: serde_json::Map<String, serde_json::Value> =
        params.iter().map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone()))).collect();
    let req = TestRequest::post()
        .uri("/payhere/notify")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(serde_json::Value::Object(object).to_string());
    call(store, req).await
}

pub async fn get(store: &MemoryStore, path: &str) -> (StatusCode, String) {
    call(store, TestRequest::get().uri(path)).await
}
