use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use lsk_payment_engine::{traits::DocumentStore, AppwriteStore, PaymentFlowApi};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::payhere::SignatureVerifier,
    routes::{health, PayhereWebhookRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let store = AppwriteStore::new(config.appwrite.clone());
    let srv = create_server_instance(config, store)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance<B: DocumentStore + 'static>(
    config: ServerConfig,
    store: B,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let payments_api = PaymentFlowApi::new(store.clone(), config.platform_fee_bps);
        let verifier = SignatureVerifier::new(&config.payhere.merchant_id, config.payhere.merchant_secret.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("lsk::access_log"))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(verifier))
            .service(health)
            .service(PayhereWebhookRoute::<B>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
