//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! The webhook contract in one line: 200 means "delivered, never send this again" (including duplicates and ignored
//! statuses), 400 means "this delivery is garbage, do not retry", and 500 means "try again later".

use actix_web::{get, http::header::CONTENT_TYPE, web, HttpRequest, HttpResponse, Responder};
use log::*;
use lsk_payment_engine::{traits::DocumentStore, PaymentFlowApi, ProcessingOutcome, SideEffect};

use crate::{
    data_objects::JsonResponse,
    errors::ServerError,
    integrations::payhere::{
        payment_event_from_notification,
        PayHereNotification,
        PaymentStatus,
        SignatureVerifier,
    },
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

//----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   PayHere  ----------------------------------------------------
route!(payhere_webhook => Post "/payhere/notify" impl DocumentStore);
/// Route handler for PayHere server-to-server payment notifications.
///
/// PayHere posts the notification as an urlencoded form, but some relays re-deliver it as JSON, so the handler
/// accepts both and picks a parser off the `Content-Type` header. The signature is verified before anything else is
/// done with the payload; a notification that fails verification gets a 400 and leaves no trace in the store.
///
/// Non-success statuses (pending, cancelled, failed, chargeback) are acknowledged with a 200 and otherwise ignored.
/// Verified successful notifications are handed to the payment engine, which is replay-tolerant, so duplicate
/// deliveries also come back 200.
pub async fn payhere_webhook<TDocumentStore: DocumentStore>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<PaymentFlowApi<TDocumentStore>>,
    verifier: web::Data<SignatureVerifier>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received PayHere notification ({} bytes)", body.len());
    let notification = parse_notification(&req, &body)?;
    verifier.verify(&notification)?;
    let status = notification.status();
    if status != PaymentStatus::Success {
        info!(
            "🛍️ Ignoring {status} notification for payment {} on order {}.",
            notification.payment_id, notification.order_id
        );
        return Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Ignored {status} notification"))));
    }
    let event = payment_event_from_notification(notification)?;
    let outcome = api.process_payment(event).await?;
    let message = match &outcome {
        ProcessingOutcome::Applied { record, effect } => {
            match effect {
                SideEffect::WalletCredited(wallet) => info!(
                    "🛍️ Payment {} credited {} {} to the wallet of {}.",
                    record.gateway_payment_id, record.amount, record.currency_code, wallet.owner_user_id
                ),
                SideEffect::EscrowReleased { payment, listing_id } => info!(
                    "🛍️ Payment {} released escrow on listing {listing_id}. Agent {} earns {}.",
                    record.gateway_payment_id, payment.agent_id, payment.agent_share
                ),
                SideEffect::EscrowAlreadyReleased { listing_id, .. } => info!(
                    "🛍️ Payment {} targeted listing {listing_id}, which is already live. No further action taken.",
                    record.gateway_payment_id
                ),
            }
            format!("Payment {} processed", record.gateway_payment_id)
        },
        ProcessingOutcome::DuplicateDelivery { payment_id } => {
            info!("🛍️ Payment {payment_id} has already been processed. Acknowledging the re-delivery.");
            format!("Payment {payment_id} already processed")
        },
        ProcessingOutcome::UnrecognizedPurpose { payment_id, tag } => {
            warn!("🛍️ Payment {payment_id} carries unrecognized purpose tag '{tag}'. Acknowledged without action.");
            format!("Payment {payment_id} acknowledged")
        },
    };
    Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
}

fn parse_notification(req: &HttpRequest, body: &[u8]) -> Result<PayHereNotification, ServerError> {
    let is_json = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);
    let result = if is_json {
        serde_json::from_slice::<PayHereNotification>(body).map_err(|e| e.to_string())
    } else {
        serde_urlencoded::from_bytes::<PayHereNotification>(body).map_err(|e| e.to_string())
    };
    result.map_err(|e| {
        debug!("💻️ Could not parse PayHere notification body. {e}");
        ServerError::InvalidRequestBody(e)
    })
}
