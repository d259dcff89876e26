//! The gateway-facing endpoints: the PayFast ITN webhook and the Stripe return URL.
//!
//! The ITN handler must ALWAYS answer in the 200 range — whatever went wrong locally — otherwise the gateway
//! keeps re-delivering against a handler that will keep failing. The typed [`NotificationOutcome`] records which
//! path was actually taken; the response body mirrors it for operators reading the gateway's delivery logs.

use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use log::*;
use serde::Deserialize;
use storefront_engine::{order_objects::NotificationOutcome, ReconciliationApi, StoreBackend};

use crate::{
    data_objects::JsonResponse,
    errors::ServerError,
    integrations::{
        payfast::{ItnVerification, PayFastApi},
        stripe::StripeApi,
    },
};

/// PayFast posts its Instant Transaction Notification here, form-encoded, and retries until it sees a 2xx.
pub async fn payfast_itn(
    body: web::Form<HashMap<String, String>>,
    payfast: web::Data<PayFastApi>,
    recon: web::Data<ReconciliationApi<StoreBackend>>,
) -> HttpResponse {
    trace!("🅿️ Received PayFast ITN");
    let payload = body.into_inner();
    let result = match payfast.verify_itn(&payload) {
        ItnVerification::Invalid(reason) => {
            // Acknowledged all the same; an unverifiable notification will never become verifiable on retry.
            warn!("🅿️ Discarding unverifiable ITN. {reason}");
            JsonResponse::failure(reason)
        },
        ItnVerification::Verified(notification) => {
            match recon.process_gateway_notification(notification).await {
                NotificationOutcome::OrderCreated(order) => {
                    info!("🅿️ ITN processed. Order [{}] created.", order.id);
                    JsonResponse::success(format!("Order {} created.", order.id))
                },
                NotificationOutcome::Duplicate(id) => {
                    info!("🅿️ Duplicate ITN acknowledged for order [{id}].");
                    JsonResponse::success("Order already exists.")
                },
                NotificationOutcome::Ignored { status } => {
                    JsonResponse::success(format!("Status {status} acknowledged; no order created."))
                },
                NotificationOutcome::Failed { reason } => {
                    error!("🅿️ ITN processing failed locally: {reason}");
                    JsonResponse::failure("Acknowledged; local processing failed.")
                },
            }
        },
    };
    HttpResponse::Ok().json(result)
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeReturnQuery {
    pub session_id: String,
}

/// The customer lands here after the hosted checkout. This is a user-facing flow: the session is fetched and
/// verified, and failures surface as proper error responses rather than being swallowed.
pub async fn stripe_return(
    query: web::Query<StripeReturnQuery>,
    stripe: web::Data<StripeApi>,
    recon: web::Data<ReconciliationApi<StoreBackend>>,
) -> Result<HttpResponse, ServerError> {
    let session_id = query.into_inner().session_id;
    debug!("💠️ Stripe return for session {session_id}");
    let session = stripe.fetch_session(&session_id).await?;
    let notification = StripeApi::to_verified_notification(session)?;
    let order = recon.settle_verified_payment(notification).await?;
    info!("💠️ Stripe session {session_id} settled into order [{}].", order.id);
    Ok(HttpResponse::Ok().json(order))
}
