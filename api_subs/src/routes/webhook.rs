use std::sync::Arc;

use actix_web::{HttpRequest, Responder, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
    tier::PaymentProcessor,
};
use logger::PaymentLog;
use serde_json::{Value, json};
use sqlx::PgPool;

use crate::{
    paypal::{self, PayPalClient, TransmissionHeaders},
    reconcile,
    services::stripe_events,
};

/// Stripe event endpoint. Requires the raw body for signature verification.
///
/// Once the signature checks out the event is always acknowledged with
/// `{received: true}`; processing failures go to the payment error log so
/// Stripe does not keep retrying them.
#[post("/stripe")]
pub async fn post_stripe_webhook(
    req: HttpRequest,
    payload: String,
    config: web::Data<Arc<Config>>,
    pool: web::Data<Arc<PgPool>>,
    payments: web::Data<PaymentLog>,
) -> Res<impl Responder> {
    if config.stripe.webhook_secret.is_empty() {
        return Err(AppError::ServiceUnavailable(
            "Stripe webhooks are not configured".to_string(),
        ));
    }

    let signature = req
        .headers()
        .get("stripe-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            AppError::BadRequest("Webhook Error: missing stripe-signature header".to_string())
        })?;

    let event = stripe_events::construct_event(&payload, signature, &config.stripe.webhook_secret)?;
    let event_id = event.id.to_string();
    let billing_event = stripe_events::to_billing_event(event, &config.stripe);

    let pg_pool: &PgPool = &pool;
    if let Err(e) = reconcile::apply(pg_pool, &payments, billing_event).await {
        payments.log_error(
            "webhook.processing.failed",
            PaymentProcessor::Stripe,
            None,
            &e,
            json!({ "eventId": event_id }),
        );
    }

    Success::received()
}

/// PayPal event endpoint.
///
/// Deliveries are checked with PayPal's verify-webhook-signature API when
/// credentials and a webhook id are configured, and deliveries without the
/// transmission headers are then rejected. Otherwise they are processed
/// unverified.
#[post("/paypal")]
pub async fn post_paypal_webhook(
    req: HttpRequest,
    payload: String,
    config: web::Data<Arc<Config>>,
    pool: web::Data<Arc<PgPool>>,
    payments: web::Data<PaymentLog>,
    paypal_client: web::Data<PayPalClient>,
) -> Res<impl Responder> {
    let event = paypal::parse_event(&payload)?;

    if paypal_client.can_verify() {
        let headers = TransmissionHeaders::from_headers(req.headers()).ok_or_else(|| {
            AppError::BadRequest("Webhook Error: missing PayPal transmission headers".to_string())
        })?;
        let raw: Value = serde_json::from_str(&payload)
            .map_err(|e| AppError::BadRequest(format!("Webhook Error: {}", e)))?;
        if !paypal_client.verify_webhook(&headers, &raw).await? {
            log::warn!("Rejected PayPal webhook {}", headers.transmission_id);
            return Err(AppError::BadRequest(
                "Webhook Error: signature verification failed".to_string(),
            ));
        }
        log::info!("Received verified PayPal webhook: {}", event.event_type);
    } else {
        log::info!("Received unverified PayPal webhook: {}", event.event_type);
        if config.is_production() {
            log::warn!("Processing unverified PayPal webhook in production");
        }
    }

    let pg_pool: &PgPool = &pool;
    match reconcile::apply(pg_pool, &payments, event.to_billing_event()).await {
        Ok(_) => Success::received(),
        Err(e) => {
            payments.log_error(
                "webhook.processing.failed",
                PaymentProcessor::PayPal,
                None,
                &e,
                json!({ "eventType": event.event_type }),
            );
            Err(AppError::Internal(format!("Webhook processing error: {}", e)))
        }
    }
}
