//! PayPal webhook payloads and the REST call used to verify them.

use actix_web::http::header::HeaderMap;
use common::{
    env_config::PayPalConfig,
    error::{AppError, Res},
    tier::PaymentProcessor,
};
use log::info;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reconcile::BillingEvent;

pub const SUBSCRIPTION_CANCELLED: &str = "BILLING.SUBSCRIPTION.CANCELLED";
pub const SUBSCRIPTION_SUSPENDED: &str = "BILLING.SUBSCRIPTION.SUSPENDED";
pub const SUBSCRIPTION_EXPIRED: &str = "BILLING.SUBSCRIPTION.EXPIRED";
pub const SUBSCRIPTION_ACTIVATED: &str = "BILLING.SUBSCRIPTION.ACTIVATED";
pub const SUBSCRIPTION_UPDATED: &str = "BILLING.SUBSCRIPTION.UPDATED";

#[derive(Debug, Clone, Deserialize)]
pub struct PayPalEvent {
    pub id: Option<String>,
    pub event_type: String,
    #[serde(default)]
    pub resource: Value,
}

impl PayPalEvent {
    /// Id of the subscription the event is about, for `BILLING.SUBSCRIPTION.*` events.
    pub fn subscription_id(&self) -> Option<&str> {
        self.resource.get("id").and_then(Value::as_str)
    }

    pub fn to_billing_event(&self) -> BillingEvent {
        let event_type = self.event_type.as_str();
        let Some(subscription_id) = self.subscription_id().map(str::to_string) else {
            return self.unhandled();
        };

        match event_type {
            SUBSCRIPTION_CANCELLED | SUBSCRIPTION_SUSPENDED | SUBSCRIPTION_EXPIRED => {
                BillingEvent::PayPalSubscriptionEnded {
                    subscription_id,
                    event_type: self.event_type.clone(),
                }
            }
            SUBSCRIPTION_ACTIVATED => BillingEvent::PayPalSubscriptionActivated { subscription_id },
            SUBSCRIPTION_UPDATED => BillingEvent::PayPalSubscriptionUpdated { subscription_id },
            _ => self.unhandled(),
        }
    }

    fn unhandled(&self) -> BillingEvent {
        BillingEvent::Unhandled {
            processor: PaymentProcessor::PayPal,
            event_type: self.event_type.clone(),
        }
    }
}

pub fn parse_event(body: &str) -> Res<PayPalEvent> {
    serde_json::from_str(body).map_err(|e| AppError::BadRequest(format!("Webhook Error: {}", e)))
}

/// `PAYPAL-*` transmission headers sent with every webhook delivery.
#[derive(Debug, Clone)]
pub struct TransmissionHeaders {
    pub auth_algo: String,
    pub cert_url: String,
    pub transmission_id: String,
    pub transmission_sig: String,
    pub transmission_time: String,
}

impl TransmissionHeaders {
    /// `None` unless all five headers are present.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Some(TransmissionHeaders {
            auth_algo: get("paypal-auth-algo")?,
            cert_url: get("paypal-cert-url")?,
            transmission_id: get("paypal-transmission-id")?,
            transmission_sig: get("paypal-transmission-sig")?,
            transmission_time: get("paypal-transmission-time")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct VerifySignatureRequest<'a> {
    auth_algo: &'a str,
    cert_url: &'a str,
    transmission_id: &'a str,
    transmission_sig: &'a str,
    transmission_time: &'a str,
    webhook_id: &'a str,
    webhook_event: &'a Value,
}

#[derive(Debug, Deserialize)]
struct VerifySignatureResponse {
    verification_status: String,
}

pub struct PayPalClient {
    client: Client,
    config: PayPalConfig,
}

impl PayPalClient {
    pub fn new(config: PayPalConfig) -> Self {
        PayPalClient {
            client: Client::new(),
            config,
        }
    }

    pub fn can_verify(&self) -> bool {
        self.config.can_verify_webhooks()
    }

    async fn access_token(&self) -> Res<String> {
        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.config.api_base))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(AppError::Internal(format!(
                "PayPal token request failed with status {}",
                response.status()
            )));
        }
        Ok(response.json::<AccessTokenResponse>().await?.access_token)
    }

    /// Asks PayPal whether `event` was signed for the configured webhook.
    pub async fn verify_webhook(&self, headers: &TransmissionHeaders, event: &Value) -> Res<bool> {
        let token = self.access_token().await?;
        let body = VerifySignatureRequest {
            auth_algo: &headers.auth_algo,
            cert_url: &headers.cert_url,
            transmission_id: &headers.transmission_id,
            transmission_sig: &headers.transmission_sig,
            transmission_time: &headers.transmission_time,
            webhook_id: &self.config.webhook_id,
            webhook_event: event,
        };

        info!("Verifying PayPal webhook {}", headers.transmission_id);
        let response = self
            .client
            .post(format!(
                "{}/v1/notifications/verify-webhook-signature",
                self.config.api_base
            ))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<VerifySignatureResponse>()
            .await?;

        Ok(response.verification_status == "SUCCESS")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    #[test]
    fn cancellation_events_end_the_subscription() {
        let event = parse_event(
            r#"{"id":"WH-1","event_type":"BILLING.SUBSCRIPTION.SUSPENDED","resource":{"id":"I-ABC","status":"SUSPENDED"}}"#,
        )
        .unwrap();
        assert_eq!(
            event.to_billing_event(),
            BillingEvent::PayPalSubscriptionEnded {
                subscription_id: "I-ABC".to_string(),
                event_type: SUBSCRIPTION_SUSPENDED.to_string(),
            }
        );
    }

    #[test]
    fn activation_and_unknown_events() {
        let activated =
            parse_event(r#"{"event_type":"BILLING.SUBSCRIPTION.ACTIVATED","resource":{"id":"I-1"}}"#)
                .unwrap();
        assert_eq!(
            activated.to_billing_event(),
            BillingEvent::PayPalSubscriptionActivated {
                subscription_id: "I-1".to_string()
            }
        );

        let sale = parse_event(r#"{"event_type":"PAYMENT.SALE.COMPLETED","resource":{"id":"S-1"}}"#)
            .unwrap();
        assert!(matches!(sale.to_billing_event(), BillingEvent::Unhandled { .. }));
    }

    #[test]
    fn events_without_resource_id_are_unhandled() {
        let event = parse_event(r#"{"event_type":"BILLING.SUBSCRIPTION.CANCELLED"}"#).unwrap();
        assert!(matches!(event.to_billing_event(), BillingEvent::Unhandled { .. }));
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        assert!(matches!(parse_event("not json"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn transmission_headers_need_all_fields() {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            ("paypal-auth-algo", "SHA256withRSA"),
            ("paypal-cert-url", "https://api.paypal.com/cert.pem"),
            ("paypal-transmission-id", "abc"),
            ("paypal-transmission-sig", "sig"),
        ] {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        assert!(TransmissionHeaders::from_headers(&headers).is_none());

        headers.insert(
            HeaderName::from_static("paypal-transmission-time"),
            HeaderValue::from_static("2024-01-01T00:00:00Z"),
        );
        let parsed = TransmissionHeaders::from_headers(&headers).unwrap();
        assert_eq!(parsed.transmission_id, "abc");
    }
}
