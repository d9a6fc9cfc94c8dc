use chrono::{DateTime, NaiveDateTime};
use common::{
    env_config::StripeConfig,
    error::{AppError, Res},
    tier::{PaymentProcessor, SubscriptionStatus, SubscriptionTier},
};
use stripe::{Event, EventObject, EventType, Expandable, Invoice, Subscription, Webhook};

use crate::reconcile::BillingEvent;

/// Verifies the `stripe-signature` header against the raw payload.
pub fn construct_event(payload: &str, signature: &str, webhook_secret: &str) -> Res<Event> {
    Webhook::construct_event(payload, signature, webhook_secret).map_err(|e| {
        log::error!("Webhook signature verification failed: {}", e);
        AppError::BadRequest(format!("Webhook Error: {}", e))
    })
}

/// Reduces a verified Stripe event to the billing change it describes.
pub fn to_billing_event(event: Event, config: &StripeConfig) -> BillingEvent {
    let event_type = event.type_;
    log::info!("Processing Stripe event {}: {}", event.id, event_type);

    match (&event_type, event.data.object) {
        (
            EventType::CustomerSubscriptionCreated
            | EventType::CustomerSubscriptionUpdated
            | EventType::CustomerSubscriptionDeleted,
            EventObject::Subscription(subscription),
        ) => subscription_changed(&subscription, config).unwrap_or_else(|e| {
            log::error!("Unreadable subscription {}: {}", subscription.id, e);
            unhandled(&event_type)
        }),
        (EventType::InvoicePaymentSucceeded, EventObject::Invoice(invoice)) => {
            match invoice_subscription(&invoice) {
                Some(subscription_id) => BillingEvent::StripeInvoicePaid { subscription_id },
                None => unhandled(&event_type),
            }
        }
        (EventType::InvoicePaymentFailed, EventObject::Invoice(invoice)) => {
            match invoice_subscription(&invoice) {
                Some(subscription_id) => BillingEvent::StripeInvoiceFailed { subscription_id },
                None => unhandled(&event_type),
            }
        }
        _ => unhandled(&event_type),
    }
}

fn subscription_changed(subscription: &Subscription, config: &StripeConfig) -> Res<BillingEvent> {
    let status: SubscriptionStatus = subscription.status.as_str().parse()?;
    let price_id = subscription
        .items
        .data
        .first()
        .and_then(|item| item.price.as_ref())
        .map(|price| price.id.to_string());

    Ok(BillingEvent::StripeSubscriptionChanged {
        subscription_id: subscription.id.to_string(),
        status,
        cancel_at_period_end: subscription.cancel_at_period_end,
        current_period_end: from_unix(subscription.current_period_end),
        tier: price_id.and_then(|id| tier_for_price(&id, config)),
    })
}

fn invoice_subscription(invoice: &Invoice) -> Option<String> {
    // one-off invoices carry no subscription
    invoice.subscription.as_ref().map(|s| match s {
        Expandable::Id(id) => id.to_string(),
        Expandable::Object(sub) => sub.id.to_string(),
    })
}

fn unhandled(event_type: &EventType) -> BillingEvent {
    BillingEvent::Unhandled {
        processor: PaymentProcessor::Stripe,
        event_type: event_type.to_string(),
    }
}

/// Maps a Stripe price back to the tier it was configured for.
pub fn tier_for_price(price_id: &str, config: &StripeConfig) -> Option<SubscriptionTier> {
    [SubscriptionTier::Pro, SubscriptionTier::Unlimited]
        .into_iter()
        .find(|tier| config.price_id_for(*tier) == Some(price_id))
}

pub fn from_unix(timestamp: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StripeConfig {
        StripeConfig {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: "whsec_test".to_string(),
            price_id_pro: "price_1Pro".to_string(),
            price_id_unlimited: "price_1Unl".to_string(),
        }
    }

    #[test]
    fn prices_map_back_to_tiers() {
        assert_eq!(tier_for_price("price_1Pro", &config()), Some(SubscriptionTier::Pro));
        assert_eq!(tier_for_price("price_1Unl", &config()), Some(SubscriptionTier::Unlimited));
        assert_eq!(tier_for_price("price_other", &config()), None);
    }

    #[test]
    fn bad_signatures_are_bad_requests() {
        let err = construct_event("{}", "t=1,v1=deadbeef", "whsec_test").unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert!(msg.starts_with("Webhook Error")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn unix_timestamps_convert() {
        let dt = from_unix(1_700_000_000).unwrap();
        assert_eq!(dt.and_utc().timestamp(), 1_700_000_000);
    }
}
