use common::{
    env_config::Config,
    error::{AppError, Res},
    stripe as stripe_client,
    tier::{PaymentProcessor, SubscriptionStatus, SubscriptionTier},
};
use db::{
    BillingStore,
    dtos::subscription::{SubscriptionPatch, SubscriptionUpsert},
    models::subscription::SubscriptionRecord,
};
use logger::PaymentLog;
use serde_json::json;

use crate::{
    dtos::sub::{CreateSubscriptionResponse, SubscriptionDetails},
    services::{stripe_events::from_unix, sub},
};

/// Subscribes the user to `tier` through Stripe and records the result.
pub async fn start_stripe_subscription(
    config: &Config,
    store: &dyn BillingStore,
    payments: &PaymentLog,
    user_id: &str,
    email: &str,
    payment_method_id: &str,
    tier: SubscriptionTier,
) -> Res<CreateSubscriptionResponse> {
    let price_id = config.stripe.price_id_for(tier).ok_or_else(|| {
        AppError::ServiceUnavailable(format!("No Stripe price configured for the {} plan", tier))
    })?;

    let client = stripe_client::create_client(&config.stripe.secret_key);
    let customer = stripe_client::find_or_create_customer(&client, email, payment_method_id).await?;
    let subscription = sub::create_subscription(&client, &customer, price_id, payment_method_id).await?;
    let status: SubscriptionStatus = subscription.status.as_str().parse()?;

    store
        .upsert_subscription(SubscriptionUpsert {
            user_id: user_id.to_string(),
            customer_id: Some(customer.id.to_string()),
            subscription_id: subscription.id.to_string(),
            status,
            plan_id: tier.as_str().to_string(),
            processor: PaymentProcessor::Stripe,
            cancel_at_period_end: subscription.cancel_at_period_end,
            current_period_end: from_unix(subscription.current_period_end),
        })
        .await?;

    // incomplete subscriptions are upgraded later by the webhook
    if status.is_entitled() {
        store.set_user_tier(user_id, tier).await?;
    }

    payments.log_transaction(
        "subscription.created",
        PaymentProcessor::Stripe,
        user_id,
        json!({
            "subscriptionId": subscription.id.to_string(),
            "planId": tier.as_str(),
            "customerId": customer.id.to_string(),
        }),
    );

    Ok(CreateSubscriptionResponse {
        subscription_id: subscription.id.to_string(),
        client_secret: sub::client_secret(&subscription),
        status: status.to_string(),
    })
}

/// Stored record enriched with live Stripe data. Stripe failures are logged
/// and the stored values are returned instead.
pub async fn subscription_details(config: &Config, record: SubscriptionRecord) -> SubscriptionDetails {
    let processor = record.processor().unwrap_or(PaymentProcessor::Stripe);
    let mut details = SubscriptionDetails {
        id: record.subscription_id.clone(),
        status: record.status.clone(),
        plan_id: record.plan_id.clone(),
        cancel_at_period_end: record.cancel_at_period_end,
        current_period_end: record.current_period_end.map(|d| d.and_utc().timestamp()),
        payment_method: None,
        payment_processor: processor.to_string(),
    };

    if processor != PaymentProcessor::Stripe || !config.stripe.is_configured() {
        return details;
    }

    let client = stripe_client::create_client(&config.stripe.secret_key);
    match sub::retrieve_subscription(&client, &record.subscription_id).await {
        Ok(live) => {
            details.status = live.status.to_string();
            details.cancel_at_period_end = live.cancel_at_period_end;
            details.current_period_end = Some(live.current_period_end);
            details.payment_method = sub::default_card(&client, &live)
                .await
                .unwrap_or_else(|e| {
                    log::error!("Error retrieving payment method for {}: {}", live.id, e);
                    None
                });
        }
        Err(e) => log::error!(
            "Error retrieving Stripe subscription {}: {}",
            record.subscription_id,
            e
        ),
    }
    details
}

/// Cancels the user's subscription with its processor and marks the record.
pub async fn cancel_subscription(
    config: &Config,
    store: &dyn BillingStore,
    payments: &PaymentLog,
    user_id: &str,
    requested_id: Option<&str>,
) -> Res<()> {
    let record = store
        .subscription_for_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

    if let Some(requested) = requested_id {
        if requested != record.subscription_id {
            return Err(AppError::Forbidden(
                "Subscription does not belong to this user".to_string(),
            ));
        }
    }

    let processor = record.processor()?;
    let patch = match processor {
        // PayPal subscriptions are managed from the PayPal account
        PaymentProcessor::PayPal => SubscriptionPatch {
            status: Some(SubscriptionStatus::Canceled),
            ..Default::default()
        },
        PaymentProcessor::Stripe => {
            if !config.stripe.is_configured() {
                return Err(AppError::ServiceUnavailable(
                    "Stripe API key not configured".to_string(),
                ));
            }
            let client = stripe_client::create_client(&config.stripe.secret_key);
            let updated = sub::cancel_at_period_end(&client, &record.subscription_id).await?;
            SubscriptionPatch {
                status: Some(updated.status.as_str().parse()?),
                cancel_at_period_end: Some(updated.cancel_at_period_end),
                current_period_end: from_unix(updated.current_period_end),
                plan_id: None,
            }
        }
    };

    store.patch_subscription(user_id, patch).await?;
    payments.log_transaction(
        "subscription.canceled",
        processor,
        user_id,
        json!({ "subscriptionId": record.subscription_id }),
    );
    Ok(())
}

/// Records a PayPal subscription approved in the browser and grants its tier.
pub async fn confirm_paypal_subscription(
    store: &dyn BillingStore,
    payments: &PaymentLog,
    user_id: &str,
    subscription_id: &str,
    tier: SubscriptionTier,
) -> Res<()> {
    if subscription_id.trim().is_empty() {
        return Err(AppError::BadRequest("subscriptionID is required".to_string()));
    }

    store
        .upsert_subscription(SubscriptionUpsert {
            user_id: user_id.to_string(),
            customer_id: None,
            subscription_id: subscription_id.to_string(),
            status: SubscriptionStatus::Active,
            plan_id: tier.as_str().to_string(),
            processor: PaymentProcessor::PayPal,
            cancel_at_period_end: false,
            current_period_end: None,
        })
        .await?;
    store.set_user_tier(user_id, tier).await?;

    log::warn!(
        "PayPal subscription {} recorded for {} without verification",
        subscription_id,
        user_id
    );
    payments.log_transaction(
        "subscription.created",
        PaymentProcessor::PayPal,
        user_id,
        json!({ "subscriptionId": subscription_id, "planId": tier.as_str(), "verified": false }),
    );
    Ok(())
}
