//! Applies billing notifications from Stripe and PayPal to subscription
//! records and user entitlements.
//!
//! Provider payloads are first reduced to a [`BillingEvent`]; [`apply`] then
//! performs the writes through a [`BillingStore`], so the rules can run
//! against any store.

use chrono::NaiveDateTime;
use common::{
    error::Res,
    tier::{PaymentProcessor, SubscriptionStatus, SubscriptionTier},
};
use db::{
    BillingStore,
    dtos::subscription::SubscriptionPatch,
    models::{subscription::SubscriptionRecord, user::User},
};
use logger::PaymentLog;
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
pub enum BillingEvent {
    /// `customer.subscription.created|updated|deleted`
    StripeSubscriptionChanged {
        subscription_id: String,
        status: SubscriptionStatus,
        cancel_at_period_end: bool,
        current_period_end: Option<NaiveDateTime>,
        /// Tier of the subscribed price, when it matches a configured price.
        tier: Option<SubscriptionTier>,
    },
    /// `invoice.payment_succeeded`: a billing cycle was paid.
    StripeInvoicePaid { subscription_id: String },
    /// `invoice.payment_failed`
    StripeInvoiceFailed { subscription_id: String },
    /// `BILLING.SUBSCRIPTION.CANCELLED|SUSPENDED|EXPIRED`
    PayPalSubscriptionEnded {
        subscription_id: String,
        event_type: String,
    },
    /// `BILLING.SUBSCRIPTION.ACTIVATED`
    PayPalSubscriptionActivated { subscription_id: String },
    /// `BILLING.SUBSCRIPTION.UPDATED`
    PayPalSubscriptionUpdated { subscription_id: String },
    /// Anything else; acknowledged and logged only.
    Unhandled {
        processor: PaymentProcessor,
        event_type: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Records of this user were written.
    Applied { user_id: String },
    /// The event names a subscription we have no record of.
    UnknownSubscription,
    /// Nothing to write for this event.
    Ignored,
}

pub async fn apply(
    store: &dyn BillingStore,
    payments: &PaymentLog,
    event: BillingEvent,
) -> Res<ReconcileOutcome> {
    match event {
        BillingEvent::StripeSubscriptionChanged {
            subscription_id,
            status,
            cancel_at_period_end,
            current_period_end,
            tier,
        } => {
            let Some(record) =
                find_record(store, PaymentProcessor::Stripe, &subscription_id).await?
            else {
                return Ok(ReconcileOutcome::UnknownSubscription);
            };

            store
                .patch_subscription(
                    &record.user_id,
                    SubscriptionPatch {
                        status: Some(status),
                        cancel_at_period_end: Some(cancel_at_period_end),
                        current_period_end,
                        plan_id: tier.map(|t| t.as_str().to_string()),
                    },
                )
                .await?;

            if status.is_terminal() {
                downgrade(store, payments, &record, PaymentProcessor::Stripe).await?;
            } else if status.is_entitled() {
                if let Some(tier) = tier.or_else(|| record.tier()) {
                    sync_tier(store, &record.user_id, tier).await?;
                }
            }
            Ok(ReconcileOutcome::Applied {
                user_id: record.user_id,
            })
        }

        BillingEvent::StripeInvoicePaid { subscription_id } => {
            let Some(record) =
                find_record(store, PaymentProcessor::Stripe, &subscription_id).await?
            else {
                return Ok(ReconcileOutcome::UnknownSubscription);
            };

            store
                .patch_subscription(
                    &record.user_id,
                    SubscriptionPatch {
                        status: Some(SubscriptionStatus::Active),
                        ..Default::default()
                    },
                )
                .await?;

            // new billing cycle: refill the quota of the purchased tier
            let tier = record.tier().unwrap_or(SubscriptionTier::Free);
            if existing_user(store, &record.user_id).await?.is_some() {
                store.set_user_tier(&record.user_id, tier).await?;
                payments.log_transaction(
                    "invoice.paid",
                    PaymentProcessor::Stripe,
                    &record.user_id,
                    json!({ "subscriptionId": subscription_id, "planId": tier.as_str() }),
                );
            }
            Ok(ReconcileOutcome::Applied {
                user_id: record.user_id,
            })
        }

        BillingEvent::StripeInvoiceFailed { subscription_id } => {
            let Some(record) =
                find_record(store, PaymentProcessor::Stripe, &subscription_id).await?
            else {
                return Ok(ReconcileOutcome::UnknownSubscription);
            };

            store
                .patch_subscription(
                    &record.user_id,
                    SubscriptionPatch {
                        status: Some(SubscriptionStatus::PastDue),
                        ..Default::default()
                    },
                )
                .await?;
            payments.log_transaction(
                "invoice.payment_failed",
                PaymentProcessor::Stripe,
                &record.user_id,
                json!({ "subscriptionId": subscription_id }),
            );
            Ok(ReconcileOutcome::Applied {
                user_id: record.user_id,
            })
        }

        BillingEvent::PayPalSubscriptionEnded {
            subscription_id,
            event_type,
        } => {
            let Some(record) =
                find_record(store, PaymentProcessor::PayPal, &subscription_id).await?
            else {
                return Ok(ReconcileOutcome::UnknownSubscription);
            };

            log::info!("PayPal subscription {} ended ({})", subscription_id, event_type);
            store
                .patch_subscription(
                    &record.user_id,
                    SubscriptionPatch {
                        status: Some(SubscriptionStatus::Canceled),
                        ..Default::default()
                    },
                )
                .await?;
            downgrade(store, payments, &record, PaymentProcessor::PayPal).await?;
            Ok(ReconcileOutcome::Applied {
                user_id: record.user_id,
            })
        }

        BillingEvent::PayPalSubscriptionActivated { subscription_id } => {
            let Some(record) =
                find_record(store, PaymentProcessor::PayPal, &subscription_id).await?
            else {
                return Ok(ReconcileOutcome::UnknownSubscription);
            };

            store
                .patch_subscription(
                    &record.user_id,
                    SubscriptionPatch {
                        status: Some(SubscriptionStatus::Active),
                        ..Default::default()
                    },
                )
                .await?;
            if let Some(tier) = record.tier() {
                sync_tier(store, &record.user_id, tier).await?;
            }
            Ok(ReconcileOutcome::Applied {
                user_id: record.user_id,
            })
        }

        BillingEvent::PayPalSubscriptionUpdated { subscription_id } => {
            log::info!("PayPal subscription {} updated", subscription_id);
            Ok(ReconcileOutcome::Ignored)
        }

        BillingEvent::Unhandled {
            processor,
            event_type,
        } => {
            log::info!("Unhandled {} event type: {}", processor, event_type);
            Ok(ReconcileOutcome::Ignored)
        }
    }
}

async fn find_record(
    store: &dyn BillingStore,
    processor: PaymentProcessor,
    subscription_id: &str,
) -> Res<Option<SubscriptionRecord>> {
    let record = store
        .subscription_by_external_id(processor, subscription_id)
        .await?;
    if record.is_none() {
        log::warn!(
            "No {} subscription record for {}, event ignored",
            processor,
            subscription_id
        );
    }
    Ok(record)
}

/// Moves the user back to `free`. Users already there keep what is left of
/// their quota, so redelivered cancellations do not refill it.
async fn downgrade(
    store: &dyn BillingStore,
    payments: &PaymentLog,
    record: &SubscriptionRecord,
    processor: PaymentProcessor,
) -> Res<()> {
    match existing_user(store, &record.user_id).await? {
        Some(user) if user.tier() == SubscriptionTier::Free => Ok(()),
        Some(_) => {
            store
                .set_user_tier(&record.user_id, SubscriptionTier::Free)
                .await?;
            payments.log_transaction(
                "subscription.canceled",
                processor,
                &record.user_id,
                json!({ "subscriptionId": record.subscription_id }),
            );
            Ok(())
        }
        None => Ok(()),
    }
}

/// Moves the user onto `tier` unless already there, so repeated
/// notifications do not refill the quota mid-cycle.
async fn sync_tier(store: &dyn BillingStore, user_id: &str, tier: SubscriptionTier) -> Res<()> {
    match existing_user(store, user_id).await? {
        Some(user) if user.tier() == tier => Ok(()),
        Some(_) => store.set_user_tier(user_id, tier).await,
        None => Ok(()),
    }
}

/// Accounts can be deleted while their subscription record stays behind;
/// events for them only touch the record.
async fn existing_user(store: &dyn BillingStore, user_id: &str) -> Res<Option<User>> {
    let user = store.user(user_id).await?;
    if user.is_none() {
        log::warn!("Subscription belongs to unknown user {}", user_id);
    }
    Ok(user)
}
