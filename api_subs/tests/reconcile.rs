use std::{collections::HashMap, sync::Mutex};

use api_subs::reconcile::{self, BillingEvent, ReconcileOutcome};
use async_trait::async_trait;
use chrono::Utc;
use common::{
    error::{AppError, Res},
    tier::{PaymentProcessor, SubscriptionStatus, SubscriptionTier},
};
use db::{
    BillingStore,
    dtos::subscription::{SubscriptionPatch, SubscriptionUpsert},
    models::{subscription::SubscriptionRecord, user::User},
};
use logger::PaymentLog;

#[derive(Default)]
struct MemoryStore {
    users: Mutex<HashMap<String, User>>,
    subscriptions: Mutex<HashMap<String, SubscriptionRecord>>,
}

impl MemoryStore {
    fn with_subscriber(
        user_id: &str,
        tier: SubscriptionTier,
        remaining: i32,
        processor: PaymentProcessor,
        subscription_id: &str,
    ) -> Self {
        let store = MemoryStore::default();
        let now = Utc::now().naive_utc();
        store.users.lock().unwrap().insert(
            user_id.to_string(),
            User {
                id: user_id.to_string(),
                email: format!("{}@example.com", user_id),
                display_name: user_id.to_string(),
                photo_url: None,
                subscription_tier: tier.to_string(),
                mockups_remaining: remaining,
                mockups_created: 0,
                favorited_templates: vec![],
                created_at: now,
                updated_at: now,
            },
        );
        store.subscriptions.lock().unwrap().insert(
            user_id.to_string(),
            SubscriptionRecord {
                user_id: user_id.to_string(),
                customer_id: None,
                subscription_id: subscription_id.to_string(),
                status: SubscriptionStatus::Active.to_string(),
                plan_id: tier.to_string(),
                payment_processor: processor.to_string(),
                cancel_at_period_end: false,
                current_period_end: None,
                created_at: now,
                updated_at: now,
            },
        );
        store
    }

    fn stored_user(&self, user_id: &str) -> User {
        self.users.lock().unwrap()[user_id].clone()
    }

    fn set_remaining(&self, user_id: &str, remaining: i32) {
        if let Some(user) = self.users.lock().unwrap().get_mut(user_id) {
            user.mockups_remaining = remaining;
        }
    }

    fn delete_user(&self, user_id: &str) {
        self.users.lock().unwrap().remove(user_id);
    }

    fn record(&self, user_id: &str) -> SubscriptionRecord {
        self.subscriptions.lock().unwrap()[user_id].clone()
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn user(&self, user_id: &str) -> Res<Option<User>> {
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }

    async fn set_user_tier(&self, user_id: &str, tier: SubscriptionTier) -> Res<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(user_id.to_string()))?;
        user.subscription_tier = tier.to_string();
        user.mockups_remaining = tier.monthly_quota();
        Ok(())
    }

    async fn subscription_for_user(&self, user_id: &str) -> Res<Option<SubscriptionRecord>> {
        Ok(self.subscriptions.lock().unwrap().get(user_id).cloned())
    }

    async fn subscription_by_external_id(
        &self,
        processor: PaymentProcessor,
        subscription_id: &str,
    ) -> Res<Option<SubscriptionRecord>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .find(|r| {
                r.payment_processor == processor.as_str() && r.subscription_id == subscription_id
            })
            .cloned())
    }

    async fn upsert_subscription(&self, data: SubscriptionUpsert) -> Res<SubscriptionRecord> {
        let now = Utc::now().naive_utc();
        let record = SubscriptionRecord {
            user_id: data.user_id.clone(),
            customer_id: data.customer_id,
            subscription_id: data.subscription_id,
            status: data.status.to_string(),
            plan_id: data.plan_id,
            payment_processor: data.processor.to_string(),
            cancel_at_period_end: data.cancel_at_period_end,
            current_period_end: data.current_period_end,
            created_at: now,
            updated_at: now,
        };
        self.subscriptions
            .lock()
            .unwrap()
            .insert(data.user_id, record.clone());
        Ok(record)
    }

    async fn patch_subscription(&self, user_id: &str, patch: SubscriptionPatch) -> Res<()> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let record = subscriptions
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(user_id.to_string()))?;
        if let Some(status) = patch.status {
            record.status = status.to_string();
        }
        if let Some(flag) = patch.cancel_at_period_end {
            record.cancel_at_period_end = flag;
        }
        if let Some(end) = patch.current_period_end {
            record.current_period_end = Some(end);
        }
        if let Some(plan_id) = patch.plan_id {
            record.plan_id = plan_id;
        }
        Ok(())
    }
}

fn payment_log() -> (tempfile::TempDir, PaymentLog) {
    let dir = tempfile::tempdir().unwrap();
    let log = PaymentLog::new(dir.path()).unwrap();
    (dir, log)
}

#[tokio::test]
async fn stripe_cancellation_downgrades_to_free() {
    let store = MemoryStore::with_subscriber(
        "u1",
        SubscriptionTier::Pro,
        7,
        PaymentProcessor::Stripe,
        "sub_123",
    );
    let (_dir, payments) = payment_log();

    let outcome = reconcile::apply(
        &store,
        &payments,
        BillingEvent::StripeSubscriptionChanged {
            subscription_id: "sub_123".to_string(),
            status: SubscriptionStatus::Canceled,
            cancel_at_period_end: false,
            current_period_end: None,
            tier: Some(SubscriptionTier::Pro),
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Applied { user_id: "u1".to_string() });
    assert_eq!(store.record("u1").status, "canceled");
    let user = store.stored_user("u1");
    assert_eq!(user.subscription_tier, "free");
    assert_eq!(user.mockups_remaining, 3);

    let logged = payments.recent(10, false).unwrap();
    assert_eq!(logged[0].action, "subscription.canceled");
}

#[tokio::test]
async fn upgrade_through_subscription_update_sets_new_tier() {
    let store = MemoryStore::with_subscriber(
        "u1",
        SubscriptionTier::Pro,
        2,
        PaymentProcessor::Stripe,
        "sub_123",
    );
    let (_dir, payments) = payment_log();

    reconcile::apply(
        &store,
        &payments,
        BillingEvent::StripeSubscriptionChanged {
            subscription_id: "sub_123".to_string(),
            status: SubscriptionStatus::Active,
            cancel_at_period_end: true,
            current_period_end: None,
            tier: Some(SubscriptionTier::Unlimited),
        },
    )
    .await
    .unwrap();

    let record = store.record("u1");
    assert!(record.cancel_at_period_end);
    assert_eq!(record.plan_id, "unlimited");
    assert_eq!(store.stored_user("u1").subscription_tier, "unlimited");
}

#[tokio::test]
async fn repeated_updates_do_not_refill_quota() {
    let store = MemoryStore::with_subscriber(
        "u1",
        SubscriptionTier::Pro,
        4,
        PaymentProcessor::Stripe,
        "sub_123",
    );
    let (_dir, payments) = payment_log();

    reconcile::apply(
        &store,
        &payments,
        BillingEvent::StripeSubscriptionChanged {
            subscription_id: "sub_123".to_string(),
            status: SubscriptionStatus::Active,
            cancel_at_period_end: false,
            current_period_end: None,
            tier: Some(SubscriptionTier::Pro),
        },
    )
    .await
    .unwrap();

    assert_eq!(store.stored_user("u1").mockups_remaining, 4);
}

#[tokio::test]
async fn paid_invoice_resets_quota_for_the_cycle() {
    let store = MemoryStore::with_subscriber(
        "u1",
        SubscriptionTier::Pro,
        0,
        PaymentProcessor::Stripe,
        "sub_123",
    );
    let (_dir, payments) = payment_log();

    reconcile::apply(
        &store,
        &payments,
        BillingEvent::StripeInvoicePaid {
            subscription_id: "sub_123".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(store.record("u1").status, "active");
    assert_eq!(store.stored_user("u1").mockups_remaining, 15);
}

#[tokio::test]
async fn failed_invoice_marks_past_due() {
    let store = MemoryStore::with_subscriber(
        "u1",
        SubscriptionTier::Unlimited,
        999_999,
        PaymentProcessor::Stripe,
        "sub_123",
    );
    let (_dir, payments) = payment_log();

    reconcile::apply(
        &store,
        &payments,
        BillingEvent::StripeInvoiceFailed {
            subscription_id: "sub_123".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(store.record("u1").status, "past_due");
    // access is kept until Stripe cancels the subscription
    assert_eq!(store.stored_user("u1").subscription_tier, "unlimited");
}

#[tokio::test]
async fn unknown_subscriptions_are_ignored() {
    let store = MemoryStore::with_subscriber(
        "u1",
        SubscriptionTier::Pro,
        5,
        PaymentProcessor::Stripe,
        "sub_123",
    );
    let (_dir, payments) = payment_log();

    let outcome = reconcile::apply(
        &store,
        &payments,
        BillingEvent::StripeInvoicePaid {
            subscription_id: "sub_other".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome, ReconcileOutcome::UnknownSubscription);
    assert_eq!(store.stored_user("u1").mockups_remaining, 5);
}

#[tokio::test]
async fn paypal_cancellation_downgrades_to_free() {
    let store = MemoryStore::with_subscriber(
        "u2",
        SubscriptionTier::Unlimited,
        999_999,
        PaymentProcessor::PayPal,
        "I-BW452GLLEP1G",
    );
    let (_dir, payments) = payment_log();

    let outcome = reconcile::apply(
        &store,
        &payments,
        BillingEvent::PayPalSubscriptionEnded {
            subscription_id: "I-BW452GLLEP1G".to_string(),
            event_type: "BILLING.SUBSCRIPTION.CANCELLED".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Applied { user_id: "u2".to_string() });
    assert_eq!(store.record("u2").status, "canceled");
    assert_eq!(store.stored_user("u2").subscription_tier, "free");
    assert_eq!(store.stored_user("u2").mockups_remaining, 3);
    let logged = payments.recent(1, false).unwrap();
    assert_eq!(logged[0].provider, "paypal");
}

#[tokio::test]
async fn paypal_ids_do_not_match_stripe_records() {
    let store = MemoryStore::with_subscriber(
        "u1",
        SubscriptionTier::Pro,
        5,
        PaymentProcessor::Stripe,
        "shared-id",
    );
    let (_dir, payments) = payment_log();

    let outcome = reconcile::apply(
        &store,
        &payments,
        BillingEvent::PayPalSubscriptionEnded {
            subscription_id: "shared-id".to_string(),
            event_type: "BILLING.SUBSCRIPTION.EXPIRED".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome, ReconcileOutcome::UnknownSubscription);
    assert_eq!(store.stored_user("u1").subscription_tier, "pro");
}

#[tokio::test]
async fn unhandled_events_are_acknowledged() {
    let store = MemoryStore::default();
    let (_dir, payments) = payment_log();

    let outcome = reconcile::apply(
        &store,
        &payments,
        BillingEvent::Unhandled {
            processor: PaymentProcessor::Stripe,
            event_type: "charge.refunded".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Ignored);
}

#[tokio::test]
async fn repeated_cancellations_do_not_refill_quota() {
    let store = MemoryStore::with_subscriber(
        "u1",
        SubscriptionTier::Pro,
        9,
        PaymentProcessor::Stripe,
        "sub_123",
    );
    let (_dir, payments) = payment_log();
    let canceled = BillingEvent::StripeSubscriptionChanged {
        subscription_id: "sub_123".to_string(),
        status: SubscriptionStatus::Canceled,
        cancel_at_period_end: false,
        current_period_end: None,
        tier: Some(SubscriptionTier::Pro),
    };

    reconcile::apply(&store, &payments, canceled.clone())
        .await
        .unwrap();
    assert_eq!(store.stored_user("u1").mockups_remaining, 3);

    store.set_remaining("u1", 1);
    reconcile::apply(&store, &payments, canceled).await.unwrap();

    let user = store.stored_user("u1");
    assert_eq!(user.subscription_tier, "free");
    assert_eq!(user.mockups_remaining, 1);
    let logged = payments.recent(10, false).unwrap();
    assert_eq!(
        logged
            .iter()
            .filter(|entry| entry.action == "subscription.canceled")
            .count(),
        1
    );
}

#[tokio::test]
async fn cancellation_for_deleted_account_updates_the_record() {
    let store = MemoryStore::with_subscriber(
        "u1",
        SubscriptionTier::Pro,
        5,
        PaymentProcessor::PayPal,
        "I-1",
    );
    store.delete_user("u1");
    let (_dir, payments) = payment_log();

    let outcome = reconcile::apply(
        &store,
        &payments,
        BillingEvent::PayPalSubscriptionEnded {
            subscription_id: "I-1".to_string(),
            event_type: "BILLING.SUBSCRIPTION.CANCELLED".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Applied { user_id: "u1".to_string() });
    assert_eq!(store.record("u1").status, "canceled");
}

#[tokio::test]
async fn paid_invoice_for_deleted_account_updates_the_record() {
    let store = MemoryStore::with_subscriber(
        "u1",
        SubscriptionTier::Pro,
        0,
        PaymentProcessor::Stripe,
        "sub_123",
    );
    store.delete_user("u1");
    let (_dir, payments) = payment_log();

    let outcome = reconcile::apply(
        &store,
        &payments,
        BillingEvent::StripeInvoicePaid {
            subscription_id: "sub_123".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Applied { user_id: "u1".to_string() });
    assert_eq!(store.record("u1").status, "active");
}
