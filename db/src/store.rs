use async_trait::async_trait;
use common::{
    error::Res,
    tier::{PaymentProcessor, SubscriptionTier},
};
use sqlx::PgPool;

use crate::{
    dtos::subscription::{SubscriptionPatch, SubscriptionUpsert},
    models::{subscription::SubscriptionRecord, user::User},
    subscription, user,
};

/// Persistence needed to reconcile billing state with user entitlements.
#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn user(&self, user_id: &str) -> Res<Option<User>>;

    /// Sets the tier and refills the quota for it.
    async fn set_user_tier(&self, user_id: &str, tier: SubscriptionTier) -> Res<()>;

    async fn subscription_for_user(&self, user_id: &str) -> Res<Option<SubscriptionRecord>>;

    async fn subscription_by_external_id(
        &self,
        processor: PaymentProcessor,
        subscription_id: &str,
    ) -> Res<Option<SubscriptionRecord>>;

    async fn upsert_subscription(&self, data: SubscriptionUpsert) -> Res<SubscriptionRecord>;

    async fn patch_subscription(&self, user_id: &str, patch: SubscriptionPatch) -> Res<()>;
}

#[async_trait]
impl BillingStore for PgPool {
    async fn user(&self, user_id: &str) -> Res<Option<User>> {
        user::get_user_by_id(self, user_id).await
    }

    async fn set_user_tier(&self, user_id: &str, tier: SubscriptionTier) -> Res<()> {
        user::set_tier(self, user_id, tier).await
    }

    async fn subscription_for_user(&self, user_id: &str) -> Res<Option<SubscriptionRecord>> {
        subscription::get_by_user(self, user_id).await
    }

    async fn subscription_by_external_id(
        &self,
        processor: PaymentProcessor,
        subscription_id: &str,
    ) -> Res<Option<SubscriptionRecord>> {
        subscription::get_by_external_id(self, processor, subscription_id).await
    }

    async fn upsert_subscription(&self, data: SubscriptionUpsert) -> Res<SubscriptionRecord> {
        subscription::upsert(self, data).await
    }

    async fn patch_subscription(&self, user_id: &str, patch: SubscriptionPatch) -> Res<()> {
        subscription::patch(self, user_id, patch).await
    }
}
