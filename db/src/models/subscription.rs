use chrono::NaiveDateTime;
use common::{
    error::Res,
    tier::{PaymentProcessor, SubscriptionTier},
};
use serde::Serialize;

/// The single subscription a user holds with either processor.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub user_id: String,
    pub customer_id: Option<String>,
    pub subscription_id: String,
    pub status: String,
    pub plan_id: String,
    pub payment_processor: String,
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SubscriptionRecord {
    pub fn processor(&self) -> Res<PaymentProcessor> {
        self.payment_processor.parse()
    }

    /// Tier purchased by this subscription, if the plan id is still known.
    pub fn tier(&self) -> Option<SubscriptionTier> {
        SubscriptionTier::from_plan_id(&self.plan_id)
    }
}
