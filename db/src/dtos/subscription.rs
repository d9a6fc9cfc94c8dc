use chrono::NaiveDateTime;
use common::tier::{PaymentProcessor, SubscriptionStatus};

#[derive(Debug, Clone)]
pub struct SubscriptionUpsert {
    pub user_id: String,
    pub customer_id: Option<String>,
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    pub plan_id: String,
    pub processor: PaymentProcessor,
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<NaiveDateTime>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionPatch {
    pub status: Option<SubscriptionStatus>,
    pub cancel_at_period_end: Option<bool>,
    pub current_period_end: Option<NaiveDateTime>,
    pub plan_id: Option<String>,
}
