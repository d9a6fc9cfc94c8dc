use serde::{Deserialize, Serialize};

use crate::models::plan::SubscriptionPlan;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub payment_method_id: String,
    pub plan_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionResponse {
    pub subscription_id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelSubscriptionRequest {
    pub subscription_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPayPalRequest {
    #[serde(rename = "subscriptionID")]
    pub subscription_id: String,
    #[serde(rename = "planId")]
    pub plan_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSummary {
    pub brand: String,
    pub last4: String,
    pub exp_month: i64,
    pub exp_year: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDetails {
    pub id: String,
    pub status: String,
    pub plan_id: String,
    pub cancel_at_period_end: bool,
    /// Unix timestamp of the end of the paid period.
    pub current_period_end: Option<i64>,
    pub payment_method: Option<CardSummary>,
    pub payment_processor: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionEnvelope {
    pub subscription: Option<SubscriptionDetails>,
}

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<SubscriptionPlan>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentLogQuery {
    pub count: Option<usize>,
    pub errors: Option<bool>,
}
