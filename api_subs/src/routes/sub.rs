use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    firebase::FirebaseClaims,
    http::Success,
    tier::{PaymentProcessor, SubscriptionTier},
};
use logger::PaymentLog;
use serde_json::json;
use sqlx::PgPool;

use crate::{
    dtos::sub::{
        CancelSubscriptionRequest, ConfirmPayPalRequest, CreateSubscriptionRequest, PlansResponse,
        SubscriptionEnvelope,
    },
    models::plan,
    services::billing,
};

fn parse_plan(plan_id: &str) -> Res<SubscriptionTier> {
    SubscriptionTier::from_plan_id(plan_id)
        .ok_or_else(|| AppError::BadRequest("Invalid plan selected".to_string()))
}

/// Public pricing table.
#[get("/plans")]
pub async fn get_plans() -> Res<impl Responder> {
    Success::ok(PlansResponse {
        plans: plan::catalogue(),
    })
}

/// Subscribes the signed-in user to a paid plan with a card collected by Stripe Elements.
///
/// # Input
/// - `paymentMethodId`: id of the payment method created on the client
/// - `planId`: `price_pro` / `pro` or `price_unlimited` / `unlimited`
///
/// # Output
/// - Success: `{subscriptionId, clientSecret, status}`; when `status` is
///   `incomplete` the client confirms the payment with `clientSecret`
/// - Error: 400 for an unknown plan, 503 when Stripe is not configured,
///   500 when Stripe rejects the request (also written to the payment error log)
///
/// # Frontend Example
/// ```javascript
/// const { paymentMethod } = await stripe.createPaymentMethod({ type: 'card', card });
/// const response = await fetch('/api/create-subscription', {
///   method: 'POST',
///   headers: {
///     'Content-Type': 'application/json',
///     'Authorization': `Bearer ${token}`
///   },
///   body: JSON.stringify({ paymentMethodId: paymentMethod.id, planId: 'price_pro' })
/// });
///
/// const { clientSecret, status } = await response.json();
/// if (status === 'incomplete') {
///   await stripe.confirmCardPayment(clientSecret);
/// }
/// ```
#[post("/create-subscription", wrap = "api_auth::auth_middleware()")]
pub async fn create_subscription(
    claims: web::ReqData<FirebaseClaims>,
    req: web::Json<CreateSubscriptionRequest>,
    config: web::Data<Arc<Config>>,
    pool: web::Data<Arc<PgPool>>,
    payments: web::Data<PaymentLog>,
) -> Res<impl Responder> {
    if !config.stripe.is_configured() {
        return Err(AppError::ServiceUnavailable(
            "Stripe API key not configured".to_string(),
        ));
    }
    let tier = parse_plan(&req.plan_id)?;
    let email = claims.require_email()?;

    let pg_pool: &PgPool = &pool;
    api_auth::ensure_profile(pg_pool, &claims).await?;

    let result = billing::start_stripe_subscription(
        &config,
        pg_pool,
        &payments,
        &claims.uid,
        email,
        &req.payment_method_id,
        tier,
    )
    .await;

    match result {
        Ok(created) => Success::ok(created),
        Err(e) => {
            payments.log_error(
                "subscription.creation.failed",
                PaymentProcessor::Stripe,
                Some(&claims.uid),
                &e,
                json!({ "planId": req.plan_id }),
            );
            Err(e)
        }
    }
}

/// Current subscription of the signed-in user, `{subscription: null}` when none.
#[post("/get-subscription", wrap = "api_auth::auth_middleware()")]
pub async fn get_subscription(
    claims: web::ReqData<FirebaseClaims>,
    config: web::Data<Arc<Config>>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    let subscription = match db::subscription::get_by_user(pg_pool, &claims.uid).await? {
        Some(record) => Some(billing::subscription_details(&config, record).await),
        None => None,
    };
    Success::ok(SubscriptionEnvelope { subscription })
}

#[post("/cancel-subscription", wrap = "api_auth::auth_middleware()")]
pub async fn cancel_subscription(
    claims: web::ReqData<FirebaseClaims>,
    req: Option<web::Json<CancelSubscriptionRequest>>,
    config: web::Data<Arc<Config>>,
    pool: web::Data<Arc<PgPool>>,
    payments: web::Data<PaymentLog>,
) -> Res<impl Responder> {
    let req = req.map(web::Json::into_inner).unwrap_or_default();
    let pg_pool: &PgPool = &pool;

    billing::cancel_subscription(
        &config,
        pg_pool,
        &payments,
        &claims.uid,
        req.subscription_id.as_deref(),
    )
    .await?;
    Success::done()
}

/// Stores a subscription approved through the PayPal buttons.
#[post("/confirm-paypal-subscription", wrap = "api_auth::auth_middleware()")]
pub async fn confirm_paypal_subscription(
    claims: web::ReqData<FirebaseClaims>,
    req: web::Json<ConfirmPayPalRequest>,
    pool: web::Data<Arc<PgPool>>,
    payments: web::Data<PaymentLog>,
) -> Res<impl Responder> {
    let tier = parse_plan(&req.plan_id)?;
    let pg_pool: &PgPool = &pool;
    api_auth::ensure_profile(pg_pool, &claims).await?;

    if let Err(e) = billing::confirm_paypal_subscription(
        pg_pool,
        &payments,
        &claims.uid,
        &req.subscription_id,
        tier,
    )
    .await
    {
        payments.log_error(
            "subscription.creation.failed",
            PaymentProcessor::PayPal,
            Some(&claims.uid),
            &e,
            json!({ "planId": req.plan_id }),
        );
        return Err(e);
    }
    Success::done()
}
