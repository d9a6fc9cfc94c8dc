use common::error::{AppError, Res};
use stripe::{
    Client, CreateSubscription, CreateSubscriptionItems, Customer, Expandable, PaymentMethod,
    Subscription, SubscriptionId,
};

use crate::dtos::sub::CardSummary;

fn parse_subscription_id(subscription_id: &str) -> Res<SubscriptionId> {
    subscription_id
        .parse::<SubscriptionId>()
        .map_err(|e| AppError::BadRequest(format!("Invalid subscription ID: {}", e)))
}

/// Starts a subscription to `price_id` billed to `payment_method_id`,
/// expanding the first invoice's payment intent so the client can confirm
/// the payment.
pub async fn create_subscription(
    client: &Client,
    customer: &Customer,
    price_id: &str,
    payment_method_id: &str,
) -> Res<Subscription> {
    let mut params = CreateSubscription::new(customer.id.clone());
    params.items = Some(vec![CreateSubscriptionItems {
        price: Some(price_id.to_string()),
        ..Default::default()
    }]);
    params.default_payment_method = Some(payment_method_id);
    params.expand = &["latest_invoice.payment_intent"];

    Subscription::create(client, params)
        .await
        .map_err(AppError::from)
}

/// Client secret of the payment intent attached to the latest invoice.
pub fn client_secret(subscription: &Subscription) -> Option<String> {
    subscription
        .latest_invoice
        .as_ref()
        .and_then(|invoice| invoice.as_object())
        .and_then(|invoice| invoice.payment_intent.as_ref())
        .and_then(|intent| intent.as_object())
        .and_then(|intent| intent.client_secret.clone())
}

pub async fn retrieve_subscription(client: &Client, subscription_id: &str) -> Res<Subscription> {
    let sub_id = parse_subscription_id(subscription_id)?;
    Subscription::retrieve(client, &sub_id, &[])
        .await
        .map_err(AppError::from)
}

/// Card details of the subscription's default payment method, if it has one.
pub async fn default_card(client: &Client, subscription: &Subscription) -> Res<Option<CardSummary>> {
    let method = match &subscription.default_payment_method {
        None => return Ok(None),
        Some(Expandable::Object(method)) => (**method).clone(),
        Some(Expandable::Id(id)) => PaymentMethod::retrieve(client, id, &[])
            .await
            .map_err(AppError::from)?,
    };

    Ok(method.card.map(|card| CardSummary {
        brand: card.brand,
        last4: card.last4,
        exp_month: card.exp_month,
        exp_year: card.exp_year,
    }))
}

/// Stops renewal; the subscription stays active until the period ends.
pub async fn cancel_at_period_end(client: &Client, subscription_id: &str) -> Res<Subscription> {
    let sub_id = parse_subscription_id(subscription_id)?;

    Subscription::update(
        client,
        &sub_id,
        stripe::UpdateSubscription {
            cancel_at_period_end: Some(true),
            ..Default::default()
        },
    )
    .await
    .map_err(AppError::from)
}
