use common::{
    error::{AppError, Res},
    tier::PaymentProcessor,
};
use sqlx::{Executor, Postgres};

use crate::{
    dtos::subscription::{SubscriptionPatch, SubscriptionUpsert},
    models::subscription::SubscriptionRecord,
};

pub async fn get_by_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
) -> Res<Option<SubscriptionRecord>> {
    sqlx::query_as::<_, SubscriptionRecord>("SELECT * FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Looks a record up by the processor's own subscription id, as carried by webhooks.
pub async fn get_by_external_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    processor: PaymentProcessor,
    subscription_id: &str,
) -> Res<Option<SubscriptionRecord>> {
    sqlx::query_as::<_, SubscriptionRecord>(
        "SELECT * FROM subscriptions WHERE payment_processor = $1 AND subscription_id = $2",
    )
    .bind(processor.as_str())
    .bind(subscription_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Replaces the user's subscription record, keeping its original creation time.
pub async fn upsert<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: SubscriptionUpsert,
) -> Res<SubscriptionRecord> {
    sqlx::query_as::<_, SubscriptionRecord>(
        r#"
        INSERT INTO subscriptions (
            user_id, customer_id, subscription_id, status, plan_id,
            payment_processor, cancel_at_period_end, current_period_end
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id) DO UPDATE SET
            customer_id = EXCLUDED.customer_id,
            subscription_id = EXCLUDED.subscription_id,
            status = EXCLUDED.status,
            plan_id = EXCLUDED.plan_id,
            payment_processor = EXCLUDED.payment_processor,
            cancel_at_period_end = EXCLUDED.cancel_at_period_end,
            current_period_end = EXCLUDED.current_period_end,
            updated_at = (NOW() AT TIME ZONE 'utc')
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.customer_id)
    .bind(data.subscription_id)
    .bind(data.status.as_str())
    .bind(data.plan_id)
    .bind(data.processor.as_str())
    .bind(data.cancel_at_period_end)
    .bind(data.current_period_end)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn patch<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    data: SubscriptionPatch,
) -> Res<()> {
    let result = sqlx::query(
        r#"
        UPDATE subscriptions SET
            status = COALESCE($2, status),
            cancel_at_period_end = COALESCE($3, cancel_at_period_end),
            current_period_end = COALESCE($4, current_period_end),
            plan_id = COALESCE($5, plan_id),
            updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(data.status.map(|s| s.as_str()))
    .bind(data.cancel_at_period_end)
    .bind(data.current_period_end)
    .bind(data.plan_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "No subscription found for user {}",
            user_id
        )));
    }
    Ok(())
}
