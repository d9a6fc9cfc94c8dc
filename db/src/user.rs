use common::{
    error::{AppError, Res},
    tier::SubscriptionTier,
};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    dtos::user::{MockupCreateRequest, NewUser},
    models::{mockup::MockupEntry, user::User},
};

pub async fn get_user_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Creates the free-tier profile on first sign-in and returns the stored row.
/// An existing profile is returned untouched.
pub async fn ensure_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: NewUser,
) -> Res<User> {
    let free = SubscriptionTier::Free;
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, display_name, photo_url, subscription_tier, mockups_remaining)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE SET id = users.id
        RETURNING *
        "#,
    )
    .bind(data.id)
    .bind(data.email)
    .bind(data.display_name)
    .bind(data.photo_url)
    .bind(free.as_str())
    .bind(free.monthly_quota())
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn update_display_name<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    display_name: &str,
) -> Res<User> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET display_name = $2, updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(display_name)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Moves the user onto `tier` and refills the quota for the new cycle.
pub async fn set_tier<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    tier: SubscriptionTier,
) -> Res<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET subscription_tier = $2, mockups_remaining = $3, updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(tier.as_str())
    .bind(tier.monthly_quota())
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }
    Ok(())
}

/// Spends one mockup and records it in the history.
///
/// The decrement is guarded in SQL so two concurrent requests can never take
/// the remaining count below zero. Unlimited users are counted but not decremented.
pub async fn consume_mockup(pool: &PgPool, user_id: &str, data: MockupCreateRequest) -> Res<User> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET mockups_created = mockups_created + 1,
            mockups_remaining = CASE
                WHEN subscription_tier = 'unlimited' THEN mockups_remaining
                ELSE mockups_remaining - 1
            END,
            updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1 AND (subscription_tier = 'unlimited' OR mockups_remaining > 0)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(user) = updated else {
        let exists = get_user_by_id(&mut *tx, user_id).await?.is_some();
        return Err(if exists {
            AppError::Forbidden("No mockups remaining for the current billing cycle.".to_string())
        } else {
            AppError::NotFound("User not found".to_string())
        });
    };

    sqlx::query(
        r#"
        INSERT INTO mockup_history (id, user_id, template_id, template_name, image_url)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(data.template_id)
    .bind(data.template_name)
    .bind(data.image_url)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(user)
}

pub async fn list_mockups<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
) -> Res<Vec<MockupEntry>> {
    sqlx::query_as::<_, MockupEntry>(
        "SELECT * FROM mockup_history WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

/// Adds a template to the favorites set; adding twice is a no-op.
pub async fn add_favorite<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    template_id: &str,
) -> Res<User> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET favorited_templates = CASE
                WHEN $2 = ANY(favorited_templates) THEN favorited_templates
                ELSE array_append(favorited_templates, $2)
            END,
            updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(template_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn remove_favorite<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    template_id: &str,
) -> Res<User> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET favorited_templates = array_remove(favorited_templates, $2),
            updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(template_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Removes the profile and its mockup history. The subscription record is kept.
pub async fn delete_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
) -> Res<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
