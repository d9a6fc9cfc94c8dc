use common::{
    error::{AppError, Res},
    firebase::FirebaseClaims,
};
use db::{
    dtos::user::{MockupCreateRequest, NewUser},
    models::user::User,
};
use sqlx::PgPool;

use crate::dtos::user::{MockupRequest, ProfileResponse};

/// Profile for the signed-in user, created with the free tier on first access.
pub async fn ensure_profile(pool: &PgPool, claims: &FirebaseClaims) -> Res<User> {
    let email = claims.email.clone().unwrap_or_default();
    let display_name = claims
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    db::user::ensure_user(
        pool,
        NewUser {
            id: claims.uid.clone(),
            email,
            display_name,
            photo_url: claims.picture.clone(),
        },
    )
    .await
}

pub async fn get_profile(pool: &PgPool, claims: &FirebaseClaims) -> Res<ProfileResponse> {
    let user = ensure_profile(pool, claims).await?;
    let history = db::user::list_mockups(pool, &user.id).await?;
    Ok(ProfileResponse {
        user,
        created_mockups_history: history,
    })
}

pub async fn update_display_name(pool: &PgPool, claims: &FirebaseClaims, name: &str) -> Res<User> {
    let name = validate_display_name(name)?;
    ensure_profile(pool, claims).await?;
    db::user::update_display_name(pool, &claims.uid, name).await
}

pub async fn create_mockup(
    pool: &PgPool,
    claims: &FirebaseClaims,
    request: MockupRequest,
) -> Res<User> {
    if request.template_id.trim().is_empty() {
        return Err(AppError::BadRequest("templateId is required".to_string()));
    }
    ensure_profile(pool, claims).await?;

    let user = db::user::consume_mockup(
        pool,
        &claims.uid,
        MockupCreateRequest {
            template_id: request.template_id,
            template_name: request.template_name,
            image_url: request.image_url,
        },
    )
    .await?;
    if user.tier().is_metered() {
        log::info!(
            "User {} created a mockup, {} remaining",
            user.id,
            user.mockups_remaining
        );
    } else {
        log::info!("User {} created a mockup", user.id);
    }
    Ok(user)
}

pub fn validate_display_name(name: &str) -> Res<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Display name cannot be empty".to_string()));
    }
    if name.chars().count() > 100 {
        return Err(AppError::BadRequest(
            "Display name cannot be more than 100 characters".to_string(),
        ));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::validate_display_name;

    #[test]
    fn display_names_are_trimmed_and_required() {
        assert_eq!(validate_display_name("  Ada  ").unwrap(), "Ada");
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(101)).is_err());
    }
}
