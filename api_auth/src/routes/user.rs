use std::sync::Arc;

use actix_web::{Responder, delete, get, post, put, web};
use common::{error::{AppError, Res}, firebase::FirebaseClaims, http::Success};
use sqlx::PgPool;

use crate::{
    dtos::user::{DisplayNameRequest, FavoritesResponse, MockupRequest, QuotaResponse},
    services,
};

/// Returns the signed-in user's profile, creating it on first sign-in.
///
/// New profiles start on the free tier with 3 mockups, nothing created and
/// no favourites.
///
/// # Output
/// - Success: the profile with `createdMockupsHistory` (newest first) and `favoritedTemplates`
/// - Error: 401 when the Firebase ID token is missing or invalid
///
/// # Frontend Example
/// ```javascript
/// const token = await firebase.auth().currentUser.getIdToken();
/// const response = await fetch('/api/v1/users/me', {
///   headers: { 'Authorization': `Bearer ${token}` }
/// });
///
/// if (response.ok) {
///   const profile = await response.json();
///   // {
///   //   uid: "kX9...",
///   //   email: "user@example.com",
///   //   displayName: "user",
///   //   subscriptionTier: "free",
///   //   mockupsRemaining: 3,
///   //   mockupsCreated: 0,
///   //   favoritedTemplates: [],
///   //   createdMockupsHistory: [],
///   //   ...
///   // }
/// }
/// ```
#[get("/me", wrap = "crate::auth_middleware()")]
async fn get_me(
    claims: web::ReqData<FirebaseClaims>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    let profile = services::user::get_profile(pg_pool, &claims).await?;
    Success::ok(profile)
}

/// Deletes the profile and mockup history. Billing records are retained.
#[delete("/me", wrap = "crate::auth_middleware()")]
async fn delete_me(
    claims: web::ReqData<FirebaseClaims>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    if !db::user::delete_user(pg_pool, &claims.uid).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    log::info!("Deleted account {}", claims.uid);
    Success::done()
}

#[put("/me/display-name", wrap = "crate::auth_middleware()")]
async fn update_display_name(
    claims: web::ReqData<FirebaseClaims>,
    req: web::Json<DisplayNameRequest>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    let user = services::user::update_display_name(pg_pool, &claims, &req.display_name).await?;
    Success::ok(user)
}

/// Spends one mockup from the current billing cycle and records it.
///
/// # Input
/// - `templateId`, `templateName`: the template the mockup was generated from
/// - `imageUrl`: optional location of the generated image
///
/// # Output
/// - Success: `{subscriptionTier, mockupsRemaining, mockupsCreated}` after the charge
/// - Error: 403 when no mockups remain; unlimited users are never blocked
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/v1/users/me/mockups', {
///   method: 'POST',
///   headers: {
///     'Content-Type': 'application/json',
///     'Authorization': `Bearer ${token}`
///   },
///   body: JSON.stringify({
///     templateId: "65f1c0...",
///     templateName: "Minimal Portfolio",
///     imageUrl: "https://cdn.example.com/mockups/abc.png"
///   })
/// });
///
/// if (response.status === 403) {
///   // show the upgrade dialog
/// }
/// ```
#[post("/me/mockups", wrap = "crate::auth_middleware()")]
async fn create_mockup(
    claims: web::ReqData<FirebaseClaims>,
    req: web::Json<MockupRequest>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    let user = services::user::create_mockup(pg_pool, &claims, req.into_inner()).await?;
    Success::created(QuotaResponse::from(user))
}

#[get("/me/mockups", wrap = "crate::auth_middleware()")]
async fn list_mockups(
    claims: web::ReqData<FirebaseClaims>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    let history = db::user::list_mockups(pg_pool, &claims.uid).await?;
    Success::ok(history)
}

#[post("/me/favorites/{template_id}", wrap = "crate::auth_middleware()")]
async fn add_favorite(
    claims: web::ReqData<FirebaseClaims>,
    path: web::Path<String>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    services::user::ensure_profile(pg_pool, &claims).await?;
    let user = db::user::add_favorite(pg_pool, &claims.uid, &path).await?;
    Success::ok(FavoritesResponse {
        favorited_templates: user.favorited_templates,
    })
}

#[delete("/me/favorites/{template_id}", wrap = "crate::auth_middleware()")]
async fn remove_favorite(
    claims: web::ReqData<FirebaseClaims>,
    path: web::Path<String>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    let user = db::user::remove_favorite(pg_pool, &claims.uid, &path).await?;
    Success::ok(FavoritesResponse {
        favorited_templates: user.favorited_templates,
    })
}
