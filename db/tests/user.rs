use common::{error::AppError, tier::SubscriptionTier};
use db::dtos::user::{MockupCreateRequest, NewUser};
use sqlx::PgPool;

fn new_user(id: &str, email: &str) -> NewUser {
    NewUser {
        id: id.to_string(),
        email: email.to_string(),
        display_name: "Ada".to_string(),
        photo_url: None,
    }
}

fn mockup(template_id: &str) -> MockupCreateRequest {
    MockupCreateRequest {
        template_id: template_id.to_string(),
        template_name: "Landing".to_string(),
        image_url: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn new_profiles_start_on_free_tier(pool: PgPool) {
    let user = db::user::ensure_user(&pool, new_user("u1", "ada@example.com"))
        .await
        .unwrap();

    assert_eq!(user.subscription_tier, "free");
    assert_eq!(user.mockups_remaining, 3);
    assert_eq!(user.mockups_created, 0);
    assert!(user.favorited_templates.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn ensure_user_keeps_existing_profile(pool: PgPool) {
    db::user::ensure_user(&pool, new_user("u1", "ada@example.com"))
        .await
        .unwrap();
    db::user::set_tier(&pool, "u1", SubscriptionTier::Pro)
        .await
        .unwrap();

    let again = db::user::ensure_user(&pool, new_user("u1", "other@example.com"))
        .await
        .unwrap();
    assert_eq!(again.email, "ada@example.com");
    assert_eq!(again.subscription_tier, "pro");
    assert_eq!(again.mockups_remaining, 15);
}

#[sqlx::test(migrations = "./migrations")]
async fn exhausted_quota_is_forbidden(pool: PgPool) {
    db::user::ensure_user(&pool, new_user("u1", "ada@example.com"))
        .await
        .unwrap();

    for expected in [2, 1, 0] {
        let user = db::user::consume_mockup(&pool, "u1", mockup("t1"))
            .await
            .unwrap();
        assert_eq!(user.mockups_remaining, expected);
    }

    let err = db::user::consume_mockup(&pool, "u1", mockup("t1"))
        .await
        .unwrap_err();
    match err {
        AppError::Forbidden(msg) => {
            assert_eq!(msg, "No mockups remaining for the current billing cycle.")
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let history = db::user::list_mockups(&pool, "u1").await.unwrap();
    assert_eq!(history.len(), 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn unlimited_tier_is_counted_not_decremented(pool: PgPool) {
    db::user::ensure_user(&pool, new_user("u1", "ada@example.com"))
        .await
        .unwrap();
    db::user::set_tier(&pool, "u1", SubscriptionTier::Unlimited)
        .await
        .unwrap();

    db::user::consume_mockup(&pool, "u1", mockup("t1"))
        .await
        .unwrap();
    let user = db::user::consume_mockup(&pool, "u1", mockup("t2"))
        .await
        .unwrap();

    assert_eq!(user.mockups_remaining, SubscriptionTier::Unlimited.monthly_quota());
    assert_eq!(user.mockups_created, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn consuming_for_missing_user_is_not_found(pool: PgPool) {
    let err = db::user::consume_mockup(&pool, "ghost", mockup("t1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn favorites_behave_as_a_set(pool: PgPool) {
    db::user::ensure_user(&pool, new_user("u1", "ada@example.com"))
        .await
        .unwrap();

    db::user::add_favorite(&pool, "u1", "t1").await.unwrap();
    db::user::add_favorite(&pool, "u1", "t2").await.unwrap();
    let user = db::user::add_favorite(&pool, "u1", "t1").await.unwrap();
    assert_eq!(user.favorited_templates, vec!["t1", "t2"]);

    let user = db::user::remove_favorite(&pool, "u1", "t1").await.unwrap();
    assert_eq!(user.favorited_templates, vec!["t2"]);
    let user = db::user::remove_favorite(&pool, "u1", "t1").await.unwrap();
    assert_eq!(user.favorited_templates, vec!["t2"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_user_removes_profile_and_history(pool: PgPool) {
    db::user::ensure_user(&pool, new_user("u1", "ada@example.com"))
        .await
        .unwrap();
    db::user::consume_mockup(&pool, "u1", mockup("t1"))
        .await
        .unwrap();

    assert!(db::user::delete_user(&pool, "u1").await.unwrap());
    assert!(!db::user::delete_user(&pool, "u1").await.unwrap());
    assert!(db::user::list_mockups(&pool, "u1").await.unwrap().is_empty());
    assert!(matches!(
        db::user::set_tier(&pool, "u1", SubscriptionTier::Free).await,
        Err(AppError::NotFound(_))
    ));
}
