use db::models::{mockup::MockupEntry, user::User};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayNameRequest {
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockupRequest {
    pub template_id: String,
    pub template_name: String,
    pub image_url: Option<String>,
}

/// Profile plus the mockup history, as rendered by the dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub created_mockups_history: Vec<MockupEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaResponse {
    pub subscription_tier: String,
    pub mockups_remaining: i32,
    pub mockups_created: i32,
}

impl From<User> for QuotaResponse {
    fn from(user: User) -> Self {
        QuotaResponse {
            subscription_tier: user.subscription_tier,
            mockups_remaining: user.mockups_remaining,
            mockups_created: user.mockups_created,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesResponse {
    pub favorited_templates: Vec<String>,
}
