use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockupEntry {
    pub id: Uuid,
    pub user_id: String,
    pub template_id: String,
    pub template_name: String,
    pub image_url: Option<String>,
    pub created_at: NaiveDateTime,
}
