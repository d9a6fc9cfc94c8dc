use chrono::NaiveDateTime;
use common::tier::SubscriptionTier;
use serde::{Deserialize, Serialize};

/// Profile row keyed by the Firebase uid.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "uid")]
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub subscription_tier: String,
    pub mockups_remaining: i32,
    pub mockups_created: i32,
    pub favorited_templates: Vec<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    /// Unknown stored values count as free.
    pub fn tier(&self) -> SubscriptionTier {
        self.subscription_tier
            .parse()
            .unwrap_or(SubscriptionTier::Free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(tier: &str) -> User {
        let now = chrono::Utc::now().naive_utc();
        User {
            id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            display_name: "u1".to_string(),
            photo_url: None,
            subscription_tier: tier.to_string(),
            mockups_remaining: 3,
            mockups_created: 0,
            favorited_templates: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stored_tier_is_parsed() {
        assert_eq!(user("unlimited").tier(), SubscriptionTier::Unlimited);
        assert_eq!(user("enterprise").tier(), SubscriptionTier::Free);
    }

    #[test]
    fn serializes_with_uid() {
        let json = serde_json::to_value(user("pro")).unwrap();
        assert_eq!(json["uid"], "u1");
        assert_eq!(json["mockupsRemaining"], 3);
        assert!(json.get("id").is_none());
    }
}
