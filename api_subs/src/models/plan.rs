use common::tier::SubscriptionTier;
use serde::Serialize;

/// Entry of the public pricing table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    pub id: SubscriptionTier,
    pub name: &'static str,
    /// Monthly price in cents.
    pub price: i64,
    pub currency: &'static str,
    pub interval: &'static str,
    pub mockups_per_month: i32,
    /// Plan id to send to the checkout endpoints; absent for the free tier.
    pub price_id: Option<&'static str>,
    pub features: &'static [&'static str],
}

pub fn catalogue() -> Vec<SubscriptionPlan> {
    vec![
        SubscriptionPlan {
            id: SubscriptionTier::Free,
            name: "Free",
            price: 0,
            currency: "usd",
            interval: "month",
            mockups_per_month: SubscriptionTier::Free.monthly_quota(),
            price_id: None,
            features: &[
                "3 mockups/month",
                "Standard templates",
                "Watermarked exports",
                "Basic support",
            ],
        },
        SubscriptionPlan {
            id: SubscriptionTier::Pro,
            name: "Pro",
            price: 1000,
            currency: "usd",
            interval: "month",
            mockups_per_month: SubscriptionTier::Pro.monthly_quota(),
            price_id: Some("price_pro"),
            features: &[
                "15 mockups/month",
                "All templates",
                "HD exports",
                "Priority rendering",
                "Email support",
            ],
        },
        SubscriptionPlan {
            id: SubscriptionTier::Unlimited,
            name: "Unlimited",
            price: 5000,
            currency: "usd",
            interval: "month",
            mockups_per_month: SubscriptionTier::Unlimited.monthly_quota(),
            price_id: Some("price_unlimited"),
            features: &[
                "Unlimited mockups",
                "All templates",
                "HD exports",
                "Priority rendering",
                "API access",
                "Team accounts",
                "24/7 support",
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchasable_plans_resolve_to_their_tier() {
        for plan in catalogue() {
            match plan.price_id {
                Some(price_id) => assert_eq!(SubscriptionTier::from_plan_id(price_id), Some(plan.id)),
                None => assert_eq!(plan.id, SubscriptionTier::Free),
            }
        }
    }
}
