use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Mockups granted per billing cycle on the free tier.
pub const FREE_MOCKUPS: i32 = 3;
/// Mockups granted per billing cycle on the pro tier.
pub const PRO_MOCKUPS: i32 = 15;
/// Stand-in for "no limit"; the unlimited tier is never decremented.
pub const UNLIMITED_MOCKUPS: i32 = 999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Pro,
    Unlimited,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Unlimited => "unlimited",
        }
    }

    /// Mockups available at the start of each billing cycle.
    pub fn monthly_quota(&self) -> i32 {
        match self {
            SubscriptionTier::Free => FREE_MOCKUPS,
            SubscriptionTier::Pro => PRO_MOCKUPS,
            SubscriptionTier::Unlimited => UNLIMITED_MOCKUPS,
        }
    }

    pub fn is_metered(&self) -> bool {
        *self != SubscriptionTier::Unlimited
    }

    /// Parses a plan id as sent by checkout clients.
    /// Accepts both `pro` and the `price_pro` form; the free tier is not purchasable.
    pub fn from_plan_id(plan_id: &str) -> Option<Self> {
        match plan_id.strip_prefix("price_").unwrap_or(plan_id) {
            "pro" => Some(SubscriptionTier::Pro),
            "unlimited" => Some(SubscriptionTier::Unlimited),
            _ => None,
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionTier::Free),
            "pro" => Ok(SubscriptionTier::Pro),
            "unlimited" => Ok(SubscriptionTier::Unlimited),
            other => Err(AppError::Internal(format!("Unknown subscription tier: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProcessor {
    Stripe,
    PayPal,
}

impl PaymentProcessor {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProcessor::Stripe => "stripe",
            PaymentProcessor::PayPal => "paypal",
        }
    }
}

impl fmt::Display for PaymentProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProcessor {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(PaymentProcessor::Stripe),
            "paypal" => Ok(PaymentProcessor::PayPal),
            other => Err(AppError::Internal(format!("Unknown payment processor: {}", other))),
        }
    }
}

/// Subscription status as stored on the subscription record.
/// Mirrors Stripe's vocabulary; PayPal states are mapped onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    Incomplete,
    IncompleteExpired,
    PastDue,
    Unpaid,
    Paused,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// The subscription grants its tier.
    pub fn is_entitled(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }

    /// The subscription is over and the user falls back to the free tier.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Canceled | SubscriptionStatus::IncompleteExpired
        )
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "incomplete" => Ok(SubscriptionStatus::Incomplete),
            "incomplete_expired" => Ok(SubscriptionStatus::IncompleteExpired),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "unpaid" => Ok(SubscriptionStatus::Unpaid),
            "paused" => Ok(SubscriptionStatus::Paused),
            // PayPal spells it with two Ls
            "canceled" | "cancelled" => Ok(SubscriptionStatus::Canceled),
            other => Err(AppError::Internal(format!("Unknown subscription status: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_ids_accept_price_prefix() {
        assert_eq!(SubscriptionTier::from_plan_id("price_pro"), Some(SubscriptionTier::Pro));
        assert_eq!(SubscriptionTier::from_plan_id("unlimited"), Some(SubscriptionTier::Unlimited));
        assert_eq!(SubscriptionTier::from_plan_id("price_free"), None);
        assert_eq!(SubscriptionTier::from_plan_id("enterprise"), None);
    }

    #[test]
    fn quotas_follow_tiers() {
        assert_eq!(SubscriptionTier::Free.monthly_quota(), 3);
        assert_eq!(SubscriptionTier::Pro.monthly_quota(), 15);
        assert!(!SubscriptionTier::Unlimited.is_metered());
        assert!(SubscriptionTier::Pro.is_metered());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::IncompleteExpired,
            SubscriptionStatus::Canceled,
        ] {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>().unwrap(), status);
        }
        assert_eq!(
            "cancelled".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Canceled
        );
        assert!("bogus".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn only_canceled_states_are_terminal() {
        assert!(SubscriptionStatus::Canceled.is_terminal());
        assert!(SubscriptionStatus::IncompleteExpired.is_terminal());
        assert!(!SubscriptionStatus::PastDue.is_terminal());
        assert!(SubscriptionStatus::Trialing.is_entitled());
        assert!(!SubscriptionStatus::Unpaid.is_entitled());
    }
}
