use std::{env, sync::Arc};

use crate::tier::SubscriptionTier;

#[derive(Clone, Debug, Default)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server.
/// It includes database connection details, the Firebase project used
/// to verify ID tokens, server host and port, number of worker threads,
/// CORS settings, logging preferences, rate limits and the payment
/// provider credentials.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the PostgreSQL database holding users and subscriptions.
    pub database_url: String,
    /// The MongoDB connection string for the template catalog.
    pub mongodb_uri: String,
    /// The MongoDB database name for the template catalog.
    pub mongodb_database: String,
    /// Firebase project whose ID tokens are accepted.
    pub firebase_project_id: String,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Directory for the application log and the payment logs.
    pub log_dir: String,
    /// Requests allowed per client IP within `rate_limit_window_secs`.
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    /// Stripe configuration.
    pub stripe: StripeConfig,
    /// PayPal configuration.
    pub paypal: PayPalConfig,
}

#[derive(Clone, Debug, Default)]
pub struct StripeConfig {
    /// Stripe secret key, empty when Stripe is not configured.
    pub secret_key: String,
    /// Stripe webhook signing secret.
    pub webhook_secret: String,
    /// Price id charged for the pro tier.
    pub price_id_pro: String,
    /// Price id charged for the unlimited tier.
    pub price_id_unlimited: String,
}

impl StripeConfig {
    pub fn is_configured(&self) -> bool {
        !self.secret_key.is_empty()
    }

    /// Configured Stripe price for a purchasable tier.
    pub fn price_id_for(&self, tier: SubscriptionTier) -> Option<&str> {
        let price = match tier {
            SubscriptionTier::Pro => &self.price_id_pro,
            SubscriptionTier::Unlimited => &self.price_id_unlimited,
            SubscriptionTier::Free => return None,
        };
        Some(price.as_str()).filter(|p| !p.is_empty())
    }
}

#[derive(Clone, Debug, Default)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Webhook id from the PayPal dashboard, needed for signature verification.
    pub webhook_id: String,
    /// REST API base, sandbox unless overridden.
    pub api_base: String,
}

impl PayPalConfig {
    /// Whether incoming webhooks can be verified against the PayPal API.
    pub fn can_verify_webhooks(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty() && !self.webhook_id.is_empty()
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: `development` or `production`
    /// - `DATABASE_URL`: Connection string for the PostgreSQL database
    /// - `MONGODB_URI`: Connection string for the template catalog
    /// - `FIREBASE_PROJECT_ID`: Firebase project id (token audience)
    ///
    /// Optional (with defaults):
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 5000)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `LOG_DIR`: Log directory (default: "logs")
    /// - `MONGODB_DATABASE`: Catalog database name (default: "mockup_market")
    /// - `RATE_LIMIT_MAX` / `RATE_LIMIT_WINDOW_SECS`: (default: 100 per 600 seconds)
    /// - `STRIPE_*` and `PAYPAL_*` provider settings (empty disables the provider)
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            mongodb_uri: env::var("MONGODB_URI").expect("MONGODB_URI must be set"),
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "mockup_market".to_string()),
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .expect("FIREBASE_PROJECT_ID must be set"),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            num_workers: env::var("WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            rate_limit_max: env::var("RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
            stripe: StripeConfig {
                secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
                webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
                price_id_pro: env::var("STRIPE_PRICE_ID_PRO").unwrap_or_default(),
                price_id_unlimited: env::var("STRIPE_PRICE_ID_UNLIMITED").unwrap_or_default(),
            },
            paypal: PayPalConfig {
                client_id: env::var("PAYPAL_CLIENT_ID").unwrap_or_default(),
                client_secret: env::var("PAYPAL_CLIENT_SECRET").unwrap_or_default(),
                webhook_id: env::var("PAYPAL_WEBHOOK_ID").unwrap_or_default(),
                api_base: env::var("PAYPAL_API_BASE")
                    .unwrap_or_else(|_| "https://api-m.sandbox.paypal.com".to_string()),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_paid_tiers_have_prices() {
        let stripe = StripeConfig {
            secret_key: "sk_test_123".to_string(),
            price_id_pro: "price_1Pro".to_string(),
            ..Default::default()
        };
        assert_eq!(stripe.price_id_for(SubscriptionTier::Pro), Some("price_1Pro"));
        assert_eq!(stripe.price_id_for(SubscriptionTier::Unlimited), None);
        assert_eq!(stripe.price_id_for(SubscriptionTier::Free), None);
    }

    #[test]
    fn paypal_verification_needs_all_credentials() {
        let mut paypal = PayPalConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            ..Default::default()
        };
        assert!(!paypal.can_verify_webhooks());
        paypal.webhook_id = "WH-1".to_string();
        assert!(paypal.can_verify_webhooks());
    }
}
