pub mod env_config;
pub mod error;
pub mod firebase;
pub mod http;
pub mod stripe;
pub mod tier;
