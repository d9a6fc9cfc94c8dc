mod cors;
mod mongo;

use std::time::Duration;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use api_subs::paypal::PayPalClient;
use common::{env_config::Config, firebase::FirebaseAuth};
use logger::PaymentLog;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // init logger
    logger::setup(&config.log_dir).expect("Failed to set up logger");

    // init db connections
    let pool = db::setup(&config.database_url, config.is_production())
        .await
        .expect("Failed to set up database");
    let catalog = mongo::setup_mongo(&config.mongodb_uri, &config.mongodb_database)
        .await
        .expect("Failed to connect to MongoDB");
    let templates = api_templates::collection(&catalog);
    api_templates::ensure_indexes(&templates).await;

    // shared across workers
    let templates = web::Data::new(templates);
    let firebase = web::Data::new(FirebaseAuth::new(&config.firebase_project_id));
    let payments = web::Data::new(PaymentLog::new(&config.log_dir)?);
    let paypal = web::Data::new(PayPalClient::new(config.paypal.clone()));
    let rate_limiter = limiter::ip_middleware(
        config.rate_limit_max,
        Duration::from_secs(config.rate_limit_window_secs),
    );

    if !config.stripe.is_configured() {
        log::warn!("STRIPE_SECRET_KEY is not set; card subscriptions are disabled");
    }
    if !paypal.can_verify() {
        log::warn!("PayPal webhook verification is not configured");
    }

    let origin = config.cors_allowed_origin.clone();
    let console_logging = config.console_logging_enabled;

    log::info!(
        "Starting server on {}:{} ({})",
        config.server_host,
        config.server_port,
        config.environment
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config_data.clone()))
            .app_data(templates.clone())
            .app_data(firebase.clone())
            .app_data(payments.clone())
            .app_data(paypal.clone())
            .wrap(logger::middleware(console_logging)) // 3rd
            .wrap(extractor::middleware()) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api/v1")
                    .wrap(rate_limiter.clone())
                    .service(api_templates::mount_templates())
                    .service(api_auth::mount_users()),
            )
            .service(api_subs::mount_billing().wrap(rate_limiter.clone()))
            .service(api_subs::mount_webhooks())
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
