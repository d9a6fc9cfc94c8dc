use actix_web::web;

pub mod paypal;
pub mod reconcile;

mod routes {
    pub(crate) mod admin;
    pub(crate) mod sub;
    pub(crate) mod webhook;
}

mod services {
    pub(crate) mod billing;
    pub(crate) mod stripe_events;
    pub(crate) mod sub;
}

mod dtos {
    pub(crate) mod sub;
}

mod models {
    pub(crate) mod plan;
}

/// Subscription lifecycle under `/api`.
pub fn mount_billing() -> actix_web::Scope {
    web::scope("/api")
        .service(routes::sub::get_plans)
        .service(routes::sub::create_subscription)
        .service(routes::sub::get_subscription)
        .service(routes::sub::cancel_subscription)
        .service(routes::sub::confirm_paypal_subscription)
        .service(routes::admin::get_payment_logs)
}

/// Provider callbacks under `/webhook`. Not authenticated; each provider's
/// signature is checked instead.
pub fn mount_webhooks() -> actix_web::Scope {
    web::scope("/webhook")
        .service(routes::webhook::post_stripe_webhook)
        .service(routes::webhook::post_paypal_webhook)
}
