use actix_web::web;
use middleware::auth::AuthMiddleware;

pub mod dtos {
    pub mod user;
}
pub mod middleware {
    pub mod auth;
}
mod routes {
    pub(crate) mod user;
}
mod services {
    pub(crate) mod user;
}

pub use services::user::ensure_profile;

/// Requires a verified Firebase user.
pub fn auth_middleware() -> AuthMiddleware {
    AuthMiddleware::new(false)
}

/// Requires a verified Firebase user carrying the `admin` custom claim.
pub fn admin_middleware() -> AuthMiddleware {
    AuthMiddleware::new(true)
}

/// `/users` scope: the signed-in user's profile, quota and favourites.
/// Every route requires a verified user.
pub fn mount_users() -> actix_web::Scope {
    web::scope("/users")
        .service(routes::user::get_me)
        .service(routes::user::delete_me)
        .service(routes::user::update_display_name)
        .service(routes::user::create_mockup)
        .service(routes::user::list_mockups)
        .service(routes::user::add_favorite)
        .service(routes::user::remove_favorite)
}
