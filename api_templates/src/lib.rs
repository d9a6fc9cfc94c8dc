use actix_web::web;

pub mod query;

pub mod dtos {
    pub mod template;
}
pub mod models {
    pub mod template;
}
mod routes {
    pub(crate) mod template;
}
mod services {
    pub(crate) mod template;
}

pub use services::template::{collection, ensure_indexes};

/// `/templates` scope: public catalog reads, admin-only writes.
///
/// Expects a `web::Data<Collection<Template>>` built with [`collection`].
pub fn mount_templates() -> actix_web::Scope {
    web::scope("/templates")
        .service(routes::template::get_templates)
        .service(routes::template::create_template)
        .service(routes::template::search_templates)
        .service(routes::template::get_templates_by_category)
        .service(routes::template::get_template)
        .service(routes::template::update_template)
        .service(routes::template::delete_template)
}
