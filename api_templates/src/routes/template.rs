use actix_web::{Responder, delete, get, post, put, web};
use common::{
    error::{AppError, Res},
    firebase::FirebaseClaims,
    http::Success,
};
use mongodb::Collection;
use serde_json::json;

use crate::{
    dtos::template::{CollectionResponse, DataResponse, ListResponse, SearchQuery, TemplateRequest},
    models::template::Template,
    query::ListQuery,
    services::template,
};

/// Lists templates with filtering, sorting, field selection and pagination.
///
/// # Query
/// - any non-reserved key filters on that field (`category=Blog`,
///   `isFree=true`); `field[gte|gt|lte|lt]=n` gives a range
/// - `sort=-rating,name` (default `-createdAt`)
/// - `fields=name,price` limits the returned fields
/// - `page` (default 1) and `limit` (default 10, at most 100)
///
/// # Output
/// `{success, count, pagination: {next?, prev?}, data}`
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/v1/templates?category=SaaS&price[lte]=50&sort=-rating&page=2');
/// const { data, pagination } = await response.json();
/// if (pagination.next) {
///   loadMore(pagination.next.page);
/// }
/// ```
#[get("")]
pub async fn get_templates(
    params: web::Query<Vec<(String, String)>>,
    templates: web::Data<Collection<Template>>,
) -> Res<impl Responder> {
    let query = ListQuery::from_params(&params);
    let (data, total) = template::list(&templates, &query).await?;

    Success::ok(ListResponse {
        success: true,
        count: data.len(),
        pagination: query.pagination(total),
        data,
    })
}

/// Full-text search, best match first.
#[get("/search")]
pub async fn search_templates(
    params: web::Query<SearchQuery>,
    templates: web::Data<Collection<Template>>,
) -> Res<impl Responder> {
    let text = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("Please provide a search query".to_string()))?;

    let data = template::search(&templates, text).await?;
    Success::ok(CollectionResponse::new(data))
}

#[get("/category/{category}")]
pub async fn get_templates_by_category(
    path: web::Path<String>,
    templates: web::Data<Collection<Template>>,
) -> Res<impl Responder> {
    let data = template::by_category(&templates, &path).await?;
    Success::ok(CollectionResponse::new(data))
}

#[get("/{id}")]
pub async fn get_template(
    path: web::Path<String>,
    templates: web::Data<Collection<Template>>,
) -> Res<impl Responder> {
    let found = template::get(&templates, &path).await?;
    Success::ok(DataResponse::new(found))
}

/// Adds a template to the catalog. Admin only.
///
/// # Input
/// `{name, description, category, technologies, previewImage, price,
/// isFree?, rating?, version?, features?, requirements?}`
///
/// # Output
/// - Success: 201 `{success, data}`
/// - Error: 400 `{error, errors: [...]}` listing every invalid field
#[post("", wrap = "api_auth::admin_middleware()")]
pub async fn create_template(
    claims: web::ReqData<FirebaseClaims>,
    req: web::Json<TemplateRequest>,
    templates: web::Data<Collection<Template>>,
) -> Res<impl Responder> {
    let created = template::create(&templates, req.into_inner(), &claims.uid).await?;
    Success::created(DataResponse::new(created))
}

#[put("/{id}", wrap = "api_auth::admin_middleware()")]
pub async fn update_template(
    path: web::Path<String>,
    req: web::Json<TemplateRequest>,
    templates: web::Data<Collection<Template>>,
) -> Res<impl Responder> {
    let updated = template::update(&templates, &path, req.into_inner()).await?;
    Success::ok(DataResponse::new(updated))
}

#[delete("/{id}", wrap = "api_auth::admin_middleware()")]
pub async fn delete_template(
    path: web::Path<String>,
    templates: web::Data<Collection<Template>>,
) -> Res<impl Responder> {
    template::delete(&templates, &path).await?;
    Success::ok(json!({
        "success": true,
        "data": {},
        "message": "Template successfully deleted"
    }))
}
