use chrono::SecondsFormat;
use common::error::{AppError, Res};
use futures::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Bson, DateTime, Document, doc, oid::ObjectId},
    options::ReturnDocument,
};
use serde_json::Value;

use crate::{
    dtos::template::{TemplateRequest, TemplateResponse, to_chrono},
    models::template::{DEFAULT_VERSION, Template, TemplateCategory},
    query::ListQuery,
};

pub const COLLECTION: &str = "templates";

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;

pub fn collection(db: &Database) -> Collection<Template> {
    db.collection(COLLECTION)
}

/// Text index backing search plus a plain category index. Failures are
/// logged and startup continues; search answers with an error until the
/// text index exists.
pub async fn ensure_indexes(collection: &Collection<Template>) {
    let text_index = IndexModel::builder()
        .keys(doc! { "name": "text", "description": "text", "category": "text" })
        .build();
    match collection.create_index(text_index).await {
        Ok(_) => log::info!("Index ready: templates(name, description, category) text"),
        Err(e) => log::warn!("Could not create templates text index: {}", e),
    }

    let category_index = IndexModel::builder().keys(doc! { "category": 1 }).build();
    match collection.create_index(category_index).await {
        Ok(_) => log::info!("Index ready: templates(category)"),
        Err(e) => log::warn!("Could not create templates category index: {}", e),
    }
}

fn parse_id(id: &str) -> Res<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| AppError::BadRequest("Invalid template ID".to_string()))
}

fn not_found() -> AppError {
    AppError::NotFound("Template not found".to_string())
}

// === VALIDATION ===

fn check_name(name: String) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Please add a name".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("Name cannot be more than {} characters", MAX_NAME_LEN));
    }
    Ok(name.to_string())
}

fn check_description(description: String) -> Result<String, String> {
    if description.trim().is_empty() {
        return Err("Please add a description".to_string());
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(format!(
            "Description cannot be more than {} characters",
            MAX_DESCRIPTION_LEN
        ));
    }
    Ok(description)
}

fn check_category(category: String) -> Result<TemplateCategory, String> {
    category.parse()
}

fn check_technologies(technologies: Vec<String>) -> Result<Vec<String>, String> {
    let technologies: Vec<String> = technologies
        .into_iter()
        .map(|t| t.trim().to_string())
        .collect();
    if technologies.is_empty() {
        return Err("Please add at least one technology".to_string());
    }
    if technologies.iter().any(String::is_empty) {
        return Err("Technologies cannot be empty".to_string());
    }
    Ok(technologies)
}

fn check_preview_image(url: String) -> Result<String, String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("Please add a preview image URL".to_string());
    }
    Ok(url.to_string())
}

fn check_price(price: f64) -> Result<f64, String> {
    if !price.is_finite() || price < 0.0 {
        return Err("Price must be at least 0".to_string());
    }
    Ok(price)
}

fn check_rating(rating: f64) -> Result<f64, String> {
    if !rating.is_finite() || rating < 1.0 {
        return Err("Rating must be at least 1".to_string());
    }
    if rating > 5.0 {
        return Err("Rating cannot be more than 5".to_string());
    }
    Ok(rating)
}

/// Blank versions fall back to the default.
fn normalize_version(version: Option<String>) -> String {
    version
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_VERSION.to_string())
}

fn keep<T>(result: Result<T, String>, errors: &mut Vec<String>) -> Option<T> {
    result.map_err(|e| errors.push(e)).ok()
}

/// Checks a creation request, collecting every violation.
pub fn validate_new(req: TemplateRequest, created_by: &str) -> Res<Template> {
    let mut errors = Vec::new();

    let name = keep(
        req.name.ok_or_else(|| "Please add a name".to_string()).and_then(check_name),
        &mut errors,
    );
    let description = keep(
        req.description
            .ok_or_else(|| "Please add a description".to_string())
            .and_then(check_description),
        &mut errors,
    );
    let category = keep(
        req.category
            .ok_or_else(|| "Please add a category".to_string())
            .and_then(check_category),
        &mut errors,
    );
    let technologies = keep(
        check_technologies(req.technologies.unwrap_or_default()),
        &mut errors,
    );
    let preview_image = keep(
        req.preview_image
            .ok_or_else(|| "Please add a preview image URL".to_string())
            .and_then(check_preview_image),
        &mut errors,
    );
    let price = keep(
        req.price
            .ok_or_else(|| "Please add a price".to_string())
            .and_then(check_price),
        &mut errors,
    );
    let rating = keep(req.rating.map(check_rating).transpose(), &mut errors).flatten();

    match (name, description, category, technologies, preview_image, price) {
        (
            Some(name),
            Some(description),
            Some(category),
            Some(technologies),
            Some(preview_image),
            Some(price),
        ) if errors.is_empty() => {
            let now = DateTime::now();
            Ok(Template {
                id: None,
                name,
                description,
                category,
                technologies,
                preview_image,
                price,
                is_free: req.is_free.unwrap_or(false),
                rating,
                version: normalize_version(req.version),
                features: req.features.unwrap_or_default(),
                requirements: req.requirements.unwrap_or_default(),
                created_by: created_by.to_string(),
                created_at: now,
                updated_at: now,
            })
        }
        _ => Err(AppError::Validation(errors)),
    }
}

/// `$set` document for a partial update. Only the fields present in the
/// request are checked and written; `updatedAt` is always refreshed.
pub fn validate_update(req: TemplateRequest) -> Res<Document> {
    let mut errors = Vec::new();
    let mut set = Document::new();

    if let Some(name) = req.name.map(check_name) {
        if let Some(name) = keep(name, &mut errors) {
            set.insert("name", name);
        }
    }
    if let Some(description) = req.description.map(check_description) {
        if let Some(description) = keep(description, &mut errors) {
            set.insert("description", description);
        }
    }
    if let Some(category) = req.category.map(check_category) {
        if let Some(category) = keep(category, &mut errors) {
            set.insert("category", category.as_str());
        }
    }
    if let Some(technologies) = req.technologies.map(check_technologies) {
        if let Some(technologies) = keep(technologies, &mut errors) {
            set.insert("technologies", technologies);
        }
    }
    if let Some(url) = req.preview_image.map(check_preview_image) {
        if let Some(url) = keep(url, &mut errors) {
            set.insert("previewImage", url);
        }
    }
    if let Some(price) = req.price.map(check_price) {
        if let Some(price) = keep(price, &mut errors) {
            set.insert("price", price);
        }
    }
    if let Some(rating) = req.rating.map(check_rating) {
        if let Some(rating) = keep(rating, &mut errors) {
            set.insert("rating", rating);
        }
    }
    if let Some(is_free) = req.is_free {
        set.insert("isFree", is_free);
    }
    if req.version.is_some() {
        set.insert("version", normalize_version(req.version));
    }
    if let Some(features) = req.features {
        set.insert("features", features);
    }
    if let Some(requirements) = req.requirements {
        set.insert("requirements", requirements);
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    set.insert("updatedAt", DateTime::now());
    Ok(set)
}

// === JSON ===

/// Plain JSON for a raw document: ids as hex strings and dates as ISO-8601.
pub fn document_to_json(document: Document) -> Value {
    bson_to_json(Bson::Document(document))
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(date) => {
            Value::String(to_chrono(date).to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        Bson::Document(document) => Value::Object(
            document
                .into_iter()
                .map(|(key, value)| (key, bson_to_json(value)))
                .collect(),
        ),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}

// === QUERIES ===

/// One page of templates and the number of documents matching the filter.
pub async fn list(collection: &Collection<Template>, query: &ListQuery) -> Res<(Vec<Value>, u64)> {
    let raw = collection.clone_with_type::<Document>();
    let total = raw.count_documents(query.filter.clone()).await?;

    let mut find = raw
        .find(query.filter.clone())
        .sort(query.sort.clone())
        .skip(query.skip())
        .limit(query.limit);
    if let Some(projection) = &query.projection {
        find = find.projection(projection.clone());
    }

    let documents: Vec<Document> = find.await?.try_collect().await?;
    Ok((documents.into_iter().map(document_to_json).collect(), total))
}

/// Full-text search over name, description and category, best match first.
pub async fn search(collection: &Collection<Template>, text: &str) -> Res<Vec<Value>> {
    let score = doc! { "score": { "$meta": "textScore" } };
    let documents: Vec<Document> = collection
        .clone_with_type::<Document>()
        .find(doc! { "$text": { "$search": text } })
        .projection(score.clone())
        .sort(score)
        .await?
        .try_collect()
        .await?;
    Ok(documents.into_iter().map(document_to_json).collect())
}

pub async fn by_category(
    collection: &Collection<Template>,
    category: &str,
) -> Res<Vec<TemplateResponse>> {
    let templates: Vec<Template> = collection
        .find(doc! { "category": category })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    Ok(templates.into_iter().map(TemplateResponse::from).collect())
}

pub async fn get(collection: &Collection<Template>, id: &str) -> Res<TemplateResponse> {
    let oid = parse_id(id)?;
    collection
        .find_one(doc! { "_id": oid })
        .await?
        .map(TemplateResponse::from)
        .ok_or_else(not_found)
}

pub async fn create(
    collection: &Collection<Template>,
    req: TemplateRequest,
    created_by: &str,
) -> Res<TemplateResponse> {
    let mut template = validate_new(req, created_by)?;
    let inserted = collection.insert_one(&template).await?;
    template.id = inserted.inserted_id.as_object_id();

    log::info!(
        "Template {} created by {}",
        template.id.map(|id| id.to_hex()).unwrap_or_default(),
        created_by
    );
    Ok(TemplateResponse::from(template))
}

pub async fn update(
    collection: &Collection<Template>,
    id: &str,
    req: TemplateRequest,
) -> Res<TemplateResponse> {
    let oid = parse_id(id)?;
    let set = validate_update(req)?;

    collection
        .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .map(TemplateResponse::from)
        .ok_or_else(not_found)
}

pub async fn delete(collection: &Collection<Template>, id: &str) -> Res<()> {
    let oid = parse_id(id)?;
    let result = collection.delete_one(doc! { "_id": oid }).await?;
    if result.deleted_count == 0 {
        return Err(not_found());
    }
    log::info!("Template {} deleted", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> TemplateRequest {
        TemplateRequest {
            name: Some("  Storefront  ".to_string()),
            description: Some("A shop layout".to_string()),
            category: Some("E-commerce".to_string()),
            technologies: Some(vec!["React".to_string(), "Tailwind".to_string()]),
            preview_image: Some("https://cdn.example.com/storefront.png".to_string()),
            price: Some(29.0),
            ..Default::default()
        }
    }

    #[test]
    fn new_template_gets_defaults() {
        let template = validate_new(valid_request(), "admin-uid").unwrap();
        assert_eq!(template.name, "Storefront");
        assert_eq!(template.category, TemplateCategory::ECommerce);
        assert_eq!(template.version, "1.0.0");
        assert!(!template.is_free);
        assert_eq!(template.rating, None);
        assert_eq!(template.created_by, "admin-uid");
    }

    #[test]
    fn every_violation_is_reported() {
        let req = TemplateRequest {
            name: Some("x".repeat(101)),
            category: Some("Games".to_string()),
            technologies: Some(vec![]),
            price: Some(-1.0),
            rating: Some(6.0),
            ..Default::default()
        };
        let Err(AppError::Validation(errors)) = validate_new(req, "admin-uid") else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors,
            vec![
                "Name cannot be more than 100 characters",
                "Please add a description",
                "`Games` is not a valid category",
                "Please add at least one technology",
                "Please add a preview image URL",
                "Price must be at least 0",
                "Rating cannot be more than 5",
            ]
        );
    }

    #[test]
    fn name_length_counts_characters() {
        let mut req = valid_request();
        req.name = Some("é".repeat(100));
        assert!(validate_new(req, "admin-uid").is_ok());
    }

    #[test]
    fn partial_update_only_sets_given_fields() {
        let set = validate_update(TemplateRequest {
            price: Some(0.0),
            is_free: Some(true),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(set.get_f64("price").unwrap(), 0.0);
        assert!(set.get_bool("isFree").unwrap());
        assert!(set.contains_key("updatedAt"));
        assert!(!set.contains_key("name"));
    }

    #[test]
    fn partial_update_is_validated() {
        let result = validate_update(TemplateRequest {
            description: Some("d".repeat(501)),
            rating: Some(0.5),
            ..Default::default()
        });
        let Err(AppError::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn blank_version_falls_back_to_default() {
        let set = validate_update(TemplateRequest {
            version: Some("   ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(set.get_str("version").unwrap(), DEFAULT_VERSION);

        let set = validate_update(TemplateRequest {
            version: Some(" 2.1.0 ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(set.get_str("version").unwrap(), "2.1.0");
    }

    #[test]
    fn documents_become_plain_json() {
        let id = ObjectId::parse_str("65a1b2c3d4e5f6a7b8c9d0e1").unwrap();
        let json = document_to_json(doc! {
            "_id": id,
            "name": "Blog starter",
            "price": 0.0,
            "technologies": ["Next.js"],
            "createdAt": DateTime::from_millis(1_700_000_000_000),
        });
        assert_eq!(json["_id"], "65a1b2c3d4e5f6a7b8c9d0e1");
        assert_eq!(json["technologies"][0], "Next.js");
        assert_eq!(json["createdAt"], "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn malformed_ids_are_bad_requests() {
        assert!(matches!(parse_id("123"), Err(AppError::BadRequest(_))));
    }
}
