use chrono::{DateTime, Utc};
use mongodb::bson;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::template::{Template, TemplateCategory};

/// Body of create and update requests. Every field is optional so that
/// updates can be partial; creation checks the required ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub preview_image: Option<String>,
    pub price: Option<f64>,
    pub is_free: Option<bool>,
    pub rating: Option<f64>,
    pub version: Option<String>,
    pub features: Option<Vec<String>>,
    pub requirements: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: TemplateCategory,
    pub technologies: Vec<String>,
    pub preview_image: String,
    pub price: f64,
    pub is_free: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub version: String,
    pub features: Vec<String>,
    pub requirements: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn to_chrono(date: bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(date.timestamp_millis()).unwrap_or_default()
}

impl From<Template> for TemplateResponse {
    fn from(t: Template) -> Self {
        TemplateResponse {
            id: t.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: t.name,
            description: t.description,
            category: t.category,
            technologies: t.technologies,
            preview_image: t.preview_image,
            price: t.price,
            is_free: t.is_free,
            rating: t.rating,
            version: t.version,
            features: t.features,
            requirements: t.requirements,
            created_by: t.created_by,
            created_at: to_chrono(t.created_at),
            updated_at: to_chrono(t.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: i64,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

/// Paged listing. Documents are passed through as JSON since a `fields`
/// projection may leave out required fields.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub count: usize,
    pub pagination: Pagination,
    pub data: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct CollectionResponse<T: Serialize> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
}

impl<T: Serialize> CollectionResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        CollectionResponse {
            success: true,
            count: data.len(),
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        DataResponse {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}
