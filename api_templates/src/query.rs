//! Translation of listing query strings into Mongo filter, sort and
//! projection documents.
//!
//! `?category=Blog&price[lte]=20&sort=-rating,name&fields=name,price&page=2`
//! filters on category and a price range, sorts by rating then name, returns
//! only the two fields and skips the first page.

use mongodb::bson::{Bson, Document, doc};

use crate::dtos::template::{PageRef, Pagination};

const RANGE_OPERATORS: [&str; 4] = ["gte", "gt", "lte", "lt"];
const NUMERIC_FIELDS: [&str; 2] = ["price", "rating"];
const BOOLEAN_FIELDS: [&str; 1] = ["isFree"];

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filter: Document,
    pub sort: Document,
    pub projection: Option<Document>,
    pub page: u64,
    pub limit: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            filter: Document::new(),
            sort: doc! { "createdAt": -1 },
            projection: None,
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListQuery {
    pub fn from_params(params: &[(String, String)]) -> Self {
        let mut query = ListQuery::default();

        for (key, value) in params {
            match key.as_str() {
                "page" => {
                    query.page = value.parse::<u64>().ok().filter(|p| *p > 0).unwrap_or(1);
                }
                "limit" => {
                    query.limit = value
                        .parse::<i64>()
                        .ok()
                        .filter(|l| *l > 0)
                        .map(|l| l.min(MAX_LIMIT))
                        .unwrap_or(DEFAULT_LIMIT);
                }
                "sort" => {
                    if let Some(sort) = sort_document(value) {
                        query.sort = sort;
                    }
                }
                "fields" => query.projection = projection_document(value),
                _ => add_filter(&mut query.filter, key, value),
            }
        }
        query
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit as u64)
    }

    /// Neighbouring pages given the number of documents matching the filter.
    pub fn pagination(&self, total: u64) -> Pagination {
        let limit = self.limit as u64;
        Pagination {
            next: (self.page.saturating_mul(limit) < total).then_some(PageRef {
                page: self.page + 1,
                limit: self.limit,
            }),
            prev: (self.skip() > 0).then_some(PageRef {
                page: self.page - 1,
                limit: self.limit,
            }),
        }
    }
}

/// `field[op]` with a supported range operator.
fn split_operator(key: &str) -> Option<(&str, &str)> {
    let (field, op) = key.strip_suffix(']')?.split_once('[')?;
    if field.is_empty() || !RANGE_OPERATORS.contains(&op) {
        return None;
    }
    Some((field, op))
}

fn add_filter(filter: &mut Document, key: &str, value: &str) {
    // operators only come from the `field[op]` form
    if key.is_empty() || key.starts_with('$') {
        return;
    }

    if !key.contains('[') {
        filter.insert(key, typed_value(key, value));
        return;
    }

    let Some((field, op)) = split_operator(key) else {
        log::debug!("Ignoring unsupported template filter `{}`", key);
        return;
    };
    let op_key = format!("${}", op);
    match filter.get_mut(field) {
        Some(Bson::Document(ops)) => {
            ops.insert(op_key, typed_value(field, value));
        }
        _ => {
            let mut ops = Document::new();
            ops.insert(op_key, typed_value(field, value));
            filter.insert(field, ops);
        }
    }
}

/// Casts the value to the stored type of `field`. Fields outside the known
/// numeric and boolean ones, and values that do not parse, match as text.
pub fn typed_value(field: &str, value: &str) -> Bson {
    if BOOLEAN_FIELDS.contains(&field) {
        return match value {
            "true" => Bson::Boolean(true),
            "false" => Bson::Boolean(false),
            _ => Bson::String(value.to_string()),
        };
    }
    if !NUMERIC_FIELDS.contains(&field) {
        return Bson::String(value.to_string());
    }
    if let Ok(n) = value.parse::<i64>() {
        return Bson::Int64(n);
    }
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Bson::Double(n),
        _ => Bson::String(value.to_string()),
    }
}

fn field_names(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|f| !f.is_empty())
}

fn sort_document(value: &str) -> Option<Document> {
    let mut sort = Document::new();
    for field in field_names(value) {
        match field.strip_prefix('-') {
            Some(desc) if !desc.is_empty() => sort.insert(desc, -1),
            Some(_) => continue,
            None => sort.insert(field, 1),
        };
    }
    (!sort.is_empty()).then_some(sort)
}

fn projection_document(value: &str) -> Option<Document> {
    let mut projection = Document::new();
    for field in field_names(value) {
        projection.insert(field, 1);
    }
    (!projection.is_empty()).then_some(projection)
}
