use std::{fmt, str::FromStr};

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateCategory {
    #[serde(rename = "E-commerce")]
    ECommerce,
    Portfolio,
    Blog,
    SaaS,
    #[serde(rename = "Landing Page")]
    LandingPage,
    Dashboard,
    Other,
}

impl TemplateCategory {
    pub const ALL: [TemplateCategory; 7] = [
        TemplateCategory::ECommerce,
        TemplateCategory::Portfolio,
        TemplateCategory::Blog,
        TemplateCategory::SaaS,
        TemplateCategory::LandingPage,
        TemplateCategory::Dashboard,
        TemplateCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateCategory::ECommerce => "E-commerce",
            TemplateCategory::Portfolio => "Portfolio",
            TemplateCategory::Blog => "Blog",
            TemplateCategory::SaaS => "SaaS",
            TemplateCategory::LandingPage => "Landing Page",
            TemplateCategory::Dashboard => "Dashboard",
            TemplateCategory::Other => "Other",
        }
    }
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("`{}` is not a valid category", s))
    }
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

/// Catalog entry as stored in the `templates` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: String,
    pub category: TemplateCategory,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub preview_image: String,
    pub price: f64,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    /// Firebase uid of the admin who added the template.
    pub created_by: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
