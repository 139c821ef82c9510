use serde::Deserialize;

/// Category as returned by the list endpoint.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Category as returned by the single-category endpoint.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CategoryDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    #[serde(default)]
    pub sub_categories: Vec<SubCategory>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SubCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub thumbnail_url: Option<String>,
}
