use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ArticleSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub text_content: Option<String>,
    pub thumbnail: Option<String>,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub thumbnail: Option<String>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub author_image: Option<String>,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Pagination {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub has_previous: bool,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ArticlePage {
    #[serde(default)]
    pub articles: Vec<ArticleSummary>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Filters for the article listing. `extended=true` is always sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ArticleQuery {
    pub title: Option<String>,
    pub id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
}

impl ArticleQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_category(category_id: &str) -> Self {
        Self::new().with_category(category_id)
    }

    pub fn with_category(mut self, category_id: &str) -> Self {
        self.category = Some(category_id.to_string());
        self
    }

    pub fn with_sub_category(mut self, sub_category_id: &str) -> Self {
        self.sub_category = Some(sub_category_id.to_string());
        self
    }

    /// Query string pairs, skipping unset or empty values.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("extended", "true".to_string())];

        let text_fields = [
            ("title", &self.title),
            ("id", &self.id),
        ];
        for (key, value) in text_fields {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                pairs.push((key, value.to_string()));
            }
        }

        for (key, value) in [("page", self.page), ("limit", self.limit)] {
            if let Some(value) = value.filter(|v| *v > 0) {
                pairs.push((key, value.to_string()));
            }
        }

        let filter_fields = [
            ("category", &self.category),
            ("sub_category", &self.sub_category),
        ];
        for (key, value) in filter_fields {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                pairs.push((key, value.to_string()));
            }
        }

        pairs
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackScore {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for FeedbackScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackScore::Positive => write!(f, "positive"),
            FeedbackScore::Neutral => write!(f, "neutral"),
            FeedbackScore::Negative => write!(f, "negative"),
        }
    }
}
