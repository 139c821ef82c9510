use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Workspace {
    pub name: Option<String>,
    pub logo: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub greeting_message: Option<String>,
    #[serde(default)]
    pub translations: Translations,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Translations {
    #[serde(default)]
    pub navigation: HashMap<String, String>,
    #[serde(default)]
    pub tickets: HashMap<String, String>,
}

impl Workspace {
    /// Navigation label for `key`, or `fallback` when the workspace does not translate it.
    pub fn navigation_label<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.translations
            .navigation
            .get(key)
            .map(String::as_str)
            .filter(|label| !label.is_empty())
            .unwrap_or(fallback)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Help Center")
    }
}
