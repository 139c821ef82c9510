use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub avatar: Option<String>,
    pub picture: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl User {
    pub fn display_name(&self) -> &str {
        non_empty(&self.name)
            .or_else(|| non_empty(&self.email))
            .unwrap_or("User")
    }

    /// First non-empty of `image`, `avatar`, `picture`.
    pub fn avatar_url(&self) -> Option<&str> {
        [&self.image, &self.avatar, &self.picture]
            .into_iter()
            .find_map(non_empty)
    }

    pub fn initials(&self) -> String {
        self.display_name()
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .take(2)
            .collect()
    }
}
