use crate::utils::serde_helpers::counter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryTheme {
    #[default]
    Default,
    Dark,
    Light,
}

impl LibraryTheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryTheme::Default => "default",
            LibraryTheme::Dark => "dark",
            LibraryTheme::Light => "light",
        }
    }
}

/// 用户书房
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub banner_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub theme: LibraryTheme,
    #[serde(default, deserialize_with = "counter::deserialize")]
    pub total_works: i64,
    #[serde(default, deserialize_with = "counter::deserialize")]
    pub total_views: i64,
    #[serde(default, deserialize_with = "counter::deserialize")]
    pub total_likes: i64,
    #[serde(default, deserialize_with = "counter::deserialize")]
    pub followers_count: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryView {
    #[serde(flatten)]
    pub library: Library,
    pub is_owner: bool,
    pub owner_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateLibraryRequest {
    #[validate(length(max = 100))]
    pub name: String,
    pub description: Option<String>,
    pub banner_url: Option<String>,
    pub is_public: Option<bool>,
    pub theme: Option<LibraryTheme>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateLibraryRequest {
    #[validate(length(max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub banner_url: Option<String>,
    pub is_public: Option<bool>,
    pub theme: Option<LibraryTheme>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_theme_round_trips_lowercase() {
        assert_eq!(serde_json::to_value(LibraryTheme::Dark).unwrap(), json!("dark"));
        let t: LibraryTheme = serde_json::from_value(json!("light")).unwrap();
        assert_eq!(t, LibraryTheme::Light);
        assert!(serde_json::from_value::<LibraryTheme>(json!("neon")).is_err());
    }
}
