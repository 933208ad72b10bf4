use super::library::Library;
use crate::utils::serde_helpers::{counter, string_list};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    pub id: String,
    pub title: String,
    pub genre: String,
    #[serde(default, deserialize_with = "string_list::deserialize")]
    pub themes: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub variation_prompt: Option<String>,
    #[serde(default)]
    pub variation_text: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub library_id: Option<String>,
    #[serde(default, deserialize_with = "counter::deserialize")]
    pub like_count: i64,
    #[serde(default, deserialize_with = "counter::deserialize")]
    pub view_count: i64,
    #[serde(default, deserialize_with = "counter::deserialize")]
    pub comment_count: i64,
    #[serde(default = "default_true")]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

fn non_empty(value: Option<&str>) -> bool {
    value.map_or(false, |v| !v.trim().is_empty())
}

impl Work {
    /// 变奏版本需要提示词和正文同时存在
    pub fn has_variation(&self) -> bool {
        non_empty(self.variation_prompt.as_deref()) && non_empty(self.variation_text.as_deref())
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

/// 作品详情
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkDetail {
    #[serde(flatten)]
    pub work: Work,
    pub has_variation: bool,
    pub author_name: Option<String>,
    pub liked_by_viewer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateWorkRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 50, message = "Genre is required"))]
    pub genre: String,
    #[serde(default)]
    pub themes: Vec<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub model_version: Option<String>,
    pub cover_url: Option<String>,
    pub prompt: Option<String>,
    pub original_text: Option<String>,
    pub variation_prompt: Option<String>,
    pub variation_text: Option<String>,
    pub library_id: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateWorkRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub genre: Option<String>,
    pub themes: Option<Vec<String>>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub model_version: Option<String>,
    pub cover_url: Option<String>,
    pub prompt: Option<String>,
    pub original_text: Option<String>,
    pub variation_prompt: Option<String>,
    pub variation_text: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkSort {
    #[default]
    Latest,
    Popular,
}

/// 作品列表查询参数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkListQuery {
    pub genre: Option<String>,
    pub theme: Option<String>,
    pub library_id: Option<String>,
    pub user_id: Option<String>,
    pub sort: Option<WorkSort>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// 首页主题书架
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeShelf {
    pub theme: String,
    pub works: Vec<Work>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeFeed {
    pub latest: Vec<Work>,
    pub popular: Vec<Work>,
    pub libraries: Vec<Library>,
    pub shelves: Vec<ThemeShelf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeToggle {
    pub work_id: String,
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeState {
    pub work_id: String,
    pub liked: bool,
    pub like_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn work(variation_prompt: Option<&str>, variation_text: Option<&str>) -> Work {
        serde_json::from_value(json!({
            "id": "w1",
            "title": "미래 도시 단편 소설",
            "genre": "소설",
            "themes": "[\"미래\"]",
            "variation_prompt": variation_prompt,
            "variation_text": variation_text,
            "like_count": null,
            "created_at": "2024-05-01T12:00:00+00:00"
        }))
        .unwrap()
    }

    #[test]
    fn test_has_variation_requires_both_parts() {
        assert!(work(Some("다르게"), Some("본문")).has_variation());
        assert!(!work(Some("다르게"), None).has_variation());
        assert!(!work(None, Some("본문")).has_variation());
        assert!(!work(Some(""), Some("본문")).has_variation());
    }

    #[test]
    fn test_row_defaults() {
        let w = work(None, None);
        assert_eq!(w.themes, vec!["미래"]);
        assert_eq!(w.like_count, 0);
        assert!(w.is_public);
        assert!(!w.is_owned_by("anyone"));
    }
}
