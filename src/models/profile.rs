use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 未填写名字时的显示名
pub const ANONYMOUS_NAME: &str = "Someone";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// 显示名，空名字回退到 `Someone`
    pub fn display_name(&self) -> String {
        display_name_of(self.full_name.as_deref())
    }
}

pub fn display_name_of(full_name: Option<&str>) -> String {
    match full_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => ANONYMOUS_NAME.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(display_name_of(Some("김작가")), "김작가");
        assert_eq!(display_name_of(Some("   ")), ANONYMOUS_NAME);
        assert_eq!(display_name_of(None), ANONYMOUS_NAME);
    }
}
