use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryFollower {
    pub id: String,
    pub library_id: String,
    pub follower_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowToggle {
    pub library_id: String,
    pub following: bool,
    pub followers_count: i64,
}

/// 关注者列表项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowerView {
    pub follower_id: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub followed_at: DateTime<Utc>,
}
