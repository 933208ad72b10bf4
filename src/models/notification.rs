use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Like,
    Comment,
    Follow,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Like => "like",
            NotificationType::Comment => "comment",
            NotificationType::Follow => "follow",
        }
    }

    /// 渲染通知文案
    pub fn render(&self, actor_name: &str, work_title: Option<&str>) -> String {
        let title = work_title.unwrap_or_default();
        match self {
            NotificationType::Like => format!("{} liked your work \"{}\"", actor_name, title),
            NotificationType::Comment => format!("{} commented on \"{}\"", actor_name, title),
            NotificationType::Follow => format!("{} started following your library", actor_name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// 接收者
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub actor_id: String,
    #[serde(default)]
    pub work_id: Option<String>,
    #[serde(default)]
    pub library_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// 新通知
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: String,
    pub notification_type: NotificationType,
    pub actor_id: String,
    pub actor_name: String,
    pub work_id: Option<String>,
    pub work_title: Option<String>,
    pub library_id: Option<String>,
}

/// 带上下文的通知
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub actor_name: String,
    pub work_title: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_messages() {
        assert_eq!(
            NotificationType::Like.render("민지", Some("웃음의 미학")),
            "민지 liked your work \"웃음의 미학\""
        );
        assert_eq!(
            NotificationType::Comment.render("Someone", Some("시")),
            "Someone commented on \"시\""
        );
        assert_eq!(
            NotificationType::Follow.render("민지", None),
            "민지 started following your library"
        );
    }
}
