use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNotificationRequest {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
}

/// 通知类型，新增类型需显式扩展此枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Follow,
}

impl Notification {
    /// 由存储分配 `id` 与 `created_at`
    pub fn from_request(id: String, request: CreateNotificationRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            from: request.from,
            to: request.to,
            notification_type: request.notification_type,
            created_at,
        }
    }
}

impl CreateNotificationRequest {
    pub fn follow(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            notification_type: NotificationType::Follow,
        }
    }
}
