//! 存储边界
//!
//! 业务服务只依赖这里的两个 trait，具体实现为 SurrealDB ([`Database`](super::Database))
//! 或进程内存 ([`MemoryStore`](super::MemoryStore))。

use crate::{
    error::Result,
    models::{
        follow::EdgeChange,
        notification::{CreateNotificationRequest, Notification},
        user::{NewUser, ProfileChanges, RelationField, User},
    },
};
use async_trait::async_trait;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn find_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// 按给定顺序返回存在的用户，不存在的ID被忽略
    async fn find_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>>;

    /// `clerk_id` 或 `username` 已存在时返回 `Conflict`
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    async fn update_user_profile(&self, id: &str, changes: ProfileChanges) -> Result<Option<User>>;

    /// 单侧集合原语，集合语义：重复添加不会产生重复元素
    ///
    /// `following` / `followers` 必须成对修改，业务代码只能通过
    /// [`apply_follow_edge`](UserStore::apply_follow_edge) 修改关注集合，
    /// 各实现的 `apply_follow_edge` 复用同一套集合更新逻辑。
    async fn add_to_set(&self, user_id: &str, field: RelationField, value: &str) -> Result<()>;

    /// 单侧集合原语，约束同 [`add_to_set`](UserStore::add_to_set)
    async fn remove_from_set(&self, user_id: &str, field: RelationField, value: &str) -> Result<()>;

    /// 原子地修改关注边的两侧：`acting.following` 与 `target.followers`
    ///
    /// 给出 `notification` 时在同一次写入中追加该通知并返回；任一部分失败则整体不生效。
    /// 任一用户不存在时返回 `NotFound`。
    async fn apply_follow_edge(
        &self,
        acting_id: &str,
        target_id: &str,
        change: EdgeChange,
        notification: Option<CreateNotificationRequest>,
    ) -> Result<Option<Notification>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create_notification(&self, request: CreateNotificationRequest) -> Result<Notification>;

    /// 最新的在前
    async fn list_notifications(&self, to: &str) -> Result<Vec<Notification>>;
}
