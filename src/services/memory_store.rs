use crate::{
    error::{AppError, Result},
    models::{
        follow::EdgeChange,
        notification::{CreateNotificationRequest, Notification},
        user::{NewUser, ProfileChanges, RelationField, User},
    },
    services::store::{NotificationStore, UserStore},
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};
use tracing::debug;
use uuid::Uuid;

/// 进程内存储，用于测试和本地开发
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    notifications: Arc<RwLock<Vec<Notification>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.read().len()
    }

    pub fn all_users(&self) -> Vec<User> {
        self.users.read().values().cloned().collect()
    }
}

/// 集合更新，单侧原语与关注边共用
fn update_set(set: &mut BTreeSet<String>, value: &str, change: EdgeChange) {
    match change {
        EdgeChange::Add => set.insert(value.to_string()),
        EdgeChange::Remove => set.remove(value),
    };
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn find_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.clerk_id == clerk_id)
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>> {
        let users = self.users.read();
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut users = self.users.write();

        if users.values().any(|u| u.clerk_id == new_user.clerk_id) {
            return Err(AppError::Conflict(format!(
                "User {} already exists",
                new_user.clerk_id
            )));
        }
        if users.values().any(|u| u.username == new_user.username) {
            return Err(AppError::Conflict(format!(
                "Username {} is already taken",
                new_user.username
            )));
        }

        let user = User::from_new(Uuid::new_v4().to_string(), new_user, Utc::now());
        debug!("Memory store created user {}", user.id);
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update_user_profile(&self, id: &str, changes: ProfileChanges) -> Result<Option<User>> {
        let mut users = self.users.write();
        Ok(users.get_mut(id).map(|user| {
            user.apply_changes(changes, Utc::now());
            user.clone()
        }))
    }

    async fn add_to_set(&self, user_id: &str, field: RelationField, value: &str) -> Result<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| AppError::not_found("User"))?;
        update_set(user.relation_mut(field), value, EdgeChange::Add);
        Ok(())
    }

    async fn remove_from_set(&self, user_id: &str, field: RelationField, value: &str) -> Result<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| AppError::not_found("User"))?;
        update_set(user.relation_mut(field), value, EdgeChange::Remove);
        Ok(())
    }

    async fn apply_follow_edge(
        &self,
        acting_id: &str,
        target_id: &str,
        change: EdgeChange,
        notification: Option<CreateNotificationRequest>,
    ) -> Result<Option<Notification>> {
        // 用户与通知的写锁同时持有，边和通知一次生效
        let mut users = self.users.write();
        let mut notifications = self.notifications.write();
        if !users.contains_key(acting_id) || !users.contains_key(target_id) {
            return Err(AppError::not_found("User"));
        }

        let now = Utc::now();
        if let Some(acting) = users.get_mut(acting_id) {
            update_set(acting.relation_mut(RelationField::Following), target_id, change);
            acting.updated_at = now;
        }
        if let Some(target) = users.get_mut(target_id) {
            update_set(target.relation_mut(RelationField::Followers), acting_id, change);
            target.updated_at = now;
        }

        let created = notification
            .map(|request| Notification::from_request(Uuid::new_v4().to_string(), request, now));
        if let Some(notification) = &created {
            notifications.push(notification.clone());
        }
        Ok(created)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create_notification(&self, request: CreateNotificationRequest) -> Result<Notification> {
        let notification = Notification::from_request(Uuid::new_v4().to_string(), request, Utc::now());
        self.notifications.write().push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, to: &str) -> Result<Vec<Notification>> {
        let mut list: Vec<Notification> = self
            .notifications
            .read()
            .iter()
            .filter(|n| n.to == to)
            .cloned()
            .collect();
        list.reverse();
        Ok(list)
    }
}
