use crate::{
    error::Result,
    models::notification::Notification,
    services::store::NotificationStore,
};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
}

impl NotificationService {
    pub async fn new(store: Arc<dyn NotificationStore>) -> Result<Self> {
        Ok(Self { store })
    }

    /// 当前用户收到的通知，最新的在前
    pub async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        debug!("Listing notifications for user {}", user_id);
        self.store.list_notifications(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::notification::CreateNotificationRequest, services::MemoryStore};

    #[tokio::test]
    async fn test_list_only_own_notifications() {
        let store = MemoryStore::new();
        store
            .create_notification(CreateNotificationRequest::follow("a", "b"))
            .await
            .unwrap();
        store
            .create_notification(CreateNotificationRequest::follow("b", "a"))
            .await
            .unwrap();

        let service = NotificationService::new(Arc::new(store)).await.unwrap();
        let list = service.list_notifications("b").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].from, "a");
    }
}
