use crate::{
    error::{AppError, Result},
    models::{
        follow::{EdgeChange, FollowTransition},
        notification::CreateNotificationRequest,
        user::UserSummary,
    },
    services::store::UserStore,
};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

type PairKey = (String, String);

/// 按无序用户对加锁，同一对用户的切换操作串行执行
///
/// 每个条目记录锁和当前持有/等待者数量，数量归零时移除。
#[derive(Default)]
struct PairLocks {
    locks: DashMap<PairKey, (Arc<Mutex<()>>, usize)>,
}

impl PairLocks {
    fn key(a: &str, b: &str) -> PairKey {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    fn slot(&self, a: &str, b: &str) -> PairSlot<'_> {
        let key = Self::key(a, b);
        let lock = {
            let mut entry = self
                .locks
                .entry(key.clone())
                .or_insert_with(|| (Arc::new(Mutex::new(())), 0));
            entry.1 += 1;
            entry.0.clone()
        };
        PairSlot {
            locks: self,
            key,
            lock,
        }
    }
}

/// 对某个用户对的一次占用，析构时释放计数；请求被取消时同样生效
struct PairSlot<'a> {
    locks: &'a PairLocks,
    key: PairKey,
    lock: Arc<Mutex<()>>,
}

impl Drop for PairSlot<'_> {
    fn drop(&mut self) {
        self.locks.locks.remove_if_mut(&self.key, |_, (_, users)| {
            *users -= 1;
            *users == 0
        });
    }
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UserStore>,
    pair_locks: Arc<PairLocks>,
}

impl FollowService {
    pub async fn new(users: Arc<dyn UserStore>) -> Result<Self> {
        Ok(Self {
            users,
            pair_locks: Arc::new(PairLocks::default()),
        })
    }

    /// 切换 `acting_user_id` 对 `target_user_id` 的关注状态
    ///
    /// 未关注时建立关注边并发送一条 follow 通知；已关注时移除关注边，不发通知。
    /// 两侧集合与通知通过一次原子写入生效，失败时状态不变。
    pub async fn toggle_follow(&self, acting_user_id: &str, target_user_id: &str) -> Result<FollowTransition> {
        debug!("User {} toggling follow on user {}", acting_user_id, target_user_id);

        // 防止自己关注自己
        if acting_user_id == target_user_id {
            return Err(AppError::InvalidOperation("You cannot follow yourself".to_string()));
        }

        let slot = self.pair_locks.slot(acting_user_id, target_user_id);
        let _guard = slot.lock.lock().await;
        self.toggle_locked(acting_user_id, target_user_id).await
    }

    async fn toggle_locked(&self, acting_user_id: &str, target_user_id: &str) -> Result<FollowTransition> {
        let acting_user = self.users.find_user_by_id(acting_user_id).await?;
        let target_user = self.users.find_user_by_id(target_user_id).await?;

        let (acting_user, _target_user) = match (acting_user, target_user) {
            (Some(acting), Some(target)) => (acting, target),
            _ => return Err(AppError::not_found("User")),
        };

        let transition = if acting_user.is_following(target_user_id) {
            FollowTransition::Unfollowed
        } else {
            FollowTransition::Followed
        };

        let notification = transition
            .emits_notification()
            .then(|| CreateNotificationRequest::follow(acting_user_id, target_user_id));

        let sent = self
            .users
            .apply_follow_edge(
                acting_user_id,
                target_user_id,
                EdgeChange::from(transition),
                notification,
            )
            .await?;

        if let Some(notification) = sent {
            debug!("Follow notification {} sent to {}", notification.id, notification.to);
        }
        info!("User {} {:?} user {}", acting_user_id, transition, target_user_id);
        Ok(transition)
    }

    /// 获取关注者列表
    pub async fn get_followers(&self, user_id: &str) -> Result<Vec<UserSummary>> {
        debug!("Getting followers for user: {}", user_id);

        let user = self
            .users
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        let ids: Vec<String> = user.followers.into_iter().collect();

        let users = self.users.find_users_by_ids(&ids).await?;
        Ok(users.iter().map(|u| u.to_summary()).collect())
    }

    /// 获取关注中的用户列表
    pub async fn get_following(&self, user_id: &str) -> Result<Vec<UserSummary>> {
        debug!("Getting following for user: {}", user_id);

        let user = self
            .users
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        let ids: Vec<String> = user.following.into_iter().collect();

        let users = self.users.find_users_by_ids(&ids).await?;
        Ok(users.iter().map(|u| u.to_summary()).collect())
    }
}
