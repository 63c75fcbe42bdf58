use crate::{
    config::Config,
    services::{
        auth::AuthService,
        follow::FollowService,
        media::MediaService,
        notification::NotificationService,
        store::{NotificationStore, UserStore},
        user::UserService,
    },
    utils::middleware::{build_rate_limiter, KeyedRateLimiter},
    error::Result,
};
use std::sync::Arc;

/// 应用程序的共享状态
/// 包含所有服务和配置的引用
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 认证服务
    pub auth_service: AuthService,

    /// 用户服务
    pub user_service: UserService,

    /// 关注服务
    pub follow_service: FollowService,

    /// 通知服务
    pub notification_service: NotificationService,

    /// 按IP的速率限制器
    pub rate_limiter: Arc<KeyedRateLimiter>,
}

impl AppState {
    /// 基于给定存储组装所有服务
    pub async fn build<S>(config: Config, store: Arc<S>) -> Result<Self>
    where
        S: UserStore + NotificationStore + 'static,
    {
        let users: Arc<dyn UserStore> = store.clone();
        let notifications: Arc<dyn NotificationStore> = store;

        let auth_service = AuthService::new(&config).await?;
        let media_service = MediaService::new(&config).await?;
        let notification_service = NotificationService::new(notifications).await?;
        let user_service = UserService::new(
            users.clone(),
            auth_service.clone(),
            media_service,
            config.max_bio_length,
        )
        .await?;
        let follow_service = FollowService::new(users).await?;
        let rate_limiter = Arc::new(build_rate_limiter(config.rate_limit_requests)?);

        Ok(Self {
            config,
            auth_service,
            user_service,
            follow_service,
            notification_service,
            rate_limiter,
        })
    }
}
