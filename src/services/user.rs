use crate::{
    error::{AppError, Result},
    models::{
        media::{ImageKind, ImageUpload},
        user::{NewUser, ProfileChanges, UpdateProfileRequest, User},
    },
    services::{auth::IdentityUser, store::UserStore, AuthService, MediaService},
    utils::validation::{sanitize_username, validate_bio, validate_username},
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

/// 用户名后缀尝试上限
const MAX_USERNAME_ATTEMPTS: usize = 100;

fn new_user_from_identity(clerk_id: &str, email: &str, username: String, identity: &IdentityUser) -> NewUser {
    NewUser {
        clerk_id: clerk_id.to_string(),
        email: email.to_string(),
        username,
        first_name: identity.first_name.clone().unwrap_or_default(),
        last_name: identity.last_name.clone().unwrap_or_default(),
        profile_picture: identity.image_url.clone().unwrap_or_default(),
    }
}

/// 同步结果：已存在或新建
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Existing(User),
    Created(User),
}

/// 用户服务，处理用户资料相关的业务逻辑
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    auth_service: AuthService,
    media_service: MediaService,
    max_bio_length: usize,
}

impl UserService {
    pub async fn new(
        users: Arc<dyn UserStore>,
        auth_service: AuthService,
        media_service: MediaService,
        max_bio_length: usize,
    ) -> Result<Self> {
        Ok(Self {
            users,
            auth_service,
            media_service,
            max_bio_length,
        })
    }

    pub async fn get_profile_by_username(&self, username: &str) -> Result<User> {
        debug!("Fetching profile for username: {}", username);
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    pub async fn get_current_user(&self, clerk_id: &str) -> Result<User> {
        self.users
            .find_user_by_clerk_id(clerk_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// 首次登录时从身份服务同步用户
    ///
    /// 并发同步时以存储的唯一约束为准：同一 `clerk_id` 的后到者返回已存在的用户，
    /// 用户名被抢占时换下一个后缀重试。
    pub async fn sync_user(&self, clerk_id: &str) -> Result<SyncOutcome> {
        if let Some(existing) = self.users.find_user_by_clerk_id(clerk_id).await? {
            debug!("User {} already synced", clerk_id);
            return Ok(SyncOutcome::Existing(existing));
        }

        let identity = self.auth_service.fetch_identity(clerk_id).await?;
        let email = identity
            .primary_email()
            .ok_or_else(|| AppError::bad_request("Identity has no email address"))?
            .to_string();
        let base = sanitize_username(email.split('@').next().unwrap_or_default());
        validate_username(&base)?;

        for attempt in 0..MAX_USERNAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                base.clone()
            } else {
                format!("{}_{}", base, attempt)
            };
            if self.users.find_user_by_username(&candidate).await?.is_some() {
                continue;
            }

            match self
                .users
                .create_user(new_user_from_identity(clerk_id, &email, candidate.clone(), &identity))
                .await
            {
                Ok(user) => {
                    info!("Created user {} ({}) for {}", user.id, user.username, clerk_id);
                    return Ok(SyncOutcome::Created(user));
                }
                Err(AppError::Conflict(reason)) => {
                    if let Some(existing) = self.users.find_user_by_clerk_id(clerk_id).await? {
                        debug!("User {} synced concurrently", clerk_id);
                        return Ok(SyncOutcome::Existing(existing));
                    }
                    debug!("Username {} taken concurrently: {}", candidate, reason);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::validation("Failed to generate unique username"))
    }

    /// 更新资料，图片上传失败时记录日志并跳过该图片
    pub async fn update_profile(
        &self,
        clerk_id: &str,
        request: UpdateProfileRequest,
        images: Vec<ImageUpload>,
    ) -> Result<User> {
        request.validate()?;
        if let Some(bio) = &request.bio {
            validate_bio(bio, self.max_bio_length)?;
        }

        let user = self.get_current_user(clerk_id).await?;
        let mut changes = ProfileChanges::from(request);

        for image in &images {
            match self.media_service.upload_image(image).await {
                Ok(uploaded) => match image.kind {
                    ImageKind::ProfilePicture => {
                        changes.profile_picture = Some(uploaded.secure_url)
                    }
                    ImageKind::BannerImage => {
                        changes.banner_image = Some(uploaded.secure_url)
                    }
                },
                Err(e) => warn!("{:?} upload failed for user {}: {}", image.kind, user.id, e),
            }
        }

        if changes.is_empty() {
            return Ok(user);
        }

        self.users
            .update_user_profile(&user.id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }
}
