use crate::{
    error::{AppError, Result},
    models::{
        follow::ToggleFollowResponse,
        media::{ImageKind, ImageUpload},
        response::ApiResponse,
        user::{UpdateProfileRequest, UserSummary},
    },
    services::user::SyncOutcome,
    state::AppState,
    utils::middleware::RequireAuth,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // 公开路由
        .route("/profile/:username", get(get_user_profile))
        .route("/followers/:user_id", get(get_followers))
        .route("/following/:user_id", get(get_following))
        // 需要认证的路由
        .route("/sync", post(sync_user))
        .route("/me", get(get_current_user))
        .route("/profile", put(update_profile))
        .route("/follow/:target_user_id", post(follow_user))
}

/// 按用户名获取资料
/// GET /api/users/profile/:username
pub async fn get_user_profile(
    State(app_state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<Value>> {
    let user = app_state.user_service.get_profile_by_username(&username).await?;

    Ok(Json(json!({
        "success": true,
        "user": user
    })))
}

/// 从身份服务同步当前用户
/// POST /api/users/sync
pub async fn sync_user(
    State(app_state): State<Arc<AppState>>,
    RequireAuth(auth): RequireAuth,
) -> Result<(StatusCode, Json<Value>)> {
    debug!("Syncing user {}", auth.clerk_id);

    let (status, user, message) = match app_state.user_service.sync_user(&auth.clerk_id).await? {
        SyncOutcome::Existing(user) => (StatusCode::OK, user, "User already exists"),
        SyncOutcome::Created(user) => (StatusCode::CREATED, user, "User created successfully"),
    };

    Ok((
        status,
        Json(json!({
            "success": true,
            "user": user,
            "message": message
        })),
    ))
}

/// 获取当前用户
/// GET /api/users/me
pub async fn get_current_user(
    State(app_state): State<Arc<AppState>>,
    RequireAuth(auth): RequireAuth,
) -> Result<Json<Value>> {
    let user = app_state.user_service.get_current_user(&auth.clerk_id).await?;

    Ok(Json(json!({
        "success": true,
        "user": user
    })))
}

/// 更新当前用户资料（multipart 表单）
/// PUT /api/users/profile
pub async fn update_profile(
    State(app_state): State<Arc<AppState>>,
    RequireAuth(auth): RequireAuth,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    debug!("Updating profile for {}", auth.clerk_id);

    let mut request = UpdateProfileRequest::default();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to process multipart field: {}", e);
        AppError::bad_request("Invalid multipart body")
    })? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(kind) = ImageKind::from_field_name(&name) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(|e| {
                error!("Failed to read file data: {}", e);
                AppError::FileUpload("Failed to read uploaded file".to_string())
            })?;
            if !data.is_empty() {
                images.push(ImageUpload {
                    kind,
                    content_type,
                    data: data.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|_| AppError::BadRequest(format!("Invalid value for field {}", name)))?;
        match name.as_str() {
            "firstName" => request.first_name = Some(value),
            "lastName" => request.last_name = Some(value),
            "bio" => request.bio = Some(value),
            "location" => request.location = Some(value),
            other => debug!("Ignoring unknown profile field {}", other),
        }
    }

    let user = app_state
        .user_service
        .update_profile(&auth.clerk_id, request, images)
        .await?;

    Ok(Json(json!({
        "success": true,
        "user": user
    })))
}

/// 切换关注状态
/// POST /api/users/follow/:target_user_id
pub async fn follow_user(
    State(app_state): State<Arc<AppState>>,
    RequireAuth(auth): RequireAuth,
    Path(target_user_id): Path<String>,
) -> Result<Json<ApiResponse<ToggleFollowResponse>>> {
    // 调用方身份在边界处解析一次，显式传入关注服务
    let current_user = app_state.user_service.get_current_user(&auth.clerk_id).await?;

    let transition = app_state
        .follow_service
        .toggle_follow(&current_user.id, &target_user_id)
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        ToggleFollowResponse { transition },
        transition.message(),
    )))
}

/// 获取关注者列表
/// GET /api/users/followers/:user_id
pub async fn get_followers(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>> {
    let followers = app_state.follow_service.get_followers(&user_id).await?;
    Ok(Json(ApiResponse::success(followers)))
}

/// 获取关注中的用户列表
/// GET /api/users/following/:user_id
pub async fn get_following(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>> {
    let following = app_state.follow_service.get_following(&user_id).await?;
    Ok(Json(ApiResponse::success(following)))
}
