use crate::{
    error::Result,
    models::{notification::Notification, response::ApiResponse},
    state::AppState,
    utils::middleware::RequireAuth,
};
use axum::{extract::State, response::Json, routing::get, Router};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_notifications))
}

/// 获取当前用户收到的通知
/// GET /api/notifications
pub async fn list_notifications(
    State(app_state): State<Arc<AppState>>,
    RequireAuth(auth): RequireAuth,
) -> Result<Json<ApiResponse<Vec<Notification>>>> {
    let user = app_state.user_service.get_current_user(&auth.clerk_id).await?;
    let notifications = app_state
        .notification_service
        .list_notifications(&user.id)
        .await?;

    Ok(Json(ApiResponse::success(notifications)))
}
