use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    follow::EdgeChange,
    notification::{CreateNotificationRequest, Notification, NotificationType},
    user::{NewUser, ProfileChanges, RelationField, User},
};
use crate::services::store::{NotificationStore, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use surrealdb::sql::Thing;
use surrealdb::{Response, Surreal};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const SCHEMA: &str = r#"
    DEFINE TABLE user SCHEMALESS;
    DEFINE INDEX user_clerk_id ON TABLE user COLUMNS clerk_id UNIQUE;
    DEFINE INDEX user_username ON TABLE user COLUMNS username UNIQUE;
    DEFINE TABLE notification SCHEMALESS;
    DEFINE INDEX notification_to ON TABLE notification COLUMNS `to`;
"#;

/// 数据库服务
#[derive(Clone)]
pub struct Database {
    pub client: Surreal<Any>,
    pub config: Config,
}

/// SurrealDB 中的用户行，`id` 为记录ID
#[derive(Debug, Deserialize)]
struct UserRow {
    id: Thing,
    clerk_id: String,
    #[serde(default)]
    email: String,
    username: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    profile_picture: String,
    #[serde(default)]
    banner_image: String,
    #[serde(default)]
    following: Vec<String>,
    #[serde(default)]
    followers: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id.id.to_raw(),
            clerk_id: row.clerk_id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            bio: row.bio,
            location: row.location,
            profile_picture: row.profile_picture,
            banner_image: row.banner_image,
            following: row.following.into_iter().collect(),
            followers: row.followers.into_iter().collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct UserContent {
    clerk_id: String,
    email: String,
    username: String,
    first_name: String,
    last_name: String,
    bio: String,
    location: String,
    profile_picture: String,
    banner_image: String,
    following: Vec<String>,
    followers: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct NotificationRow {
    id: Thing,
    from: String,
    to: String,
    #[serde(rename = "type")]
    notification_type: NotificationType,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id.id.to_raw(),
            from: row.from,
            to: row.to,
            notification_type: row.notification_type,
            created_at: row.created_at,
        }
    }
}

/// 唯一索引冲突
fn is_unique_violation(err: &surrealdb::Error) -> bool {
    err.to_string().contains("already contains")
}

/// 集合更新子句，单侧原语与关注边共用
fn set_clause(field: RelationField, change: EdgeChange, param: &str) -> String {
    let op = match change {
        EdgeChange::Add => "array::union",
        EdgeChange::Remove => "array::complement",
    };
    format!("{field} = {op}({field}, [${param}])", field = field.as_str(), op = op, param = param)
}

impl Database {
    /// 创建新的数据库实例
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Initializing database connection to {}", config.database_url);

        let endpoint = if config.database_url.contains("://") {
            config.database_url.clone()
        } else {
            warn!("DATABASE_URL without scheme, assuming http://{}", config.database_url);
            format!("http://{}", config.database_url)
        };

        let client = any::connect(endpoint.as_str()).await?;
        client
            .signin(Root {
                username: &config.database_username,
                password: &config.database_password,
            })
            .await?;
        client
            .use_ns(&config.database_namespace)
            .use_db(&config.database_name)
            .await?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// 进程内 SurrealDB，用于测试
    #[cfg(test)]
    pub(crate) async fn in_memory() -> Result<Self> {
        let client = any::connect("mem://").await?;
        client.use_ns("test").use_db("test").await?;
        let db = Self {
            client,
            config: Config::default(),
        };
        db.define_schema().await?;
        Ok(db)
    }

    /// 验证数据库连接
    pub async fn verify_connection(&self) -> Result<()> {
        match self.query("INFO FOR DB").await {
            Ok(_) => {
                info!("Database connection verified successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to verify database connection: {}", e);
                Err(e)
            }
        }
    }

    /// 定义表和唯一索引
    pub async fn define_schema(&self) -> Result<()> {
        self.query(SCHEMA).await?;
        info!("Database schema defined");
        Ok(())
    }

    /// 执行原始SQL查询
    pub async fn query(&self, sql: &str) -> Result<Response> {
        let response = self.client.query(sql).await?;
        Ok(response.check()?)
    }

    /// 执行带参数的查询
    pub async fn query_with_params<P>(&self, sql: &str, params: P) -> Result<Response>
    where
        P: Serialize,
    {
        debug!("Executing query: {}", sql.trim());
        let response = self.client.query(sql).bind(params).await?;
        Ok(response.check()?)
    }

    async fn find_user_where(&self, field: &str, value: &str) -> Result<Option<User>> {
        let query = format!("SELECT * FROM user WHERE {} = $value LIMIT 1", field);
        let mut response = self
            .query_with_params(&query, json!({ "value": value }))
            .await?;
        let rows: Vec<UserRow> = response.take(0)?;
        Ok(rows.into_iter().next().map(User::from))
    }
}

#[async_trait]
impl UserStore for Database {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        self.find_user_where("meta::id(id)", id).await
    }

    async fn find_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>> {
        self.find_user_where("clerk_id", clerk_id).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_user_where("username", username).await
    }

    async fn find_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut response = self
            .query_with_params(
                "SELECT * FROM user WHERE meta::id(id) IN $ids",
                json!({ "ids": ids }),
            )
            .await?;
        let rows: Vec<UserRow> = response.take(0)?;
        let mut found: std::collections::HashMap<String, User> = rows
            .into_iter()
            .map(User::from)
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let id = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let content = UserContent {
            clerk_id: new_user.clerk_id,
            email: new_user.email,
            username: new_user.username,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            bio: String::new(),
            location: String::new(),
            profile_picture: new_user.profile_picture,
            banner_image: String::new(),
            following: Vec::new(),
            followers: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let username = content.username.clone();
        let result = self
            .query_with_params(
                "CREATE type::thing('user', $id) CONTENT $data",
                json!({ "id": id, "data": content }),
            )
            .await;
        let mut response = match result {
            Err(AppError::Database(e)) if is_unique_violation(&e) => {
                debug!("Duplicate user on create: {}", e);
                return Err(AppError::Conflict(format!(
                    "User or username {} already exists",
                    username
                )));
            }
            other => other?,
        };
        let rows: Vec<UserRow> = response.take(0)?;

        rows.into_iter()
            .next()
            .map(User::from)
            .ok_or_else(|| AppError::Store("Failed to create user record".to_string()))
    }

    async fn update_user_profile(&self, id: &str, changes: ProfileChanges) -> Result<Option<User>> {
        let mut data = serde_json::to_value(&changes)?;
        if let Some(map) = data.as_object_mut() {
            map.insert("updated_at".to_string(), serde_json::to_value(Utc::now())?);
        }

        let mut response = self
            .query_with_params(
                "UPDATE user MERGE $data WHERE meta::id(id) = $id RETURN AFTER",
                json!({ "id": id, "data": data }),
            )
            .await?;
        let rows: Vec<UserRow> = response.take(0)?;
        Ok(rows.into_iter().next().map(User::from))
    }

    async fn add_to_set(&self, user_id: &str, field: RelationField, value: &str) -> Result<()> {
        let query = format!(
            "UPDATE user SET {} WHERE meta::id(id) = $id",
            set_clause(field, EdgeChange::Add, "value")
        );
        self.query_with_params(&query, json!({ "id": user_id, "value": value }))
            .await?;
        Ok(())
    }

    async fn remove_from_set(&self, user_id: &str, field: RelationField, value: &str) -> Result<()> {
        let query = format!(
            "UPDATE user SET {} WHERE meta::id(id) = $id",
            set_clause(field, EdgeChange::Remove, "value")
        );
        self.query_with_params(&query, json!({ "id": user_id, "value": value }))
            .await?;
        Ok(())
    }

    async fn apply_follow_edge(
        &self,
        acting_id: &str,
        target_id: &str,
        change: EdgeChange,
        notification: Option<CreateNotificationRequest>,
    ) -> Result<Option<Notification>> {
        // 本服务不删除用户，事务前的存在性检查不会失效
        let ids = [acting_id.to_string(), target_id.to_string()];
        if self.find_users_by_ids(&ids).await?.len() < 2 {
            return Err(AppError::not_found("User"));
        }

        let now = Utc::now();
        let created = notification.map(|request| {
            Notification::from_request(Uuid::new_v4().simple().to_string(), request, now)
        });

        let create_notification = if created.is_some() {
            "CREATE type::thing('notification', $notification_id) CONTENT $notification;"
        } else {
            ""
        };

        // 两侧集合与通知在同一事务内提交
        let query = format!(
            r#"
                BEGIN TRANSACTION;
                UPDATE user SET {following}, updated_at = $now WHERE meta::id(id) = $acting;
                UPDATE user SET {followers}, updated_at = $now WHERE meta::id(id) = $target;
                {create_notification}
                COMMIT TRANSACTION;
            "#,
            following = set_clause(RelationField::Following, change, "target"),
            followers = set_clause(RelationField::Followers, change, "acting"),
            create_notification = create_notification,
        );

        let mut params = json!({
            "acting": acting_id,
            "target": target_id,
            "now": now,
        });
        if let (Some(notification), Some(map)) = (&created, params.as_object_mut()) {
            map.insert("notification_id".to_string(), json!(notification.id));
            map.insert(
                "notification".to_string(),
                json!({
                    "from": notification.from,
                    "to": notification.to,
                    "type": notification.notification_type,
                    "created_at": notification.created_at,
                }),
            );
        }

        self.query_with_params(&query, params).await?;
        Ok(created)
    }
}

#[async_trait]
impl NotificationStore for Database {
    async fn create_notification(&self, request: CreateNotificationRequest) -> Result<Notification> {
        let id = Uuid::new_v4().simple().to_string();
        let mut data = serde_json::to_value(&request)?;
        if let Some(map) = data.as_object_mut() {
            map.insert("created_at".to_string(), serde_json::to_value(Utc::now())?);
        }

        let mut response = self
            .query_with_params(
                "CREATE type::thing('notification', $id) CONTENT $data",
                json!({ "id": id, "data": data }),
            )
            .await?;
        let rows: Vec<NotificationRow> = response.take(0)?;

        rows.into_iter()
            .next()
            .map(Notification::from)
            .ok_or_else(|| AppError::Store("Failed to create notification record".to_string()))
    }

    async fn list_notifications(&self, to: &str) -> Result<Vec<Notification>> {
        let mut response = self
            .query_with_params(
                "SELECT * FROM notification WHERE `to` = $to",
                json!({ "to": to }),
            )
            .await?;
        let rows: Vec<NotificationRow> = response.take(0)?;

        let mut list: Vec<Notification> = rows.into_iter().map(Notification::from).collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }
}
