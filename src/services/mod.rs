pub mod auth;
pub mod database;
pub mod follow;
pub mod media;
pub mod memory_store;
pub mod notification;
pub mod store;
pub mod user;

// 重新导出常用类型
pub use auth::AuthService;
pub use database::Database;
pub use follow::FollowService;
pub use media::MediaService;
pub use memory_store::MemoryStore;
pub use notification::NotificationService;
pub use user::UserService;
