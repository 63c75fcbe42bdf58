use serde::{Deserialize, Serialize};
use std::env;

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Surreal,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "surreal" | "surrealdb" => Ok(StoreBackend::Surreal),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow::anyhow!("Unknown STORE_BACKEND: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,

    // Store configuration
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub database_namespace: String,
    pub database_name: String,
    pub database_username: String,
    pub database_password: String,

    // Identity provider
    pub auth_jwt_secret: String,
    pub auth_jwt_public_key: Option<String>,
    pub identity_api_url: String,
    pub identity_secret_key: String,

    // Media host
    pub media_api_url: String,
    pub media_cloud_name: String,
    pub media_api_key: String,
    pub media_api_secret: String,
    pub media_folder: String,
    pub max_upload_size: usize,

    // Content settings
    pub max_bio_length: usize,

    // Rate limiting
    pub rate_limit_requests: u32,

    // CORS configuration
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "5001".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "szark_social=debug,tower_http=debug".to_string()),

            store_backend: env::var("STORE_BACKEND")
                .unwrap_or_else(|_| "surreal".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            database_namespace: env::var("DATABASE_NAMESPACE")
                .unwrap_or_else(|_| "szark".to_string()),
            database_name: env::var("DATABASE_NAME")
                .unwrap_or_else(|_| "social".to_string()),
            database_username: env::var("DATABASE_USERNAME")
                .unwrap_or_else(|_| "root".to_string()),
            database_password: env::var("DATABASE_PASSWORD")
                .unwrap_or_else(|_| "root".to_string()),

            auth_jwt_secret: env::var("AUTH_JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("AUTH_JWT_SECRET must be set"))?,
            auth_jwt_public_key: env::var("AUTH_JWT_PUBLIC_KEY").ok(),
            identity_api_url: env::var("IDENTITY_API_URL")
                .unwrap_or_else(|_| "https://api.clerk.com".to_string()),
            identity_secret_key: env::var("IDENTITY_SECRET_KEY").unwrap_or_default(),

            media_api_url: env::var("MEDIA_API_URL")
                .unwrap_or_else(|_| "https://api.cloudinary.com".to_string()),
            media_cloud_name: env::var("MEDIA_CLOUD_NAME").unwrap_or_default(),
            media_api_key: env::var("MEDIA_API_KEY").unwrap_or_default(),
            media_api_secret: env::var("MEDIA_API_SECRET").unwrap_or_default(),
            media_folder: env::var("MEDIA_FOLDER")
                .unwrap_or_else(|_| "szark-social".to_string()),
            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .unwrap_or_else(|_| "5242880".to_string())
                .parse()?,

            max_bio_length: env::var("MAX_BIO_LENGTH")
                .unwrap_or_else(|_| "160".to_string())
                .parse()?,

            rate_limit_requests: env::var("RATE_LIMIT_REQUESTS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// 测试与本地开发用的默认配置，使用内存存储
impl Default for Config {
    fn default() -> Self {
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 5001,
            environment: "development".to_string(),
            log_level: "szark_social=debug,tower_http=debug".to_string(),
            store_backend: StoreBackend::Memory,
            database_url: "http://localhost:8000".to_string(),
            database_namespace: "szark".to_string(),
            database_name: "social".to_string(),
            database_username: "root".to_string(),
            database_password: "root".to_string(),
            auth_jwt_secret: "development-secret".to_string(),
            auth_jwt_public_key: None,
            identity_api_url: "http://localhost:9000".to_string(),
            identity_secret_key: "sk_test".to_string(),
            media_api_url: "http://localhost:9001".to_string(),
            media_cloud_name: "demo".to_string(),
            media_api_key: "key".to_string(),
            media_api_secret: "secret".to_string(),
            media_folder: "szark-social".to_string(),
            max_upload_size: 5 * 1024 * 1024,
            max_bio_length: 160,
            rate_limit_requests: 100,
            cors_allowed_origins: "http://localhost:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("SurrealDB".parse::<StoreBackend>().unwrap(), StoreBackend::Surreal);
        assert!("mongo".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_default_config_is_development() {
        let config = Config::default();
        assert!(config.is_development());
        assert!(!config.is_production());
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.log_level.starts_with("szark_social="));
    }
}
