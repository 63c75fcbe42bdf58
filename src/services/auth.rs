use crate::{config::Config, error::{AppError, Result}};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// 身份服务签发的会话令牌声明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 身份服务用户ID
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub sid: Option<String>, // 会话ID
}

/// 已通过验证的请求身份，由认证中间件放入请求扩展
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub clerk_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityEmail {
    pub email_address: String,
}

/// 身份服务返回的用户资料
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<IdentityEmail>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
}

impl IdentityUser {
    pub fn primary_email(&self) -> Option<&str> {
        self.email_addresses.first().map(|e| e.email_address.as_str())
    }
}

#[derive(Clone)]
pub struct AuthService {
    config: Config,
    http_client: Client,
}

impl AuthService {
    pub async fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config: config.clone(),
            http_client,
        })
    }

    pub fn verify_jwt(&self, token: &str) -> Result<Claims> {
        let (decoding_key, algorithm) = match &self.config.auth_jwt_public_key {
            Some(pem) => (DecodingKey::from_rsa_pem(pem.as_bytes())?, Algorithm::RS256),
            None => (
                DecodingKey::from_secret(self.config.auth_jwt_secret.as_bytes()),
                Algorithm::HS256,
            ),
        };
        let validation = Validation::new(algorithm);

        match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(token_data) => {
                debug!("JWT token verified for user: {}", token_data.claims.sub);
                Ok(token_data.claims)
            }
            Err(e) => {
                warn!("JWT verification failed: {}", e);
                Err(AppError::Authentication("Invalid token".to_string()))
            }
        }
    }

    /// 从身份服务获取用户资料
    pub async fn fetch_identity(&self, clerk_id: &str) -> Result<IdentityUser> {
        let url = format!(
            "{}/v1/users/{}",
            self.config.identity_api_url.trim_end_matches('/'),
            clerk_id
        );
        debug!("Fetching identity for {} from {}", clerk_id, url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.config.identity_secret_key)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<IdentityUser>().await?),
            StatusCode::NOT_FOUND => Err(AppError::not_found("Identity")),
            status => Err(AppError::ExternalService(format!(
                "Identity provider returned {}",
                status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token(secret: &str, sub: &str, exp_offset: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: Utc::now().timestamp() + exp_offset,
            iat: Some(Utc::now().timestamp()),
            sid: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[tokio::test]
    async fn test_verify_jwt() {
        let config = Config::default();
        let service = AuthService::new(&config).await.unwrap();

        let claims = service
            .verify_jwt(&token(&config.auth_jwt_secret, "user_123", 3600))
            .unwrap();
        assert_eq!(claims.sub, "user_123");

        assert!(service.verify_jwt(&token("other-secret", "user_123", 3600)).is_err());
        assert!(service
            .verify_jwt(&token(&config.auth_jwt_secret, "user_123", -3600))
            .is_err());
        assert!(service.verify_jwt("not-a-jwt").is_err());
    }

    #[tokio::test]
    async fn test_fetch_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/user_123"))
            .and(header("authorization", "Bearer sk_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "user_123",
                "email_addresses": [{ "email_address": "jane.doe@example.com" }],
                "first_name": "Jane",
                "last_name": null,
                "image_url": "https://img.example.com/jane.png"
            })))
            .mount(&server)
            .await;

        let config = Config {
            identity_api_url: server.uri(),
            ..Config::default()
        };
        let service = AuthService::new(&config).await.unwrap();

        let identity = service.fetch_identity("user_123").await.unwrap();
        assert_eq!(identity.primary_email(), Some("jane.doe@example.com"));
        assert_eq!(identity.first_name.as_deref(), Some("Jane"));
        assert!(identity.last_name.is_none());

        let err = service.fetch_identity("user_404").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
