use crate::{
    config::Config,
    error::{AppError, Result},
    models::media::{ImageUpload, UploadedImage},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// 媒体托管客户端，图片存储与转码由外部服务负责
#[derive(Clone)]
pub struct MediaService {
    config: Config,
    http_client: Client,
}

impl MediaService {
    pub async fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config: config.clone(),
            http_client,
        })
    }

    /// 对按键排序的参数签名：`k1=v1&k2=v2` 拼接密钥后取 SHA-256
    pub fn sign(params: &[(&str, String)], secret: &str) -> String {
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let joined = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hasher.update(secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn validate(&self, upload: &ImageUpload) -> Result<()> {
        if !upload.content_type.starts_with("image/") {
            return Err(AppError::FileUpload(format!(
                "Unsupported content type: {}",
                upload.content_type
            )));
        }
        if upload.data.is_empty() {
            return Err(AppError::FileUpload("Empty file".to_string()));
        }
        if upload.data.len() > self.config.max_upload_size {
            return Err(AppError::FileUpload(format!(
                "File exceeds {} bytes",
                self.config.max_upload_size
            )));
        }
        Ok(())
    }

    pub async fn upload_image(&self, upload: &ImageUpload) -> Result<UploadedImage> {
        self.validate(upload)?;

        let folder = upload.kind.folder(&self.config.media_folder);
        let timestamp = Utc::now().timestamp().to_string();
        let signature = Self::sign(
            &[("folder", folder.clone()), ("timestamp", timestamp.clone())],
            &self.config.media_api_secret,
        );
        let data_uri = format!(
            "data:{};base64,{}",
            upload.content_type,
            STANDARD.encode(&upload.data)
        );

        let url = format!(
            "{}/v1_1/{}/image/upload",
            self.config.media_api_url.trim_end_matches('/'),
            self.config.media_cloud_name
        );
        debug!("Uploading {} bytes to {} ({})", upload.data.len(), url, folder);

        let response = self
            .http_client
            .post(&url)
            .form(&[
                ("file", data_uri.as_str()),
                ("folder", folder.as_str()),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.config.media_api_key.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalService(format!(
                "Media host returned {}",
                status
            )));
        }

        let uploaded: UploadedImage = response.json().await?;
        info!("Uploaded image {} to {}", uploaded.public_id, folder);
        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::ImageKind;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn upload(content_type: &str, data: Vec<u8>) -> ImageUpload {
        ImageUpload {
            kind: ImageKind::ProfilePicture,
            content_type: content_type.to_string(),
            data,
        }
    }

    #[test]
    fn test_sign_is_order_independent() {
        let a = MediaService::sign(&[("timestamp", "1".into()), ("folder", "f".into())], "s");
        let b = MediaService::sign(&[("folder", "f".into()), ("timestamp", "1".into())], "s");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, MediaService::sign(&[("folder", "f".into())], "s"));
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_input() {
        let config = Config {
            max_upload_size: 4,
            ..Config::default()
        };
        let service = MediaService::new(&config).await.unwrap();

        assert!(service.validate(&upload("image/png", vec![1, 2, 3])).is_ok());
        assert!(service.validate(&upload("text/plain", vec![1])).is_err());
        assert!(service.validate(&upload("image/png", vec![])).is_err());
        assert!(service.validate(&upload("image/png", vec![0; 5])).is_err());
    }

    #[tokio::test]
    async fn test_upload_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/upload"))
            .and(body_string_contains("folder=szark-social%2Fprofiles"))
            .and(body_string_contains("signature_algorithm=sha256"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "secure_url": "https://cdn.example.com/szark-social/profiles/abc.png",
                "public_id": "szark-social/profiles/abc",
                "bytes": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = Config {
            media_api_url: server.uri(),
            ..Config::default()
        };
        let service = MediaService::new(&config).await.unwrap();

        let uploaded = service
            .upload_image(&upload("image/png", vec![1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(uploaded.public_id, "szark-social/profiles/abc");
        assert!(uploaded.secure_url.starts_with("https://"));
    }

    #[tokio::test]
    async fn test_upload_image_host_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = Config {
            media_api_url: server.uri(),
            ..Config::default()
        };
        let service = MediaService::new(&config).await.unwrap();

        let err = service
            .upload_image(&upload("image/jpeg", vec![9]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
    }
}
