use serde::{Deserialize, Serialize};

/// 上传图片的用途，决定媒体托管上的目录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageKind {
    ProfilePicture,
    BannerImage,
}

impl ImageKind {
    pub fn folder(&self, base: &str) -> String {
        match self {
            ImageKind::ProfilePicture => format!("{}/profiles", base),
            ImageKind::BannerImage => format!("{}/banners", base),
        }
    }

    /// multipart 表单中的字段名
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "profilePicture" => Some(ImageKind::ProfilePicture),
            "bannerImage" => Some(ImageKind::BannerImage),
            _ => None,
        }
    }
}

/// 待上传的图片
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub kind: ImageKind,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// 媒体托管返回的上传结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedImage {
    pub secure_url: String,
    pub public_id: String,
}
