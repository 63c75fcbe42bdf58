use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

/// 用户记录
/// `following` / `followers` 只能通过关注服务成对修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub clerk_id: String, // 身份服务用户ID
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub location: String,
    pub profile_picture: String,
    pub banner_image: String,
    pub following: BTreeSet<String>,
    pub followers: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建用户时的字段，id 与时间戳由存储分配
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub clerk_id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: String,
}

/// 关系集合字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationField {
    Following,
    Followers,
}

impl RelationField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationField::Following => "following",
            RelationField::Followers => "followers",
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 50))]
    pub first_name: Option<String>,

    #[validate(length(max = 50))]
    pub last_name: Option<String>,

    pub bio: Option<String>,

    #[validate(length(max = 100))]
    pub location: Option<String>,
}

/// 写入存储的资料变更
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner_image: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.location.is_none()
            && self.profile_picture.is_none()
            && self.banner_image.is_none()
    }
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            bio: req.bio,
            location: req.location,
            profile_picture: None,
            banner_image: None,
        }
    }
}

/// 关注列表中展示的用户摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: String,
}

impl User {
    pub fn from_new(id: String, new_user: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id,
            clerk_id: new_user.clerk_id,
            email: new_user.email,
            username: new_user.username,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            bio: String::new(),
            location: String::new(),
            profile_picture: new_user.profile_picture,
            banner_image: String::new(),
            following: BTreeSet::new(),
            followers: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_following(&self, user_id: &str) -> bool {
        self.following.contains(user_id)
    }

    pub fn apply_changes(&mut self, changes: ProfileChanges, now: DateTime<Utc>) {
        if let Some(v) = changes.first_name {
            self.first_name = v;
        }
        if let Some(v) = changes.last_name {
            self.last_name = v;
        }
        if let Some(v) = changes.bio {
            self.bio = v;
        }
        if let Some(v) = changes.location {
            self.location = v;
        }
        if let Some(v) = changes.profile_picture {
            self.profile_picture = v;
        }
        if let Some(v) = changes.banner_image {
            self.banner_image = v;
        }
        self.updated_at = now;
    }

    pub fn relation_mut(&mut self, field: RelationField) -> &mut BTreeSet<String> {
        match field {
            RelationField::Following => &mut self.following,
            RelationField::Followers => &mut self.followers,
        }
    }

    pub fn to_summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}
