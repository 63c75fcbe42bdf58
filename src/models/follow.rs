use serde::{Deserialize, Serialize};

/// 一次切换关注产生的状态转换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowTransition {
    Followed,
    Unfollowed,
}

impl FollowTransition {
    pub fn message(&self) -> &'static str {
        match self {
            FollowTransition::Followed => "User followed successfully",
            FollowTransition::Unfollowed => "User unfollowed successfully",
        }
    }
}

/// 对关注边的一次原子修改，两侧集合同时生效
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChange {
    Add,
    Remove,
}

impl From<FollowTransition> for EdgeChange {
    fn from(transition: FollowTransition) -> Self {
        match transition {
            FollowTransition::Followed => EdgeChange::Add,
            FollowTransition::Unfollowed => EdgeChange::Remove,
        }
    }
}

impl FollowTransition {
    /// 只有建立关注边才产生通知
    pub fn emits_notification(&self) -> bool {
        matches!(self, FollowTransition::Followed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleFollowResponse {
    pub transition: FollowTransition,
}
