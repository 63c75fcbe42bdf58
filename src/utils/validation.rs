use crate::error::{AppError, Result};
use regex::Regex;
use std::sync::OnceLock;

fn username_regex() -> &'static Regex {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    USERNAME.get_or_init(|| Regex::new(r"^[a-z0-9_-]+$").expect("valid username regex"))
}

/// 验证用户名格式
pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(AppError::validation("Username cannot be empty"));
    }

    if username.len() < 3 {
        return Err(AppError::validation("Username must be at least 3 characters"));
    }

    if username.len() > 30 {
        return Err(AppError::validation("Username cannot exceed 30 characters"));
    }

    // 用户名只能包含小写字母、数字、下划线和连字符
    if !username_regex().is_match(username) {
        return Err(AppError::validation(
            "Username may only contain lowercase letters, digits, '_' and '-'",
        ));
    }

    Ok(())
}

/// 将邮箱本地部分等任意文本转换为合法用户名
pub fn sanitize_username(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect::<String>()
        .to_lowercase();

    name.truncate(24);

    if name.is_empty() {
        name = "user".to_string();
    }
    if name.len() < 3 {
        name = format!("user_{}", name);
    }
    name
}

pub fn validate_bio(bio: &str, max_length: usize) -> Result<()> {
    if bio.chars().count() > max_length {
        return Err(AppError::Validation(format!(
            "Bio cannot exceed {} characters",
            max_length
        )));
    }
    Ok(())
}
