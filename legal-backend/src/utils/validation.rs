// src/utils/validation.rs

//! DTO共通のバリデーションルール

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

/// ユーザー名の制約
pub mod uname {
    pub const MIN_LENGTH: u64 = 3;
    pub const MAX_LENGTH: u64 = 50;
}

/// パスワードの制約
pub mod password {
    pub const MIN_LENGTH: u64 = 8;
}

/// ユーザー名の正規表現パターン
pub static UNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid username regex"));

/// ユーザー名の形式をバリデーション
pub fn validate_uname(uname: &str) -> Result<(), ValidationError> {
    if !UNAME_REGEX.is_match(uname) {
        let mut error = ValidationError::new("invalid_username_format");
        error.message = Some(
            "Username may only contain letters, digits, underscores and hyphens".into(),
        );
        return Err(error);
    }
    Ok(())
}

/// パスワードの強度をバリデーション（長さは validator の length で行う）
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_lowercase || !has_uppercase || !has_digit {
        let mut error = ValidationError::new("weak_password");
        error.message = Some("Password must contain at least one lowercase letter, one uppercase letter, and one digit".into());
        return Err(error);
    }

    Ok(())
}
