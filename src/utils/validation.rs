use crate::error::{AppError, Result};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// 邮箱验证工具函数
pub fn validate_email(email: &str) -> bool {
    validator::validate_email(email)
}

/// 验证邮箱并返回详细错误信息
pub fn validate_email_format(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    if !validator::validate_email(email) {
        return Err(AppError::Validation("Email format is invalid".to_string()));
    }

    if email.len() > 254 {
        return Err(AppError::Validation("Email address is too long".to_string()));
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > 128 {
        return Err(AppError::Validation("Password is too long".to_string()));
    }
    Ok(())
}

/// 验证显示名称格式
pub fn validate_display_name(display_name: &str) -> Result<()> {
    if display_name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    if display_name.chars().count() > 100 {
        return Err(AppError::Validation("Name must be 100 characters or fewer".to_string()));
    }

    Ok(())
}
