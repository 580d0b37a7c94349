// 通用错误类型定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 通用错误类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {} ({})", self.code, self.message, details),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for CommonError {}

impl CommonError {
    /// 字段校验错误
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self {
            code: "VALIDATION_ERROR".to_string(),
            message: message.into(),
            details: Some(format!("field: {}", field)),
        }
    }
}
