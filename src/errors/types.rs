// 统一错误类型定义

use fanlog_common::CommonError;
use std::io;
use thiserror::Error;

/// 日志系统错误类型
///
/// 只有初始化会返回错误，日志调用本身不返回错误。
#[derive(Debug, Error)]
pub enum LoggerError {
    /// 无法解析本机主机名
    #[error("无法获取主机名: {0}")]
    Hostname(#[source] io::Error),

    /// 重复初始化
    #[error("日志系统已经初始化")]
    AlreadyInitialized,

    /// 配置错误
    #[error("配置错误: {message}")]
    Configuration { message: String },

    /// 配置校验失败
    #[error("配置验证失败: {}", join_errors(.0))]
    Validation(Vec<CommonError>),

    /// 无法安装 tracing 全局订阅器
    #[error("无法安装 tracing 订阅器: {0}")]
    TracingInstall(String),
}

fn join_errors(errors: &[CommonError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl LoggerError {
    /// 获取错误代码
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Hostname(_) => "HOSTNAME_ERROR",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::TracingInstall(_) => "TRACING_INSTALL_ERROR",
        }
    }

    /// 创建配置错误
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<tracing::subscriber::SetGlobalDefaultError> for LoggerError {
    fn from(err: tracing::subscriber::SetGlobalDefaultError) -> Self {
        Self::TracingInstall(err.to_string())
    }
}

/// 日志系统结果类型
pub type Result<T> = std::result::Result<T, LoggerError>;
