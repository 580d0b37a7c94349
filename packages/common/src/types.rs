// 通用类型定义

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 日志级别，按严重程度递增排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// 无法识别的级别名称
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("无法识别的日志级别: {0}")]
pub struct ParseLevelError(pub String);

impl Level {
    /// 全部级别，按严重程度递增
    pub const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    /// 解析级别名称，无法识别时返回 None
    pub fn parse(name: &str) -> Option<Level> {
        match name.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "fatal" => Some(Level::Fatal),
            _ => None,
        }
    }

    /// 写入日志记录 `level` 字段的小写名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }

    /// 级别子目录名，例如 `TRACE`
    pub fn dir_name(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// 级别文件名，例如 `Trace.log`
    pub fn file_name(&self) -> &'static str {
        match self {
            Level::Trace => "Trace.log",
            Level::Debug => "Debug.log",
            Level::Info => "Info.log",
            Level::Warn => "Warn.log",
            Level::Error => "Error.log",
            Level::Fatal => "Fatal.log",
        }
    }

    /// 从当前级别到 fatal 的累积集合
    pub fn and_above(self) -> &'static [Level] {
        &Self::ALL[self as usize..]
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::parse(s).ok_or_else(|| ParseLevelError(s.to_string()))
    }
}
