// 日志系统设置
// 全局记录器只初始化一次，之后所有级别函数读取它

use crate::config::LoggerConfig;
use crate::errors::{LoggerError, Result};
use crate::logging::{Event, FanoutLayer, FanoutRouter, Logger};
use fanlog_common::Level;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

/// 全局记录器
static LOGGER: OnceLock<Logger> = OnceLock::new();

/// 日志系统初始化器
pub struct LoggingSetup;

impl LoggingSetup {
    /// 初始化日志系统
    ///
    /// 只能调用一次，应在启动阶段、产生日志的任务开始之前完成。
    /// 重复调用返回 [`LoggerError::AlreadyInitialized`]。
    /// tracing 桥接安装失败时返回错误，全局记录器保持未初始化。
    pub fn init(config: &LoggerConfig, console_capable: bool) -> Result<()> {
        if LOGGER.get().is_some() {
            return Err(LoggerError::AlreadyInitialized);
        }

        let router = FanoutRouter::new(config, console_capable);
        let logger = router.build()?;

        // 桥接层在事件发出时才读取全局记录器，可以先于记录器安装
        if config.capture_tracing {
            Self::install_tracing_bridge()?;
        }

        LOGGER
            .set(logger)
            .map_err(|_| LoggerError::AlreadyInitialized)?;

        tracing::info!("日志系统初始化完成");
        tracing::info!("最低级别: {}", config.min_level);
        tracing::info!("控制台输出: {}", router.console_enabled());

        if router.active_levels().is_empty() {
            tracing::info!("未启用文件日志");
        } else {
            tracing::info!("文件日志已启用: {}", config.path);
        }

        Ok(())
    }

    /// 把 tracing 事件转发到全局记录器
    fn install_tracing_bridge() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace"));

        let subscriber =
            tracing_subscriber::registry().with(FanoutLayer::global().with_filter(env_filter));
        tracing::subscriber::set_global_default(subscriber)?;

        Ok(())
    }

    /// 是否已经初始化
    pub fn is_initialized() -> bool {
        LOGGER.get().is_some()
    }

    /// 创建开发环境日志配置
    pub fn development_config() -> LoggerConfig {
        LoggerConfig {
            console: true,
            beautify_console_log: true,
            file: false,
            min_level: "trace".to_string(),
            ..LoggerConfig::default()
        }
    }

    /// 创建生产环境日志配置
    pub fn production_config() -> LoggerConfig {
        LoggerConfig {
            console: true,
            beautify_console_log: false,
            file: true,
            path: "./logs".to_string(),
            min_level: "info".to_string(),
            rotation_max_size_mb: 100,
            max_age_days: 30,
            max_backups: 10,
            compress: true,
            ..LoggerConfig::default()
        }
    }

    /// 创建测试环境日志配置
    pub fn test_config() -> LoggerConfig {
        LoggerConfig {
            console: false,
            beautify_console_log: false,
            file: false,
            min_level: "warn".to_string(),
            ..LoggerConfig::default()
        }
    }
}

fn global() -> Option<&'static Logger> {
    LOGGER.get()
}

/// 全局记录器的副本，未初始化时返回不输出的记录器
pub fn log() -> Logger {
    global().cloned().unwrap_or_else(Logger::disabled)
}

/// 指定级别的事件
pub fn event(level: Level) -> Event {
    match global() {
        Some(logger) => logger.event(level),
        None => Logger::disabled().event(level),
    }
}

pub fn trace() -> Event {
    event(Level::Trace)
}

pub fn debug() -> Event {
    event(Level::Debug)
}

pub fn info() -> Event {
    event(Level::Info)
}

pub fn warn() -> Event {
    event(Level::Warn)
}

pub fn error() -> Event {
    event(Level::Error)
}

/// fatal 事件，发出后进程以状态码 1 退出
pub fn fatal() -> Event {
    event(Level::Fatal)
}

/// 派生附带固定标识字段的记录器，不修改全局记录器
pub fn logger_with_identifiers(identifiers: &HashMap<String, String>) -> Logger {
    log().with_fields(identifiers)
}
