// 配置加载器
// 处理配置文件加载和环境变量解析

use crate::config::{ConfigValidator, LoggerConfig};
use crate::errors::{LoggerError, Result};
use config::ConfigError;
use dotenvy::dotenv;
use std::sync::OnceLock;
use tracing::{debug, info};

/// 全局配置实例
static CONFIG: OnceLock<LoggerConfig> = OnceLock::new();

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 初始化配置
    pub fn init() -> Result<&'static LoggerConfig> {
        // 加载 .env 文件
        if let Err(e) = dotenv() {
            debug!("无法加载 .env 文件: {}", e);
        }

        let config = LoggerConfig::load().map_err(convert_config_error)?;
        Self::install(config)
    }

    /// 验证并存储一个已构造的配置
    pub fn install(config: LoggerConfig) -> Result<&'static LoggerConfig> {
        ConfigValidator::validate_all(&config).map_err(LoggerError::Validation)?;

        // 存储到全局变量
        CONFIG
            .set(config)
            .map_err(|_| LoggerError::AlreadyInitialized)?;
        let stored = CONFIG
            .get()
            .ok_or_else(|| LoggerError::configuration("配置未初始化"))?;

        info!("配置加载成功");
        info!("日志目录: {}", stored.path);
        info!("最低级别: {}", stored.min_level);

        Ok(stored)
    }

    /// 获取配置，未初始化时返回 None
    pub fn get() -> Option<&'static LoggerConfig> {
        CONFIG.get()
    }

    /// 打印配置摘要
    pub fn print_summary(config: &LoggerConfig) {
        println!("=== Fanlog 配置摘要 ===");
        println!("服务名: {}", config.service_name);
        println!("控制台: {} (美化: {})", config.console, config.beautify_console_log);
        println!("文件日志: {}", config.file);
        println!("日志目录: {}", config.path);
        println!("最低级别: {}", config.min_level);
        println!(
            "滚动: {} MB / {} 天 / {} 个备份 / 压缩: {}",
            config.rotation_max_size_mb, config.max_age_days, config.max_backups, config.compress
        );
        println!("========================");
    }
}

/// 配置错误转换辅助函数
pub fn convert_config_error(err: ConfigError) -> LoggerError {
    LoggerError::configuration(format!("配置错误: {}", err))
}
