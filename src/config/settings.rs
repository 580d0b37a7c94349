// 日志系统设置
// 定义配置结构体和加载逻辑

use config::{Config, ConfigError, Environment, File};
use fanlog_common::Level;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 配置文件中的驼峰键（不区分大小写）与字段名的对应关系
const KEY_ALIASES: &[(&str, &str)] = &[
    ("beautifyconsolelog", "beautify_console_log"),
    ("minlevel", "min_level"),
    ("rotationmaxsizemb", "rotation_max_size_mb"),
    ("maxagedays", "max_age_days"),
    ("maxbackups", "max_backups"),
    ("servicename", "service_name"),
    ("capturetracing", "capture_tracing"),
];

/// 日志配置
///
/// 初始化时传入一次，之后不再修改。
/// 字段同时接受驼峰名（如 `minLevel`）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// 启用控制台输出
    pub console: bool,
    /// 控制台使用美化格式，否则输出原始 JSON 行
    #[serde(alias = "beautifyConsoleLog")]
    pub beautify_console_log: bool,
    /// 启用级别文件输出
    pub file: bool,
    /// 级别子目录所在的根目录
    pub path: String,
    /// 最低级别: trace/debug/info/warn/error/fatal，其他值不创建文件输出
    #[serde(alias = "minLevel")]
    pub min_level: String,
    /// 单个文件达到该大小（MB）后滚动
    #[serde(alias = "rotationMaxSizeMB")]
    pub rotation_max_size_mb: u64,
    /// 滚动文件保留天数
    #[serde(alias = "maxAgeDays")]
    pub max_age_days: u64,
    /// 滚动文件保留个数
    #[serde(alias = "maxBackups")]
    pub max_backups: usize,
    /// 压缩滚动文件
    pub compress: bool,
    /// 以主机名为键写入每条记录的服务名
    #[serde(alias = "serviceName")]
    pub service_name: String,
    /// 初始化时把 tracing 事件接入扇出输出
    #[serde(alias = "captureTracing")]
    pub capture_tracing: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            console: true,
            beautify_console_log: true,
            file: true,
            path: "./logs".to_string(),
            min_level: "info".to_string(),
            rotation_max_size_mb: 100,
            max_age_days: 28,
            max_backups: 10,
            compress: false,
            service_name: env!("CARGO_PKG_NAME").to_string(),
            capture_tracing: false,
        }
    }
}

impl LoggerConfig {
    /// 从默认值、配置文件和环境变量加载配置
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("fanlog.toml")
    }

    /// 从指定配置文件加载，文件不存在时跳过
    pub fn load_from(file: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // 1. 加载默认配置
        builder = builder.add_source(Config::try_from(&LoggerConfig::default())?);

        // 2. 尝试加载配置文件
        let file = file.as_ref();
        if file.exists() {
            builder = builder.add_source(Self::file_source(file)?);
        }

        // 3. 加载环境变量（优先级最高）
        builder = builder.add_source(
            Environment::with_prefix("FANLOG")
                .prefix_separator("_")
                .separator("__"),
        );

        builder.build()?.try_deserialize()
    }

    /// 读取配置文件，并把驼峰键统一成字段名
    fn file_source(file: &Path) -> Result<Config, ConfigError> {
        let table: HashMap<String, config::Value> = Config::builder()
            .add_source(File::from(file))
            .build()?
            .try_deserialize()?;

        let mut builder = Config::builder();
        for (key, value) in table {
            builder = builder.set_override(canonical_key(&key), value)?;
        }
        builder.build()
    }

    /// 解析最低级别，无法识别时返回 None
    pub fn min_level(&self) -> Option<Level> {
        Level::parse(&self.min_level)
    }

    /// 本配置会创建的文件输出级别
    pub fn file_levels(&self) -> &'static [Level] {
        match self.min_level() {
            Some(level) if self.file => level.and_above(),
            _ => &[],
        }
    }
}

fn canonical_key(key: &str) -> String {
    let key = key.to_lowercase();
    KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, field)| field.to_string())
        .unwrap_or(key)
}
