// 扇出路由
// 根据配置构建控制台与各级别文件输出，并组合成一个扇出写入器

use crate::config::LoggerConfig;
use crate::errors::{LoggerError, Result};
use crate::logging::{
    ConsoleWriter, LevelFilterWriter, Logger, MultiLevelWriter, RotatingFileSink, RotationOptions,
};
use fanlog_common::Level;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

/// 扇出路由器
pub struct FanoutRouter<'a> {
    config: &'a LoggerConfig,
    console_capable: bool,
}

impl<'a> FanoutRouter<'a> {
    /// `console_capable` 表示调用方是否允许输出到控制台
    pub fn new(config: &'a LoggerConfig, console_capable: bool) -> Self {
        Self {
            config,
            console_capable,
        }
    }

    /// 控制台输出是否启用
    pub fn console_enabled(&self) -> bool {
        self.console_capable && self.config.console
    }

    /// 会创建文件输出的级别，从最低级别一直到 fatal
    pub fn active_levels(&self) -> &'static [Level] {
        self.config.file_levels()
    }

    /// 级别文件路径: `<path>/<LEVEL>/<Level>.log`
    pub fn level_path(&self, level: Level) -> PathBuf {
        PathBuf::from(&self.config.path)
            .join(level.dir_name())
            .join(level.file_name())
    }

    /// 构建扇出写入器，文件输出在第一次写入时才打开
    pub fn build_writer(&self) -> MultiLevelWriter {
        let mut writer = MultiLevelWriter::default();

        if self.console_enabled() {
            writer.push(ConsoleWriter::stdout(self.config.beautify_console_log));
        }

        let options = RotationOptions::from_config(self.config);
        for &level in self.active_levels() {
            let sink = RotatingFileSink::new(self.level_path(level), options.clone());
            writer.push(LevelFilterWriter::new(sink, level));
        }

        writer
    }

    /// 使用本机主机名构建记录器
    pub fn build(&self) -> Result<Logger> {
        self.build_with_host(hostname::get)
    }

    /// 使用指定的主机名解析函数构建记录器
    ///
    /// 主机名解析失败时返回错误，不创建任何输出。
    pub fn build_with_host<F>(&self, resolve_host: F) -> Result<Logger>
    where
        F: FnOnce() -> io::Result<OsString>,
    {
        let host = resolve_host().map_err(LoggerError::Hostname)?;
        let host = host.to_string_lossy().into_owned();

        let writer = self.build_writer();

        Ok(Logger::new(writer)
            .with_str(host, self.config.service_name.clone())
            .with_timestamp())
    }
}
