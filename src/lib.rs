// Fanlog Library
// 分级扇出结构化日志

pub mod config;
pub mod errors;
pub mod logging;

pub use config::{ConfigLoader, LoggerConfig};
pub use errors::{LoggerError, Result};
pub use fanlog_common::Level;
pub use logging::*;
