// Fanlog Common Package
// 日志级别与通用错误定义

pub mod types;
pub mod errors;

pub use types::*;
pub use errors::*;
