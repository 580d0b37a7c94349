// 错误处理模块
// 定义日志系统的错误类型

pub mod types;


pub use types::*;
