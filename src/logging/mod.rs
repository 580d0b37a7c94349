// 日志系统模块
// 控制台加按级别滚动文件的扇出日志，以及请求上下文字段传递

pub mod writer;
pub mod rotating;
pub mod console;
pub mod logger;
pub mod router;
pub mod setup;
pub mod context;
pub mod bridge;


pub use writer::*;
pub use rotating::*;
pub use console::ConsoleWriter;
pub use logger::{Event, Logger};
pub use router::*;
pub use setup::{
    LoggingSetup, debug, error, event, fatal, info, log, logger_with_identifiers, trace, warn,
};
pub use context::*;
pub use bridge::*;
