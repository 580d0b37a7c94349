// 配置管理模块
// 处理日志配置和环境变量

pub mod settings;
pub mod loader;
pub mod validator;


pub use settings::*;
pub use loader::*;
pub use validator::*;
