//! atrium-bootstrap - 统一服务启动骨架
//!
//! 运行时初始化、基础设施连接与关闭信号

mod infrastructure;
mod retry;
mod runtime;

pub use infrastructure::*;
pub use retry::*;
pub use runtime::*;
