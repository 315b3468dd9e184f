//! 会话模块
//!
//! 打印/扫描互斥的共享状态以及发送结果定义。

pub mod outcome;
pub mod state;

pub use outcome::TransferOutcome;
pub use state::{PrintPermit, SessionContext, SessionGuard, SessionState};
