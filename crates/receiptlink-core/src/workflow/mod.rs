//! 工作流模块
//!
//! 提供高层 API 封装完整的扫描/打印流程

pub mod discovery;
pub mod printer;

pub use discovery::DiscoverySession;
pub use printer::PrinterSession;
