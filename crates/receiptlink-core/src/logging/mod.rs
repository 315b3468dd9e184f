//! 日志模块
//!
//! 库内部使用 `log` 门面；可执行程序通过 `tracing-log` 桥接到 `tracing`，
//! 并用这里的日志级别生成默认的 `EnvFilter` 指令。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 日志级别
///
/// 实现了 `PartialOrd` 以便过滤。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    #[default]
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// 获取显示名称
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// 生成 `EnvFilter` 指令，例如 `info,receiptlink_core=info`
    ///
    /// btleplug 与 bluer 在 debug 以下非常啰嗦，最多放到 info。
    pub fn filter_directive(&self) -> String {
        let radio = (*self).min(LogLevel::Info).name();
        format!(
            "{level},receiptlink_core={level},btleplug={radio},bluer={radio}",
            level = self.name()
        )
    }

    /// `-v` 次数叠加到基础级别上
    pub fn raised_by(self, verbosity: u8) -> Self {
        match (self as u8).saturating_add(verbosity) {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ERROR" => Ok(LogLevel::Error),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "TRACE" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(
            LogLevel::Debug.filter_directive(),
            "debug,receiptlink_core=debug,btleplug=info,bluer=info"
        );
        assert_eq!(
            LogLevel::Warn.filter_directive(),
            "warn,receiptlink_core=warn,btleplug=warn,bluer=warn"
        );
    }

    #[test]
    fn test_raised_by() {
        assert_eq!(LogLevel::Info.raised_by(0), LogLevel::Info);
        assert_eq!(LogLevel::Info.raised_by(1), LogLevel::Debug);
        assert_eq!(LogLevel::Warn.raised_by(9), LogLevel::Trace);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
