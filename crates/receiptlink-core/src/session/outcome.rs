use crate::ble::CharacteristicRef;
use serde::Serialize;
use std::fmt;

/// 一次发送尝试的最终结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    Success,
    PrinterNotSelected,
    ScanInProgress,
    PrintInProgress,
    /// 连接失败、特征无法解析、写入异常或整体超时
    Timeout,
    TicketEmpty,
    /// 需要调用方通过 `select_characteristic` 选定写入特征后重新发送
    NeedsCharacteristicSelection { candidates: Vec<CharacteristicRef> },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success)
    }

    pub fn message(&self) -> &'static str {
        match self {
            TransferOutcome::Success => "Print data sent",
            TransferOutcome::PrinterNotSelected => "No printer selected",
            TransferOutcome::ScanInProgress => "Scan in progress",
            TransferOutcome::PrintInProgress => "Print in progress",
            TransferOutcome::Timeout => "Printer timed out",
            TransferOutcome::TicketEmpty => "Ticket is empty",
            TransferOutcome::NeedsCharacteristicSelection { .. } => {
                "Select a characteristic to write to"
            }
        }
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
