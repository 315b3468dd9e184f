//! 传输模块
//!
//! BLE 与 SPP 两条写入路径共享同一 `TransportSession` 能力：
//! 准入由 `PrintPermit` 证明，结果统一为 `TransferOutcome`，
//! 分片、节流与重试常量由各自实现决定。

pub mod ble;
pub mod spp;

use crate::device::TransportKind;
use crate::session::{PrintPermit, TransferOutcome};
use std::time::Duration;

pub use ble::BleTransferSession;
pub use spp::SppTransferSession;

/// 单次发送的可选覆盖参数，未设置时使用配置值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub chunk_size: Option<usize>,
    pub inter_chunk_delay: Option<Duration>,
}

impl SendOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_inter_chunk_delay(mut self, delay: Duration) -> Self {
        self.inter_chunk_delay = Some(delay);
        self
    }
}

/// 把缓冲区切成定长分片，最后一片可能较短
pub fn chunks(bytes: &[u8], chunk_size: usize) -> std::slice::Chunks<'_, u8> {
    bytes.chunks(chunk_size.max(1))
}

#[async_trait::async_trait]
pub trait TransportSession: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// 执行一次发送；`permit` 在 Printing 应结束时被释放
    async fn transfer(
        &self,
        permit: PrintPermit,
        bytes: &[u8],
        options: &SendOptions,
    ) -> TransferOutcome;
}
