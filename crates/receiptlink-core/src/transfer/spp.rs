//! SPP 写入路径
//!
//! 系统蓝牙栈重置后 RFCOMM 套接字容易残留，因此连接前总是先断开旧会话并等待稳定；
//! 首次连接失败会清理后再重试一次。发送完成后同步断开再返回结果。

use crate::config::SppTransferConfig;
use crate::device::TransportKind;
use crate::error::TransportError;
use crate::session::{PrintPermit, TransferOutcome};
use crate::spp::SppProvider;
use crate::transfer::{SendOptions, TransportSession, chunks};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

/// 首次失败后只重试一次
const CONNECT_ATTEMPTS: usize = 2;

pub struct SppTransferSession {
    provider: Arc<dyn SppProvider>,
    config: SppTransferConfig,
}

impl SppTransferSession {
    pub fn new(provider: Arc<dyn SppProvider>, config: SppTransferConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &SppTransferConfig {
        &self.config
    }

    async fn best_effort_disconnect(&self) {
        if let Err(e) = self.provider.disconnect().await {
            debug!("SPP disconnect failed (ignored): {}", e);
        }
    }

    /// 断开可能残留的会话并等待系统蓝牙栈稳定
    async fn reset(&self) {
        self.best_effort_disconnect().await;
        time::sleep(self.config.settle_delay()).await;
    }

    async fn connect_with_retry(&self, address: &str) -> bool {
        for attempt in 1..=CONNECT_ATTEMPTS {
            self.reset().await;
            match self.provider.connect(address).await {
                Ok(true) => return true,
                Ok(false) => warn!("SPP connect to {} failed (attempt {})", address, attempt),
                Err(e) => warn!(
                    "SPP connect to {} failed (attempt {}): {}",
                    address, attempt, e
                ),
            }
        }
        false
    }

    async fn run(
        &self,
        address: &str,
        bytes: &[u8],
        chunk_size: usize,
        delay: Duration,
    ) -> Result<(), TransportError> {
        if !self.connect_with_retry(address).await {
            return Err(TransportError::ConnectionFailed(address.to_string()));
        }

        // 系统报告已连接的套接字未必立即可写
        time::sleep(self.config.post_connect_delay()).await;

        let total = bytes.len().div_ceil(chunk_size);
        info!(
            "Sending {} bytes to {} in {} chunk(s)",
            bytes.len(),
            address,
            total
        );
        for (i, chunk) in chunks(bytes, chunk_size).enumerate() {
            self.provider.send(chunk).await?;
            if i + 1 < total {
                time::sleep(delay).await;
            }
        }

        self.provider.disconnect().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TransportSession for SppTransferSession {
    fn kind(&self) -> TransportKind {
        TransportKind::Spp
    }

    async fn transfer(
        &self,
        permit: PrintPermit,
        bytes: &[u8],
        options: &SendOptions,
    ) -> TransferOutcome {
        let address = permit.device().address().to_string();
        let chunk_size = options
            .chunk_size
            .unwrap_or_else(|| self.config.chunk_size())
            .max(1);
        let delay = options
            .inter_chunk_delay
            .unwrap_or_else(|| self.config.inter_chunk_delay());

        info!(
            "SPP print to {} ({} bytes, chunk={}, delay={:?})",
            permit.device().display_name(),
            bytes.len(),
            chunk_size,
            delay
        );

        let outcome = match self.run(&address, bytes, chunk_size, delay).await {
            Ok(()) => {
                info!("SPP print to {} sent", address);
                TransferOutcome::Success
            }
            Err(e) => {
                warn!("SPP print to {} failed: {}", address, e);
                self.best_effort_disconnect().await;
                TransferOutcome::Timeout
            }
        };

        drop(permit);

        // 避免调用方立即重试造成紧密的重连循环
        time::sleep(self.config.cooldown()).await;
        outcome
    }
}
