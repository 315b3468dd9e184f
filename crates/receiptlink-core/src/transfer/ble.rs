//! BLE 写入路径
//!
//! 流程:
//! 1. 有界超时内连接设备
//! 2. 枚举服务并解析写入特征
//! 3. 按分片无响应写入，分片之间节流（BLE 特征写入没有应用层确认）
//! 4. 成功立即返回，后台延迟断开后才释放 Printing
//!
//! 整体截止时间与第 1-3 步竞争，先完成者决定结果，另一方被丢弃；
//! 失败时在竞争结束后只断开一次。

use crate::ble::{BleProvider, CharacteristicRef, CharacteristicResolution, resolve_characteristic};
use crate::config::BleTransferConfig;
use crate::device::{DeviceHandle, TransportKind};
use crate::session::{PrintPermit, SessionGuard, TransferOutcome};
use crate::transfer::{SendOptions, TransportSession, chunks};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

pub struct BleTransferSession {
    provider: Arc<dyn BleProvider>,
    guard: SessionGuard,
    config: BleTransferConfig,
}

impl BleTransferSession {
    pub fn new(provider: Arc<dyn BleProvider>, guard: SessionGuard, config: BleTransferConfig) -> Self {
        Self {
            provider,
            guard,
            config,
        }
    }

    pub fn config(&self) -> &BleTransferConfig {
        &self.config
    }

    async fn best_effort_disconnect(&self, handle: &DeviceHandle) {
        if let Err(e) = self.provider.disconnect(handle).await {
            debug!("Disconnect from {} failed (ignored): {}", handle, e);
        }
    }

    /// 连接、解析特征并写完所有分片
    ///
    /// 返回 `Err` 时不断开连接，由 `transfer` 在竞争结束后统一断开一次。
    async fn run(
        &self,
        handle: &DeviceHandle,
        bytes: &[u8],
        chunk_size: usize,
        delay: Duration,
    ) -> Result<(), TransferOutcome> {
        match time::timeout(self.config.connect_timeout(), self.provider.connect(handle)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("BLE connect to {} failed: {}", handle, e);
                return Err(TransferOutcome::Timeout);
            }
            Err(_) => {
                warn!(
                    "BLE connect to {} timed out after {:?}",
                    handle,
                    self.config.connect_timeout()
                );
                return Err(TransferOutcome::Timeout);
            }
        }

        let services = match self.provider.discover_services(handle).await {
            Ok(services) => services,
            Err(e) => {
                warn!("Service discovery on {} failed: {}", handle, e);
                return Err(TransferOutcome::Timeout);
            }
        };

        let target = match resolve_characteristic(
            &services,
            self.guard.chosen_characteristic(),
            self.config.manual_characteristic_selection,
            self.config.fallback(),
        ) {
            CharacteristicResolution::Resolved(target) => target,
            CharacteristicResolution::NeedsSelection(candidates) => {
                info!(
                    "{} writable characteristic(s) on {}, waiting for selection",
                    candidates.len(),
                    handle
                );
                return Err(TransferOutcome::NeedsCharacteristicSelection { candidates });
            }
            CharacteristicResolution::Unresolved => {
                warn!("No writable characteristic on {}", handle);
                return Err(TransferOutcome::Timeout);
            }
        };

        if let Err(e) = self.write_chunks(handle, &target, bytes, chunk_size, delay).await {
            warn!("BLE write to {} failed: {}", target, e);
            return Err(TransferOutcome::Timeout);
        }

        Ok(())
    }

    async fn write_chunks(
        &self,
        handle: &DeviceHandle,
        target: &CharacteristicRef,
        bytes: &[u8],
        chunk_size: usize,
        delay: Duration,
    ) -> Result<(), crate::error::TransportError> {
        let total = bytes.len().div_ceil(chunk_size);
        info!(
            "Writing {} bytes to {} in {} chunk(s)",
            bytes.len(),
            target,
            total
        );

        for (i, chunk) in chunks(bytes, chunk_size).enumerate() {
            self.provider.write(handle, target, chunk).await?;
            if i + 1 < total {
                time::sleep(delay).await;
            }
        }
        Ok(())
    }

    /// 成功后的延迟断开，结束时释放 Printing
    fn spawn_teardown(&self, handle: DeviceHandle, permit: PrintPermit) {
        let provider = Arc::clone(&self.provider);
        let delay = self.config.teardown_delay();
        tokio::spawn(async move {
            time::sleep(delay).await;
            if let Err(e) = provider.disconnect(&handle).await {
                debug!("Delayed disconnect from {} failed (ignored): {}", handle, e);
            }
            debug!("BLE session with {} closed", handle);
            drop(permit);
        });
    }
}

#[async_trait::async_trait]
impl TransportSession for BleTransferSession {
    fn kind(&self) -> TransportKind {
        TransportKind::Ble
    }

    async fn transfer(
        &self,
        permit: PrintPermit,
        bytes: &[u8],
        options: &SendOptions,
    ) -> TransferOutcome {
        let handle = permit.device().handle().clone();
        let chunk_size = options
            .chunk_size
            .unwrap_or_else(|| self.config.chunk_size())
            .max(1);
        let delay = options
            .inter_chunk_delay
            .unwrap_or_else(|| self.config.inter_chunk_delay());
        let deadline = self.config.overall_timeout();

        info!(
            "BLE print to {} ({} bytes, chunk={}, delay={:?})",
            permit.device().display_name(),
            bytes.len(),
            chunk_size,
            delay
        );

        let result = tokio::select! {
            result = self.run(&handle, bytes, chunk_size, delay) => result,
            () = time::sleep(deadline) => {
                warn!("BLE print to {} exceeded {:?}, forcing disconnect", handle, deadline);
                Err(TransferOutcome::Timeout)
            }
        };

        match result {
            Ok(()) => {
                info!("BLE print to {} sent", handle);
                self.spawn_teardown(handle, permit);
                TransferOutcome::Success
            }
            Err(outcome) => {
                // 失败路径与截止时间共用这一次断开
                self.best_effort_disconnect(&handle).await;
                drop(permit);
                outcome
            }
        }
    }
}
