//! 打印会话
//!
//! 高层 API 封装完整的打印流程:
//! 1. 扫描并从结果流中选择设备
//! 2. 守卫检查（未选设备 / 扫描中 / 打印中）
//! 3. 按设备的传输类型分派到 BLE 或 SPP 写入路径
//! 4. 返回唯一的 `TransferOutcome`

use crate::ble::{BleProvider, CharacteristicRef};
use crate::config::PrinterSettings;
use crate::device::{DeviceRecord, TransportKind};
use crate::error::SessionError;
use crate::session::{SessionGuard, SessionState, TransferOutcome};
use crate::spp::SppProvider;
use crate::transfer::{BleTransferSession, SendOptions, SppTransferSession, TransportSession};
use crate::workflow::DiscoverySession;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub struct PrinterSession {
    guard: SessionGuard,
    discovery: DiscoverySession,
    ble: BleTransferSession,
    spp: SppTransferSession,
}

impl PrinterSession {
    pub fn new(
        ble: Arc<dyn BleProvider>,
        spp: Arc<dyn SppProvider>,
        settings: &PrinterSettings,
    ) -> Self {
        let guard = SessionGuard::new();
        Self {
            discovery: DiscoverySession::new(Arc::clone(&ble), Arc::clone(&spp), guard.clone()),
            ble: BleTransferSession::new(ble, guard.clone(), settings.ble.clone()),
            spp: SppTransferSession::new(spp, settings.spp.clone()),
            guard,
        }
    }

    pub fn state(&self) -> SessionState {
        self.guard.state()
    }

    pub fn start_scan(
        &self,
        timeout: Duration,
        filter: Option<TransportKind>,
    ) -> Result<(), SessionError> {
        self.discovery.start_scan(timeout, filter)
    }

    pub async fn stop_scan(&self) {
        self.discovery.stop_scan().await;
    }

    pub fn results(&self) -> watch::Receiver<Vec<DeviceRecord>> {
        self.discovery.results()
    }

    pub fn scanning(&self) -> watch::Receiver<bool> {
        self.discovery.scanning()
    }

    pub fn devices(&self) -> Vec<DeviceRecord> {
        self.discovery.devices()
    }

    pub fn select_device(&self, record: DeviceRecord) {
        debug!(
            "Selected {} printer {} ({})",
            record.kind(),
            record.display_name(),
            record.address()
        );
        self.guard.select_device(record);
    }

    pub fn selected_device(&self) -> Option<DeviceRecord> {
        self.guard.selected()
    }

    /// 响应 `NeedsCharacteristicSelection`，之后重新发送即可
    pub fn select_characteristic(&self, characteristic: CharacteristicRef) {
        debug!("Selected characteristic {}", characteristic);
        self.guard.select_characteristic(characteristic);
    }

    fn session_for(&self, kind: TransportKind) -> &dyn TransportSession {
        match kind {
            TransportKind::Ble => &self.ble,
            TransportKind::Spp => &self.spp,
        }
    }

    /// 按选中设备的传输类型发送
    pub async fn send(&self, bytes: &[u8], options: SendOptions) -> TransferOutcome {
        let permit = match self.guard.admit(None) {
            Ok(permit) => permit,
            Err(outcome) => {
                debug!("Send rejected: {}", outcome);
                return outcome;
            }
        };
        if bytes.is_empty() {
            return TransferOutcome::TicketEmpty;
        }

        let session = self.session_for(permit.device().kind());
        session.transfer(permit, bytes, &options).await
    }

    pub async fn print_via_ble(&self, bytes: &[u8], options: SendOptions) -> TransferOutcome {
        self.print_via(TransportKind::Ble, bytes, options).await
    }

    pub async fn print_via_spp(&self, bytes: &[u8], options: SendOptions) -> TransferOutcome {
        self.print_via(TransportKind::Spp, bytes, options).await
    }

    async fn print_via(
        &self,
        kind: TransportKind,
        bytes: &[u8],
        options: SendOptions,
    ) -> TransferOutcome {
        if bytes.is_empty() {
            return TransferOutcome::TicketEmpty;
        }
        let permit = match self.guard.admit(Some(kind)) {
            Ok(permit) => permit,
            Err(outcome) => {
                debug!("{} print rejected: {}", kind, outcome);
                return outcome;
            }
        };
        self.session_for(kind).transfer(permit, bytes, &options).await
    }
}
