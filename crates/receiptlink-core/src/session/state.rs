//! 会话状态与准入守卫
//!
//! `Idle / Scanning / Printing` 三态由单一 `SessionContext` 持有，
//! 扫描与打印互斥由状态枚举本身保证。检查与状态翻转在同一把锁内完成，
//! 锁从不跨越 await。

use crate::ble::CharacteristicRef;
use crate::device::{DeviceRecord, TransportKind};
use crate::error::SessionError;
use crate::session::TransferOutcome;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Scanning,
    Printing,
}

#[derive(Debug, Default)]
pub struct SessionContext {
    state: SessionState,
    selected: Option<DeviceRecord>,
    characteristic: Option<CharacteristicRef>,
}

/// 进程内唯一的会话守卫，克隆共享同一上下文
#[derive(Debug, Clone, Default)]
pub struct SessionGuard {
    inner: Arc<Mutex<SessionContext>>,
}

impl SessionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionContext> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn selected(&self) -> Option<DeviceRecord> {
        self.lock().selected.clone()
    }

    /// 切换到其他设备时丢弃之前选定的特征
    pub fn select_device(&self, record: DeviceRecord) {
        let mut ctx = self.lock();
        if ctx.selected.as_ref().map(DeviceRecord::address) != Some(record.address()) {
            ctx.characteristic = None;
        }
        ctx.selected = Some(record);
    }

    pub fn select_characteristic(&self, characteristic: CharacteristicRef) {
        self.lock().characteristic = Some(characteristic);
    }

    pub fn chosen_characteristic(&self) -> Option<CharacteristicRef> {
        self.lock().characteristic
    }

    /// 准入一次打印
    ///
    /// `kind` 为 `Some` 时要求选中的设备属于该传输。
    pub fn admit(&self, kind: Option<TransportKind>) -> Result<PrintPermit, TransferOutcome> {
        let mut ctx = self.lock();

        let device = match &ctx.selected {
            Some(device) if kind.is_none_or(|k| k == device.kind()) => device.clone(),
            _ => return Err(TransferOutcome::PrinterNotSelected),
        };
        match ctx.state {
            SessionState::Scanning => return Err(TransferOutcome::ScanInProgress),
            SessionState::Printing => return Err(TransferOutcome::PrintInProgress),
            SessionState::Idle => {}
        }

        ctx.state = SessionState::Printing;
        drop(ctx);

        Ok(PrintPermit {
            guard: self.clone(),
            device,
        })
    }

    pub fn begin_scan(&self) -> Result<(), SessionError> {
        let mut ctx = self.lock();
        if ctx.state == SessionState::Printing {
            return Err(SessionError::PrintInProgress);
        }
        ctx.state = SessionState::Scanning;
        Ok(())
    }

    pub fn end_scan(&self) {
        let mut ctx = self.lock();
        if ctx.state == SessionState::Scanning {
            ctx.state = SessionState::Idle;
        }
    }

    fn end_print(&self) {
        let mut ctx = self.lock();
        if ctx.state == SessionState::Printing {
            ctx.state = SessionState::Idle;
        }
    }
}

/// 打印许可：持有期间状态为 Printing，释放时回到 Idle
#[derive(Debug)]
pub struct PrintPermit {
    guard: SessionGuard,
    device: DeviceRecord,
}

impl PrintPermit {
    pub fn device(&self) -> &DeviceRecord {
        &self.device
    }
}

impl Drop for PrintPermit {
    fn drop(&mut self) {
        self.guard.end_print();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceHandle;

    fn ble_printer() -> DeviceRecord {
        DeviceRecord::ble(
            "11:22:33:44:55:66",
            Some("MPT-II".to_string()),
            DeviceHandle::new("11:22:33:44:55:66"),
        )
    }

    #[test]
    fn test_admit_requires_selection() {
        let guard = SessionGuard::new();
        assert_eq!(
            guard.admit(None).unwrap_err(),
            TransferOutcome::PrinterNotSelected
        );
        assert_eq!(guard.state(), SessionState::Idle);
    }

    #[test]
    fn test_admit_rejects_while_scanning() {
        let guard = SessionGuard::new();
        guard.select_device(ble_printer());
        guard.begin_scan().unwrap();
        assert_eq!(guard.admit(None).unwrap_err(), TransferOutcome::ScanInProgress);
        assert_eq!(guard.state(), SessionState::Scanning);
    }

    #[test]
    fn test_permit_holds_printing_until_dropped() {
        let guard = SessionGuard::new();
        guard.select_device(ble_printer());

        let permit = guard.admit(None).unwrap();
        assert_eq!(guard.state(), SessionState::Printing);
        assert_eq!(guard.admit(None).unwrap_err(), TransferOutcome::PrintInProgress);
        assert!(matches!(
            guard.begin_scan(),
            Err(SessionError::PrintInProgress)
        ));

        drop(permit);
        assert_eq!(guard.state(), SessionState::Idle);
    }

    #[test]
    fn test_admit_checks_transport_kind() {
        let guard = SessionGuard::new();
        guard.select_device(ble_printer());
        assert_eq!(
            guard.admit(Some(TransportKind::Spp)).unwrap_err(),
            TransferOutcome::PrinterNotSelected
        );
        assert!(guard.admit(Some(TransportKind::Ble)).is_ok());
    }

    #[test]
    fn test_end_scan_does_not_clear_printing() {
        let guard = SessionGuard::new();
        guard.select_device(ble_printer());
        let _permit = guard.admit(None).unwrap();
        guard.end_scan();
        assert_eq!(guard.state(), SessionState::Printing);
    }

    #[test]
    fn test_reselecting_other_device_drops_characteristic() {
        let guard = SessionGuard::new();
        guard.select_device(ble_printer());
        guard.select_characteristic(CharacteristicRef::new(
            crate::ble::FALLBACK_SERVICE_UUID,
            crate::ble::FALLBACK_CHAR_UUID,
        ));

        guard.select_device(ble_printer());
        assert!(guard.chosen_characteristic().is_some());

        guard.select_device(DeviceRecord::spp("AA:BB:CC:DD:EE:FF", None));
        assert!(guard.chosen_characteristic().is_none());
    }
}
