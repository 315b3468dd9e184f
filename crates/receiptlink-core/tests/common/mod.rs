//! 测试用的内存传输提供者，记录每一次调用

#![allow(dead_code)]

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use receiptlink_core::{
    BleAdvertisement, BleProvider, CharacteristicRef, DeviceHandle, DeviceRecord,
    GattCharacteristic, GattService, PairedDevice, SppProvider, TransportError,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

pub const PRINTER_SERVICE: Uuid = Uuid::from_u128(0x0000_ff00_0000_1000_8000_00805f9b34fb);
pub const PRINTER_NOTIFY: Uuid = Uuid::from_u128(0x0000_ff01_0000_1000_8000_00805f9b34fb);
pub const PRINTER_WRITE: Uuid = Uuid::from_u128(0x0000_ff02_0000_1000_8000_00805f9b34fb);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BleCall {
    Scan,
    StopScan,
    Connect,
    Discover,
    Write(CharacteristicRef, Vec<u8>),
    Disconnect,
}

pub struct MockBle {
    calls: Mutex<Vec<BleCall>>,
    services: Mutex<Vec<GattService>>,
    adv_tx: mpsc::UnboundedSender<BleAdvertisement>,
    adv_rx: Mutex<Option<mpsc::UnboundedReceiver<BleAdvertisement>>>,
    pub scan_fails: AtomicBool,
    pub connect_fails: AtomicBool,
    pub connect_delay: Mutex<Option<Duration>>,
    pub write_delay: Mutex<Option<Duration>>,
    pub write_fails: AtomicBool,
    pub disconnect_delay: Mutex<Option<Duration>>,
    pub stop_scan_delay: Mutex<Option<Duration>>,
}

impl MockBle {
    pub fn new(services: Vec<GattService>) -> Self {
        let (adv_tx, adv_rx) = mpsc::unbounded_channel();
        Self {
            calls: Mutex::new(Vec::new()),
            services: Mutex::new(services),
            adv_tx,
            adv_rx: Mutex::new(Some(adv_rx)),
            scan_fails: AtomicBool::new(false),
            connect_fails: AtomicBool::new(false),
            connect_delay: Mutex::new(None),
            write_delay: Mutex::new(None),
            write_fails: AtomicBool::new(false),
            disconnect_delay: Mutex::new(None),
            stop_scan_delay: Mutex::new(None),
        }
    }

    /// 一个带可写特征的典型打印机
    pub fn printer() -> Self {
        Self::new(vec![GattService {
            uuid: PRINTER_SERVICE,
            characteristics: vec![
                GattCharacteristic {
                    uuid: PRINTER_NOTIFY,
                    can_write: false,
                },
                GattCharacteristic {
                    uuid: PRINTER_WRITE,
                    can_write: true,
                },
            ],
        }])
    }

    pub fn advertise(&self, address: &str, name: Option<&str>) {
        let _ = self.adv_tx.send(BleAdvertisement {
            handle: DeviceHandle::new(format!("hci0/{address}")),
            address: address.to_string(),
            local_name: name.map(str::to_string),
            rssi: Some(-60),
        });
    }

    pub fn calls(&self) -> Vec<BleCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &BleCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn connects(&self) -> usize {
        self.count(&BleCall::Connect)
    }

    pub fn disconnects(&self) -> usize {
        self.count(&BleCall::Disconnect)
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BleCall::Write(_, bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: BleCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl BleProvider for MockBle {
    async fn scan(&self) -> Result<BoxStream<'static, BleAdvertisement>, TransportError> {
        self.record(BleCall::Scan);
        if self.scan_fails.load(Ordering::SeqCst) {
            return Err(TransportError::NoAdapter);
        }
        match self.adv_rx.lock().unwrap().take() {
            Some(rx) => Ok(UnboundedReceiverStream::new(rx).boxed()),
            None => Ok(stream::pending().boxed()),
        }
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.record(BleCall::StopScan);
        let delay = *self.stop_scan_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn connect(&self, _handle: &DeviceHandle) -> Result<(), TransportError> {
        self.record(BleCall::Connect);
        let delay = *self.connect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.connect_fails.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed("mock".to_string()));
        }
        Ok(())
    }

    async fn discover_services(
        &self,
        _handle: &DeviceHandle,
    ) -> Result<Vec<GattService>, TransportError> {
        self.record(BleCall::Discover);
        Ok(self.services.lock().unwrap().clone())
    }

    async fn write(
        &self,
        _handle: &DeviceHandle,
        target: &CharacteristicRef,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.write_fails.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.record(BleCall::Write(*target, bytes.to_vec()));
        Ok(())
    }

    async fn disconnect(&self, _handle: &DeviceHandle) -> Result<(), TransportError> {
        self.record(BleCall::Disconnect);
        let delay = *self.disconnect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SppCall {
    PairedDevices,
    Connect(String),
    Send(Vec<u8>),
    Disconnect,
    StopDiscovery,
}

pub struct MockSpp {
    calls: Mutex<Vec<SppCall>>,
    paired: Mutex<Vec<PairedDevice>>,
    /// 依次弹出的连接结果，耗尽后使用 `connect_default`
    connect_results: Mutex<VecDeque<bool>>,
    pub connect_default: AtomicBool,
    pub send_fails: AtomicBool,
    pub paired_fails: AtomicBool,
}

impl MockSpp {
    pub fn new(paired: Vec<PairedDevice>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            paired: Mutex::new(paired),
            connect_results: Mutex::new(VecDeque::new()),
            connect_default: AtomicBool::new(true),
            send_fails: AtomicBool::new(false),
            paired_fails: AtomicBool::new(false),
        }
    }

    pub fn with_connect_results(self, results: &[bool]) -> Self {
        self.connect_results.lock().unwrap().extend(results);
        self
    }

    pub fn calls(&self) -> Vec<SppCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SppCall::Connect(_)))
            .count()
    }

    pub fn sends(&self) -> Vec<Vec<u8>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SppCall::Send(bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SppCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl SppProvider for MockSpp {
    async fn paired_devices(&self) -> Result<Vec<PairedDevice>, TransportError> {
        self.record(SppCall::PairedDevices);
        if self.paired_fails.load(Ordering::SeqCst) {
            return Err(TransportError::NoAdapter);
        }
        Ok(self.paired.lock().unwrap().clone())
    }

    async fn connect(&self, address: &str) -> Result<bool, TransportError> {
        self.record(SppCall::Connect(address.to_string()));
        let next = self.connect_results.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.connect_default.load(Ordering::SeqCst)))
    }

    async fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.send_fails.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.record(SppCall::Send(bytes.to_vec()));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.record(SppCall::Disconnect);
        Ok(())
    }

    async fn stop_discovery(&self) -> Result<(), TransportError> {
        self.record(SppCall::StopDiscovery);
        Ok(())
    }
}

pub fn ble_printer() -> DeviceRecord {
    DeviceRecord::ble(
        "11:22:33:44:55:66",
        Some("MPT-II".to_string()),
        DeviceHandle::new("hci0/11:22:33:44:55:66"),
    )
}

pub fn spp_printer() -> DeviceRecord {
    DeviceRecord::spp("AA:BB:CC:DD:EE:FF", Some("POS-58".to_string()))
}

pub fn ticket(len: usize) -> Vec<u8> {
    (0..=255u8).cycle().take(len).collect()
}
