//! Receiptlink Core Library
//!
//! 通过蓝牙把已编码的小票字节流可靠地送到打印机。
//! 支持两种互斥的传输：BLE GATT 特征写入与经典蓝牙 SPP (RFCOMM) 套接字。
//!
//! # 模块
//!
//! - **ble**: BLE 提供者接口、btleplug 实现、特征解析
//! - **spp**: SPP 提供者接口、bluer RFCOMM 实现
//! - **session**: Idle/Scanning/Printing 守卫与发送结果
//! - **transfer**: 分片、节流、超时与重试
//! - **workflow**: 设备发现与打印会话
//!
//! # 使用示例
//!
//! ```ignore
//! use receiptlink_core::{BluezSppProvider, BtleplugProvider, PrinterSession, PrinterSettings};
//!
//! let settings = PrinterSettings::load();
//! let ble = Arc::new(BtleplugProvider::new().await?);
//! let spp = Arc::new(BluezSppProvider::new().await?);
//! let session = PrinterSession::new(ble, spp, &settings);
//!
//! // 1. 扫描
//! session.start_scan(settings.scan_timeout(), None)?;
//! let mut results = session.results();
//! results.changed().await?;
//!
//! // 2. 选择设备
//! session.select_device(results.borrow()[0].clone());
//!
//! // 3. 发送
//! let outcome = session.send(&ticket, SendOptions::default()).await;
//! ```

pub mod ble;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod session;
pub mod spp;
pub mod transfer;
pub mod workflow;

// BLE re-exports
pub use ble::{
    BleAdvertisement, BleProvider, BtleplugProvider, CharacteristicRef, FALLBACK_CHAR_UUID,
    FALLBACK_SERVICE_UUID, GattCharacteristic, GattService,
};

// SPP re-exports
pub use spp::{BluezSppProvider, PairedDevice, SppProvider};

pub use config::{BleTransferConfig, PrinterSettings, SppTransferConfig};
pub use device::{DeviceHandle, DeviceRecord, TransportKind};
pub use error::{SessionError, TransportError};
pub use logging::LogLevel;
pub use session::{SessionGuard, SessionState, TransferOutcome};
pub use transfer::{SendOptions, TransportSession};
pub use workflow::{DiscoverySession, PrinterSession};
