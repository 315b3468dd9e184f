//! 经典蓝牙 SPP (Serial Port Profile) 传输
//!
//! SPP 只能访问系统已配对的设备，没有实时广播发现。

pub mod rfcomm;

use crate::error::TransportError;

pub use rfcomm::BluezSppProvider;

/// 默认 SPP RFCOMM 通道
pub const DEFAULT_RFCOMM_CHANNEL: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedDevice {
    pub address: String,
    pub name: Option<String>,
}

/// SPP 传输提供者
///
/// 同一时间只持有一条套接字连接，`send`/`disconnect` 作用于该连接。
#[async_trait::async_trait]
pub trait SppProvider: Send + Sync {
    async fn paired_devices(&self) -> Result<Vec<PairedDevice>, TransportError>;

    /// 连接失败返回 `Ok(false)`，只有提供者自身异常才返回 `Err`
    async fn connect(&self, address: &str) -> Result<bool, TransportError>;

    async fn send(&self, bytes: &[u8]) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;

    async fn stop_discovery(&self) -> Result<(), TransportError>;
}
