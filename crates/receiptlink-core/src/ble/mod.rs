pub mod client;
pub mod gatt;
pub mod scanner;

use crate::device::DeviceHandle;
use crate::error::TransportError;
use futures_util::stream::BoxStream;
use uuid::Uuid;

pub use client::BtleplugProvider;
pub use gatt::{CharacteristicResolution, resolve_characteristic, writable_characteristics};

/// 未枚举到可写特征时使用的默认服务（常见热敏打印机）
pub const FALLBACK_SERVICE_UUID: Uuid = Uuid::from_u128(0x000018f0_0000_1000_8000_00805f9b34fb);
/// 默认服务下的默认写特征
pub const FALLBACK_CHAR_UUID: Uuid = Uuid::from_u128(0x00002af1_0000_1000_8000_00805f9b34fb);

/// 一次 BLE 广播事件
#[derive(Debug, Clone, PartialEq)]
pub struct BleAdvertisement {
    pub handle: DeviceHandle,
    pub address: String,
    pub local_name: Option<String>,
    pub rssi: Option<i16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattCharacteristic {
    pub uuid: Uuid,
    pub can_write: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    pub uuid: Uuid,
    pub characteristics: Vec<GattCharacteristic>,
}

/// 服务 + 特征，唯一定位一个写入端点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CharacteristicRef {
    pub service: Uuid,
    pub characteristic: Uuid,
}

impl CharacteristicRef {
    pub fn new(service: Uuid, characteristic: Uuid) -> Self {
        Self {
            service,
            characteristic,
        }
    }
}

impl std::fmt::Display for CharacteristicRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.service, self.characteristic)
    }
}

impl std::str::FromStr for CharacteristicRef {
    type Err = String;

    /// 格式: `<service-uuid>/<characteristic-uuid>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (service, characteristic) = s
            .split_once('/')
            .ok_or_else(|| format!("expected <service>/<characteristic>, got '{s}'"))?;
        let service = Uuid::parse_str(service.trim()).map_err(|e| e.to_string())?;
        let characteristic = Uuid::parse_str(characteristic.trim()).map_err(|e| e.to_string())?;
        Ok(Self::new(service, characteristic))
    }
}

/// BLE 传输提供者
///
/// 扫描、GATT 连接、服务发现与特征写入都由提供者完成，
/// 会话层只负责编排与节流。
#[async_trait::async_trait]
pub trait BleProvider: Send + Sync {
    /// 开始扫描，返回广播事件流；丢弃流即取消订阅
    async fn scan(&self) -> Result<BoxStream<'static, BleAdvertisement>, TransportError>;

    async fn stop_scan(&self) -> Result<(), TransportError>;

    async fn connect(&self, handle: &DeviceHandle) -> Result<(), TransportError>;

    async fn discover_services(
        &self,
        handle: &DeviceHandle,
    ) -> Result<Vec<GattService>, TransportError>;

    /// 无响应写入 (write without response)
    async fn write(
        &self,
        handle: &DeviceHandle,
        target: &CharacteristicRef,
        bytes: &[u8],
    ) -> Result<(), TransportError>;

    async fn disconnect(&self, handle: &DeviceHandle) -> Result<(), TransportError>;
}
