//! 设备记录
//!
//! 发现阶段产生的统一设备句柄，标记其所属传输。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 传输类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Ble,
    Spp,
}

impl TransportKind {
    pub fn name(&self) -> &'static str {
        match self {
            TransportKind::Ble => "BLE",
            TransportKind::Spp => "SPP",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ble" => Ok(TransportKind::Ble),
            "spp" | "classic" | "rfcomm" => Ok(TransportKind::Spp),
            other => Err(format!("unknown transport '{other}', expected ble or spp")),
        }
    }
}

/// 提供者内部的不透明设备标识
///
/// BLE 下是 btleplug 的 peripheral id，SPP 下是 MAC 地址。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandle(String);

impl DeviceHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一次发现得到的设备，发现后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    kind: TransportKind,
    address: String,
    name: Option<String>,
    handle: DeviceHandle,
}

impl DeviceRecord {
    pub fn ble(address: impl Into<String>, name: Option<String>, handle: DeviceHandle) -> Self {
        Self {
            kind: TransportKind::Ble,
            address: address.into(),
            name,
            handle,
        }
    }

    /// SPP 设备没有独立句柄，地址即句柄
    pub fn spp(address: impl Into<String>, name: Option<String>) -> Self {
        let address = address.into();
        Self {
            kind: TransportKind::Spp,
            handle: DeviceHandle::new(address.clone()),
            address,
            name,
        }
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    /// 名称缺失时回退到地址
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }

    pub fn matches_address(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }
}
