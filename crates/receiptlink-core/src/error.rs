//! 错误类型
//!
//! 传输提供者的错误在传输会话内部被捕获并映射为 `TransferOutcome::Timeout`，
//! 永远不会穿透 `send` 调用。

use uuid::Uuid;

/// 传输提供者（BLE / SPP）错误
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("No Bluetooth adapters found")]
    NoAdapter,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(Uuid),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("BLE error: {0}")]
    Ble(#[from] btleplug::Error),

    #[error("BlueZ error: {0}")]
    Bluez(#[from] bluer::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 会话层错误（扫描准入、配置读写）
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Print in progress")]
    PrintInProgress,

    #[error("Config IO error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}
