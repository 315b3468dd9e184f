//! 应用配置和持久化
//!
//! 提供扫描时长、分片大小、节流延迟、超时等设置的存储和读取。

use crate::ble::{CharacteristicRef, FALLBACK_CHAR_UUID, FALLBACK_SERVICE_UUID};
use crate::device::TransportKind;
use crate::error::SessionError;
use crate::logging::LogLevel;
use crate::spp::DEFAULT_RFCOMM_CHANNEL;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// BLE 发送参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BleTransferConfig {
    /// 每次写入的字节数（受 ATT MTU 限制）
    pub chunk_size: usize,
    pub inter_chunk_delay_ms: u64,
    pub connect_timeout_ms: u64,
    /// 整个发送过程的截止时间
    pub overall_timeout_ms: u64,
    /// 成功后延迟断开的时间
    pub teardown_delay_ms: u64,
    pub fallback_service: Uuid,
    pub fallback_characteristic: Uuid,
    /// 是否由调用方手动选择写入特征
    pub manual_characteristic_selection: bool,
}

impl Default for BleTransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: 20,
            inter_chunk_delay_ms: 20,
            connect_timeout_ms: 5_000,
            overall_timeout_ms: 10_000,
            teardown_delay_ms: 3_000,
            fallback_service: FALLBACK_SERVICE_UUID,
            fallback_characteristic: FALLBACK_CHAR_UUID,
            manual_characteristic_selection: false,
        }
    }
}

impl BleTransferConfig {
    pub fn chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    pub fn inter_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.inter_chunk_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_millis(self.overall_timeout_ms)
    }

    pub fn teardown_delay(&self) -> Duration {
        Duration::from_millis(self.teardown_delay_ms)
    }

    pub fn fallback(&self) -> CharacteristicRef {
        CharacteristicRef::new(self.fallback_service, self.fallback_characteristic)
    }
}

/// SPP 发送参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SppTransferConfig {
    pub chunk_size: usize,
    pub inter_chunk_delay_ms: u64,
    /// 连接成功后等待套接字可写的时间
    pub post_connect_delay_ms: u64,
    /// 断开旧连接后等待系统蓝牙栈稳定的时间
    pub settle_delay_ms: u64,
    /// 每次尝试结束后的冷却时间
    pub cooldown_ms: u64,
    pub rfcomm_channel: u8,
}

impl Default for SppTransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            inter_chunk_delay_ms: 20,
            post_connect_delay_ms: 2_000,
            settle_delay_ms: 1_000,
            cooldown_ms: 1_000,
            rfcomm_channel: DEFAULT_RFCOMM_CHANNEL,
        }
    }
}

impl SppTransferConfig {
    pub fn chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    pub fn inter_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.inter_chunk_delay_ms)
    }

    pub fn post_connect_delay(&self) -> Duration {
        Duration::from_millis(self.post_connect_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// 应用设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterSettings {
    /// 扫描窗口（秒）
    pub scan_timeout_secs: u64,
    /// 只扫描某一种传输
    pub transport_filter: Option<TransportKind>,
    pub log_level: LogLevel,
    pub ble: BleTransferConfig,
    pub spp: SppTransferConfig,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            scan_timeout_secs: 10,
            transport_filter: None,
            log_level: LogLevel::Info,
            ble: BleTransferConfig::default(),
            spp: SppTransferConfig::default(),
        }
    }
}

impl PrinterSettings {
    /// 获取配置文件路径
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("receiptlink");
        config_dir.join("settings.toml")
    }

    /// 加载设置（如果文件不存在则使用默认值）
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(settings) => {
                        debug!("Loaded settings from {:?}", path);
                        return settings;
                    }
                    Err(e) => {
                        log::warn!("Failed to parse settings: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read settings file: {}, using defaults", e);
                }
            }
        }
        Self::default()
    }

    /// 保存设置
    pub fn save(&self) -> Result<(), SessionError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = PrinterSettings::default();
        assert_eq!(settings.ble.chunk_size, 20);
        assert_eq!(settings.ble.connect_timeout(), Duration::from_secs(5));
        assert_eq!(settings.ble.overall_timeout(), Duration::from_secs(10));
        assert_eq!(settings.spp.chunk_size, 512);
        assert_eq!(settings.spp.post_connect_delay(), Duration::from_secs(2));
        assert_eq!(settings.scan_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: PrinterSettings = toml::from_str(
            r#"
            transport_filter = "spp"

            [ble]
            chunk_size = 180
            "#,
        )
        .unwrap();

        assert_eq!(settings.transport_filter, Some(TransportKind::Spp));
        assert_eq!(settings.ble.chunk_size, 180);
        assert_eq!(settings.ble.fallback_service, FALLBACK_SERVICE_UUID);
        assert_eq!(settings.spp, SppTransferConfig::default());
    }

    #[test]
    fn test_zero_chunk_size_clamped() {
        let config = SppTransferConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert_eq!(config.chunk_size(), 1);
    }

    #[test]
    fn test_settings_toml_roundtrip() {
        let settings = PrinterSettings {
            log_level: LogLevel::Debug,
            ..Default::default()
        };
        let text = toml::to_string_pretty(&settings).unwrap();
        let parsed: PrinterSettings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }
}
