//! BLE Client - 基于 btleplug 的 GATT 传输提供者
//!
//! 流程:
//! 1. 按 peripheral id 或地址查找目标设备
//! 2. 连接并发现服务
//! 3. 以 write-without-response 写入选定特征
//! 4. 断开连接

use crate::ble::{BleAdvertisement, BleProvider, CharacteristicRef, GattCharacteristic, GattService};
use crate::device::DeviceHandle;
use crate::error::TransportError;
use btleplug::api::{Central, CharPropFlags, Characteristic, Manager as _, Peripheral, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral as PlatformPeripheral};
use futures_util::stream::BoxStream;

pub struct BtleplugProvider {
    adapter: Adapter,
}

impl BtleplugProvider {
    pub async fn new() -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters.into_iter().next().ok_or(TransportError::NoAdapter)?;

        Ok(Self { adapter })
    }

    async fn find_device(&self, handle: &DeviceHandle) -> Result<PlatformPeripheral, TransportError> {
        let peripherals = self.adapter.peripherals().await?;

        for peripheral in peripherals {
            if peripheral.id().to_string() == handle.as_str() {
                return Ok(peripheral);
            }
            // 句柄也可能是用户直接给出的 MAC 地址
            if let Some(props) = peripheral.properties().await? {
                if props.address.to_string().eq_ignore_ascii_case(handle.as_str()) {
                    return Ok(peripheral);
                }
            }
        }

        Err(TransportError::DeviceNotFound(handle.to_string()))
    }

    fn find_characteristic(
        peripheral: &PlatformPeripheral,
        target: &CharacteristicRef,
    ) -> Result<Characteristic, TransportError> {
        peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == target.service && c.uuid == target.characteristic)
            .ok_or(TransportError::CharacteristicNotFound(target.characteristic))
    }
}

#[async_trait::async_trait]
impl BleProvider for BtleplugProvider {
    async fn scan(&self) -> Result<BoxStream<'static, BleAdvertisement>, TransportError> {
        crate::ble::scanner::advertisement_stream(&self.adapter).await
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.adapter.stop_scan().await?;
        Ok(())
    }

    async fn connect(&self, handle: &DeviceHandle) -> Result<(), TransportError> {
        let peripheral = self.find_device(handle).await?;
        tracing::info!("Connecting to {}", handle);
        peripheral.connect().await?;
        Ok(())
    }

    async fn discover_services(
        &self,
        handle: &DeviceHandle,
    ) -> Result<Vec<GattService>, TransportError> {
        let peripheral = self.find_device(handle).await?;
        tracing::info!("Discovering services...");
        peripheral.discover_services().await?;

        let services = peripheral
            .services()
            .into_iter()
            .map(|service| GattService {
                uuid: service.uuid,
                characteristics: service
                    .characteristics
                    .into_iter()
                    .map(|c| GattCharacteristic {
                        uuid: c.uuid,
                        can_write: c
                            .properties
                            .intersects(CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE),
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();

        log::debug!("Discovered {} service(s) on {}", services.len(), handle);
        Ok(services)
    }

    async fn write(
        &self,
        handle: &DeviceHandle,
        target: &CharacteristicRef,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        let peripheral = self.find_device(handle).await?;
        let characteristic = Self::find_characteristic(&peripheral, target)?;
        peripheral
            .write(&characteristic, bytes, WriteType::WithoutResponse)
            .await?;
        Ok(())
    }

    async fn disconnect(&self, handle: &DeviceHandle) -> Result<(), TransportError> {
        let peripheral = self.find_device(handle).await?;
        if peripheral.is_connected().await? {
            peripheral.disconnect().await?;
        }
        Ok(())
    }
}
