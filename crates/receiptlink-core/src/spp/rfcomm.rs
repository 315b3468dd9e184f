//! RFCOMM 套接字 - 使用 bluer (BlueZ D-Bus) 实现 SPP 提供者

use crate::error::TransportError;
use crate::spp::{DEFAULT_RFCOMM_CHANNEL, PairedDevice, SppProvider};
use bluer::rfcomm::{SocketAddr, Stream};
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// 标准 SPP 服务类 UUID
const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805f9b34fb);

pub struct BluezSppProvider {
    session: bluer::Session,
    channel: u8,
    stream: Mutex<Option<Stream>>,
}

impl BluezSppProvider {
    pub async fn new() -> Result<Self, TransportError> {
        Self::with_channel(DEFAULT_RFCOMM_CHANNEL).await
    }

    pub async fn with_channel(channel: u8) -> Result<Self, TransportError> {
        let session = bluer::Session::new().await?;
        Ok(Self {
            session,
            channel,
            stream: Mutex::new(None),
        })
    }
}

#[async_trait::async_trait]
impl SppProvider for BluezSppProvider {
    async fn paired_devices(&self) -> Result<Vec<PairedDevice>, TransportError> {
        let adapter = self.session.default_adapter().await?;
        if !adapter.is_powered().await? {
            debug!("Powering on adapter '{}'", adapter.name());
            adapter.set_powered(true).await?;
        }

        let mut devices = Vec::new();
        for addr in adapter.device_addresses().await? {
            let device = adapter.device(addr)?;
            if !device.is_paired().await? {
                continue;
            }

            let uuids = device.uuids().await?.unwrap_or_default();
            debug!(
                "Paired device {}: spp_uuid={}",
                addr,
                uuids.contains(&SPP_UUID)
            );

            devices.push(PairedDevice {
                address: addr.to_string(),
                name: device.name().await?,
            });
        }

        info!("Found {} paired device(s)", devices.len());
        Ok(devices)
    }

    async fn connect(&self, address: &str) -> Result<bool, TransportError> {
        let addr: bluer::Address = address
            .parse()
            .map_err(|_| TransportError::InvalidAddress(address.to_string()))?;

        match Stream::connect(SocketAddr::new(addr, self.channel)).await {
            Ok(stream) => {
                info!("RFCOMM connected to {} (channel {})", address, self.channel);
                *self.stream.lock().await = Some(stream);
                Ok(true)
            }
            Err(e) => {
                warn!("RFCOMM connect to {} failed: {}", address, e);
                Ok(false)
            }
        }
    }

    async fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.lock().await.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("RFCOMM shutdown error (ignored): {}", e);
            }
            info!("RFCOMM disconnected");
        }
        Ok(())
    }

    async fn stop_discovery(&self) -> Result<(), TransportError> {
        // bluer 的发现随 discover_devices 流的生命周期结束；SPP 只读取配对列表，不持有该流
        debug!("SPP discovery stopped");
        Ok(())
    }
}
