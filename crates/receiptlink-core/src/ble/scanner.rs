//! BLE Scanner - 把 btleplug 的 CentralEvent 转换为广播事件流
//!
//! 打印机通常不广播特定服务 UUID，因此扫描不加过滤，
//! 由调用方按名称/地址挑选设备。
//!
//! 适配器缓存中已有的设备（扫描开始前已发现的）会先于实时事件输出。

use crate::ble::BleAdvertisement;
use crate::device::DeviceHandle;
use crate::error::TransportError;
use btleplug::api::{Central, CentralEvent, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Peripheral};
use futures_util::stream::{self, BoxStream, StreamExt};
use log::{debug, trace};

pub(crate) async fn advertisement_stream(
    adapter: &Adapter,
) -> Result<BoxStream<'static, BleAdvertisement>, TransportError> {
    let events = adapter.events().await?;
    adapter.start_scan(ScanFilter::default()).await?;

    let mut cached = Vec::new();
    for peripheral in adapter.peripherals().await? {
        if let Some(adv) = parse_advertisement(&peripheral).await {
            trace!("Cached peripheral {} ({:?})", adv.address, adv.local_name);
            cached.push(adv);
        }
    }
    debug!("BLE scan started with {} cached peripheral(s)", cached.len());

    let adapter = adapter.clone();
    let live = events.filter_map(move |event| {
        let adapter = adapter.clone();
        async move {
            match event {
                CentralEvent::DeviceDiscovered(id) => {
                    let peripheral = adapter.peripheral(&id).await.ok()?;
                    parse_advertisement(&peripheral).await
                }
                _ => None,
            }
        }
    });

    Ok(stream::iter(cached).chain(live).boxed())
}

async fn parse_advertisement(peripheral: &Peripheral) -> Option<BleAdvertisement> {
    let props = peripheral.properties().await.ok()??;
    Some(BleAdvertisement {
        handle: DeviceHandle::new(peripheral.id().to_string()),
        address: props.address.to_string(),
        local_name: props.local_name,
        rssi: props.rssi,
    })
}
