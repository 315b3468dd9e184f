//! 打印客户端 - 用真实的 BLE / SPP 提供者驱动核心会话

use anyhow::{Context, Result, bail};
use futures_util::StreamExt;
use receiptlink_core::{
    BluezSppProvider, BtleplugProvider, CharacteristicRef, DeviceRecord, PrinterSession,
    PrinterSettings, SendOptions, TransferOutcome, TransportKind,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;

/// 扫描结果的 JSON 输出
#[derive(Serialize)]
struct DeviceJson<'a> {
    kind: TransportKind,
    address: &'a str,
    name: Option<&'a str>,
}

impl<'a> From<&'a DeviceRecord> for DeviceJson<'a> {
    fn from(record: &'a DeviceRecord) -> Self {
        Self {
            kind: record.kind(),
            address: record.address(),
            name: record.name(),
        }
    }
}

pub async fn open_session(settings: &PrinterSettings) -> Result<PrinterSession> {
    let ble = BtleplugProvider::new()
        .await
        .context("Failed to open BLE adapter")?;
    let spp = BluezSppProvider::with_channel(settings.spp.rfcomm_channel)
        .await
        .context("Failed to open BlueZ session")?;
    tracing::debug!(
        "Opened BLE adapter and BlueZ session (RFCOMM channel {})",
        settings.spp.rfcomm_channel
    );
    Ok(PrinterSession::new(Arc::new(ble), Arc::new(spp), settings))
}

fn print_device(index: usize, device: &DeviceRecord) {
    println!(
        "   [{}] {} {} ({})",
        index,
        device.kind(),
        device.display_name(),
        device.address()
    );
}

/// 扫描并实时打印新发现的设备
pub async fn scan(
    session: &PrinterSession,
    timeout: Duration,
    filter: Option<TransportKind>,
    json: bool,
) -> Result<Vec<DeviceRecord>> {
    session.start_scan(timeout, filter)?;

    let mut shown = 0;
    let mut updates = WatchStream::new(session.results());
    let mut scanning = session.scanning();

    loop {
        tokio::select! {
            devices = updates.next() => {
                let Some(devices) = devices else { break };
                if !json {
                    for (i, device) in devices.iter().enumerate().skip(shown) {
                        print_device(i, device);
                    }
                }
                shown = shown.max(devices.len());
            }
            changed = scanning.wait_for(|s| !*s) => {
                changed?;
                break;
            }
        }
    }

    let devices = session.devices();
    if json {
        let out: Vec<DeviceJson> = devices.iter().map(DeviceJson::from).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if devices.is_empty() {
        println!("   未发现设备");
    } else {
        // 扫描结束前最后一批更新
        for (i, device) in devices.iter().enumerate().skip(shown) {
            print_device(i, device);
        }
    }
    Ok(devices)
}

/// 扫描直到目标地址出现（或扫描窗口结束）
async fn find_device(
    session: &PrinterSession,
    address: &str,
    timeout: Duration,
    filter: Option<TransportKind>,
) -> Result<DeviceRecord> {
    session.start_scan(timeout, filter)?;

    let mut results = session.results();
    let mut scanning = session.scanning();
    let found = tokio::select! {
        found = results.wait_for(|devices| devices.iter().any(|d| d.matches_address(address))) => {
            let devices = found?;
            devices.iter().find(|d| d.matches_address(address)).cloned()
        }
        _ = scanning.wait_for(|s| !*s) => None,
    };
    session.stop_scan().await;
    tracing::debug!("Lookup of {} finished: found={}", address, found.is_some());

    match found {
        Some(device) => Ok(device),
        None => bail!("设备 {} 未找到", address),
    }
}

pub struct PrintRequest<'a> {
    pub file: &'a Path,
    pub address: &'a str,
    pub transport: Option<TransportKind>,
    pub characteristic: Option<CharacteristicRef>,
    pub options: SendOptions,
}

pub async fn print(
    session: &PrinterSession,
    settings: &PrinterSettings,
    request: PrintRequest<'_>,
) -> Result<TransferOutcome> {
    let ticket = tokio::fs::read(request.file)
        .await
        .with_context(|| format!("Failed to read {}", request.file.display()))?;

    let filter = request.transport.or(settings.transport_filter);
    let device = find_device(session, request.address, settings.scan_timeout(), filter).await?;
    println!(
        "   目标设备: {} {} ({})",
        device.kind(),
        device.display_name(),
        device.address()
    );

    tracing::info!(
        "Printing {} ({} bytes) to {}",
        request.file.display(),
        ticket.len(),
        device.address()
    );
    session.select_device(device);
    if let Some(characteristic) = request.characteristic {
        session.select_characteristic(characteristic);
    }

    let outcome = match request.transport {
        Some(TransportKind::Ble) => session.print_via_ble(&ticket, request.options).await,
        Some(TransportKind::Spp) => session.print_via_spp(&ticket, request.options).await,
        None => session.send(&ticket, request.options).await,
    };

    tracing::info!("Print outcome: {}", outcome);
    if outcome.is_success() && session.selected_device().map(|d| d.kind()) == Some(TransportKind::Ble) {
        // BLE 成功后连接在后台延迟断开，进程退出前等它完成
        tokio::time::sleep(settings.ble.teardown_delay() + Duration::from_millis(200)).await;
    }

    Ok(outcome)
}
