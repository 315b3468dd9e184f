//! 设备发现会话
//!
//! 合并 BLE 实时扫描与 SPP 配对列表，结果与扫描状态通过 `watch` 通道对外发布。
//!
//! - BLE：广播事件逐条到达，每条新设备触发一次结果发布
//! - SPP：开始扫描时读取一次系统配对列表
//! - 超时后自动调用 `stop_scan`
//!
//! 提供者出错不会重试，该传输在本轮扫描中不再贡献设备。

use crate::ble::BleProvider;
use crate::device::{DeviceRecord, TransportKind};
use crate::error::SessionError;
use crate::session::SessionGuard;
use crate::spp::SppProvider;
use futures_util::StreamExt;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct DiscoverySession {
    ble: Arc<dyn BleProvider>,
    spp: Arc<dyn SppProvider>,
    guard: SessionGuard,
    results: Arc<watch::Sender<Vec<DeviceRecord>>>,
    scanning: Arc<watch::Sender<bool>>,
    cancel: Arc<Mutex<Option<CancellationToken>>>,
}

impl DiscoverySession {
    pub fn new(ble: Arc<dyn BleProvider>, spp: Arc<dyn SppProvider>, guard: SessionGuard) -> Self {
        let (results, _) = watch::channel(Vec::new());
        let (scanning, _) = watch::channel(false);
        Self {
            ble,
            spp,
            guard,
            results: Arc::new(results),
            scanning: Arc::new(scanning),
            cancel: Arc::new(Mutex::new(None)),
        }
    }

    /// 累积的发现结果
    pub fn results(&self) -> watch::Receiver<Vec<DeviceRecord>> {
        self.results.subscribe()
    }

    /// 扫描状态
    pub fn scanning(&self) -> watch::Receiver<bool> {
        self.scanning.subscribe()
    }

    pub fn is_scanning(&self) -> bool {
        *self.scanning.borrow()
    }

    pub fn devices(&self) -> Vec<DeviceRecord> {
        self.results.borrow().clone()
    }

    /// 当前一轮扫描的取消令牌；状态翻转都在这把锁内完成
    fn round(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 开始一轮扫描
    ///
    /// 清空上一轮结果；正在扫描时会重新开始计时。打印中返回错误。
    pub fn start_scan(
        &self,
        timeout: Duration,
        filter: Option<TransportKind>,
    ) -> Result<(), SessionError> {
        let token = CancellationToken::new();
        {
            let mut round = self.round();
            self.guard.begin_scan()?;
            if let Some(previous) = round.replace(token.clone()) {
                debug!("Restarting scan window");
                previous.cancel();
            }
            self.results.send_replace(Vec::new());
            self.scanning.send_if_modified(|scanning| !std::mem::replace(scanning, true));
        }

        info!(
            "Starting scan for {} seconds (transport: {})",
            timeout.as_secs(),
            filter.map_or("all", |k| k.name())
        );

        if filter != Some(TransportKind::Spp) {
            tokio::spawn(self.clone().watch_ble(token.clone()));
        }
        if filter != Some(TransportKind::Ble) {
            tokio::spawn(self.clone().fetch_paired(token.clone()));
        }

        let session = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = time::sleep(timeout) => {
                    debug!("Scan window elapsed");
                    session.stop_scan().await;
                }
            }
        });

        Ok(())
    }

    /// 停止扫描，可重复调用
    ///
    /// 等待提供者停止期间若已开始新一轮扫描，则不改动新一轮的状态。
    pub async fn stop_scan(&self) {
        let current = self.round().take();
        let was_scanning = match current {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        };

        if let Err(e) = self.ble.stop_scan().await {
            debug!("BLE stop_scan failed (ignored): {}", e);
        }
        if let Err(e) = self.spp.stop_discovery().await {
            debug!("SPP stop_discovery failed (ignored): {}", e);
        }

        {
            let round = self.round();
            if round.is_some() {
                debug!("Newer scan round started while stopping, leaving it running");
                return;
            }
            self.guard.end_scan();
            self.scanning.send_if_modified(|scanning| std::mem::replace(scanning, false));
        }

        if was_scanning {
            info!("Scan complete: {} device(s)", self.results.borrow().len());
        }
    }

    /// 追加新设备；`always_notify` 为真时即使没有新设备也发布一次
    fn append(&self, token: &CancellationToken, records: Vec<DeviceRecord>, always_notify: bool) {
        self.results.send_if_modified(|list| {
            if token.is_cancelled() {
                return false;
            }
            let mut changed = false;
            for record in records {
                let known = list
                    .iter()
                    .any(|r| r.kind() == record.kind() && r.matches_address(record.address()));
                if !known {
                    debug!(
                        "Discovered {} device: addr={}, name={:?}",
                        record.kind(),
                        record.address(),
                        record.name()
                    );
                    list.push(record);
                    changed = true;
                }
            }
            changed || always_notify
        });
    }

    async fn watch_ble(self, token: CancellationToken) {
        let stream = tokio::select! {
            biased;
            () = token.cancelled() => return,
            stream = self.ble.scan() => stream,
        };
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("BLE scan unavailable: {}", e);
                return;
            }
        };

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                adv = stream.next() => match adv {
                    Some(adv) => {
                        let record = DeviceRecord::ble(adv.address, adv.local_name, adv.handle);
                        self.append(&token, vec![record], false);
                    }
                    None => {
                        debug!("BLE advertisement stream ended");
                        break;
                    }
                },
            }
        }
    }

    async fn fetch_paired(self, token: CancellationToken) {
        let paired = tokio::select! {
            biased;
            () = token.cancelled() => return,
            paired = self.spp.paired_devices() => paired,
        };

        match paired {
            Ok(devices) => {
                let records = devices
                    .into_iter()
                    .map(|d| DeviceRecord::spp(d.address, d.name))
                    .collect();
                self.append(&token, records, true);
            }
            Err(e) => warn!("SPP paired device list unavailable: {}", e),
        }
    }
}
