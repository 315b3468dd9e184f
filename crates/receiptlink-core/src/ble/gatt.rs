//! GATT 特征解析
//!
//! 从服务枚举结果中挑选写入端点。解析顺序：
//! 1. 调用方已选定且设备上存在的可写特征
//! 2. 启用手动选择时，把候选列表交还给调用方
//! 3. 枚举到的第一个可写特征
//! 4. 默认服务/特征 UUID 对
//! 5. 无法解析

use crate::ble::{CharacteristicRef, GattService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharacteristicResolution {
    Resolved(CharacteristicRef),
    NeedsSelection(Vec<CharacteristicRef>),
    Unresolved,
}

/// 按枚举顺序收集所有可写特征，并标记所属服务
pub fn writable_characteristics(services: &[GattService]) -> Vec<CharacteristicRef> {
    services
        .iter()
        .flat_map(|service| {
            service
                .characteristics
                .iter()
                .filter(|c| c.can_write)
                .map(move |c| CharacteristicRef::new(service.uuid, c.uuid))
        })
        .collect()
}

fn has_characteristic(services: &[GattService], target: &CharacteristicRef) -> bool {
    services.iter().any(|service| {
        service.uuid == target.service
            && service
                .characteristics
                .iter()
                .any(|c| c.uuid == target.characteristic)
    })
}

pub fn resolve_characteristic(
    services: &[GattService],
    chosen: Option<CharacteristicRef>,
    manual_selection: bool,
    fallback: CharacteristicRef,
) -> CharacteristicResolution {
    let candidates = writable_characteristics(services);

    if let Some(chosen) = chosen {
        if candidates.contains(&chosen) {
            return CharacteristicResolution::Resolved(chosen);
        }
        log::debug!("Chosen characteristic {} not present on device", chosen);
    }

    if manual_selection && !candidates.is_empty() {
        return CharacteristicResolution::NeedsSelection(candidates);
    }

    if let Some(first) = candidates.first() {
        return CharacteristicResolution::Resolved(*first);
    }

    if has_characteristic(services, &fallback) {
        return CharacteristicResolution::Resolved(fallback);
    }

    CharacteristicResolution::Unresolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::{FALLBACK_CHAR_UUID, FALLBACK_SERVICE_UUID, GattCharacteristic};
    use uuid::Uuid;

    const SERVICE_A: Uuid = Uuid::from_u128(0x0000_ff00_0000_1000_8000_00805f9b34fb);
    const NOTIFY: Uuid = Uuid::from_u128(0x0000_ff01_0000_1000_8000_00805f9b34fb);
    const WRITE: Uuid = Uuid::from_u128(0x0000_ff02_0000_1000_8000_00805f9b34fb);

    fn fallback() -> CharacteristicRef {
        CharacteristicRef::new(FALLBACK_SERVICE_UUID, FALLBACK_CHAR_UUID)
    }

    fn printer_services() -> Vec<GattService> {
        vec![GattService {
            uuid: SERVICE_A,
            characteristics: vec![
                GattCharacteristic {
                    uuid: NOTIFY,
                    can_write: false,
                },
                GattCharacteristic {
                    uuid: WRITE,
                    can_write: true,
                },
            ],
        }]
    }

    #[test]
    fn test_auto_selects_first_writable() {
        let resolution = resolve_characteristic(&printer_services(), None, false, fallback());
        assert_eq!(
            resolution,
            CharacteristicResolution::Resolved(CharacteristicRef::new(SERVICE_A, WRITE))
        );
    }

    #[test]
    fn test_manual_selection_hands_back_candidates() {
        let resolution = resolve_characteristic(&printer_services(), None, true, fallback());
        assert_eq!(
            resolution,
            CharacteristicResolution::NeedsSelection(vec![CharacteristicRef::new(
                SERVICE_A, WRITE
            )])
        );
    }

    #[test]
    fn test_chosen_characteristic_skips_manual_selection() {
        let chosen = CharacteristicRef::new(SERVICE_A, WRITE);
        let resolution = resolve_characteristic(&printer_services(), Some(chosen), true, fallback());
        assert_eq!(resolution, CharacteristicResolution::Resolved(chosen));
    }

    #[test]
    fn test_fallback_pair_when_nothing_writable() {
        // 某些设备不报告写属性，但默认特征实际可写
        let services = vec![GattService {
            uuid: FALLBACK_SERVICE_UUID,
            characteristics: vec![GattCharacteristic {
                uuid: FALLBACK_CHAR_UUID,
                can_write: false,
            }],
        }];
        let resolution = resolve_characteristic(&services, None, false, fallback());
        assert_eq!(resolution, CharacteristicResolution::Resolved(fallback()));
    }

    #[test]
    fn test_unresolved() {
        let services = vec![GattService {
            uuid: SERVICE_A,
            characteristics: vec![GattCharacteristic {
                uuid: NOTIFY,
                can_write: false,
            }],
        }];
        assert_eq!(
            resolve_characteristic(&services, None, true, fallback()),
            CharacteristicResolution::Unresolved
        );
    }
}
