//! GATT service definitions handed to the BLE stack.
//!
//! Only the HID service has behaviour; Battery and Device Information are
//! fixed tables answered from [`StaticValues`].

use uuid::Uuid;

use ble_peripheral_rust::{
    gatt::{
        characteristic::Characteristic,
        descriptor::Descriptor,
        properties::{AttributePermission, CharacteristicProperty},
        service::Service,
    },
    uuid::ShortUuid,
};

use crate::consts::*;
use crate::hid::{HID_INFO, REPORT_MAP};
use crate::store::read_at;
use crate::error::AttResult;

/// Characteristic Presentation Format: uint8, exponent 0, unit percentage
/// (0x27AD), namespace Bluetooth SIG, description 0.
pub const BATTERY_PERCENT_FORMAT: [u8; 7] = [0x04, 0x00, 0xAD, 0x27, 0x01, 0x00, 0x00];

/// PnP ID: vendor source USB-IF, vendor/product/version unassigned.
pub const PNP_ID: [u8; 7] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

pub const MODEL_NUMBER: &str = "LeKeyboard-1";

/// Values of the stateless Battery and Device Information characteristics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticValues {
    pub battery_level: u8,
    pub manufacturer: String,
    pub model: String,
}

impl StaticValues {
    pub fn new(battery_level: u8, manufacturer: impl Into<String>) -> Self {
        Self {
            battery_level,
            manufacturer: manufacturer.into(),
            model: MODEL_NUMBER.to_owned(),
        }
    }

    /// Value for a static characteristic, or `None` if `uuid` is not one.
    pub fn value(&self, uuid: Uuid) -> Option<Vec<u8>> {
        let v = if uuid == Uuid::from_short(UUID_BATTERY_LEVEL) {
            vec![self.battery_level]
        } else if uuid == Uuid::from_short(UUID_MFG_NAME) {
            self.manufacturer.as_bytes().to_vec()
        } else if uuid == Uuid::from_short(UUID_MODEL_NUM) {
            self.model.as_bytes().to_vec()
        } else if uuid == Uuid::from_short(UUID_PNP_ID) {
            PNP_ID.to_vec()
        } else {
            return None;
        };
        Some(v)
    }

    pub fn read(&self, uuid: Uuid, offset: usize) -> Option<AttResult<Vec<u8>>> {
        self.value(uuid).map(|v| read_at(&v, offset))
    }
}

pub fn advertised_services() -> [Uuid; 3] {
    [
        Uuid::from_short(UUID_HID_SERVICE),
        Uuid::from_short(UUID_BAS_SERVICE),
        Uuid::from_short(UUID_DIS_SERVICE),
    ]
}

fn report_reference(report_type: u8) -> Descriptor {
    Descriptor {
        uuid: Uuid::from_short(UUID_REPORT_REF_DESC),
        value: Some(vec![RID_KEYBD, report_type]),
        ..Default::default()
    }
}

/// Keyboard HID service. Mutable values are left empty so every read and
/// write reaches the service adapter.
pub fn build_hid_service() -> Service {
    Service {
        uuid: Uuid::from_short(UUID_HID_SERVICE),
        primary: true,
        characteristics: vec![
            Characteristic {
                uuid: Uuid::from_short(UUID_HID_INFO),
                properties: vec![CharacteristicProperty::Read],
                permissions: vec![AttributePermission::ReadEncryptionRequired],
                value: Some(HID_INFO.to_vec()),
                ..Default::default()
            },
            Characteristic {
                uuid: Uuid::from_short(UUID_HID_REPORT_MAP),
                properties: vec![CharacteristicProperty::Read],
                permissions: vec![AttributePermission::ReadEncryptionRequired],
                value: Some(REPORT_MAP.to_vec()),
                ..Default::default()
            },
            Characteristic {
                uuid: Uuid::from_short(UUID_HID_CONTROL_POINT),
                properties: vec![CharacteristicProperty::WriteWithoutResponse],
                permissions: vec![AttributePermission::WriteEncryptionRequired],
                ..Default::default()
            },
            Characteristic {
                uuid: Uuid::from_short(UUID_HID_PROTOCOL_MODE),
                properties: vec![
                    CharacteristicProperty::Read,
                    CharacteristicProperty::WriteWithoutResponse,
                ],
                permissions: vec![
                    AttributePermission::ReadEncryptionRequired,
                    AttributePermission::WriteEncryptionRequired,
                ],
                ..Default::default()
            },
            // Input report, Report Reference (1, Input)
            Characteristic {
                uuid: Uuid::from_short(UUID_HID_REPORT),
                properties: vec![
                    CharacteristicProperty::Read,
                    CharacteristicProperty::NotifyEncryptionRequired,
                ],
                permissions: vec![AttributePermission::ReadEncryptionRequired],
                descriptors: vec![report_reference(REPORT_TYPE_INPUT)],
                ..Default::default()
            },
            // Output report, Report Reference (1, Output). Read requests from
            // the stack carry only the characteristic UUID, which this shares
            // with the input report, so reads of 0x2A4D resolve to the input
            // report. The LED state stays readable through 0x2A32.
            Characteristic {
                uuid: Uuid::from_short(UUID_HID_REPORT),
                properties: vec![
                    CharacteristicProperty::Read,
                    CharacteristicProperty::Write,
                    CharacteristicProperty::WriteWithoutResponse,
                ],
                permissions: vec![
                    AttributePermission::ReadEncryptionRequired,
                    AttributePermission::WriteEncryptionRequired,
                ],
                descriptors: vec![report_reference(REPORT_TYPE_OUTPUT)],
                ..Default::default()
            },
            Characteristic {
                uuid: Uuid::from_short(UUID_BOOT_KEYBOARD_INPUT),
                properties: vec![
                    CharacteristicProperty::Read,
                    CharacteristicProperty::NotifyEncryptionRequired,
                ],
                permissions: vec![AttributePermission::ReadEncryptionRequired],
                ..Default::default()
            },
            Characteristic {
                uuid: Uuid::from_short(UUID_BOOT_KEYBOARD_OUTPUT),
                properties: vec![
                    CharacteristicProperty::Read,
                    CharacteristicProperty::Write,
                    CharacteristicProperty::WriteWithoutResponse,
                ],
                permissions: vec![
                    AttributePermission::ReadEncryptionRequired,
                    AttributePermission::WriteEncryptionRequired,
                ],
                ..Default::default()
            },
        ],
    }
}

pub fn build_battery_service(level: u8) -> Service {
    Service {
        uuid: Uuid::from_short(UUID_BAS_SERVICE),
        primary: true,
        characteristics: vec![Characteristic {
            uuid: Uuid::from_short(UUID_BATTERY_LEVEL),
            properties: vec![CharacteristicProperty::Read],
            permissions: vec![AttributePermission::Readable],
            value: Some(vec![level]),
            descriptors: vec![Descriptor {
                uuid: Uuid::from_short(UUID_PRESENTATION_FORMAT_DESC),
                value: Some(BATTERY_PERCENT_FORMAT.to_vec()),
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

pub fn build_device_info_service(values: &StaticValues) -> Service {
    let read_only = |uuid: u16, value: Vec<u8>| Characteristic {
        uuid: Uuid::from_short(uuid),
        properties: vec![CharacteristicProperty::Read],
        permissions: vec![AttributePermission::Readable],
        value: Some(value),
        ..Default::default()
    };
    Service {
        uuid: Uuid::from_short(UUID_DIS_SERVICE),
        primary: true,
        characteristics: vec![
            read_only(UUID_MFG_NAME, values.manufacturer.as_bytes().to_vec()),
            read_only(UUID_MODEL_NUM, values.model.as_bytes().to_vec()),
            read_only(UUID_PNP_ID, PNP_ID.to_vec()),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hid_service_has_two_report_characteristics_with_distinct_references() {
        let svc = build_hid_service();
        let refs: Vec<_> = svc
            .characteristics
            .iter()
            .filter(|c| c.uuid == Uuid::from_short(UUID_HID_REPORT))
            .map(|c| c.descriptors[0].value.clone())
            .collect();
        assert_eq!(refs, [Some(vec![1, 1]), Some(vec![1, 2])]);
    }

    #[test]
    fn static_values_answer_reads() {
        let v = StaticValues::new(77, "Olly");
        assert_eq!(v.read(Uuid::from_short(UUID_BATTERY_LEVEL), 0), Some(Ok(vec![77])));
        assert_eq!(v.read(Uuid::from_short(UUID_MFG_NAME), 1), Some(Ok(b"lly".to_vec())));
        assert!(v.read(Uuid::from_short(UUID_PNP_ID), 8).unwrap().is_err());
        assert_eq!(v.read(Uuid::from_short(UUID_HID_REPORT), 0), None);
    }
}
