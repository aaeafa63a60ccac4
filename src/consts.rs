// Assigned numbers for HID over GATT and the companion services

pub const UUID_HID_SERVICE: u16 = 0x1812;
pub const UUID_BAS_SERVICE: u16 = 0x180F;
pub const UUID_DIS_SERVICE: u16 = 0x180A;

pub const UUID_HID_INFO: u16 = 0x2A4A;
pub const UUID_HID_CONTROL_POINT: u16 = 0x2A4C;
pub const UUID_HID_PROTOCOL_MODE: u16 = 0x2A4E;
pub const UUID_HID_REPORT_MAP: u16 = 0x2A4B;
pub const UUID_HID_REPORT: u16 = 0x2A4D;
pub const UUID_BOOT_KEYBOARD_INPUT: u16 = 0x2A22;
pub const UUID_BOOT_KEYBOARD_OUTPUT: u16 = 0x2A32;

pub const UUID_BATTERY_LEVEL: u16 = 0x2A19;
pub const UUID_MFG_NAME: u16 = 0x2A29;
pub const UUID_MODEL_NUM: u16 = 0x2A24;
pub const UUID_PNP_ID: u16 = 0x2A50;

pub const UUID_REPORT_REF_DESC: u16 = 0x2908;
pub const UUID_PRESENTATION_FORMAT_DESC: u16 = 0x2904;

// Generic Access appearance: HID keyboard (961)
pub const PERIPHERAL_APPEARANCE: u16 = 0x03C1;

// Report IDs / types carried by the Report Reference descriptors
pub const RID_KEYBD: u8 = 0x01;
pub const REPORT_TYPE_INPUT: u8 = 0x01;
pub const REPORT_TYPE_OUTPUT: u8 = 0x02;

// Client Characteristic Configuration bits
pub const CCCD_NOTIFY: u16 = 1 << 0;
pub const CCCD_INDICATE: u16 = 1 << 1;
