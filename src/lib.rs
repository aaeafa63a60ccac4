//! BLE HID-over-GATT keyboard peripheral.
//!
//! The keyboard service ([`service::KeyboardService`]) holds all protocol
//! state and is driven by two sides: key events from [`input`] or [`ui`], and
//! attribute requests from the BLE stack via [`ble`].

pub mod ble;
pub mod consts;
pub mod error;
pub mod hid;
pub mod host_power;
pub mod input;
pub mod protocol;
pub mod service;
pub mod services;
pub mod store;
pub mod ui;

pub use error::{AttError, AttStatus};
pub use input::KeyEvent;
pub use service::{AttributeId, KeyboardService, Notification};
