//! HID-over-GATT keyboard service state and its attribute read/write surface.
//!
//! [`KeyboardService`] owns every mutable attribute, the rollover state and the
//! protocol state machine. The BLE stack binding calls [`KeyboardService::handle_read`]
//! and [`KeyboardService::handle_write`] for central requests, and the input
//! side calls [`KeyboardService::on_key_event`]. Notifications are returned as
//! snapshots so the caller sends them with no service lock held.

use parking_lot::Mutex;

use crate::consts::*;
use crate::error::{AttError, AttResult, AttStatus};
use crate::hid::{
    HID_INFO, INPUT_REPORT_LEN, KeyboardState, LedState, OUTPUT_REPORT_LEN, REPORT_MAP,
    decode_output_report,
};
use crate::input::KeyEvent;
use crate::protocol::{ProtocolMode, ProtocolState, SuspendState};
use crate::store::{Attribute, read_at};

const INPUT_REPORT_REF: [u8; 2] = [RID_KEYBD, REPORT_TYPE_INPUT];
const OUTPUT_REPORT_REF: [u8; 2] = [RID_KEYBD, REPORT_TYPE_OUTPUT];

/// Every attribute of the keyboard service the adapter answers for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeId {
    HidInformation,
    ReportMap,
    ControlPoint,
    ProtocolMode,
    InputReport,
    InputClientConfig,
    InputReportReference,
    OutputReport,
    OutputReportReference,
    BootInputReport,
    BootClientConfig,
    BootOutputReport,
}

/// Sink for a read response. Mirrors the stack's response writer, which may
/// fail while streaming the value back.
pub trait ResponseWriter {
    fn write(&mut self, data: &[u8]) -> AttResult<()>;
}

impl ResponseWriter for Vec<u8> {
    fn write(&mut self, data: &[u8]) -> AttResult<()> {
        self.extend_from_slice(data);
        Ok(())
    }
}

/// An input report ready to be sent to the subscribed central.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Notification {
    pub mode: ProtocolMode,
    pub value: [u8; INPUT_REPORT_LEN],
}

impl Notification {
    /// Characteristic carrying the report for the active protocol mode.
    pub const fn characteristic(&self) -> u16 {
        match self.mode {
            ProtocolMode::Report => UUID_HID_REPORT,
            ProtocolMode::Boot => UUID_BOOT_KEYBOARD_INPUT,
        }
    }
}

#[derive(Debug, Default)]
pub struct KeyboardService {
    protocol: ProtocolState,
    keys: Mutex<KeyboardState>,
    input_report: Attribute<INPUT_REPORT_LEN>,
    output_report: Attribute<OUTPUT_REPORT_LEN>,
    input_cccd: Attribute<2>,
    boot_cccd: Attribute<2>,
}

impl KeyboardService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol_mode(&self) -> ProtocolMode {
        self.protocol.mode()
    }

    pub fn suspend_state(&self) -> SuspendState {
        self.protocol.suspend_state()
    }

    /// Last generated input report.
    pub fn current_report(&self) -> [u8; INPUT_REPORT_LEN] {
        self.input_report.snapshot()
    }

    /// LED state last written by the central.
    pub fn leds(&self) -> LedState {
        decode_output_report(self.output_report.snapshot())
    }

    pub fn read(&self, attr: AttributeId, offset: usize) -> AttResult<Vec<u8>> {
        use AttributeId::*;
        match attr {
            HidInformation => read_at(&HID_INFO, offset),
            ReportMap => read_at(REPORT_MAP, offset),
            ControlPoint => Err(AttError::ReadNotPermitted),
            AttributeId::ProtocolMode => read_at(&[self.protocol.mode() as u8], offset),
            InputReport | BootInputReport => self.input_report.read(offset),
            OutputReport | BootOutputReport => self.output_report.read(offset),
            InputClientConfig => self.input_cccd.read(offset),
            BootClientConfig => self.boot_cccd.read(offset),
            InputReportReference => read_at(&INPUT_REPORT_REF, offset),
            OutputReportReference => read_at(&OUTPUT_REPORT_REF, offset),
        }
    }

    /// Whole-value write. Offsets other than zero are rejected.
    pub fn write(&self, attr: AttributeId, offset: usize, data: &[u8]) -> AttResult<()> {
        use AttributeId::*;
        if offset != 0 {
            return Err(AttError::InvalidWriteOffset { offset });
        }
        match attr {
            AttributeId::ProtocolMode => self.protocol.set_protocol_mode(data).map(drop),
            ControlPoint => self.protocol.handle_control_point(data).map(drop),
            OutputReport | BootOutputReport => {
                self.output_report.write(data)?;
                tracing::debug!(leds = ?self.leds(), "Output report updated");
                Ok(())
            }
            InputClientConfig => write_cccd(&self.input_cccd, data),
            BootClientConfig => write_cccd(&self.boot_cccd, data),
            HidInformation | ReportMap | InputReport | InputReportReference
            | OutputReportReference | BootInputReport => Err(AttError::WriteNotPermitted),
        }
    }

    /// Services a read request, streaming the value into `w`.
    pub fn handle_read(
        &self,
        attr: AttributeId,
        offset: usize,
        w: &mut impl ResponseWriter,
    ) -> AttStatus {
        let res = self
            .read(attr, offset)
            .and_then(|value| w.write(&value).map_err(|_| AttError::TransportWriteFailure));
        if let Err(e) = &res {
            tracing::warn!(?attr, %offset, error = %e, "Read rejected");
        } else {
            tracing::debug!(?attr, %offset, "Read");
        }
        AttStatus::from(&res)
    }

    pub fn handle_write(&self, attr: AttributeId, offset: usize, data: &[u8]) -> AttStatus {
        let res = self.write(attr, offset, data);
        if let Err(e) = &res {
            tracing::warn!(?attr, %offset, ?data, error = %e, "Write rejected");
        } else {
            tracing::debug!(?attr, ?data, "Write");
        }
        AttStatus::from(&res)
    }

    /// Mirrors a subscription change from the stack into the matching
    /// Client Characteristic Configuration value.
    pub fn set_notifications(&self, attr: AttributeId, enabled: bool) -> AttStatus {
        let value = if enabled { CCCD_NOTIFY } else { 0 };
        self.handle_write(attr, 0, &value.to_le_bytes())
    }

    /// Feeds one key transition through the rollover state.
    ///
    /// Returns the notification to send, if the report changed, the active
    /// path has notifications enabled and the host is not suspended. While
    /// suspended the rollover state keeps tracking the keys but the stored
    /// report keeps its last value; the first event after resume publishes
    /// the accumulated state.
    pub fn on_key_event(&self, ev: KeyEvent) -> Option<Notification> {
        // Held across generation and publication so reports leave in event order.
        let mut keys = self.keys.lock();
        keys.on_key_event(ev.usage, ev.pressed);
        if self.protocol.is_suspended() {
            tracing::trace!(?ev, "Suspended, report not published");
            return None;
        }
        let report = keys.current_report();
        if report == self.input_report.snapshot() {
            return None;
        }
        self.input_report.with(|v| *v = report);
        tracing::trace!(
            mods = %format!("{:#010b}", report[0]),
            keys = ?&report[2..],
            "Input report"
        );
        self.notification_for(report)
    }

    fn notification_for(&self, value: [u8; INPUT_REPORT_LEN]) -> Option<Notification> {
        let mode = self.protocol.mode();
        let cccd = match mode {
            ProtocolMode::Report => &self.input_cccd,
            ProtocolMode::Boot => &self.boot_cccd,
        };
        if u16::from_le_bytes(cccd.snapshot()) & CCCD_NOTIFY == 0 {
            return None;
        }
        if self.protocol.is_suspended() {
            return None;
        }
        Some(Notification { mode, value })
    }
}

fn write_cccd(cccd: &Attribute<2>, data: &[u8]) -> AttResult<()> {
    let raw: [u8; 2] = data.try_into().map_err(|_| AttError::InvalidLength {
        expected: 2,
        got: data.len(),
    })?;
    if u16::from_le_bytes(raw) & !(CCCD_NOTIFY | CCCD_INDICATE) != 0 {
        return Err(AttError::UnsupportedValue);
    }
    cccd.write(&raw)
}
