//! Protocol mode and host power state.
//!
//! The pair `(ProtocolMode, SuspendState)` decides which input report path is
//! authoritative and whether reports may be generated at all.

use parking_lot::Mutex;

use crate::error::AttError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ProtocolMode {
    #[default]
    Report = 0,
    Boot = 1,
}

impl TryFrom<u8> for ProtocolMode {
    type Error = AttError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(ProtocolMode::Report),
            1 => Ok(ProtocolMode::Boot),
            _ => Err(AttError::UnsupportedValue),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SuspendState {
    #[default]
    Active,
    Suspended,
}

/// HID Control Point commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlPointCommand {
    Suspend = 0,
    ExitSuspend = 1,
}

impl TryFrom<u8> for ControlPointCommand {
    type Error = AttError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(ControlPointCommand::Suspend),
            1 => Ok(ControlPointCommand::ExitSuspend),
            _ => Err(AttError::UnsupportedValue),
        }
    }
}

/// Extracts the single byte of a one-octet command payload.
fn single(data: &[u8]) -> Result<u8, AttError> {
    match data {
        [v] => Ok(*v),
        _ => Err(AttError::UnsupportedValue),
    }
}

#[derive(Debug, Default)]
pub struct ProtocolState {
    mode: Mutex<ProtocolMode>,
    suspend: Mutex<SuspendState>,
}

impl ProtocolState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ProtocolMode {
        *self.mode.lock()
    }

    pub fn suspend_state(&self) -> SuspendState {
        *self.suspend.lock()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspend_state() == SuspendState::Suspended
    }

    /// Applies a Protocol Mode write. Report data is left untouched.
    pub fn set_protocol_mode(&self, data: &[u8]) -> Result<ProtocolMode, AttError> {
        let mode = ProtocolMode::try_from(single(data)?)?;
        let prev = std::mem::replace(&mut *self.mode.lock(), mode);
        if prev != mode {
            tracing::info!(?prev, ?mode, "Protocol mode changed");
        }
        Ok(mode)
    }

    /// Applies a HID Control Point write.
    pub fn handle_control_point(&self, data: &[u8]) -> Result<SuspendState, AttError> {
        let state = match ControlPointCommand::try_from(single(data)?)? {
            ControlPointCommand::Suspend => SuspendState::Suspended,
            ControlPointCommand::ExitSuspend => SuspendState::Active,
        };
        let prev = std::mem::replace(&mut *self.suspend.lock(), state);
        match (prev, state) {
            (SuspendState::Active, SuspendState::Suspended) => tracing::info!("Suspend"),
            (SuspendState::Suspended, SuspendState::Active) => tracing::info!("Exit suspend"),
            _ => tracing::debug!(?state, "Control point write without transition"),
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_report_active() {
        let s = ProtocolState::new();
        assert_eq!(s.mode(), ProtocolMode::Report);
        assert_eq!(s.suspend_state(), SuspendState::Active);
    }

    #[test]
    fn protocol_mode_accepts_zero_and_one_only() {
        let s = ProtocolState::new();
        assert_eq!(s.set_protocol_mode(&[1]), Ok(ProtocolMode::Boot));
        assert_eq!(s.set_protocol_mode(&[2]), Err(AttError::UnsupportedValue));
        assert_eq!(s.set_protocol_mode(&[0, 0]), Err(AttError::UnsupportedValue));
        assert_eq!(s.set_protocol_mode(&[]), Err(AttError::UnsupportedValue));
        assert_eq!(s.mode(), ProtocolMode::Boot);
        assert_eq!(s.set_protocol_mode(&[0]), Ok(ProtocolMode::Report));
    }

    #[test]
    fn control_point_transitions() {
        let s = ProtocolState::new();
        assert_eq!(s.handle_control_point(&[0]), Ok(SuspendState::Suspended));
        assert!(s.is_suspended());
        assert_eq!(s.handle_control_point(&[7]), Err(AttError::UnsupportedValue));
        assert!(s.is_suspended());
        assert_eq!(s.handle_control_point(&[1]), Ok(SuspendState::Active));
        assert!(!s.is_suspended());
    }
}
