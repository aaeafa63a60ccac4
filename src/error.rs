//! Attribute-level error taxonomy and its mapping onto ATT status codes.
//!
//! Every failure in the attribute path is local: the adapter turns it into a
//! status code for the central and the service keeps running.

/// Result type alias for attribute operations.
pub type AttResult<T> = std::result::Result<T, AttError>;

/// Errors raised while servicing an attribute read, write or notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AttError {
    /// Read offset points past the end of the value.
    #[error("offset {offset} beyond attribute length {len}")]
    InvalidOffset { offset: usize, len: usize },

    /// Write at a non-zero offset; only whole-value writes are supported.
    #[error("write at offset {offset} not supported")]
    InvalidWriteOffset { offset: usize },

    /// Write payload does not match the fixed attribute length.
    #[error("payload length {got} does not match attribute length {expected}")]
    InvalidLength { expected: usize, got: usize },

    /// Payload has the right shape but carries a value the profile rejects.
    #[error("unsupported value")]
    UnsupportedValue,

    /// Attribute is declared write-only.
    #[error("attribute is not readable")]
    ReadNotPermitted,

    /// Attribute is declared read-only.
    #[error("attribute is not writable")]
    WriteNotPermitted,

    /// The transport failed to accept the response or notification.
    #[error("transport write failed")]
    TransportWriteFailure,
}

/// ATT protocol status codes returned to the central.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttStatus {
    Success = 0x00,
    ReadNotPermitted = 0x02,
    RequestNotSupported = 0x06,
    InvalidOffset = 0x07,
    UnlikelyError = 0x0E,
}

impl AttStatus {
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl AttError {
    pub const fn status(&self) -> AttStatus {
        match self {
            AttError::InvalidOffset { .. } | AttError::InvalidWriteOffset { .. } => {
                AttStatus::InvalidOffset
            }
            AttError::InvalidLength { .. }
            | AttError::UnsupportedValue
            | AttError::WriteNotPermitted => AttStatus::RequestNotSupported,
            AttError::ReadNotPermitted => AttStatus::ReadNotPermitted,
            AttError::TransportWriteFailure => AttStatus::UnlikelyError,
        }
    }
}

impl<T> From<&AttResult<T>> for AttStatus {
    fn from(r: &AttResult<T>) -> Self {
        match r {
            Ok(_) => AttStatus::Success,
            Err(e) => e.status(),
        }
    }
}
