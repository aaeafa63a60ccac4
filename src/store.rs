//! Fixed-size attribute buffers with bounds-checked access.
//!
//! Each mutable value owns its own lock, so a reader never observes a
//! partially written buffer and unrelated attributes never contend.

use parking_lot::Mutex;

use crate::error::{AttError, AttResult};

/// Returns `value[offset..]`, supporting continuation reads for values longer
/// than one ATT MTU.
pub fn read_at(value: &[u8], offset: usize) -> AttResult<Vec<u8>> {
    if offset > value.len() {
        return Err(AttError::InvalidOffset {
            offset,
            len: value.len(),
        });
    }
    Ok(value[offset..].to_vec())
}

/// A lockable attribute value of exactly `N` bytes.
#[derive(Debug)]
pub struct Attribute<const N: usize> {
    value: Mutex<[u8; N]>,
}

impl<const N: usize> Attribute<N> {
    pub const fn new(initial: [u8; N]) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }

    pub fn read(&self, offset: usize) -> AttResult<Vec<u8>> {
        read_at(&*self.value.lock(), offset)
    }

    /// Replaces the whole value. Queued (prepare/execute) writes are not
    /// supported, so the payload must be exactly `N` bytes.
    pub fn write(&self, data: &[u8]) -> AttResult<()> {
        let new: [u8; N] = data.try_into().map_err(|_| AttError::InvalidLength {
            expected: N,
            got: data.len(),
        })?;
        *self.value.lock() = new;
        Ok(())
    }

    /// Copy of the current value, taken under the lock.
    pub fn snapshot(&self) -> [u8; N] {
        *self.value.lock()
    }

    /// Runs `f` against the value while holding its lock.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut [u8; N]) -> R) -> R {
        f(&mut self.value.lock())
    }
}

impl<const N: usize> Default for Attribute<N> {
    fn default() -> Self {
        Self::new([0; N])
    }
}
