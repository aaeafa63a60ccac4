//! Key event sources feeding the keyboard service.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use anyhow::Context;
use tokio::sync::mpsc;

use crate::hid::evdev_to_hid;

const EV_KEY: u16 = 0x01;

/// `struct input_event`: a native `timeval` followed by type, code and value.
const TIMEVAL_LEN: usize = 2 * std::mem::size_of::<usize>();
const INPUT_EVENT_LEN: usize = TIMEVAL_LEN + 8;

/// A key transition in HID usage space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub usage: u8,
    pub pressed: bool,
}

impl KeyEvent {
    pub const fn new(usage: u8, pressed: bool) -> Self {
        Self { usage, pressed }
    }

    /// Converts a raw evdev record. Non-key events, auto-repeat (`value > 1`)
    /// and keys without a HID usage yield `None`.
    pub fn from_evdev(ty: u16, code: u16, value: i32) -> Option<Self> {
        if ty != EV_KEY {
            return None;
        }
        let pressed = match value {
            0 => false,
            1 => true,
            _ => return None,
        };
        Some(Self::new(evdev_to_hid(code)?, pressed))
    }
}

fn parse_input_event(buf: &[u8; INPUT_EVENT_LEN]) -> (u16, u16, i32) {
    let ty = u16::from_ne_bytes([buf[TIMEVAL_LEN], buf[TIMEVAL_LEN + 1]]);
    let code = u16::from_ne_bytes([buf[TIMEVAL_LEN + 2], buf[TIMEVAL_LEN + 3]]);
    let value = i32::from_ne_bytes([
        buf[TIMEVAL_LEN + 4],
        buf[TIMEVAL_LEN + 5],
        buf[TIMEVAL_LEN + 6],
        buf[TIMEVAL_LEN + 7],
    ]);
    (ty, code, value)
}

/// Reads key events from an evdev node (e.g. `/dev/input/event0`) on a
/// dedicated thread and forwards them in occurrence order.
pub fn spawn_evdev_reader(
    path: &Path,
    tx: mpsc::Sender<KeyEvent>,
) -> anyhow::Result<JoinHandle<()>> {
    let dev = File::open(path).with_context(|| format!("open input device {}", path.display()))?;
    let path: PathBuf = path.to_owned();
    tracing::info!(device = %path.display(), "Opened input device");
    let handle = std::thread::Builder::new()
        .name("evdev".into())
        .spawn(move || read_loop(dev, &path, tx))
        .context("spawn evdev reader")?;
    Ok(handle)
}

fn read_loop(mut dev: impl Read, path: &Path, tx: mpsc::Sender<KeyEvent>) {
    let mut buf = [0u8; INPUT_EVENT_LEN];
    loop {
        if let Err(e) = dev.read_exact(&mut buf) {
            tracing::error!(device = %path.display(), error = %e, "Input device read failed");
            return;
        }
        let (ty, code, value) = parse_input_event(&buf);
        let Some(ev) = KeyEvent::from_evdev(ty, code, value) else {
            continue;
        };
        tracing::trace!(?ev, %code, "evdev key");
        if tx.blocking_send(ev).is_err() {
            tracing::debug!("Key event receiver closed");
            return;
        }
    }
}
