use winit::keyboard::KeyCode;

use crate::consts::RID_KEYBD;

/// Input report length: modifiers, reserved, six key slots.
pub const INPUT_REPORT_LEN: usize = 8;
/// Output report length: one LED bitfield.
pub const OUTPUT_REPORT_LEN: usize = 1;
/// Keys tracked at once (6-key rollover).
pub const ROLLOVER: usize = 6;

/// HID Information: HID version 1.1, country 0, no remote wake, not normally connectable.
pub const HID_INFO: [u8; 4] = [0x01, 0x01, 0x00, 0x00];

/// Boot-compatible keyboard report map with LED output, Report ID 1.
pub const REPORT_MAP: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x85, RID_KEYBD, //   Report ID (1)
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    // Modifier byte
    0x19, 0xE0, //   Usage Minimum (Left Ctrl)
    0x29, 0xE7, //   Usage Maximum (Right GUI)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data,Var,Abs)
    // Reserved byte
    0x75, 0x08, //   Report Size (8)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x03, //   Input (Const,Var,Abs)
    // LEDs
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (Num Lock)
    0x29, 0x05, //   Usage Maximum (Kana)
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x91, 0x02, //   Output (Data,Var,Abs)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x03, //   Output (Const,Var,Abs)
    // 6 Keycode array
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x65, //   Logical Maximum (101)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x65, //   Usage Maximum (101)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x06, //   Report Count (6)
    0x81, 0x00, //   Input (Data,Array)
    0xC0, // End Collection
];

pub fn keycode_to_hid(code: KeyCode) -> Option<u8> {
    use KeyCode::*;
    Some(match code {
        KeyA => 0x04,
        KeyB => 0x05,
        KeyC => 0x06,
        KeyD => 0x07,
        KeyE => 0x08,
        KeyF => 0x09,
        KeyG => 0x0A,
        KeyH => 0x0B,
        KeyI => 0x0C,
        KeyJ => 0x0D,
        KeyK => 0x0E,
        KeyL => 0x0F,
        KeyM => 0x10,
        KeyN => 0x11,
        KeyO => 0x12,
        KeyP => 0x13,
        KeyQ => 0x14,
        KeyR => 0x15,
        KeyS => 0x16,
        KeyT => 0x17,
        KeyU => 0x18,
        KeyV => 0x19,
        KeyW => 0x1A,
        KeyX => 0x1B,
        KeyY => 0x1C,
        KeyZ => 0x1D,
        Digit1 => 0x1E,
        Digit2 => 0x1F,
        Digit3 => 0x20,
        Digit4 => 0x21,
        Digit5 => 0x22,
        Digit6 => 0x23,
        Digit7 => 0x24,
        Digit8 => 0x25,
        Digit9 => 0x26,
        Digit0 => 0x27,
        Enter => 0x28,
        Escape => 0x29,
        Backspace => 0x2A,
        Tab => 0x2B,
        Space => 0x2C,
        Minus => 0x2D,
        Equal => 0x2E,
        BracketLeft => 0x2F,
        BracketRight => 0x30,
        Backslash => 0x31,
        Semicolon => 0x33,
        Quote => 0x34,
        Backquote => 0x35,
        Comma => 0x36,
        Period => 0x37,
        Slash => 0x38,
        CapsLock => 0x39,
        F1 => 0x3A,
        F2 => 0x3B,
        F3 => 0x3C,
        F4 => 0x3D,
        F5 => 0x3E,
        F6 => 0x3F,
        F7 => 0x40,
        F8 => 0x41,
        F9 => 0x42,
        F10 => 0x43,
        F11 => 0x44,
        F12 => 0x45,
        PrintScreen => 0x46,
        ScrollLock => 0x47,
        Pause => 0x48,
        Insert => 0x49,
        Home => 0x4A,
        PageUp => 0x4B,
        Delete => 0x4C,
        End => 0x4D,
        PageDown => 0x4E,
        ArrowRight => 0x4F,
        ArrowLeft => 0x50,
        ArrowDown => 0x51,
        ArrowUp => 0x52,
        NumLock => 0x53,
        NumpadDivide => 0x54,
        NumpadMultiply => 0x55,
        NumpadSubtract => 0x56,
        NumpadAdd => 0x57,
        NumpadEnter => 0x58,
        Numpad1 => 0x59,
        Numpad2 => 0x5A,
        Numpad3 => 0x5B,
        Numpad4 => 0x5C,
        Numpad5 => 0x5D,
        Numpad6 => 0x5E,
        Numpad7 => 0x5F,
        Numpad8 => 0x60,
        Numpad9 => 0x61,
        Numpad0 => 0x62,
        NumpadDecimal => 0x63,
        IntlBackslash => 0x64,
        ControlLeft => 0xE0,
        ShiftLeft => 0xE1,
        AltLeft => 0xE2,
        SuperLeft => 0xE3,
        ControlRight => 0xE4,
        ShiftRight => 0xE5,
        AltRight => 0xE6,
        SuperRight => 0xE7,
        _ => return None,
    })
}

/// Maps a Linux input key code (`KEY_*` in `input-event-codes.h`) to a HID usage.
pub fn evdev_to_hid(code: u16) -> Option<u8> {
    Some(match code {
        1 => 0x29,  // ESC
        2..=10 => 0x1E + (code - 2) as u8, // 1..9
        11 => 0x27, // 0
        12 => 0x2D, // MINUS
        13 => 0x2E, // EQUAL
        14 => 0x2A, // BACKSPACE
        15 => 0x2B, // TAB
        16 => 0x14, // Q
        17 => 0x1A, // W
        18 => 0x08, // E
        19 => 0x15, // R
        20 => 0x17, // T
        21 => 0x1C, // Y
        22 => 0x18, // U
        23 => 0x0C, // I
        24 => 0x12, // O
        25 => 0x13, // P
        26 => 0x2F, // LEFTBRACE
        27 => 0x30, // RIGHTBRACE
        28 => 0x28, // ENTER
        29 => 0xE0, // LEFTCTRL
        30 => 0x04, // A
        31 => 0x16, // S
        32 => 0x07, // D
        33 => 0x09, // F
        34 => 0x0A, // G
        35 => 0x0B, // H
        36 => 0x0D, // J
        37 => 0x0E, // K
        38 => 0x0F, // L
        39 => 0x33, // SEMICOLON
        40 => 0x34, // APOSTROPHE
        41 => 0x35, // GRAVE
        42 => 0xE1, // LEFTSHIFT
        43 => 0x31, // BACKSLASH
        44 => 0x1D, // Z
        45 => 0x1B, // X
        46 => 0x06, // C
        47 => 0x19, // V
        48 => 0x05, // B
        49 => 0x11, // N
        50 => 0x10, // M
        51 => 0x36, // COMMA
        52 => 0x37, // DOT
        53 => 0x38, // SLASH
        54 => 0xE5, // RIGHTSHIFT
        55 => 0x55, // KPASTERISK
        56 => 0xE2, // LEFTALT
        57 => 0x2C, // SPACE
        58 => 0x39, // CAPSLOCK
        59..=68 => 0x3A + (code - 59) as u8, // F1..F10
        69 => 0x53, // NUMLOCK
        70 => 0x47, // SCROLLLOCK
        71 => 0x5F, // KP7
        72 => 0x60, // KP8
        73 => 0x61, // KP9
        74 => 0x56, // KPMINUS
        75 => 0x5C, // KP4
        76 => 0x5D, // KP5
        77 => 0x5E, // KP6
        78 => 0x57, // KPPLUS
        79 => 0x59, // KP1
        80 => 0x5A, // KP2
        81 => 0x5B, // KP3
        82 => 0x62, // KP0
        83 => 0x63, // KPDOT
        86 => 0x64, // 102ND
        87 => 0x44, // F11
        88 => 0x45, // F12
        96 => 0x58, // KPENTER
        97 => 0xE4, // RIGHTCTRL
        98 => 0x54, // KPSLASH
        99 => 0x46, // SYSRQ
        100 => 0xE6, // RIGHTALT
        102 => 0x4A, // HOME
        103 => 0x52, // UP
        104 => 0x4B, // PAGEUP
        105 => 0x50, // LEFT
        106 => 0x4F, // RIGHT
        107 => 0x4D, // END
        108 => 0x51, // DOWN
        109 => 0x4E, // PAGEDOWN
        110 => 0x49, // INSERT
        111 => 0x4C, // DELETE
        119 => 0x48, // PAUSE
        125 => 0xE3, // LEFTMETA
        126 => 0xE7, // RIGHTMETA
        _ => return None,
    })
}

pub fn keyboard_usage_to_modifier(usage: u8) -> Option<u8> {
    match usage {
        0xE0 => Some(1 << 0), // LCtrl
        0xE1 => Some(1 << 1), // LShift
        0xE2 => Some(1 << 2), // LAlt
        0xE3 => Some(1 << 3), // LGUI
        0xE4 => Some(1 << 4), // RCtrl
        0xE5 => Some(1 << 5), // RShift
        0xE6 => Some(1 << 6), // RAlt
        0xE7 => Some(1 << 7), // RGUI
        _ => None,
    }
}

/// Held modifiers and the 6-key rollover array.
///
/// Keys occupy slots in press order. Releasing a key compacts the remaining
/// keys to the left without reordering them. A press while all slots are held
/// is dropped without any error state (no phantom report is produced).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyboardState {
    modifiers: u8,
    keys: [u8; ROLLOVER],
}

impl KeyboardState {
    pub const fn new() -> Self {
        Self {
            modifiers: 0,
            keys: [0; ROLLOVER],
        }
    }

    /// Applies a key transition. Returns `true` when the report changed.
    pub fn on_key_event(&mut self, usage: u8, pressed: bool) -> bool {
        if let Some(m) = keyboard_usage_to_modifier(usage) {
            let before = self.modifiers;
            if pressed {
                self.modifiers |= m;
            } else {
                self.modifiers &= !m;
            }
            return before != self.modifiers;
        }
        if usage == 0 {
            return false;
        }
        if pressed {
            self.press(usage)
        } else {
            self.release(usage)
        }
    }

    fn press(&mut self, usage: u8) -> bool {
        if self.keys.contains(&usage) {
            return false;
        }
        match self.keys.iter_mut().find(|k| **k == 0) {
            Some(slot) => {
                *slot = usage;
                true
            }
            None => false,
        }
    }

    fn release(&mut self, usage: u8) -> bool {
        let Some(i) = self.keys.iter().position(|&k| k == usage) else {
            return false;
        };
        self.keys.copy_within(i + 1.., i);
        self.keys[ROLLOVER - 1] = 0;
        true
    }

    pub const fn modifiers(&self) -> u8 {
        self.modifiers
    }

    pub const fn keys(&self) -> [u8; ROLLOVER] {
        self.keys
    }

    /// Serializes into the boot keyboard input report layout.
    pub fn current_report(&self) -> [u8; INPUT_REPORT_LEN] {
        let mut out = [0u8; INPUT_REPORT_LEN];
        out[0] = self.modifiers;
        out[1] = 0x00; // reserved
        out[2..].copy_from_slice(&self.keys);
        out
    }
}

/// Keyboard LED state carried by the output report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedState(pub u8);

impl LedState {
    pub const NUM_LOCK: u8 = 1 << 0;
    pub const CAPS_LOCK: u8 = 1 << 1;
    pub const SCROLL_LOCK: u8 = 1 << 2;
    pub const COMPOSE: u8 = 1 << 3;
    pub const KANA: u8 = 1 << 4;

    pub const fn num_lock(self) -> bool {
        self.0 & Self::NUM_LOCK != 0
    }

    pub const fn caps_lock(self) -> bool {
        self.0 & Self::CAPS_LOCK != 0
    }

    pub const fn scroll_lock(self) -> bool {
        self.0 & Self::SCROLL_LOCK != 0
    }

    pub const fn compose(self) -> bool {
        self.0 & Self::COMPOSE != 0
    }

    pub const fn kana(self) -> bool {
        self.0 & Self::KANA != 0
    }
}

pub fn decode_output_report(report: [u8; OUTPUT_REPORT_LEN]) -> LedState {
    LedState(report[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: u8 = 0x04;
    const B: u8 = 0x05;
    const C: u8 = 0x06;

    #[test]
    fn release_compacts_in_press_order() {
        let mut kb = KeyboardState::new();
        for k in [A, B, C] {
            assert!(kb.on_key_event(k, true));
        }
        assert!(kb.on_key_event(B, false));
        assert_eq!(kb.keys(), [A, C, 0, 0, 0, 0]);
        assert_eq!(kb.current_report(), [0, 0, A, C, 0, 0, 0, 0]);
    }

    #[test]
    fn seventh_key_is_dropped() {
        let mut kb = KeyboardState::new();
        for k in 0x04..0x0A {
            kb.on_key_event(k, true);
        }
        let before = kb.current_report();
        assert!(!kb.on_key_event(0x0A, true));
        assert_eq!(kb.current_report(), before);
        assert_eq!(&before[2..], &[0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);
    }

    #[test]
    fn modifiers_set_and_clear_bits() {
        let mut kb = KeyboardState::new();
        kb.on_key_event(0xE1, true);
        kb.on_key_event(0xE6, true);
        assert_eq!(kb.modifiers(), 0b0100_0010);
        assert_eq!(kb.keys(), [0; ROLLOVER]);
        kb.on_key_event(0xE1, false);
        assert_eq!(kb.current_report()[0], 0b0100_0000);
        assert!(!kb.on_key_event(0xE1, false));
    }

    #[test]
    fn repeated_press_and_unknown_release_are_noops() {
        let mut kb = KeyboardState::new();
        assert!(kb.on_key_event(A, true));
        assert!(!kb.on_key_event(A, true));
        assert!(!kb.on_key_event(B, false));
        assert_eq!(kb.keys(), [A, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn evdev_codes_map_to_usages() {
        assert_eq!(evdev_to_hid(30), Some(A)); // KEY_A
        assert_eq!(evdev_to_hid(2), Some(0x1E)); // KEY_1
        assert_eq!(evdev_to_hid(11), Some(0x27)); // KEY_0
        assert_eq!(evdev_to_hid(68), Some(0x43)); // KEY_F10
        assert_eq!(evdev_to_hid(42), Some(0xE1)); // KEY_LEFTSHIFT
        assert_eq!(evdev_to_hid(0x110), None); // BTN_LEFT
    }

    #[test]
    fn led_bits_decode() {
        let leds = decode_output_report([LedState::CAPS_LOCK | LedState::KANA]);
        assert!(leds.caps_lock() && leds.kana());
        assert!(!leds.num_lock() && !leds.scroll_lock() && !leds.compose());
    }
}
