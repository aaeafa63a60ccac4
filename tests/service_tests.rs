use std::sync::{Arc, Barrier};
use std::thread;

use lekeyboard::protocol::{ProtocolMode, SuspendState};
use lekeyboard::{AttError, AttStatus, AttributeId, KeyEvent, KeyboardService, Notification};

const A: u8 = 0x04;
const B: u8 = 0x05;
const C: u8 = 0x06;

fn press(s: &KeyboardService, usage: u8) -> Option<Notification> {
    s.on_key_event(KeyEvent::new(usage, true))
}

fn release(s: &KeyboardService, usage: u8) -> Option<Notification> {
    s.on_key_event(KeyEvent::new(usage, false))
}

fn subscribed() -> KeyboardService {
    let s = KeyboardService::new();
    assert_eq!(
        s.handle_write(AttributeId::InputClientConfig, 0, &[0x01, 0x00]),
        AttStatus::Success
    );
    s
}

#[test]
fn input_report_reads_honour_offset() {
    let s = KeyboardService::new();
    press(&s, A);
    press(&s, B);
    let full = s.current_report();
    for off in 0..=full.len() {
        let mut out = Vec::new();
        assert_eq!(s.handle_read(AttributeId::InputReport, off, &mut out), AttStatus::Success);
        assert_eq!(out, &full[off..]);
    }
    for off in full.len() + 1..full.len() + 16 {
        assert_eq!(
            s.read(AttributeId::InputReport, off),
            Err(AttError::InvalidOffset { offset: off, len: 8 })
        );
    }
}

#[test]
fn protocol_mode_write_and_read_back() {
    let s = KeyboardService::new();
    for v in [1u8, 0] {
        assert_eq!(s.handle_write(AttributeId::ProtocolMode, 0, &[v]), AttStatus::Success);
        assert_eq!(s.read(AttributeId::ProtocolMode, 0).unwrap(), [v]);
    }
    s.write(AttributeId::ProtocolMode, 0, &[1]).unwrap();
    let bad_payloads: [&[u8]; 4] = [&[2], &[0xFF], &[0, 1], &[]];
    for bad in bad_payloads {
        assert_eq!(
            s.write(AttributeId::ProtocolMode, 0, bad),
            Err(AttError::UnsupportedValue)
        );
        assert_eq!(s.protocol_mode(), ProtocolMode::Boot);
    }
    assert_eq!(
        s.handle_write(AttributeId::ProtocolMode, 0, &[2]),
        AttStatus::RequestNotSupported
    );
}

#[test]
fn suspend_pauses_notifications_and_keeps_last_report() {
    let s = subscribed();
    assert!(press(&s, A).is_some());
    let before = s.current_report();

    assert_eq!(s.handle_write(AttributeId::ControlPoint, 0, &[0]), AttStatus::Success);
    assert_eq!(s.suspend_state(), SuspendState::Suspended);
    assert_eq!(press(&s, B), None);
    assert_eq!(release(&s, A), None);
    assert_eq!(s.current_report(), before);
    assert_eq!(s.read(AttributeId::InputReport, 0).unwrap(), before);

    // Writes are still accepted while suspended.
    assert_eq!(s.handle_write(AttributeId::OutputReport, 0, &[0x01]), AttStatus::Success);
    assert_eq!(s.handle_write(AttributeId::ProtocolMode, 0, &[0]), AttStatus::Success);

    assert_eq!(s.handle_write(AttributeId::ControlPoint, 0, &[1]), AttStatus::Success);
    assert_eq!(s.suspend_state(), SuspendState::Active);
    // B went down and A came up while suspended.
    let n = press(&s, C).unwrap();
    assert_eq!(n.value, [0, 0, B, C, 0, 0, 0, 0]);
}

#[test]
fn key_released_during_suspend_is_not_reported_after_resume() {
    let s = subscribed();
    press(&s, A).unwrap();
    s.handle_write(AttributeId::ControlPoint, 0, &[0]);
    assert_eq!(release(&s, A), None);
    assert_eq!(s.current_report(), [0, 0, A, 0, 0, 0, 0, 0]);
    s.handle_write(AttributeId::ControlPoint, 0, &[1]);
    let n = press(&s, B).unwrap();
    assert_eq!(n.value, [0, 0, B, 0, 0, 0, 0, 0]);
}

#[test]
fn first_event_after_resume_publishes_pending_state() {
    let s = subscribed();
    press(&s, A).unwrap();
    s.handle_write(AttributeId::ControlPoint, 0, &[0]);
    release(&s, A);
    s.handle_write(AttributeId::ControlPoint, 0, &[1]);
    // Releasing a key that is not held still flushes the stale report.
    let n = release(&s, C).unwrap();
    assert_eq!(n.value, [0; 8]);
    assert_eq!(s.current_report(), [0; 8]);
}

#[test]
fn hid_information_is_version_1_1() {
    let s = KeyboardService::new();
    assert_eq!(
        s.read(AttributeId::HidInformation, 0).unwrap(),
        [0x01, 0x01, 0x00, 0x00]
    );
}

#[test]
fn control_point_rejects_other_values() {
    let s = KeyboardService::new();
    let bad_payloads: [&[u8]; 3] = [&[2], &[0, 0], &[]];
    for bad in bad_payloads {
        assert_eq!(
            s.handle_write(AttributeId::ControlPoint, 0, bad),
            AttStatus::RequestNotSupported
        );
    }
    assert_eq!(s.suspend_state(), SuspendState::Active);
}

#[test]
fn release_compacts_remaining_keys() {
    let s = subscribed();
    for k in [A, B, C] {
        press(&s, k);
    }
    let n = release(&s, B).unwrap();
    assert_eq!(&n.value[2..], &[A, C, 0, 0, 0, 0]);
}

#[test]
fn seventh_key_changes_nothing() {
    let s = subscribed();
    for k in 0x04..0x0A {
        assert!(press(&s, k).is_some());
    }
    let before = s.current_report();
    assert_eq!(press(&s, 0x0A), None);
    assert_eq!(s.current_report(), before);
}

#[test]
fn output_report_length_is_enforced() {
    let s = KeyboardService::new();
    s.write(AttributeId::OutputReport, 0, &[0x02]).unwrap();
    let bad_payloads: [&[u8]; 2] = [&[], &[1, 2]];
    for bad in bad_payloads {
        assert_eq!(
            s.write(AttributeId::OutputReport, 0, bad),
            Err(AttError::InvalidLength { expected: 1, got: bad.len() })
        );
    }
    assert_eq!(s.read(AttributeId::OutputReport, 0).unwrap(), [0x02]);
    assert!(s.leds().caps_lock());
}

#[test]
fn no_notifications_without_subscription() {
    let s = KeyboardService::new();
    assert_eq!(press(&s, A), None);
    assert_eq!(s.current_report()[2], A);
    s.set_notifications(AttributeId::InputClientConfig, true);
    assert!(press(&s, B).is_some());
    s.set_notifications(AttributeId::InputClientConfig, false);
    assert_eq!(press(&s, C), None);
}

#[test]
fn cccd_write_races_key_presses() {
    for _ in 0..200 {
        let s = Arc::new(KeyboardService::new());
        let enabled = Arc::new(Barrier::new(2));

        let writer = {
            let (s, enabled) = (Arc::clone(&s), Arc::clone(&enabled));
            thread::spawn(move || {
                s.handle_write(AttributeId::InputClientConfig, 0, &[0x01, 0x00]);
                enabled.wait();
            })
        };
        let reader = {
            let s = Arc::clone(&s);
            thread::spawn(move || {
                let valid = [
                    [0u8; 8],
                    [0, 0, A, 0, 0, 0, 0, 0],
                    [0, 0, A, B, 0, 0, 0, 0],
                    [0, 0, A, B, C, 0, 0, 0],
                ];
                for _ in 0..500 {
                    let v = s.read(AttributeId::InputReport, 0).unwrap();
                    assert!(valid.iter().any(|r| r[..] == v[..]), "torn report {v:?}");
                }
            })
        };
        let presser = {
            let (s, enabled) = (Arc::clone(&s), Arc::clone(&enabled));
            thread::spawn(move || {
                enabled.wait();
                [A, B, C].map(|k| press(&s, k))
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        let sent = presser.join().unwrap();
        let values: Vec<_> = sent.iter().map(|n| n.unwrap().value).collect();
        assert_eq!(
            values,
            [
                [0, 0, A, 0, 0, 0, 0, 0],
                [0, 0, A, B, 0, 0, 0, 0],
                [0, 0, A, B, C, 0, 0, 0],
            ]
        );
    }
}
