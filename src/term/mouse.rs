// src/term/mouse.rs

//! Mouse report encoding.
//!
//! When the application enables a tracking mode (DECSET 9 / 1000 / 1002 /
//! 1003), host mouse events are encoded as escape sequences and handed back
//! through the delegate. Three wire formats exist: the legacy X10 byte
//! encoding, SGR (1006), and URXVT (1015). SGR wins over URXVT when both
//! are set; both win over the byte encoding.

use crate::term::Modes;
use std::io::Write;

/// Host-side mouse buttons the engine can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

/// Press or release; motion has its own entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Press,
    Release,
    Motion,
}

/// Base protocol code for a button: 0/1/2 for the buttons, 64/65 for the
/// wheel.
fn button_code(button: MouseButton) -> u16 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
        MouseButton::WheelUp => 64,
        MouseButton::WheelDown => 65,
    }
}

/// Whether the active tracking mode reports this event kind at all.
fn should_report(modes: &Modes, kind: MouseEventKind) -> bool {
    match kind {
        MouseEventKind::Press => {
            modes.mouse_x10 || modes.mouse_vt200 || modes.mouse_button_event || modes.mouse_any_event
        }
        // X10 tracking never reports releases.
        MouseEventKind::Release => {
            modes.mouse_vt200 || modes.mouse_button_event || modes.mouse_any_event
        }
        // Button-event mode reports drags (the caller filters by held
        // button); any-event mode reports all motion.
        MouseEventKind::Motion => modes.mouse_button_event || modes.mouse_any_event,
    }
}

/// Encodes one mouse event, or `None` when the active modes do not report
/// it (or the legacy encoding cannot express the coordinates).
pub(super) fn encode_mouse_event(
    modes: &Modes,
    button: MouseButton,
    kind: MouseEventKind,
    col: usize,
    row: usize,
) -> Option<Vec<u8>> {
    if !should_report(modes, kind) {
        return None;
    }

    if modes.mouse_sgr {
        let mut code = button_code(button);
        if kind == MouseEventKind::Motion {
            code += 32;
        }
        let suffix = if kind == MouseEventKind::Release {
            b'm'
        } else {
            b'M'
        };
        let mut buf = Vec::with_capacity(24);
        let _ = write!(buf, "\x1b[<{};{};{}", code, col + 1, row + 1);
        buf.push(suffix);
        return Some(buf);
    }

    // Legacy code: releases lose button identity.
    let mut code = match kind {
        MouseEventKind::Release => 3,
        MouseEventKind::Motion => button_code(button) + 32,
        MouseEventKind::Press => button_code(button),
    };

    if modes.mouse_urxvt {
        code += 32;
        let mut buf = Vec::with_capacity(24);
        let _ = write!(buf, "\x1b[{};{};{}M", code, col + 1, row + 1);
        return Some(buf);
    }

    // X10 byte encoding tops out at coordinate 222 (byte 255 after offsets).
    if col > 222 || row > 222 {
        return None;
    }
    Some(vec![
        0x1b,
        b'[',
        b'M',
        (code + 32) as u8,
        (col as u8) + 33,
        (row as u8) + 33,
    ])
}
