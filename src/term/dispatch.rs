// src/term/dispatch.rs

//! Handler registration and command semantics.
//!
//! `register` wires every recognized final byte to an `Emulator` method;
//! the parser owns the tables, the emulator owns the state. Handlers are
//! contracts over the buffer model: parameters are clamped to the grid,
//! unknown parameters are logged and skipped, and nothing here can panic on
//! untrusted input.

use super::charset::{Charset, G0, G1, G2, G3};
use super::{Emulator, EraseExtent};
use crate::cell::{AttrFlags, Attributes, Cell, CellContent};
use crate::color::{self, Color, BRIGHT_OFFSET};
use crate::delegate::HostNotice;
use crate::parser::{DcsHandler, EscapeSequenceParser, Params};
use log::{debug, warn};
use std::io::Write as _;

/// First parameter with default 1 (0 also means "default").
fn n1(params: &Params) -> usize {
    params.get_or(0, 1).max(1) as usize
}

fn is_private(collect: &[u8]) -> bool {
    collect == b"?"
}

/// Wires the full command set into `parser`.
pub(super) fn register(parser: &mut EscapeSequenceParser<Emulator>) {
    parser.set_print_handler(|emu, data| emu.print_bytes(data));

    // --- C0 / C1 executes ---
    parser.set_execute_handler(0x07, |emu, _| emu.notice(HostNotice::Bell));
    parser.set_execute_handler(0x08, |emu, _| emu.backspace());
    parser.set_execute_handler(0x09, |emu, _| emu.tab_forward(1));
    parser.set_execute_handler(0x0A, |emu, _| emu.line_feed());
    parser.set_execute_handler(0x0B, |emu, _| emu.line_feed());
    parser.set_execute_handler(0x0C, |emu, _| emu.line_feed());
    parser.set_execute_handler(0x0D, |emu, _| emu.carriage_return());
    parser.set_execute_handler(0x0E, |emu, _| emu.set_gl(G1));
    parser.set_execute_handler(0x0F, |emu, _| emu.set_gl(G0));
    // C1 shorthands.
    parser.set_execute_handler(0x84, |emu, _| emu.index());
    parser.set_execute_handler(0x85, |emu, _| {
        emu.carriage_return();
        emu.index();
    });
    parser.set_execute_handler(0x88, |emu, _| {
        let x = emu.buffers.active().x;
        emu.buffers.active_mut().set_tab(x);
    });
    parser.set_execute_handler(0x8D, |emu, _| emu.reverse_index());
    parser.set_execute_fallback(|_emu, byte| debug!("ignoring control byte {byte:#04x}"));

    // --- CSI ---
    parser.set_csi_handler(b'@', |emu, p, _c, _f| emu.insert_chars(n1(p)));
    parser.set_csi_handler(b'A', |emu, p, _c, _f| emu.cursor_up(n1(p)));
    parser.set_csi_handler(b'B', |emu, p, _c, _f| emu.cursor_down(n1(p)));
    parser.set_csi_handler(b'C', |emu, p, _c, _f| emu.cursor_forward(n1(p)));
    parser.set_csi_handler(b'D', |emu, p, _c, _f| emu.cursor_backward(n1(p)));
    parser.set_csi_handler(b'E', |emu, p, _c, _f| {
        emu.cursor_down(n1(p));
        emu.carriage_return();
    });
    parser.set_csi_handler(b'F', |emu, p, _c, _f| {
        emu.cursor_up(n1(p));
        emu.carriage_return();
    });
    parser.set_csi_handler(b'G', |emu, p, _c, _f| emu.cursor_col(n1(p) - 1));
    parser.set_csi_handler(b'H', |emu, p, _c, _f| {
        let row = n1(p);
        let col = p.get_or(1, 1).max(1) as usize;
        emu.cursor_to(col - 1, row - 1);
    });
    parser.set_csi_handler(b'I', |emu, p, _c, _f| emu.tab_forward(n1(p)));
    parser.set_csi_handler(b'J', |emu, p, c, _f| {
        if is_private(c) {
            debug!("DECSED not supported, ignoring");
            return;
        }
        match EraseExtent::from_param(p.get_or(0, 0)) {
            Some(extent) => emu.erase_in_display(extent),
            None => warn!("unknown ED mode {}", p.get_or(0, 0)),
        }
    });
    parser.set_csi_handler(b'K', |emu, p, c, _f| {
        if is_private(c) {
            debug!("DECSEL not supported, ignoring");
            return;
        }
        match EraseExtent::from_param(p.get_or(0, 0)) {
            Some(EraseExtent::Scrollback) | None => warn!("unknown EL mode {}", p.get_or(0, 0)),
            Some(extent) => emu.erase_in_line(extent),
        }
    });
    parser.set_csi_handler(b'L', |emu, p, _c, _f| emu.insert_lines(n1(p)));
    parser.set_csi_handler(b'M', |emu, p, _c, _f| emu.delete_lines(n1(p)));
    parser.set_csi_handler(b'P', |emu, p, _c, _f| emu.delete_chars(n1(p)));
    parser.set_csi_handler(b'S', |emu, p, _c, _f| emu.scroll_up_lines(n1(p)));
    parser.set_csi_handler(b'T', |emu, p, _c, _f| {
        if p.len() > 1 {
            debug!("ignoring mouse-highlight tracking variant of CSI T");
            return;
        }
        emu.scroll_down_lines(n1(p));
    });
    parser.set_csi_handler(b'X', |emu, p, _c, _f| emu.erase_chars(n1(p)));
    parser.set_csi_handler(b'Z', |emu, p, _c, _f| emu.tab_backward(n1(p)));
    parser.set_csi_handler(b'`', |emu, p, _c, _f| emu.cursor_col(n1(p) - 1));
    parser.set_csi_handler(b'a', |emu, p, _c, _f| emu.cursor_forward(n1(p)));
    parser.set_csi_handler(b'c', |emu, p, c, _f| {
        if c.is_empty() {
            if p.get_or(0, 0) == 0 {
                emu.reply_primary_da();
            }
        } else if c == b">" {
            emu.reply_secondary_da(p.get_or(0, 0));
        } else {
            debug!("ignoring DA with collect {c:?}");
        }
    });
    parser.set_csi_handler(b'd', |emu, p, _c, _f| emu.cursor_row(n1(p) - 1));
    parser.set_csi_handler(b'f', |emu, p, _c, _f| {
        let row = n1(p);
        let col = p.get_or(1, 1).max(1) as usize;
        emu.cursor_to(col - 1, row - 1);
    });
    parser.set_csi_handler(b'g', |emu, p, _c, _f| match p.get_or(0, 0) {
        0 => {
            let x = emu.buffers.active().x;
            emu.buffers.active_mut().clear_tab(x);
        }
        3 => emu.buffers.active_mut().clear_all_tabs(),
        other => warn!("unknown TBC mode {other}"),
    });
    parser.set_csi_handler(b'h', |emu, p, c, _f| emu.set_modes(p, c, true));
    parser.set_csi_handler(b'l', |emu, p, c, _f| emu.set_modes(p, c, false));
    parser.set_csi_handler(b'm', |emu, p, c, _f| {
        if c.is_empty() {
            emu.select_graphic_rendition(p);
        } else {
            debug!("ignoring SGR variant with collect {c:?}");
        }
    });
    parser.set_csi_handler(b'n', |emu, p, c, _f| {
        if c.is_empty() {
            emu.reply_dsr(p.get_or(0, 0));
        } else {
            debug!("ignoring DSR variant with collect {c:?}");
        }
    });
    parser.set_csi_handler(b'p', |emu, _p, c, _f| {
        if c == b"!" {
            emu.soft_reset();
        } else {
            debug!("ignoring CSI p with collect {c:?}");
        }
    });
    parser.set_csi_handler(b'r', |emu, p, c, _f| {
        if !c.is_empty() {
            debug!("ignoring CSI r with collect {c:?}");
            return;
        }
        let rows = emu.buffers.active().rows();
        let top = n1(p);
        let bottom = p.get_or(1, rows as u16).max(1) as usize;
        emu.set_scroll_region(top, bottom);
    });
    parser.set_csi_handler(b's', |emu, _p, c, _f| {
        if c.is_empty() {
            emu.save_cursor();
        } else {
            debug!("ignoring CSI s with collect {c:?}");
        }
    });
    parser.set_csi_handler(b'u', |emu, _p, c, _f| {
        if c.is_empty() {
            emu.restore_cursor();
        }
    });
    parser.set_csi_fallback(|_emu, p, c, f| {
        warn!(
            "unsupported CSI sequence: final {:?}, collect {:?}, {} params",
            f as char,
            c,
            p.len()
        );
    });

    // --- ESC ---
    parser.set_esc_handler(b"", b'7', |emu, _c, _f| emu.save_cursor());
    parser.set_esc_handler(b"", b'8', |emu, _c, _f| emu.restore_cursor());
    parser.set_esc_handler(b"", b'D', |emu, _c, _f| emu.index());
    parser.set_esc_handler(b"", b'E', |emu, _c, _f| {
        emu.carriage_return();
        emu.index();
    });
    parser.set_esc_handler(b"", b'H', |emu, _c, _f| {
        let x = emu.buffers.active().x;
        emu.buffers.active_mut().set_tab(x);
    });
    parser.set_esc_handler(b"", b'M', |emu, _c, _f| emu.reverse_index());
    parser.set_esc_handler(b"", b'c', |emu, _c, _f| emu.full_reset());
    parser.set_esc_handler(b"", b'=', |emu, _c, _f| emu.modes.application_keypad = true);
    parser.set_esc_handler(b"", b'>', |emu, _c, _f| emu.modes.application_keypad = false);
    parser.set_esc_handler(b"", b'N', |emu, _c, _f| emu.next_gl = Some(G2));
    parser.set_esc_handler(b"", b'O', |emu, _c, _f| emu.next_gl = Some(G3));
    parser.set_esc_handler(b"", b'n', |emu, _c, _f| emu.set_gl(G2));
    parser.set_esc_handler(b"", b'o', |emu, _c, _f| emu.set_gl(G3));
    parser.set_esc_handler(b"", b'|', |emu, _c, _f| emu.set_gr(G3));
    parser.set_esc_handler(b"", b'}', |emu, _c, _f| emu.set_gr(G2));
    parser.set_esc_handler(b"", b'~', |emu, _c, _f| emu.set_gr(G1));
    parser.set_esc_handler(b"", b'\\', |_emu, _c, _f| {});
    // Charset designation for all four slots (plus the 96-set aliases).
    for &collect in &[b'(', b')', b'*', b'+', b'-', b'.', b'/'] {
        for &final_byte in &[b'B', b'A', b'0'] {
            parser.set_esc_handler(&[collect], final_byte, |emu, c, f| {
                emu.designate_from_bytes(c, f);
            });
        }
    }
    parser.set_esc_handler(b"%", b'@', |emu, _c, _f| emu.charsets = [Charset::Ascii; 4]);
    parser.set_esc_handler(b"%", b'G', |emu, _c, _f| emu.charsets = [Charset::Ascii; 4]);
    parser.set_esc_handler(b"#", b'8', |emu, _c, _f| emu.screen_alignment_fill());
    for &final_byte in &[b'3', b'4', b'5', b'6'] {
        parser.set_esc_handler(b"#", final_byte, |emu, _c, f| emu.double_size_stub(f));
    }
    parser.set_esc_fallback(|emu, c, f| {
        // Unlisted designator finals still select a (fallback) charset.
        if c.len() == 1 && b"()*+-./".contains(&c[0]) {
            emu.designate_from_bytes(c, f);
        } else {
            warn!("unsupported ESC sequence: collect {:?}, final {:?}", c, f as char);
        }
    });

    // --- OSC ---
    parser.set_osc_handler(0, |emu, payload| emu.set_title(payload));
    parser.set_osc_handler(1, |emu, payload| emu.set_title(payload));
    parser.set_osc_handler(2, |emu, payload| emu.set_title(payload));
    parser.set_osc_fallback(|_emu, code, _payload| {
        warn!("unhandled OSC code {code}");
    });

    // --- DCS ---
    parser.set_dcs_handler(b"$", b'q', Box::new(Decrqss::default()));

    parser.set_error_handler(|_emu, state| {
        debug!("parser error while in {state:?}");
    });
}

impl Emulator {
    /// CHA / HPA: column absolute, row unchanged.
    fn cursor_col(&mut self, col: usize) {
        let buf = self.buffers.active_mut();
        buf.x = col.min(buf.cols() - 1);
    }

    /// VPA: row absolute (origin-aware), column unchanged.
    fn cursor_row(&mut self, row: usize) {
        let origin = self.modes.origin;
        let buf = self.buffers.active_mut();
        buf.y = if origin {
            (buf.scroll_top + row).min(buf.scroll_bottom)
        } else {
            row.min(buf.rows() - 1)
        };
    }

    fn designate_from_bytes(&mut self, collect: &[u8], final_byte: u8) {
        let slot = match collect.first() {
            Some(b'(') => G0,
            Some(b')') | Some(b'-') => G1,
            Some(b'*') | Some(b'.') => G2,
            Some(b'+') | Some(b'/') => G3,
            _ => {
                warn!("bad charset designator prefix {collect:?}");
                return;
            }
        };
        self.designate_charset(slot, Charset::from_designator(final_byte));
    }

    fn set_title(&mut self, payload: &[u8]) {
        let title = String::from_utf8_lossy(payload).into_owned();
        self.title = title.clone();
        self.notice(HostNotice::Title(title));
    }

    /// DECALN: fill the whole screen with 'E' and home the cursor.
    fn screen_alignment_fill(&mut self) {
        let attr = Attributes::default();
        let buf = self.buffers.active_mut();
        buf.scroll_top = 0;
        buf.scroll_bottom = buf.rows() - 1;
        for y in 0..buf.rows() {
            if let Some(line) = buf.line_mut(y) {
                let cols = line.len();
                for x in 0..cols {
                    line.put(x, Cell::Narrow(CellContent { ch: 'E', attr }), attr);
                }
                line.wrapped = false;
            }
        }
        buf.x = 0;
        buf.y = 0;
        self.full_update();
    }

    // --- Modes ---

    fn set_modes(&mut self, params: &Params, collect: &[u8], enable: bool) {
        let private = is_private(collect);
        if !collect.is_empty() && !private {
            debug!("ignoring mode set with collect {collect:?}");
            return;
        }
        for param in params.iter() {
            if private {
                self.set_dec_mode(param, enable);
            } else {
                self.set_ansi_mode(param, enable);
            }
        }
    }

    fn set_ansi_mode(&mut self, mode: u16, enable: bool) {
        match mode {
            4 => self.modes.insert = enable,
            20 => self.modes.auto_newline = enable,
            other => warn!("unknown ANSI mode {other} ({})", onoff(enable)),
        }
    }

    fn set_dec_mode(&mut self, mode: u16, enable: bool) {
        match mode {
            1 => self.modes.application_cursor = enable,
            3 => self.set_column_mode(enable),
            5 => {
                if self.modes.reverse_video != enable {
                    self.modes.reverse_video = enable;
                    self.full_update();
                }
            }
            6 => {
                self.modes.origin = enable;
                self.cursor_to(0, 0);
            }
            7 => self.modes.wraparound = enable,
            9 => self.modes.mouse_x10 = enable,
            12 => self.modes.cursor_blink = enable,
            25 => {
                self.modes.cursor_hidden = !enable;
                if enable {
                    self.notice(HostNotice::ShowCursor);
                }
            }
            47 | 1047 => {
                if enable {
                    self.enter_alt_buffer();
                } else {
                    self.exit_alt_buffer();
                }
            }
            66 => self.modes.application_keypad = enable,
            1000 => self.modes.mouse_vt200 = enable,
            1002 => self.modes.mouse_button_event = enable,
            1003 => self.modes.mouse_any_event = enable,
            1004 => self.modes.focus_events = enable,
            1005 => self.modes.mouse_utf8 = enable,
            1006 => self.modes.mouse_sgr = enable,
            1015 => self.modes.mouse_urxvt = enable,
            1048 => {
                if enable {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            }
            1049 => {
                if enable {
                    self.save_cursor();
                    self.enter_alt_buffer();
                } else {
                    self.exit_alt_buffer();
                    self.restore_cursor();
                }
            }
            2004 => self.modes.bracketed_paste = enable,
            other => warn!("unknown DEC private mode {other} ({})", onoff(enable)),
        }
    }

    /// DECCOLM: 132-column mode. Set stashes the current width; reset
    /// restores it. Both clear the screen and home the cursor.
    fn set_column_mode(&mut self, enable: bool) {
        let rows = self.cfg.rows;
        if enable {
            if self.cfg.cols != 132 {
                self.saved_cols = Some(self.cfg.cols);
                self.resize_grid(132, rows);
            }
        } else if let Some(cols) = self.saved_cols.take() {
            self.resize_grid(cols, rows);
        }
        self.erase_in_display(EraseExtent::All);
        let buf = self.buffers.active_mut();
        buf.scroll_top = 0;
        buf.scroll_bottom = buf.rows() - 1;
        self.cursor_to(0, 0);
    }

    // --- SGR ---

    fn select_graphic_rendition(&mut self, params: &Params) {
        if params.is_empty() {
            self.cur_attr = Attributes::default();
            return;
        }
        let values: Vec<u16> = params.iter().collect();
        let mut attr = self.cur_attr;
        let mut i = 0;
        while i < values.len() {
            match values[i] {
                0 => attr = Attributes::default(),
                1 => attr.flags.insert(AttrFlags::BOLD),
                2 => attr.flags.insert(AttrFlags::DIM),
                3 => attr.flags.insert(AttrFlags::ITALIC),
                4 => attr.flags.insert(AttrFlags::UNDERLINE),
                5 | 6 => attr.flags.insert(AttrFlags::BLINK),
                7 => attr.flags.insert(AttrFlags::INVERSE),
                8 => attr.flags.insert(AttrFlags::INVISIBLE),
                22 => attr.flags.remove(AttrFlags::BOLD | AttrFlags::DIM),
                23 => attr.flags.remove(AttrFlags::ITALIC),
                24 => attr.flags.remove(AttrFlags::UNDERLINE),
                25 => attr.flags.remove(AttrFlags::BLINK),
                27 => attr.flags.remove(AttrFlags::INVERSE),
                28 => attr.flags.remove(AttrFlags::INVISIBLE),
                30..=37 => attr.fg = Color::Indexed((values[i] - 30) as u8),
                39 => attr.fg = Color::Default,
                40..=47 => attr.bg = Color::Indexed((values[i] - 40) as u8),
                49 => attr.bg = Color::Default,
                90..=97 => attr.fg = Color::Indexed((values[i] - 90) as u8 + BRIGHT_OFFSET),
                100..=107 => attr.bg = Color::Indexed((values[i] - 100) as u8 + BRIGHT_OFFSET),
                38 | 48 => {
                    let (color, consumed) = parse_extended_color(&values[i + 1..]);
                    if let Some(color) = color {
                        if values[i] == 38 {
                            attr.fg = color;
                        } else {
                            attr.bg = color;
                        }
                    }
                    i += consumed;
                }
                other => warn!("unknown SGR parameter {other}"),
            }
            i += 1;
        }
        self.cur_attr = attr;
    }
}

fn onoff(enable: bool) -> &'static str {
    if enable {
        "set"
    } else {
        "reset"
    }
}

/// Parses the tail of an SGR 38/48 extended color: `5;N` or `2;R;G;B`.
/// Returns the color (if well-formed) and how many parameters were used.
fn parse_extended_color(rest: &[u16]) -> (Option<Color>, usize) {
    match rest.first() {
        Some(5) => match rest.get(1) {
            Some(&index) if index <= u16::from(u8::MAX) => {
                (Some(Color::Indexed(index as u8)), 2)
            }
            Some(&index) => {
                warn!("palette index {index} out of range");
                (None, 2)
            }
            None => {
                warn!("missing palette index after SGR 38/48;5");
                (None, 1)
            }
        },
        Some(2) => {
            if rest.len() < 4 {
                warn!("incomplete SGR truecolor sequence");
                return (None, rest.len());
            }
            let clamp = |v: u16| v.min(255) as u8;
            let index = color::nearest_indexed(clamp(rest[1]), clamp(rest[2]), clamp(rest[3]));
            (Some(Color::Indexed(index)), 4)
        }
        Some(other) => {
            warn!("unsupported extended color mode {other}");
            (None, 1)
        }
        None => {
            warn!("missing extended color mode after SGR 38/48");
            (None, 0)
        }
    }
}

/// DECRQSS: replies with the serialized current setting for the requested
/// control. Unknown requests get the invalid-request form.
#[derive(Debug, Default)]
struct Decrqss {
    payload: Vec<u8>,
}

impl DcsHandler<Emulator> for Decrqss {
    fn hook(&mut self, _target: &mut Emulator, _params: &Params, _collect: &[u8], _final_byte: u8) {
        self.payload.clear();
    }

    fn put(&mut self, _target: &mut Emulator, data: &[u8]) {
        // Requests are two bytes; anything longer is already malformed.
        if self.payload.len() < 8 {
            self.payload.extend_from_slice(data);
        }
    }

    fn unhook(&mut self, target: &mut Emulator) {
        let request = self.payload.as_slice();
        let setting = if request == b"\"q" {
            Some("0\"q".to_string())
        } else if request == b"\"p" {
            Some("61\"p".to_string())
        } else if request == b"r" {
            let buf = target.buffers.active();
            Some(format!("{};{}r", buf.scroll_top + 1, buf.scroll_bottom + 1))
        } else if request == b"m" {
            Some("0m".to_string())
        } else {
            warn!("DECRQSS for unknown setting {request:?}");
            None
        };
        let mut reply = Vec::with_capacity(16);
        match setting {
            Some(s) => {
                let _ = write!(reply, "\x1bP1$r{s}\x1b\\");
            }
            None => {
                let _ = write!(reply, "\x1bP0$r\x1b\\");
            }
        }
        target.send_bytes(reply);
        self.payload.clear();
    }
}
