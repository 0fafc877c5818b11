// src/term/mod.rs

//! The terminal engine: dispatcher state and the public host-facing API.
//!
//! `Terminal` owns the escape-sequence parser and the `Emulator` it drives.
//! The emulator carries everything the command set mutates: the buffer pair,
//! SGR state, modes, character sets, and the dirty-row range. Replies and
//! notifications are staged as `HostNotice`s and drained onto the borrowed
//! delegate before each public call returns, so delegate callbacks are
//! always synchronous and never re-enter `feed`.

pub mod charset;
mod dispatch;
pub mod mouse;
mod print;


use crate::cell::Attributes;
use crate::config::{TermConfig, TermKind};
use crate::delegate::{HostDelegate, HostNotice};
use crate::grid::{Buffer, BufferSet};
use crate::parser::EscapeSequenceParser;
use charset::Charset;
use log::{debug, warn};
pub use mouse::{MouseButton, MouseEventKind};
use print::Utf8Decoder;
use std::io::Write as _;

/// Erase extents shared by ED and EL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EraseExtent {
    Below,
    Above,
    All,
    Scrollback,
}

impl EraseExtent {
    fn from_param(value: u16) -> Option<Self> {
        match value {
            0 => Some(EraseExtent::Below),
            1 => Some(EraseExtent::Above),
            2 => Some(EraseExtent::All),
            3 => Some(EraseExtent::Scrollback),
            _ => None,
        }
    }
}

/// The mode flags a single terminal instance owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modes {
    /// DECCKM: cursor keys send application sequences.
    pub application_cursor: bool,
    /// DECNKM / DECKPAM: application keypad.
    pub application_keypad: bool,
    /// DECOM: cursor addressing is relative to the scroll region.
    pub origin: bool,
    /// DECAWM: printing past the last column wraps.
    pub wraparound: bool,
    /// IRM: printed characters shift the rest of the line right.
    pub insert: bool,
    /// LNM: LF implies CR.
    pub auto_newline: bool,
    /// Mode 2004: paste is fenced with `ESC [ 200~` / `ESC [ 201~`.
    pub bracketed_paste: bool,
    /// DECTCEM reset: the cursor is not drawn.
    pub cursor_hidden: bool,
    /// ATT610 blink.
    pub cursor_blink: bool,
    /// DECSCNM: the host should swap default fg/bg.
    pub reverse_video: bool,
    pub mouse_x10: bool,
    pub mouse_vt200: bool,
    pub mouse_button_event: bool,
    pub mouse_any_event: bool,
    pub focus_events: bool,
    pub mouse_utf8: bool,
    pub mouse_sgr: bool,
    pub mouse_urxvt: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Modes {
            application_cursor: false,
            application_keypad: false,
            origin: false,
            wraparound: true,
            insert: false,
            auto_newline: false,
            bracketed_paste: false,
            cursor_hidden: false,
            cursor_blink: false,
            reverse_video: false,
            mouse_x10: false,
            mouse_vt200: false,
            mouse_button_event: false,
            mouse_any_event: false,
            focus_events: false,
            mouse_utf8: false,
            mouse_sgr: false,
            mouse_urxvt: false,
        }
    }
}

/// Dispatcher state: everything the command semantics read and mutate.
pub(crate) struct Emulator {
    cfg: TermConfig,
    kind: TermKind,
    buffers: BufferSet,
    modes: Modes,
    cur_attr: Attributes,
    charsets: [Charset; 4],
    /// Active GL slot.
    gl: usize,
    /// Active GR slot; translates decoded scalars in 0xA0..=0xFF.
    gr: usize,
    /// One-shot GL override from SS2/SS3.
    next_gl: Option<usize>,
    decoder: Utf8Decoder,
    update: Option<(usize, usize)>,
    notices: Vec<HostNotice>,
    /// Column count stashed by DECCOLM so reset can restore it.
    saved_cols: Option<usize>,
    title: String,
    /// Double-width/height selectors are stubs; complain only once.
    dwl_warned: bool,
}

impl Emulator {
    fn new(cfg: TermConfig) -> Self {
        let kind = cfg.term_kind();
        let buffers = BufferSet::new(cfg.cols, cfg.rows, cfg.scrollback, Attributes::default());
        Emulator {
            cfg,
            kind,
            buffers,
            modes: Modes::default(),
            cur_attr: Attributes::default(),
            charsets: [Charset::Ascii; 4],
            gl: 0,
            gr: 2,
            next_gl: None,
            decoder: Utf8Decoder::default(),
            update: None,
            notices: Vec::new(),
            saved_cols: None,
            title: String::new(),
            dwl_warned: false,
        }
    }

    // --- Notices and dirty tracking ---

    fn notice(&mut self, notice: HostNotice) {
        self.notices.push(notice);
    }

    fn drain(&mut self, host: &mut dyn HostDelegate) {
        for notice in std::mem::take(&mut self.notices) {
            notice.deliver(host);
        }
    }

    fn update_line(&mut self, y: usize) {
        let rows = self.buffers.active().rows();
        let y = y.min(rows.saturating_sub(1));
        self.update = match self.update {
            None => Some((y, y)),
            Some((start, end)) => Some((start.min(y), end.max(y))),
        };
    }

    fn update_rows(&mut self, start: usize, end: usize) {
        self.update_line(start);
        self.update_line(end);
    }

    fn full_update(&mut self) {
        let rows = self.buffers.active().rows();
        self.update_rows(0, rows.saturating_sub(1));
    }

    fn erase_attr(&self) -> Attributes {
        Attributes::erase_from(self.cur_attr)
    }

    // --- Core cursor and line motion ---

    fn scroll_active(&mut self, is_wrapped: bool) {
        let fill = self.erase_attr();
        let buf = self.buffers.active_mut();
        buf.scroll(is_wrapped, fill);
        let y_disp = buf.y_disp;
        let (top, bottom) = (buf.scroll_top, buf.scroll_bottom);
        self.notice(HostNotice::Scrolled(y_disp));
        self.update_rows(top, bottom);
    }

    fn line_feed(&mut self) {
        if self.cfg.convert_eol || self.modes.auto_newline {
            self.buffers.active_mut().x = 0;
        }
        let buf = self.buffers.active();
        let (y, bottom, rows) = (buf.y, buf.scroll_bottom, buf.rows());
        if y == bottom {
            self.scroll_active(false);
        } else if y < rows - 1 {
            self.buffers.active_mut().y += 1;
        }
        let y = self.buffers.active().y;
        self.update_line(y);
        self.notice(HostNotice::Linefeed);
    }

    fn carriage_return(&mut self) {
        self.buffers.active_mut().x = 0;
    }

    fn backspace(&mut self) {
        let buf = self.buffers.active_mut();
        if buf.x > 0 {
            buf.x -= 1;
        }
    }

    fn index(&mut self) {
        let buf = self.buffers.active();
        let (y, bottom, rows) = (buf.y, buf.scroll_bottom, buf.rows());
        if y == bottom {
            self.scroll_active(false);
        } else if y < rows - 1 {
            self.buffers.active_mut().y += 1;
        }
    }

    fn reverse_index(&mut self) {
        let fill = self.erase_attr();
        let buf = self.buffers.active_mut();
        if buf.y == buf.scroll_top {
            buf.reverse_index(fill);
            let (top, bottom) = (buf.scroll_top, buf.scroll_bottom);
            self.update_rows(top, bottom);
        } else {
            buf.y = buf.y.saturating_sub(1);
        }
    }

    /// Absolute cursor addressing with 0-based arguments, honoring DECOM.
    fn cursor_to(&mut self, col: usize, row: usize) {
        let origin = self.modes.origin;
        let buf = self.buffers.active_mut();
        let (top, bottom) = (buf.scroll_top, buf.scroll_bottom);
        buf.x = col.min(buf.cols() - 1);
        buf.y = if origin {
            (top + row).min(bottom)
        } else {
            row.min(buf.rows() - 1)
        };
    }

    fn cursor_up(&mut self, n: usize) {
        let buf = self.buffers.active_mut();
        buf.x = buf.x.min(buf.cols() - 1);
        buf.y = buf.y.saturating_sub(n);
    }

    fn cursor_down(&mut self, n: usize) {
        let buf = self.buffers.active_mut();
        buf.x = buf.x.min(buf.cols() - 1);
        buf.y = (buf.y + n).min(buf.rows() - 1);
    }

    fn cursor_forward(&mut self, n: usize) {
        let buf = self.buffers.active_mut();
        buf.x = (buf.x + n).min(buf.cols() - 1);
    }

    fn cursor_backward(&mut self, n: usize) {
        let buf = self.buffers.active_mut();
        buf.x = buf.x.min(buf.cols() - 1).saturating_sub(n);
    }

    fn tab_forward(&mut self, n: usize) {
        let buf = self.buffers.active_mut();
        for _ in 0..n {
            buf.x = buf.next_tab_stop(buf.x.min(buf.cols() - 1));
        }
    }

    fn tab_backward(&mut self, n: usize) {
        let buf = self.buffers.active_mut();
        for _ in 0..n {
            buf.x = buf.prev_tab_stop(buf.x);
        }
    }

    // --- Erase ---

    /// Erases part of the current line. The wrapped flag is cleared only
    /// when column 0 is part of the erased span.
    fn erase_in_line_range(&mut self, y: usize, start: usize, end: usize) {
        let fill = self.erase_attr();
        if let Some(line) = self.buffers.active_mut().line_mut(y) {
            line.replace_cells(start, end, fill);
            if start == 0 {
                line.wrapped = false;
            }
        }
        self.update_line(y);
    }

    fn erase_in_display(&mut self, extent: EraseExtent) {
        let buf = self.buffers.active();
        let (x, y, cols, rows) = (buf.x, buf.y, buf.cols(), buf.rows());
        match extent {
            EraseExtent::Below => {
                self.erase_in_line_range(y, x.min(cols), cols);
                for row in y + 1..rows {
                    self.erase_in_line_range(row, 0, cols);
                }
            }
            EraseExtent::Above => {
                for row in 0..y {
                    self.erase_in_line_range(row, 0, cols);
                }
                self.erase_in_line_range(y, 0, (x + 1).min(cols));
            }
            EraseExtent::All => {
                for row in 0..rows {
                    self.erase_in_line_range(row, 0, cols);
                }
            }
            EraseExtent::Scrollback => {
                let buf = self.buffers.active_mut();
                let moved = buf.is_user_scrolled();
                buf.clear_history();
                if moved {
                    let y_disp = buf.y_disp;
                    self.notice(HostNotice::Scrolled(y_disp));
                }
            }
        }
    }

    fn erase_in_line(&mut self, extent: EraseExtent) {
        let buf = self.buffers.active();
        let (x, y, cols) = (buf.x, buf.y, buf.cols());
        match extent {
            EraseExtent::Below => self.erase_in_line_range(y, x.min(cols), cols),
            EraseExtent::Above => self.erase_in_line_range(y, 0, (x + 1).min(cols)),
            EraseExtent::All => self.erase_in_line_range(y, 0, cols),
            EraseExtent::Scrollback => {}
        }
    }

    fn erase_chars(&mut self, n: usize) {
        let fill = self.erase_attr();
        let buf = self.buffers.active_mut();
        let (x, y, cols) = (buf.x.min(buf.cols()), buf.y, buf.cols());
        if let Some(line) = buf.line_mut(y) {
            line.replace_cells(x, (x + n).min(cols), fill);
        }
        self.update_line(y);
    }

    // --- Line and character edits ---

    fn insert_lines(&mut self, n: usize) {
        let fill = self.erase_attr();
        let buf = self.buffers.active_mut();
        let (y, top, bottom) = (buf.y, buf.scroll_top, buf.scroll_bottom);
        if y < top || y > bottom {
            return;
        }
        buf.rotate_region_down(n, y, bottom, fill);
        buf.x = 0;
        self.update_rows(y, bottom);
    }

    fn delete_lines(&mut self, n: usize) {
        let fill = self.erase_attr();
        let buf = self.buffers.active_mut();
        let (y, top, bottom) = (buf.y, buf.scroll_top, buf.scroll_bottom);
        if y < top || y > bottom {
            return;
        }
        buf.rotate_region_up(n, y, bottom, fill);
        buf.x = 0;
        self.update_rows(y, bottom);
    }

    fn scroll_up_lines(&mut self, n: usize) {
        let fill = self.erase_attr();
        let buf = self.buffers.active_mut();
        let (top, bottom) = (buf.scroll_top, buf.scroll_bottom);
        buf.rotate_region_up(n, top, bottom, fill);
        self.update_rows(top, bottom);
    }

    fn scroll_down_lines(&mut self, n: usize) {
        let fill = self.erase_attr();
        let buf = self.buffers.active_mut();
        let (top, bottom) = (buf.scroll_top, buf.scroll_bottom);
        buf.rotate_region_down(n, top, bottom, fill);
        self.update_rows(top, bottom);
    }

    fn insert_chars(&mut self, n: usize) {
        let fill = self.erase_attr();
        let buf = self.buffers.active_mut();
        let (x, y) = (buf.x.min(buf.cols().saturating_sub(1)), buf.y);
        if let Some(line) = buf.line_mut(y) {
            line.insert_cells(x, n, fill);
        }
        self.update_line(y);
    }

    fn delete_chars(&mut self, n: usize) {
        let fill = self.erase_attr();
        let buf = self.buffers.active_mut();
        let (x, y) = (buf.x.min(buf.cols().saturating_sub(1)), buf.y);
        if let Some(line) = buf.line_mut(y) {
            line.delete_cells(x, n, fill);
        }
        self.update_line(y);
    }

    // --- Save/restore, region, resets ---

    fn save_cursor(&mut self) {
        let attr = self.cur_attr;
        self.buffers.active_mut().save_cursor(attr);
    }

    fn restore_cursor(&mut self) {
        let saved = self.buffers.active_mut().restore_cursor();
        self.cur_attr = saved.attr;
    }

    fn set_scroll_region(&mut self, top_1: usize, bottom_1: usize) {
        let origin = self.modes.origin;
        let buf = self.buffers.active_mut();
        buf.set_scroll_region(top_1, bottom_1);
        buf.x = 0;
        buf.y = if origin { buf.scroll_top } else { 0 };
    }

    /// DECSTR: clear modes and home the cursor; buffer content survives.
    fn soft_reset(&mut self) {
        self.modes = Modes::default();
        self.cur_attr = Attributes::default();
        self.charsets = [Charset::Ascii; 4];
        self.gl = 0;
        self.gr = 2;
        self.next_gl = None;
        let buf = self.buffers.active_mut();
        buf.scroll_top = 0;
        buf.scroll_bottom = buf.rows() - 1;
        buf.x = 0;
        buf.y = 0;
    }

    /// RIS: reinitialize everything including both buffers.
    fn full_reset(&mut self) {
        let cfg = self.cfg.clone();
        if let Some(cols) = self.saved_cols.take() {
            self.cfg.cols = cols;
        }
        self.buffers = BufferSet::new(
            self.cfg.cols,
            self.cfg.rows,
            cfg.scrollback,
            Attributes::default(),
        );
        self.modes = Modes::default();
        self.cur_attr = Attributes::default();
        self.charsets = [Charset::Ascii; 4];
        self.gl = 0;
        self.gr = 2;
        self.next_gl = None;
        self.decoder = Utf8Decoder::default();
        self.title.clear();
        self.full_update();
    }

    // --- Alternate buffer ---

    fn enter_alt_buffer(&mut self) {
        let erase = self.erase_attr();
        if self.buffers.activate_alternate(erase) {
            self.notice(HostNotice::BufferActivated);
            self.full_update();
        }
    }

    fn exit_alt_buffer(&mut self) {
        if self.buffers.activate_normal() {
            self.notice(HostNotice::BufferActivated);
            self.full_update();
        }
    }

    // --- Resize ---

    fn resize_grid(&mut self, cols: usize, rows: usize) {
        let cols = cols.max(1);
        let rows = rows.max(1);
        if cols == self.cfg.cols && rows == self.cfg.rows {
            return;
        }
        let fill = self.erase_attr();
        self.buffers.resize(cols, rows, fill);
        self.cfg.cols = cols;
        self.cfg.rows = rows;
        self.update = None;
        self.full_update();
        self.notice(HostNotice::SizeChanged(cols, rows));
    }

    // --- Replies ---

    fn send_bytes(&mut self, bytes: Vec<u8>) {
        self.notice(HostNotice::Send(bytes));
    }

    fn reply_primary_da(&mut self) {
        let reply: &[u8] = match self.kind {
            TermKind::Linux => b"\x1b[?6c",
            _ => b"\x1b[?1;2c",
        };
        self.send_bytes(reply.to_vec());
    }

    fn reply_secondary_da(&mut self, request_param: u16) {
        let reply = match self.kind {
            TermKind::Xterm => b"\x1b[>0;276;0c".to_vec(),
            TermKind::Rxvt => b"\x1b[>85;95;0c".to_vec(),
            TermKind::Screen => b"\x1b[>83;40003;0c".to_vec(),
            TermKind::Linux => {
                let mut reply = Vec::with_capacity(8);
                let _ = write!(reply, "\x1b[>{request_param}c");
                reply
            }
        };
        self.send_bytes(reply);
    }

    fn reply_dsr(&mut self, param: u16) {
        match param {
            5 => self.send_bytes(b"\x1b[0n".to_vec()),
            6 => {
                let buf = self.buffers.active();
                let (x, y) = (buf.x.min(buf.cols() - 1), buf.y);
                let mut reply = Vec::with_capacity(16);
                let _ = write!(reply, "\x1b[{};{}R", y + 1, x + 1);
                self.send_bytes(reply);
            }
            other => warn!("unhandled DSR parameter {other}"),
        }
    }

    // --- Charsets ---

    fn set_gl(&mut self, level: usize) {
        if level < self.charsets.len() {
            self.gl = level;
        } else {
            warn!("invalid GL level {level}");
        }
    }

    fn set_gr(&mut self, level: usize) {
        if level < self.charsets.len() {
            self.gr = level;
        } else {
            warn!("invalid GR level {level}");
        }
    }

    fn designate_charset(&mut self, slot: usize, charset: Charset) {
        if slot < self.charsets.len() {
            self.charsets[slot] = charset;
        } else {
            warn!("invalid charset slot {slot}");
        }
    }

    // --- Stubs ---

    fn double_size_stub(&mut self, final_byte: u8) {
        if !self.dwl_warned {
            warn!(
                "double-width/height line selector ESC # {:?} not implemented",
                final_byte as char
            );
            self.dwl_warned = true;
        } else {
            debug!("ignoring ESC # {:?}", final_byte as char);
        }
    }
}

/// The headless terminal engine.
pub struct Terminal {
    parser: EscapeSequenceParser<Emulator>,
    emu: Emulator,
}

impl Terminal {
    /// Builds an engine from `config`. Degenerate dimensions are clamped to
    /// 1x1; use [`TermConfig::validated`] to reject them instead.
    #[must_use]
    pub fn new(mut config: TermConfig) -> Self {
        config.cols = config.cols.max(1);
        config.rows = config.rows.max(1);
        let mut parser = EscapeSequenceParser::new();
        dispatch::register(&mut parser);
        Terminal {
            parser,
            emu: Emulator::new(config),
        }
    }

    /// Feeds raw child-process output. Delegate callbacks fire synchronously
    /// before this returns; the call is not reentrant.
    pub fn feed(&mut self, data: &[u8], host: &mut dyn HostDelegate) {
        self.parser.parse(&mut self.emu, data);
        self.emu.drain(host);
    }

    /// `feed` for text already held as a string.
    pub fn feed_str(&mut self, text: &str, host: &mut dyn HostDelegate) {
        self.feed(text.as_bytes(), host);
    }

    /// Applies a new grid size to both buffers.
    pub fn resize(&mut self, cols: usize, rows: usize, host: &mut dyn HostDelegate) {
        self.emu.resize_grid(cols, rows);
        self.emu.drain(host);
    }

    /// Encodes a mouse press/release per the active tracking mode and sends
    /// it through the delegate. Coordinates are 0-based cells.
    pub fn send_event(
        &mut self,
        button: MouseButton,
        kind: MouseEventKind,
        col: usize,
        row: usize,
        host: &mut dyn HostDelegate,
    ) {
        if let Some(bytes) = mouse::encode_mouse_event(&self.emu.modes, button, kind, col, row) {
            host.send(&bytes);
        }
    }

    /// Encodes mouse motion (with `button` held, or any motion in any-event
    /// mode).
    pub fn send_motion(
        &mut self,
        button: MouseButton,
        col: usize,
        row: usize,
        host: &mut dyn HostDelegate,
    ) {
        if let Some(bytes) =
            mouse::encode_mouse_event(&self.emu.modes, button, MouseEventKind::Motion, col, row)
        {
            host.send(&bytes);
        }
    }

    /// Out-of-band reply bytes from host logic (e.g. keyboard encoding).
    pub fn send_response(&mut self, text: &str, host: &mut dyn HostDelegate) {
        host.send(text.as_bytes());
    }

    /// Moves the displayed viewport by `delta` lines (negative = into
    /// history). The live screen is unaffected.
    pub fn scroll_display(&mut self, delta: isize, host: &mut dyn HostDelegate) {
        let buf = self.emu.buffers.active_mut();
        let old = buf.y_disp;
        let max = buf.y_base;
        let next = if delta < 0 {
            old.saturating_sub(delta.unsigned_abs())
        } else {
            old.saturating_add(delta as usize).min(max)
        };
        if next != old {
            buf.y_disp = next;
            self.emu.full_update();
            self.emu.notice(HostNotice::Scrolled(next));
        }
        self.emu.drain(host);
    }

    /// The dirty viewport rows touched since the last
    /// [`clear_update_range`](Terminal::clear_update_range), as an inclusive
    /// `(start, end)` pair.
    #[must_use]
    pub fn update_range(&self) -> Option<(usize, usize)> {
        self.emu.update
    }

    pub fn clear_update_range(&mut self) {
        self.emu.update = None;
    }

    /// Full reset, as if the engine were freshly constructed.
    pub fn reset(&mut self) {
        self.parser.reset();
        self.emu.full_reset();
    }

    // --- Read accessors ---

    /// The active screen buffer.
    #[must_use]
    pub fn buffer(&self) -> &Buffer {
        self.emu.buffers.active()
    }

    /// The normal (scrollback-carrying) buffer, active or not.
    #[must_use]
    pub fn normal_buffer(&self) -> &Buffer {
        self.emu.buffers.normal()
    }

    #[must_use]
    pub fn is_alternate(&self) -> bool {
        self.emu.buffers.is_alternate()
    }

    /// Cursor position `(col, row)` in viewport coordinates.
    #[must_use]
    pub fn cursor(&self) -> (usize, usize) {
        let buf = self.emu.buffers.active();
        (buf.x, buf.y)
    }

    /// The SGR attribute applied to subsequently printed cells.
    #[must_use]
    pub fn current_attr(&self) -> Attributes {
        self.emu.cur_attr
    }

    #[must_use]
    pub fn modes(&self) -> &Modes {
        &self.emu.modes
    }

    /// The last title set via OSC 0/1/2.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.emu.title
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.emu.cfg.cols
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.emu.cfg.rows
    }
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("cols", &self.emu.cfg.cols)
            .field("rows", &self.emu.cfg.rows)
            .field("alternate", &self.emu.buffers.is_alternate())
            .finish_non_exhaustive()
    }
}
