// src/delegate.rs

//! The narrow surface between the engine and its host.
//!
//! The engine never talks to a pseudo-terminal or a window directly. Replies
//! and notifications are staged internally as `HostNotice` values while a
//! command executes, then drained onto the borrowed `HostDelegate` before the
//! originating public call returns. Delegate methods run synchronously and
//! must not re-enter `Terminal::feed`.

/// Callback surface implemented by the host UI / transport.
pub trait HostDelegate {
    /// Terminal-originated reply bytes (device attributes, DSR, mouse
    /// reports) destined for the child process.
    fn send(&mut self, bytes: &[u8]);

    /// OSC 0/1/2 window title change.
    fn set_terminal_title(&mut self, title: &str);

    /// BEL received.
    fn bell(&mut self);

    /// A line feed was executed.
    fn linefeed(&mut self);

    /// The cursor became visible (DECTCEM set).
    fn show_cursor(&mut self);

    /// The displayed top line changed; `y_disp` is the new first displayed
    /// ring index of the active buffer.
    fn scrolled(&mut self, y_disp: usize);

    /// The active buffer switched between normal and alternate.
    fn buffer_activated(&mut self);

    /// The grid was resized.
    fn size_changed(&mut self, cols: usize, rows: usize);

    /// One character was printed; only emitted in screen-reader mode.
    fn char_printed(&mut self, _ch: char) {}
}

/// A staged delegate call, recorded during dispatch and replayed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostNotice {
    Send(Vec<u8>),
    Title(String),
    Bell,
    Linefeed,
    ShowCursor,
    Scrolled(usize),
    BufferActivated,
    SizeChanged(usize, usize),
    CharPrinted(char),
}

impl HostNotice {
    /// Replay this notice onto the delegate.
    pub fn deliver(self, host: &mut dyn HostDelegate) {
        match self {
            HostNotice::Send(bytes) => host.send(&bytes),
            HostNotice::Title(title) => host.set_terminal_title(&title),
            HostNotice::Bell => host.bell(),
            HostNotice::Linefeed => host.linefeed(),
            HostNotice::ShowCursor => host.show_cursor(),
            HostNotice::Scrolled(y_disp) => host.scrolled(y_disp),
            HostNotice::BufferActivated => host.buffer_activated(),
            HostNotice::SizeChanged(cols, rows) => host.size_changed(cols, rows),
            HostNotice::CharPrinted(ch) => host.char_printed(ch),
        }
    }
}
