// src/lib.rs

//! A headless VT-compatible terminal emulator engine.
//!
//! The engine consumes raw bytes from a child process and maintains a grid
//! of styled cells plus bounded scrollback. It draws nothing and owns no
//! file descriptors: a host embeds it, feeds it bytes, reads the grid, and
//! receives replies (device attributes, mouse reports) and notifications
//! (bell, title, scroll) through the [`HostDelegate`] trait.
//!
//! ```no_run
//! use vtcore::{Terminal, TermConfig, HostDelegate};
//!
//! struct Host;
//! impl HostDelegate for Host {
//!     fn send(&mut self, bytes: &[u8]) { /* write to the pty */ }
//!     fn set_terminal_title(&mut self, _title: &str) {}
//!     fn bell(&mut self) {}
//!     fn linefeed(&mut self) {}
//!     fn show_cursor(&mut self) {}
//!     fn scrolled(&mut self, _y_disp: usize) {}
//!     fn buffer_activated(&mut self) {}
//!     fn size_changed(&mut self, _cols: usize, _rows: usize) {}
//! }
//!
//! let mut host = Host;
//! let mut term = Terminal::new(TermConfig::default());
//! term.feed(b"\x1b[1;31mhello\x1b[0m\r\n", &mut host);
//! assert_eq!(term.buffer().line(0).unwrap().text().trim_end(), "hello");
//! ```

pub mod cell;
pub mod color;
pub mod config;
pub mod delegate;
pub mod grid;
pub mod parser;
pub mod term;

pub use cell::{AttrFlags, Attributes, Cell, CellContent};
pub use color::Color;
pub use config::{TermConfig, TermKind};
pub use delegate::HostDelegate;
pub use grid::{Buffer, BufferSet, Line};
pub use term::{Modes, MouseButton, MouseEventKind, Terminal};
