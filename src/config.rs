// src/config.rs

//! Engine configuration.
//!
//! Hosts hand a `TermConfig` to `Terminal::new`. Every field has a sane
//! default; `validated` rejects degenerate values so misconfiguration is
//! caught at the boundary instead of clamped silently deep inside.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Default tab stop interval.
pub const DEFAULT_TAB_INTERVAL: usize = 8;

/// Which family of device-attribute replies the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Xterm,
    Rxvt,
    Screen,
    Linux,
}

/// Terminal engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermConfig {
    /// Grid width in columns.
    pub cols: usize,
    /// Grid height in rows.
    pub rows: usize,
    /// Lines of history retained above the normal buffer's viewport.
    pub scrollback: usize,
    /// Advertised terminal name; selects the device-attribute reply family
    /// by prefix.
    pub term_name: String,
    /// When set, a bare LF also performs a carriage return.
    pub convert_eol: bool,
    /// When set, every printed character is reported through
    /// `HostDelegate::char_printed`.
    pub screen_reader_mode: bool,
}

impl Default for TermConfig {
    fn default() -> Self {
        TermConfig {
            cols: 80,
            rows: 25,
            scrollback: 200,
            term_name: "xterm-256color".to_string(),
            convert_eol: false,
            screen_reader_mode: false,
        }
    }
}

impl TermConfig {
    /// Checks the configuration for values the engine cannot operate with.
    pub fn validated(self) -> Result<Self> {
        if self.cols == 0 || self.rows == 0 {
            bail!(
                "terminal dimensions must be non-zero, got {}x{}",
                self.cols,
                self.rows
            );
        }
        if self.term_name.is_empty() {
            bail!("term_name must not be empty");
        }
        Ok(self)
    }

    /// The device-attribute reply family for `term_name`, by prefix.
    #[must_use]
    pub fn term_kind(&self) -> TermKind {
        if self.term_name.starts_with("linux") {
            TermKind::Linux
        } else if self.term_name.starts_with("rxvt-unicode") {
            TermKind::Rxvt
        } else if self.term_name.starts_with("screen") {
            TermKind::Screen
        } else {
            TermKind::Xterm
        }
    }
}
