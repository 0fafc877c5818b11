// src/cell.rs

//! The atomic grid element and its styling.
//!
//! A `Cell` is one column of one screen line. Narrow characters occupy a
//! single cell; a double-width character occupies a `WideHead` cell followed
//! by a `WideTail` spacer that inherits its appearance from the head.
//! `Attributes` is a plain value type: cell writes copy it, nothing aliases.

use crate::color::Color;
use bitflags::bitflags;

bitflags! {
    /// SGR style flag bits carried by every cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrFlags: u16 {
        const BOLD      = 1 << 0;
        const DIM       = 1 << 1;
        const ITALIC    = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK     = 1 << 4;
        const INVERSE   = 1 << 5;
        const INVISIBLE = 1 << 6;
    }
}

/// Visual attributes of a cell: foreground, background, and flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Attributes {
    pub fg: Color,
    pub bg: Color,
    pub flags: AttrFlags,
}

impl Attributes {
    /// The attribute used by erase operations: current background color,
    /// default foreground, no flags.
    #[must_use]
    pub fn erase_from(current: Attributes) -> Self {
        Attributes {
            fg: Color::Default,
            bg: current.bg,
            flags: AttrFlags::empty(),
        }
    }
}

/// Character content of a `Narrow` or `WideHead` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellContent {
    pub ch: char,
    pub attr: Attributes,
}

/// Placeholder returned by `Cell::ch()` for wide-character spacers.
pub const WIDE_SPACER_PLACEHOLDER: char = '\0';

/// One grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    /// A standard single-column character.
    Narrow(CellContent),
    /// The left half of a double-width character; holds the character itself.
    WideHead(CellContent),
    /// The right half of a double-width character. Carries no content of its
    /// own; appearance comes from the preceding `WideHead`.
    WideTail,
}

impl Cell {
    /// A blank cell (space) carrying the given attribute.
    #[must_use]
    pub fn blank(attr: Attributes) -> Self {
        Cell::Narrow(CellContent { ch: ' ', attr })
    }

    /// The displayable character, or the spacer placeholder for `WideTail`.
    #[must_use]
    pub fn ch(&self) -> char {
        match self {
            Cell::Narrow(c) | Cell::WideHead(c) => c.ch,
            Cell::WideTail => WIDE_SPACER_PLACEHOLDER,
        }
    }

    /// The attribute, defaulting for `WideTail`.
    #[must_use]
    pub fn attr(&self) -> Attributes {
        match self {
            Cell::Narrow(c) | Cell::WideHead(c) => c.attr,
            Cell::WideTail => Attributes::default(),
        }
    }

    /// Display width in columns: 1 for narrow, 2 for a wide head, 0 for the
    /// trailing spacer.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Cell::Narrow(_) => 1,
            Cell::WideHead(_) => 2,
            Cell::WideTail => 0,
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::blank(Attributes::default())
    }
}
