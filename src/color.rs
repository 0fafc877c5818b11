// src/color.rs

//! Palette color model for terminal cells.
//!
//! Cells carry palette indices, not concrete RGB values; resolving an index
//! to pixels is the host's job. The engine only needs the reverse mapping:
//! SGR 38/48;2 truecolor parameters are folded onto the nearest entry of the
//! standard 256-color table.

use serde::{Deserialize, Serialize};

/// Number of entries in the standard palette (16 ANSI + 216 cube + 24 gray).
pub const PALETTE_SIZE: usize = 256;

/// Offset added to map SGR 90-97 / 100-107 onto the bright palette entries.
pub const BRIGHT_OFFSET: u8 = 8;

/// A cell color: either the host-configured default or a palette index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Color {
    /// Terminal default foreground or background (SGR 39 / 49).
    #[default]
    Default,
    /// 256-color palette index.
    Indexed(u8),
}

/// RGB value of a standard-palette entry.
///
/// Entries 0-15 use the common xterm ANSI values, 16-231 the 6x6x6 color
/// cube, and 232-255 the grayscale ramp.
pub fn palette_rgb(index: u8) -> (u8, u8, u8) {
    const ANSI16: [(u8, u8, u8); 16] = [
        (0x00, 0x00, 0x00),
        (0xcd, 0x00, 0x00),
        (0x00, 0xcd, 0x00),
        (0xcd, 0xcd, 0x00),
        (0x00, 0x00, 0xee),
        (0xcd, 0x00, 0xcd),
        (0x00, 0xcd, 0xcd),
        (0xe5, 0xe5, 0xe5),
        (0x7f, 0x7f, 0x7f),
        (0xff, 0x00, 0x00),
        (0x00, 0xff, 0x00),
        (0xff, 0xff, 0x00),
        (0x5c, 0x5c, 0xff),
        (0xff, 0x00, 0xff),
        (0x00, 0xff, 0xff),
        (0xff, 0xff, 0xff),
    ];
    match index {
        0..=15 => ANSI16[index as usize],
        16..=231 => {
            let idx = index - 16;
            let cube = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            (cube(idx / 36), cube((idx / 6) % 6), cube(idx % 6))
        }
        232..=255 => {
            let level = 8 + (index - 232) * 10;
            (level, level, level)
        }
    }
}

/// Map an arbitrary RGB triple onto the nearest standard-palette index.
///
/// Plain Euclidean distance in RGB space; ties resolve to the lowest index.
pub fn nearest_indexed(r: u8, g: u8, b: u8) -> u8 {
    let mut best = 0u8;
    let mut best_dist = u32::MAX;
    for index in 0..PALETTE_SIZE as u16 {
        let (pr, pg, pb) = palette_rgb(index as u8);
        let dr = i32::from(pr) - i32::from(r);
        let dg = i32::from(pg) - i32::from(g);
        let db = i32::from(pb) - i32::from(b);
        let dist = (dr * dr + dg * dg + db * db) as u32;
        if dist < best_dist {
            best_dist = dist;
            best = index as u8;
        }
    }
    best
}
