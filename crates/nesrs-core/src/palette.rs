//! NES master palette (64 entries, PPU palette index -> RGB).
//!
//! The 2C02 only drives each color channel to one of 8 intensity levels;
//! the table below stores those raw 0-7 levels and [`palette_to_rgb`]
//! scales them up to 0-255 by multiplying by `255/7`, matching the
//! reference PPU's color generator.

/// Raw palette table: 64 entries of (R, G, B) in 0-7 levels each.
pub const NES_PALETTE: [(u8, u8, u8); 64] = [
    (3, 3, 3), (0, 1, 4), (0, 0, 6), (3, 2, 6),
    (4, 0, 3), (5, 0, 3), (5, 1, 0), (4, 2, 0),
    (3, 2, 0), (1, 2, 0), (0, 3, 1), (0, 4, 0),
    (0, 2, 2), (0, 0, 0), (0, 0, 0), (0, 0, 0),
    (5, 5, 5), (0, 3, 6), (0, 2, 7), (4, 0, 7),
    (5, 0, 7), (7, 0, 4), (7, 0, 0), (6, 3, 0),
    (4, 3, 0), (1, 4, 0), (0, 4, 0), (0, 5, 3),
    (0, 4, 4), (0, 0, 0), (0, 0, 0), (0, 0, 0),
    (7, 7, 7), (3, 5, 7), (4, 4, 7), (6, 3, 7),
    (7, 0, 7), (7, 3, 7), (7, 4, 0), (7, 5, 0),
    (6, 6, 0), (3, 6, 0), (0, 7, 0), (2, 7, 6),
    (0, 7, 7), (4, 4, 4), (0, 0, 0), (0, 0, 0),
    (7, 7, 7), (5, 6, 7), (6, 5, 7), (7, 5, 7),
    (7, 4, 7), (7, 5, 5), (7, 6, 4), (7, 7, 2),
    (7, 7, 3), (5, 7, 2), (4, 7, 3), (2, 7, 6),
    (4, 6, 7), (6, 6, 6), (0, 0, 0), (0, 0, 0),
];

/// Scale factor from a 0-7 channel level to 0-255.
const LEVEL_SCALE: f32 = 255.0 / 7.0;

/// Convert a 6-bit PPU palette index into 8-bit-per-channel RGB.
///
/// The index is masked to 0-63 before lookup, matching the PPU's
/// `$3F00`-`$3F1F` palette RAM wraparound.
#[must_use]
pub fn palette_to_rgb(index: u8) -> (u8, u8, u8) {
    let (r, g, b) = NES_PALETTE[(index & 0x3F) as usize];
    (
        (f32::from(r) * LEVEL_SCALE).round() as u8,
        (f32::from(g) * LEVEL_SCALE).round() as u8,
        (f32::from(b) * LEVEL_SCALE).round() as u8,
    )
}
