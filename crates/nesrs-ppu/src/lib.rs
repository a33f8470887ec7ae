//! Cycle-accurate Ricoh 2C02 PPU (Picture Processing Unit) emulator for NES.
//!
//! This crate implements the NES PPU's dot-by-dot rendering pipeline:
//! background tile fetching, sprite evaluation and rendering, scroll
//! register handling (the "loopy" `v`/`t`/`x`/`w` model), and the internal
//! 2KB nametable RAM with configurable mirroring.
//!
//! # Architecture
//!
//! The PPU does not own a reference to cartridge CHR memory. Instead,
//! [`Ppu::step_with_chr`] and the register accessors take a CHR-read closure
//! supplied by the caller each call, letting the host crate own the mapper
//! and route pattern-table fetches through bank switching.
//!
//! # Example
//!
//! ```no_run
//! use nesrs_ppu::{Ppu, Mirroring};
//!
//! let mut ppu = Ppu::new(Mirroring::Horizontal);
//! let chr = [0u8; 0x2000];
//! ppu.write_register(0x2000, 0x80, |_, _| {});
//! let (frame_complete, nmi) = ppu.step_with_chr(|addr| chr[addr as usize]);
//! let _pixels = ppu.frame_buffer();
//! ```

#![warn(missing_docs)]

mod background;
mod oam;
mod ppu;
mod registers;
mod scroll;
mod sprites;
mod timing;
mod vram;

pub use ppu::{FRAME_HEIGHT, FRAME_SIZE, FRAME_WIDTH, Ppu};
pub use registers::{PpuCtrl, PpuMask, PpuStatus};
pub use vram::Mirroring;
