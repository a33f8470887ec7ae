//! MMC2 Mapper (Mapper 9).
//!
//! Used exclusively by Punch-Out!! and Mike Tyson's Punch-Out!!. Features:
//!
//! - 8KB switchable PRG-ROM bank at $8000-$9FFF; $A000-$FFFF fixed to the
//!   last three 8KB banks
//! - Two independently-latched 4KB CHR windows, each holding two selectable
//!   banks. The PPU's own background tile fetches flip the latch: reading
//!   tile $FD or $FE through a window selects which of its two banks serves
//!   every subsequent fetch through that window, until the other tile is
//!   fetched
//! - Mirroring control (H/V)
//! - No PRG-RAM, no IRQ
//!
//! Register layout:
//! - $A000-$AFFF: PRG bank select (4 bits)
//! - $B000-$BFFF: CHR bank for $0000-$0FFF when latch 0 reads $FD
//! - $C000-$CFFF: CHR bank for $0000-$0FFF when latch 0 reads $FE
//! - $D000-$DFFF: CHR bank for $1000-$1FFF when latch 1 reads $FD
//! - $E000-$EFFF: CHR bank for $1000-$1FFF when latch 1 reads $FE
//! - $F000-$FFFF: Mirroring (bit 0: 0 = vertical, 1 = horizontal)

use crate::mapper::{Mapper, Mirroring};
use crate::rom::Rom;

use core::cell::Cell;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// CHR latch value fetched by the PPU's $FD/$FE tile reads.
const LATCH_FD: u8 = 0xFD;
/// CHR latch value fetched by the PPU's $FD/$FE tile reads.
const LATCH_FE: u8 = 0xFE;

/// MMC2 mapper implementation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mmc2 {
    /// PRG-ROM data.
    prg_rom: Vec<u8>,
    /// CHR-ROM data.
    chr_rom: Vec<u8>,
    /// Number of 8KB PRG-ROM banks.
    prg_banks: usize,
    /// Number of 4KB CHR-ROM banks.
    chr_banks: usize,

    /// Switchable 8KB PRG bank at $8000-$9FFF.
    prg_bank: u8,

    /// CHR bank for $0000-$0FFF, latch state $FD.
    chr_bank_low_fd: u8,
    /// CHR bank for $0000-$0FFF, latch state $FE.
    chr_bank_low_fe: u8,
    /// CHR bank for $1000-$1FFF, latch state $FD.
    chr_bank_high_fd: u8,
    /// CHR bank for $1000-$1FFF, latch state $FE.
    chr_bank_high_fe: u8,

    /// Current latch state for the $0000-$0FFF window ($FD or $FE).
    latch_low: Cell<u8>,
    /// Current latch state for the $1000-$1FFF window ($FD or $FE).
    latch_high: Cell<u8>,

    /// Nametable mirroring mode.
    mirroring: Mirroring,
}

impl Mmc2 {
    /// Create a new MMC2 mapper from ROM data.
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        let prg_banks = (rom.prg_rom.len() / 8192).max(1);
        let chr_banks = (rom.chr_rom.len() / 4096).max(1);

        Self {
            prg_rom: rom.prg_rom.clone(),
            chr_rom: rom.chr_rom.clone(),
            prg_banks,
            chr_banks,
            prg_bank: 0,
            chr_bank_low_fd: 0,
            chr_bank_low_fe: 0,
            chr_bank_high_fd: 0,
            chr_bank_high_fe: 0,
            latch_low: Cell::new(LATCH_FE),
            latch_high: Cell::new(LATCH_FE),
            mirroring: rom.header.mirroring,
        }
    }

    /// Update the CHR latch for a window given the tile-fetch address that
    /// just occurred in it.
    ///
    /// Real hardware flips the latch only on a fetch of tile $FD or $FE
    /// landing on the second byte-plane row of that tile ($xFD8/$xFE8);
    /// any other fetch through the window leaves the latch untouched.
    fn update_latch(latch: &Cell<u8>, window_addr: u16) {
        match window_addr {
            0x0FD8..=0x0FDF => latch.set(LATCH_FD),
            0x0FE8..=0x0FEF => latch.set(LATCH_FE),
            _ => {}
        }
    }
}

impl Mapper for Mmc2 {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0x9FFF => {
                let bank = (self.prg_bank as usize) % self.prg_banks;
                let offset = (addr - 0x8000) as usize;
                self.prg_rom.get(bank * 8192 + offset).copied().unwrap_or(0)
            }
            0xA000..=0xFFFF => {
                // Fixed to the last three 8KB banks, in order.
                let fixed_index = (addr - 0xA000) / 0x2000;
                let bank = self
                    .prg_banks
                    .saturating_sub(3)
                    .saturating_add(fixed_index as usize)
                    % self.prg_banks;
                let offset = (addr & 0x1FFF) as usize;
                self.prg_rom.get(bank * 8192 + offset).copied().unwrap_or(0)
            }
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, val: u8) {
        match addr {
            0xA000..=0xAFFF => self.prg_bank = val & 0x0F,
            0xB000..=0xBFFF => self.chr_bank_low_fd = val & 0x1F,
            0xC000..=0xCFFF => self.chr_bank_low_fe = val & 0x1F,
            0xD000..=0xDFFF => self.chr_bank_high_fd = val & 0x1F,
            0xE000..=0xEFFF => self.chr_bank_high_fe = val & 0x1F,
            0xF000..=0xFFFF => {
                self.mirroring = if val & 1 != 0 {
                    Mirroring::Horizontal
                } else {
                    Mirroring::Vertical
                };
            }
            _ => {}
        }
    }

    fn read_chr(&self, addr: u16) -> u8 {
        let addr = addr & 0x1FFF;

        let value = match addr {
            0x0000..=0x0FFF => {
                let bank = if self.latch_low.get() == LATCH_FD {
                    self.chr_bank_low_fd
                } else {
                    self.chr_bank_low_fe
                };
                let bank = (bank as usize) % self.chr_banks;
                let offset = addr as usize;
                self.chr_rom.get(bank * 4096 + offset).copied().unwrap_or(0)
            }
            _ => {
                let window_addr = addr - 0x1000;
                let bank = if self.latch_high.get() == LATCH_FD {
                    self.chr_bank_high_fd
                } else {
                    self.chr_bank_high_fe
                };
                let bank = (bank as usize) % self.chr_banks;
                let offset = window_addr as usize;
                self.chr_rom.get(bank * 4096 + offset).copied().unwrap_or(0)
            }
        };

        if addr < 0x1000 {
            Self::update_latch(&self.latch_low, addr);
        } else {
            Self::update_latch(&self.latch_high, addr - 0x1000);
        }

        value
    }

    fn write_chr(&mut self, _addr: u16, _val: u8) {
        // MMC2 cartridges use CHR-ROM only; writes are ignored.
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_number(&self) -> u16 {
        9
    }

    fn mapper_name(&self) -> &'static str {
        "MMC2"
    }

    fn reset(&mut self) {
        self.prg_bank = 0;
        self.chr_bank_low_fd = 0;
        self.chr_bank_low_fe = 0;
        self.chr_bank_high_fd = 0;
        self.chr_bank_high_fe = 0;
        self.latch_low.set(LATCH_FE);
        self.latch_high.set(LATCH_FE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::RomHeader;

    fn create_test_rom(prg_banks: u8, chr_banks: u8) -> Rom {
        let prg_size = prg_banks as usize * 8192;
        let chr_size = chr_banks as usize * 4096;

        // Fill each PRG bank with its bank number.
        let mut prg_rom = vec![0u8; prg_size];
        for bank in 0..prg_banks as usize {
            for i in 0..8192 {
                prg_rom[bank * 8192 + i] = bank as u8;
            }
        }

        // Fill each CHR bank with its bank number.
        let mut chr_rom = vec![0u8; chr_size];
        for bank in 0..chr_banks as usize {
            for i in 0..4096 {
                chr_rom[bank * 4096 + i] = bank as u8;
            }
        }

        Rom {
            header: RomHeader {
                prg_rom_size: prg_size,
                chr_rom_size: chr_size,
                mapper_number: 9,
                submapper: 0,
                mirroring: Mirroring::Vertical,
                has_battery: false,
                has_trainer: false,
                nes2_format: false,
                prg_ram_size: 0,
                prg_nvram_size: 0,
                chr_ram_size: 0,
                chr_nvram_size: 0,
            },
            prg_rom,
            chr_rom,
            trainer: None,
        }
    }

    #[test]
    fn test_mmc2_fixed_banks() {
        let rom = create_test_rom(16, 16); // 128KB PRG, 64KB CHR
        let mapper = Mmc2::new(&rom);

        // Last three banks (13, 14, 15) fixed at $A000, $C000, $E000.
        assert_eq!(mapper.read_prg(0xA000), 13);
        assert_eq!(mapper.read_prg(0xC000), 14);
        assert_eq!(mapper.read_prg(0xE000), 15);
    }

    #[test]
    fn test_mmc2_prg_bank_switching() {
        let rom = create_test_rom(16, 16);
        let mut mapper = Mmc2::new(&rom);

        assert_eq!(mapper.read_prg(0x8000), 0);

        mapper.write_prg(0xA000, 5);
        assert_eq!(mapper.read_prg(0x8000), 5);

        // Fixed banks are unaffected by the switchable bank register.
        assert_eq!(mapper.read_prg(0xE000), 15);
    }

    #[test]
    fn test_mmc2_chr_latch_defaults_to_fe() {
        let rom = create_test_rom(2, 16);
        let mut mapper = Mmc2::new(&rom);

        mapper.write_prg(0xB000, 2); // low window, latch FD -> bank 2
        mapper.write_prg(0xC000, 4); // low window, latch FE -> bank 4

        // Power-on latch state is $FE, so the low window reads bank 4.
        assert_eq!(mapper.read_chr(0x0000), 4);
    }

    #[test]
    fn test_mmc2_chr_latch_flips_on_fd_fe_fetch() {
        let rom = create_test_rom(2, 16);
        let mut mapper = Mmc2::new(&rom);

        mapper.write_prg(0xB000, 2); // latch FD -> bank 2
        mapper.write_prg(0xC000, 4); // latch FE -> bank 4

        assert_eq!(mapper.read_chr(0x0000), 4);

        // Fetching the $FD tile's second row flips the low-window latch.
        mapper.read_chr(0x0FD8);
        assert_eq!(mapper.read_chr(0x0000), 2);

        // Fetching the $FE tile's second row flips it back.
        mapper.read_chr(0x0FE8);
        assert_eq!(mapper.read_chr(0x0000), 4);
    }

    #[test]
    fn test_mmc2_chr_high_window_independent_latch() {
        let rom = create_test_rom(2, 16);
        let mut mapper = Mmc2::new(&rom);

        mapper.write_prg(0xD000, 6); // high window, latch FD -> bank 6
        mapper.write_prg(0xE000, 8); // high window, latch FE -> bank 8

        assert_eq!(mapper.read_chr(0x1000), 8);

        // Flipping the low window's latch must not affect the high window.
        mapper.read_chr(0x0FD8);
        assert_eq!(mapper.read_chr(0x1000), 8);

        mapper.read_chr(0x1FD8);
        assert_eq!(mapper.read_chr(0x1000), 6);
    }

    #[test]
    fn test_mmc2_mirroring_control() {
        let rom = create_test_rom(2, 16);
        let mut mapper = Mmc2::new(&rom);

        assert_eq!(mapper.mirroring(), Mirroring::Vertical);

        mapper.write_prg(0xF000, 1);
        assert_eq!(mapper.mirroring(), Mirroring::Horizontal);

        mapper.write_prg(0xF000, 0);
        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
    }

    #[test]
    fn test_mmc2_no_battery_or_irq() {
        let rom = create_test_rom(2, 16);
        let mapper = Mmc2::new(&rom);

        assert!(!mapper.has_battery());
        assert!(mapper.battery_ram().is_none());
        assert!(!mapper.irq_pending());
        assert_eq!(mapper.mapper_name(), "MMC2");
        assert_eq!(mapper.mapper_number(), 9);
    }
}
