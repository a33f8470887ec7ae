//! NES System Bus Implementation.
//!
//! The bus connects the CPU to all other components:
//! - PPU registers ($2000-$2007, mirrored every 8 bytes to $3FFF)
//! - APU/IO registers ($4000-$4017)
//! - Cartridge space ($4020-$FFFF)
//! - Internal RAM ($0000-$07FF, mirrored to $1FFF)
//!
//! The PPU owns its own internal nametable/palette RAM, so this bus only
//! has to hand it a CHR read/write closure routed through the mapper -
//! there is no separate CIRAM buffer to maintain here.

use nesrs_apu::Apu;
#[cfg(feature = "std")]
use nesrs_apu::resampler::HighQualityResampler;
use nesrs_cpu::Bus;
use nesrs_mappers::Mapper;
use nesrs_ppu::Ppu;

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};

use crate::input::Controller;

/// Convert a mapper-reported mirroring mode into the PPU's own mirroring type.
///
/// `nesrs_mappers::Mirroring` and `nesrs_ppu::Mirroring` are distinct types
/// (cartridge mappers don't depend on the PPU crate), but share the same
/// variant set, so conversion is a straight 1:1 mapping.
fn convert_mirroring(mirroring: nesrs_mappers::Mirroring) -> nesrs_ppu::Mirroring {
    match mirroring {
        nesrs_mappers::Mirroring::Horizontal => nesrs_ppu::Mirroring::Horizontal,
        nesrs_mappers::Mirroring::Vertical => nesrs_ppu::Mirroring::Vertical,
        nesrs_mappers::Mirroring::SingleScreenLower => nesrs_ppu::Mirroring::SingleScreenLower,
        nesrs_mappers::Mirroring::SingleScreenUpper => nesrs_ppu::Mirroring::SingleScreenUpper,
        nesrs_mappers::Mirroring::FourScreen => nesrs_ppu::Mirroring::FourScreen,
    }
}

/// NES system bus connecting all components.
pub struct NesBus {
    /// Internal RAM (2KB, mirrored 4 times).
    pub ram: [u8; 2048],
    /// PPU (Picture Processing Unit).
    pub ppu: Ppu,
    /// APU (Audio Processing Unit).
    pub apu: Apu,
    /// Cartridge mapper.
    pub mapper: Box<dyn Mapper>,
    /// Controller 1.
    pub controller1: Controller,
    /// Controller 2.
    pub controller2: Controller,
    /// Last mirroring mode pushed to the PPU, so we only call
    /// `Ppu::set_mirroring` when a mapper (e.g. MMC1) actually changes it.
    last_mirroring: nesrs_mappers::Mirroring,
    /// OAM DMA page, set by a write to $4014 until `execute_oam_dma` drains it.
    oam_dma_page: Option<u8>,
    /// CPU cycle counter for DMA timing.
    cpu_cycles: u64,
    /// DMC DMA stall cycles remaining.
    dmc_stall_cycles: u8,
    /// Last value on the data bus (for open bus behavior).
    last_bus_value: u8,
    /// NMI pending from PPU.
    nmi_pending: bool,
    /// IRQ pending from mapper/APU.
    irq_pending: bool,
    /// APU-rate-to-output-rate resampler with the NES analog filter chain.
    #[cfg(feature = "std")]
    resampler: HighQualityResampler,
    /// `no_std` fallback: plain box-car downsample accumulator.
    #[cfg(not(feature = "std"))]
    sample_sum: f32,
    #[cfg(not(feature = "std"))]
    sample_count: u32,
    /// CPU cycles per audio sample, recomputed by `set_sample_rate`.
    #[cfg(not(feature = "std"))]
    cycles_per_sample: u32,
    #[cfg(not(feature = "std"))]
    audio_out: Vec<f32>,
}

impl NesBus {
    /// Default audio output sample rate, used until `set_sample_rate` is called.
    const DEFAULT_SAMPLE_RATE: u32 = 48_000;

    /// Create a new NES bus with the given mapper.
    pub fn new(mapper: Box<dyn Mapper>) -> Self {
        let mirroring = mapper.mirroring();
        Self {
            ram: [0; 2048],
            ppu: Ppu::new(convert_mirroring(mirroring)),
            apu: Apu::new(),
            mapper,
            controller1: Controller::new(),
            controller2: Controller::new(),
            last_mirroring: mirroring,
            oam_dma_page: None,
            cpu_cycles: 0,
            dmc_stall_cycles: 0,
            last_bus_value: 0,
            nmi_pending: false,
            irq_pending: false,
            #[cfg(feature = "std")]
            resampler: HighQualityResampler::new(Self::DEFAULT_SAMPLE_RATE),
            #[cfg(not(feature = "std"))]
            sample_sum: 0.0,
            #[cfg(not(feature = "std"))]
            sample_count: 0,
            #[cfg(not(feature = "std"))]
            cycles_per_sample: nesrs_apu::CPU_CLOCK_NTSC / Self::DEFAULT_SAMPLE_RATE,
            #[cfg(not(feature = "std"))]
            audio_out: Vec::new(),
        }
    }

    /// Reset the bus and all components.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.ppu.reset();
        self.apu.reset();
        self.mapper.reset();
        self.controller1.reset();
        self.controller2.reset();
        self.last_mirroring = self.mapper.mirroring();
        self.ppu.set_mirroring(convert_mirroring(self.last_mirroring));
        self.oam_dma_page = None;
        self.cpu_cycles = 0;
        self.dmc_stall_cycles = 0;
        self.last_bus_value = 0;
        self.nmi_pending = false;
        self.irq_pending = false;
        #[cfg(feature = "std")]
        self.resampler.reset();
        #[cfg(not(feature = "std"))]
        {
            self.sample_sum = 0.0;
            self.sample_count = 0;
            self.audio_out.clear();
        }
    }

    /// Re-create the resampler for a new output sample rate, discarding any
    /// buffered audio.
    #[cfg(feature = "std")]
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.resampler = HighQualityResampler::new(sample_rate);
    }

    /// Recompute the fallback box-car decimation ratio for a new output
    /// sample rate, discarding any buffered audio (`no_std` builds).
    #[cfg(not(feature = "std"))]
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.cycles_per_sample = (nesrs_apu::CPU_CLOCK_NTSC / sample_rate).max(1);
        self.sample_sum = 0.0;
        self.sample_count = 0;
        self.audio_out.clear();
    }

    /// Drain the resampled audio buffer, returning every sample produced
    /// since the last call.
    #[cfg(feature = "std")]
    pub fn drain_audio(&mut self) -> Vec<f32> {
        let samples = self.resampler.samples().to_vec();
        self.resampler.clear();
        samples
    }

    /// Drain the fallback audio buffer (`no_std` builds).
    #[cfg(not(feature = "std"))]
    pub fn drain_audio(&mut self) -> Vec<f32> {
        core::mem::take(&mut self.audio_out)
    }

    /// Peek at the resampled audio buffer without draining it.
    #[must_use]
    #[cfg(feature = "std")]
    pub fn audio_buffer(&self) -> &[f32] {
        self.resampler.samples()
    }

    /// Peek at the fallback audio buffer without draining it (`no_std` builds).
    #[must_use]
    #[cfg(not(feature = "std"))]
    pub fn audio_buffer(&self) -> &[f32] {
        &self.audio_out
    }

    /// Check if OAM DMA is pending.
    #[must_use]
    pub fn oam_dma_pending(&self) -> bool {
        self.oam_dma_page.is_some()
    }

    /// Execute OAM DMA transfer.
    ///
    /// Returns the number of CPU cycles consumed.
    pub fn execute_oam_dma(&mut self) -> u16 {
        if let Some(page) = self.oam_dma_page.take() {
            let base = u16::from(page) << 8;

            let mut data = [0u8; 256];
            for (i, slot) in data.iter_mut().enumerate() {
                *slot = self.cpu_read(base.wrapping_add(i as u16));
            }
            self.ppu.oam_dma(&data);

            // DMA takes 513 or 514 cycles depending on CPU cycle parity
            let cycles = if self.cpu_cycles % 2 == 1 { 514 } else { 513 };
            self.cpu_cycles += u64::from(cycles);
            cycles
        } else {
            0
        }
    }

    /// Internal CPU read without updating bus state (for DMA).
    fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x8000..=0xFFFF => self.mapper.read_prg(addr),
            _ => 0,
        }
    }

    /// Synchronize the PPU's mirroring mode with the mapper.
    fn sync_mapper(&mut self) {
        let mirroring = self.mapper.mirroring();
        if mirroring != self.last_mirroring {
            self.last_mirroring = mirroring;
            self.ppu.set_mirroring(convert_mirroring(mirroring));
        }
    }

    /// Step the PPU by 3 dots (one CPU cycle worth).
    ///
    /// Returns true if NMI should be triggered.
    pub fn step_ppu(&mut self) -> bool {
        let mut nmi = false;

        for _ in 0..3 {
            let mapper = &mut self.mapper;
            let (frame_complete, nmi_triggered) =
                self.ppu.step_with_chr(|addr| mapper.read_chr(addr));
            let _ = frame_complete;
            if nmi_triggered {
                nmi = true;
            }
            // MMC3's IRQ counter is clocked off CHR address-line A12 rising
            // edges, not scanline boundaries (spec.md §9 open question).
            if self.ppu.take_a12_rising_edge() {
                self.mapper.ppu_a12_rising();
            }
            self.sync_mapper();
        }

        self.mapper.clock(1);

        if nmi {
            self.nmi_pending = true;
        }

        nmi
    }

    /// Step the APU by one CPU cycle, feeding its raw output sample into the
    /// resampler / output buffer.
    pub fn step_apu(&mut self) {
        self.apu.clock();

        // Handle DMC sample fetch
        if self.apu.dmc_needs_sample() {
            let addr = self.apu.dmc_sample_addr();
            let sample = self.mapper.read_prg(addr);
            self.apu.dmc_fill_sample(sample);
            // DMC DMA stalls CPU for 4 cycles
            self.dmc_stall_cycles = 4;
        }

        let raw = self.apu.output();
        #[cfg(feature = "std")]
        self.resampler.add_sample(raw);
        #[cfg(not(feature = "std"))]
        {
            self.sample_sum += raw;
            self.sample_count += 1;
            if self.sample_count >= self.cycles_per_sample {
                #[allow(clippy::cast_precision_loss)]
                let sample = self.sample_sum / self.sample_count as f32;
                self.sample_count = 0;
                self.sample_sum = 0.0;
                self.audio_out.push(sample);
            }
        }
    }

    /// Check if NMI is pending.
    #[must_use]
    pub fn nmi_pending(&self) -> bool {
        self.nmi_pending
    }

    /// Acknowledge NMI.
    pub fn acknowledge_nmi(&mut self) {
        self.nmi_pending = false;
    }

    /// Check if IRQ is pending.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.irq_pending || self.mapper.irq_pending() || self.apu.irq_pending()
    }

    /// Acknowledge mapper IRQ.
    pub fn acknowledge_mapper_irq(&mut self) {
        self.mapper.irq_acknowledge();
    }

    /// Get the current CPU cycle count.
    #[must_use]
    pub fn cpu_cycles(&self) -> u64 {
        self.cpu_cycles
    }

    /// Increment CPU cycle count.
    pub fn add_cpu_cycles(&mut self, cycles: u8) {
        self.cpu_cycles += u64::from(cycles);
    }

    /// Check if DMC stall is active.
    #[must_use]
    pub fn dmc_stall_active(&self) -> bool {
        self.dmc_stall_cycles > 0
    }

    /// Decrement DMC stall counter.
    pub fn decrement_dmc_stall(&mut self) {
        if self.dmc_stall_cycles > 0 {
            self.dmc_stall_cycles -= 1;
        }
    }

    /// Peek at memory without side effects.
    ///
    /// This is useful for debugging/display purposes where we don't want
    /// to trigger PPU register side effects or mapper state changes.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            // Internal RAM (mirrored every 2KB)
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],

            // PPU registers - return last bus value to avoid side effects
            0x2000..=0x3FFF => self.last_bus_value,

            // APU and I/O registers
            0x4000..=0x4017 => match addr {
                0x4015 => self.apu.peek_status(),
                _ => self.last_bus_value,
            },

            // APU test mode
            0x4018..=0x401F => self.last_bus_value,

            // Cartridge space
            0x4020..=0xFFFF => self.mapper.read_prg(addr),
        }
    }
}

/// CPU bus implementation.
impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        let value = match addr {
            // Internal RAM (mirrored every 2KB)
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],

            // PPU registers (mirrored every 8 bytes)
            0x2000..=0x3FFF => {
                let mapper = &mut self.mapper;
                self.ppu.read_register(addr, |a| mapper.read_chr(a))
            }

            // APU and I/O registers
            0x4000..=0x4017 => match addr {
                0x4015 => self.apu.read_status(),
                0x4016 => self.controller1.read(),
                0x4017 => self.controller2.read(),
                _ => self.last_bus_value, // Write-only registers
            },

            // APU test mode (normally disabled)
            0x4018..=0x401F => self.last_bus_value,

            // Cartridge space
            0x4020..=0xFFFF => self.mapper.read_prg(addr),
        };

        self.last_bus_value = value;
        value
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.last_bus_value = val;

        match addr {
            // Internal RAM (mirrored every 2KB)
            0x0000..=0x1FFF => {
                self.ram[(addr & 0x07FF) as usize] = val;
            }

            // PPU registers (mirrored every 8 bytes)
            0x2000..=0x3FFF => {
                let mapper = &mut self.mapper;
                self.ppu.write_register(addr, val, |a, v| mapper.write_chr(a, v));
            }

            // APU and I/O registers
            0x4000..=0x4017 => match addr {
                0x4000..=0x4013 | 0x4015 | 0x4017 => {
                    self.apu.write(addr, val);
                }
                0x4014 => {
                    // OAM DMA
                    self.oam_dma_page = Some(val);
                }
                0x4016 => {
                    self.controller1.write_strobe(val);
                    self.controller2.write_strobe(val);
                }
                _ => {}
            },

            // APU test mode (normally disabled)
            0x4018..=0x401F => {}

            // Cartridge space
            0x4020..=0xFFFF => {
                self.mapper.write_prg(addr, val);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nesrs_mappers::{Nrom, Rom};

    #[cfg(not(feature = "std"))]
    use alloc::{boxed::Box, vec};

    /// Build a minimal NROM iNES image: 2x16KB PRG (NOP-filled, reset
    /// vector at $8000) and 1x8KB CHR.
    fn test_rom_bytes() -> Vec<u8> {
        let mut data = vec![0x4E, 0x45, 0x53, 0x1A, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut prg = vec![0xEA; 32768];
        prg[0x7FFC] = 0x00;
        prg[0x7FFD] = 0x80;
        data.extend_from_slice(&prg);
        data.extend_from_slice(&[0; 8192]);
        data
    }

    fn create_test_bus() -> NesBus {
        let rom = Rom::load(&test_rom_bytes()).unwrap();
        NesBus::new(Box::new(Nrom::new(&rom)))
    }

    #[test]
    fn test_ram_mirroring() {
        let mut bus = create_test_bus();

        // Write to $0000
        Bus::write(&mut bus, 0x0000, 0x42);
        assert_eq!(Bus::read(&mut bus, 0x0000), 0x42);

        // Should mirror to $0800, $1000, $1800
        assert_eq!(Bus::read(&mut bus, 0x0800), 0x42);
        assert_eq!(Bus::read(&mut bus, 0x1000), 0x42);
        assert_eq!(Bus::read(&mut bus, 0x1800), 0x42);

        // Write to mirrored address
        Bus::write(&mut bus, 0x1234, 0xAB);
        assert_eq!(Bus::read(&mut bus, 0x0234), 0xAB); // $1234 & $07FF = $0234
    }

    #[test]
    fn test_controller_strobe() {
        let mut bus = create_test_bus();

        // A, Select, Up, Right
        bus.controller1.set_buttons(0b1010_0101);

        // Strobe high then low to latch
        Bus::write(&mut bus, 0x4016, 1);
        Bus::write(&mut bus, 0x4016, 0);

        // Read buttons one at a time (bit 0 of each read)
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 1); // A
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 0); // B
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 1); // Select
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 0); // Start
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 0); // Up (bit 4)
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 1); // Down
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 0); // Left
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 1); // Right
    }

    #[test]
    fn test_oam_dma() {
        let mut bus = create_test_bus();

        // Fill RAM page 2 ($0200-$02FF) with test data
        for i in 0..256 {
            Bus::write(&mut bus, 0x0200 + i, i as u8);
        }

        // Trigger OAM DMA from page 2
        Bus::write(&mut bus, 0x4014, 0x02);
        assert!(bus.oam_dma_pending());

        // Execute DMA
        let cycles = bus.execute_oam_dma();
        assert!(!bus.oam_dma_pending());
        assert!(cycles == 513 || cycles == 514);
    }

    #[test]
    fn test_open_bus_behavior() {
        let mut bus = create_test_bus();

        // Read from a location to set bus value
        Bus::write(&mut bus, 0x0000, 0xAB);
        let _ = Bus::read(&mut bus, 0x0000);

        // Last bus value should be updated
        assert_eq!(bus.last_bus_value, 0xAB);
    }

    #[test]
    fn test_peek_memory() {
        let mut bus = create_test_bus();

        // Write to RAM
        Bus::write(&mut bus, 0x0100, 0x42);

        // Peek should return the value without side effects
        assert_eq!(bus.peek(0x0100), 0x42);

        // Peek at mirrored address
        assert_eq!(bus.peek(0x0900), 0x42);
    }

    #[test]
    fn test_reset() {
        let mut bus = create_test_bus();
        bus.nmi_pending = true;

        bus.reset();

        assert_eq!(Bus::read(&mut bus, 0x0000), 0);
        assert_eq!(bus.cpu_cycles, 0);
        assert!(!bus.nmi_pending);
    }

    #[test]
    fn test_step_ppu_advances_three_dots() {
        let mut bus = create_test_bus();
        let start = (bus.ppu.scanline(), bus.ppu.dot());
        bus.step_ppu();
        let end = (bus.ppu.scanline(), bus.ppu.dot());
        assert_ne!(start, end);
    }
}
