//! nestest.nes golden log validation test.
//!
//! This integration test validates the CPU implementation against the
//! nestest.nes golden log, ensuring cycle-accurate emulation.
//!
//! `nesrs-cpu` is a leaf crate (no dependency on the iNES/mapper parser in
//! `nesrs-mappers`), so this test parses just enough of the 16-byte iNES
//! header itself and builds its own nestest.log-format tracer locally,
//! rather than pulling in the full cartridge stack for a CPU-only check.

use nesrs_cpu::{AddressingMode, Bus, Cpu, OPCODE_TABLE};
use std::fmt::Write as _;
use std::path::PathBuf;

/// The handful of iNES header fields this test needs.
struct RawRom {
    mapper: u8,
    prg_rom: Vec<u8>,
}

impl RawRom {
    fn load(path: &PathBuf) -> Result<Self, String> {
        let data = std::fs::read(path).map_err(|e| e.to_string())?;
        if data.len() < 16 || &data[0..4] != b"NES\x1A" {
            return Err("not an iNES file".to_string());
        }
        let prg_banks = data[4] as usize;
        let has_trainer = data[6] & 0x04 != 0;
        let mapper = (data[6] >> 4) | (data[7] & 0xF0);

        let prg_start = 16 + if has_trainer { 512 } else { 0 };
        let prg_size = prg_banks * 16384;
        let prg_rom = data
            .get(prg_start..prg_start + prg_size)
            .ok_or("PRG-ROM truncated")?
            .to_vec();

        Ok(Self { mapper, prg_rom })
    }
}

/// Simple bus implementation for nestest.
///
/// nestest uses mapper 0 (NROM) which has simple memory mapping:
/// - $0000-$07FF: 2KB internal RAM (mirrored to $0800-$1FFF)
/// - $8000-$BFFF: First 16KB of PRG-ROM
/// - $C000-$FFFF: Last 16KB of PRG-ROM (or mirror of first 16KB if only 16KB total)
struct NestestBus {
    ram: [u8; 0x0800],  // 2KB RAM
    apu_io: [u8; 0x20], // APU and I/O registers ($4000-$401F)
    prg_rom: Vec<u8>,   // PRG-ROM data
}

impl NestestBus {
    fn new(rom: &RawRom) -> Self {
        Self {
            ram: [0; 0x0800],
            apu_io: [0xFF; 0x20], // Initialize APU/IO registers to 0xFF for nestest
            prg_rom: rom.prg_rom.clone(),
        }
    }
}

impl Bus for NestestBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            // 2KB RAM, mirrored 4 times
            0x0000..=0x1FFF => {
                let mirror_addr = addr & 0x07FF;
                self.ram[mirror_addr as usize]
            }

            // PPU registers (not needed for CPU-only test)
            0x2000..=0x3FFF => 0,

            // APU and I/O registers
            0x4000..=0x401F => {
                let reg_addr = (addr - 0x4000) as usize;
                self.apu_io[reg_addr]
            }

            // Cartridge space
            0x6000..=0x7FFF => 0, // Battery-backed RAM (not used by nestest)

            // PRG-ROM
            0x8000..=0xFFFF => {
                let rom_addr = (addr - 0x8000) as usize;

                // Handle ROM mirroring for 16KB ROMs
                if self.prg_rom.len() == 16384 {
                    // Mirror: $C000-$FFFF maps to same data as $8000-$BFFF
                    self.prg_rom[rom_addr % 16384]
                } else {
                    // 32KB ROM: direct mapping
                    self.prg_rom[rom_addr]
                }
            }

            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr {
            // 2KB RAM, mirrored 4 times
            0x0000..=0x1FFF => {
                let mirror_addr = addr & 0x07FF;
                self.ram[mirror_addr as usize] = value;
            }

            // PPU registers (ignored)
            0x2000..=0x3FFF => {}

            // APU and I/O registers
            0x4000..=0x401F => {
                let reg_addr = (addr - 0x4000) as usize;
                self.apu_io[reg_addr] = value;
            }

            // Cartridge space
            0x6000..=0x7FFF => {} // Battery-backed RAM (ignored)

            // PRG-ROM (writes ignored)
            0x8000..=0xFFFF => {}

            _ => {}
        }
    }
}

/// Number of operand bytes following the opcode, by addressing mode.
fn operand_byte_count(mode: AddressingMode) -> usize {
    match mode {
        AddressingMode::Implied | AddressingMode::Accumulator => 0,
        AddressingMode::Immediate
        | AddressingMode::Relative
        | AddressingMode::ZeroPage
        | AddressingMode::ZeroPageX
        | AddressingMode::ZeroPageY
        | AddressingMode::IndexedIndirectX
        | AddressingMode::IndirectIndexedY => 1,
        AddressingMode::Absolute
        | AddressingMode::AbsoluteX
        | AddressingMode::AbsoluteY
        | AddressingMode::Indirect => 2,
    }
}

/// Disassemble the instruction at `pc` in nestest.log format (operand part only).
#[allow(clippy::too_many_lines)]
fn disassemble(cpu: &Cpu, bus: &mut impl Bus, pc: u16, mnemonic: &str, prefix: &str, mode: AddressingMode) -> String {
    match mode {
        AddressingMode::Implied => format!("{prefix}{mnemonic}"),
        AddressingMode::Accumulator => format!("{prefix}{mnemonic} A"),
        AddressingMode::Immediate => {
            let value = bus.read(pc.wrapping_add(1));
            format!("{prefix}{mnemonic} #${value:02X}")
        }
        AddressingMode::ZeroPage => {
            let addr = bus.read(pc.wrapping_add(1));
            let value = bus.read(addr as u16);
            format!("{prefix}{mnemonic} ${addr:02X} = {value:02X}")
        }
        AddressingMode::ZeroPageX => {
            let base = bus.read(pc.wrapping_add(1));
            let addr = base.wrapping_add(cpu.x);
            let value = bus.read(addr as u16);
            format!("{prefix}{mnemonic} ${base:02X},X @ {addr:02X} = {value:02X}")
        }
        AddressingMode::ZeroPageY => {
            let base = bus.read(pc.wrapping_add(1));
            let addr = base.wrapping_add(cpu.y);
            let value = bus.read(addr as u16);
            format!("{prefix}{mnemonic} ${base:02X},Y @ {addr:02X} = {value:02X}")
        }
        AddressingMode::Absolute => {
            let lo = bus.read(pc.wrapping_add(1));
            let hi = bus.read(pc.wrapping_add(2));
            let addr = u16::from_le_bytes([lo, hi]);
            if mnemonic == "JMP" || mnemonic == "JSR" {
                format!("{prefix}{mnemonic} ${addr:04X}")
            } else {
                let value = bus.read(addr);
                format!("{prefix}{mnemonic} ${addr:04X} = {value:02X}")
            }
        }
        AddressingMode::AbsoluteX => {
            let lo = bus.read(pc.wrapping_add(1));
            let hi = bus.read(pc.wrapping_add(2));
            let base = u16::from_le_bytes([lo, hi]);
            let addr = base.wrapping_add(cpu.x as u16);
            let value = bus.read(addr);
            format!("{prefix}{mnemonic} ${base:04X},X @ {addr:04X} = {value:02X}")
        }
        AddressingMode::AbsoluteY => {
            let lo = bus.read(pc.wrapping_add(1));
            let hi = bus.read(pc.wrapping_add(2));
            let base = u16::from_le_bytes([lo, hi]);
            let addr = base.wrapping_add(cpu.y as u16);
            let value = bus.read(addr);
            format!("{prefix}{mnemonic} ${base:04X},Y @ {addr:04X} = {value:02X}")
        }
        AddressingMode::Indirect => {
            let lo = bus.read(pc.wrapping_add(1));
            let hi = bus.read(pc.wrapping_add(2));
            let ptr = u16::from_le_bytes([lo, hi]);
            let target_lo = bus.read(ptr) as u16;
            let target_hi = if (ptr & 0x00FF) == 0x00FF {
                bus.read(ptr & 0xFF00) as u16
            } else {
                bus.read(ptr.wrapping_add(1)) as u16
            };
            let target = (target_hi << 8) | target_lo;
            format!("{prefix}{mnemonic} (${ptr:04X}) = {target:04X}")
        }
        AddressingMode::IndexedIndirectX => {
            let base = bus.read(pc.wrapping_add(1));
            let ptr = base.wrapping_add(cpu.x);
            let lo = bus.read(ptr as u16) as u16;
            let hi = bus.read(ptr.wrapping_add(1) as u16) as u16;
            let addr = (hi << 8) | lo;
            let value = bus.read(addr);
            format!("{prefix}{mnemonic} (${base:02X},X) @ {ptr:02X} = {addr:04X} = {value:02X}")
        }
        AddressingMode::IndirectIndexedY => {
            let ptr = bus.read(pc.wrapping_add(1));
            let lo = bus.read(ptr as u16) as u16;
            let hi = bus.read(ptr.wrapping_add(1) as u16) as u16;
            let base = (hi << 8) | lo;
            let addr = base.wrapping_add(cpu.y as u16);
            let value = bus.read(addr);
            format!("{prefix}{mnemonic} (${ptr:02X}),Y = {base:04X} @ {addr:04X} = {value:02X}")
        }
        AddressingMode::Relative => {
            let offset = bus.read(pc.wrapping_add(1)) as i8;
            let target = pc.wrapping_add(2).wrapping_add(offset as u16);
            format!("{prefix}{mnemonic} ${target:04X}")
        }
    }
}

/// Format one nestest.log line (minus the `PPU:` field, which this CPU-only
/// harness never produces and the caller strips from the golden log too).
fn trace_line(cpu: &Cpu, bus: &mut impl Bus) -> String {
    let pc = cpu.pc;
    let opcode = bus.read(pc);
    let info = &OPCODE_TABLE[opcode as usize];
    let prefix = if info.unofficial { "*" } else { "" };

    let operand_bytes: Vec<u8> = (1..=operand_byte_count(info.addr_mode))
        .map(|i| bus.read(pc.wrapping_add(i as u16)))
        .collect();

    let mut bytes_str = String::new();
    write!(bytes_str, "{opcode:02X}").unwrap();
    for byte in &operand_bytes {
        write!(bytes_str, " {byte:02X}").unwrap();
    }

    let disassembly = disassemble(cpu, bus, pc, info.mnemonic, prefix, info.addr_mode);

    let bytes_width = if prefix.is_empty() { 10 } else { 9 };
    let disasm_width = if prefix.is_empty() { 32 } else { 33 };
    let bytes_field = format!("{bytes_str:<bytes_width$}");
    let disasm_field = format!("{disassembly:<disasm_width$}");

    format!(
        "{:04X}  {}{}A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
        pc,
        bytes_field,
        disasm_field,
        cpu.a,
        cpu.x,
        cpu.y,
        cpu.status.bits(),
        cpu.sp,
        cpu.cycles
    )
}

/// Compare two log lines and find differences.
fn compare_log_lines(line_num: usize, expected: &str, actual: &str) -> Result<(), String> {
    if expected == actual {
        return Ok(());
    }

    let mut diff_pos = 0;
    for (i, (e_ch, a_ch)) in expected.chars().zip(actual.chars()).enumerate() {
        if e_ch != a_ch {
            diff_pos = i;
            break;
        }
    }

    Err(format!(
        "Line {line_num} mismatch at position {diff_pos}:\nExpected: {expected}\nActual:   {actual}\n"
    ))
}

#[test]
#[allow(clippy::too_many_lines)] // Test function requires detailed validation logic
fn nestest_golden_log_validation() {
    let rom_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..") // crates
        .join("..") // workspace root
        .join("test-roms")
        .join("cpu")
        .join("nestest.nes");

    // Skip test if nestest.nes doesn't exist (test ROMs not included in repo)
    if !rom_path.exists() {
        eprintln!("Skipping nestest validation: nestest.nes not found at {rom_path:?}");
        eprintln!("To run this test, download nestest.nes from https://github.com/christopherpow/nes-test-roms");
        eprintln!("and place it in the test-roms/cpu/ directory");
        return;
    }

    let rom = RawRom::load(&rom_path).expect("Failed to load nestest.nes");

    println!("Loaded nestest.nes:");
    println!("  Mapper: {}", rom.mapper);
    println!("  PRG-ROM: {} bytes", rom.prg_rom.len());

    assert_eq!(rom.mapper, 0, "nestest.nes should use mapper 0");

    let mut cpu = Cpu::new();
    let mut bus = NestestBus::new(&rom);

    // nestest automation starts at $C000 with cycles=7
    cpu.pc = 0xC000;
    cpu.cycles = 7;

    let golden_log_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("test-roms")
        .join("cpu")
        .join("nestest.log");

    if !golden_log_path.exists() {
        eprintln!("Skipping nestest validation: nestest.log not found at {golden_log_path:?}");
        eprintln!("To run this test, download nestest.log from https://github.com/christopherpow/nes-test-roms");
        eprintln!("and place it in the test-roms/cpu/ directory");
        return;
    }

    let golden_log = std::fs::read_to_string(&golden_log_path).expect("Failed to load nestest.log");

    // Golden log format: "... CYC:7\n" or "... PPU:  0, 21 CYC:7\n"; drop the
    // PPU field since this harness has no PPU to compare against.
    let golden_lines: Vec<String> = golden_log
        .lines()
        .map(|line| {
            if let Some(ppu_pos) = line.find("PPU:") {
                if let Some(cyc_pos) = line[ppu_pos..].find("CYC:") {
                    let before_ppu = &line[..ppu_pos];
                    let cyc_part = &line[ppu_pos + cyc_pos..];
                    format!("{before_ppu}{cyc_part}")
                } else {
                    line.to_string()
                }
            } else {
                line.to_string()
            }
        })
        .collect();

    println!("Golden log: {} lines", golden_lines.len());
    println!("Starting nestest automation mode at PC=$C000, cycles=7");

    let mut line_num = 0;
    let max_cycles = 100_000; // Safety limit

    while cpu.cycles < max_cycles {
        let actual = trace_line(&cpu, &mut bus);
        line_num += 1;

        if line_num <= golden_lines.len() {
            let expected = &golden_lines[line_num - 1];
            if let Err(e) = compare_log_lines(line_num, expected, &actual) {
                eprintln!("\nDIVERGENCE DETECTED:\n{e}");
                eprintln!("CPU State:");
                eprintln!("  PC: ${:04X}", cpu.pc);
                eprintln!("  A:  ${:02X}", cpu.a);
                eprintln!("  X:  ${:02X}", cpu.x);
                eprintln!("  Y:  ${:02X}", cpu.y);
                eprintln!("  P:  ${:02X}", cpu.status.bits());
                eprintln!("  SP: ${:02X}", cpu.sp);
                eprintln!("  Cycles: {}", cpu.cycles);

                panic!("nestest validation failed at line {line_num}");
            }
        }

        cpu.step(&mut bus);

        if cpu.pc == 0xC66E {
            println!("nestest completed at line {line_num}");
            break;
        }

        if cpu.jammed {
            eprintln!("CPU jammed at line {line_num}");
            break;
        }
    }

    assert!(
        line_num >= golden_lines.len() || cpu.pc == 0xC66E,
        "Test did not complete all {} lines (stopped at {})",
        golden_lines.len(),
        line_num
    );

    let test_result = bus.read(0x6000);
    assert_eq!(
        test_result, 0x00,
        "nestest reported error code: 0x{test_result:02X}"
    );

    println!("\nnestest PASSED!");
    println!("  Total lines traced: {line_num}");
    println!("  Final PC: ${:04X}", cpu.pc);
    println!("  Final cycles: {}", cpu.cycles);
}
