//! Shared scaffolding for the integration tests: a machine booted from a
//! synthetic ROM whose reset vector points at a program parked in main
//! RAM.

use cortland_core::devices::cpu::WithCpu;
use cortland_core::devices::machine::Machine;

/// Where test programs are loaded and entered
pub const PROGRAM_ORG: u16 = 0x1000;

/// Upper bound on steps before a runaway program fails its test
const MAX_STEPS: u32 = 10_000;

/// Build a machine whose ROM vectors into `program`, loaded at
/// `PROGRAM_ORG` in main RAM
pub fn boot_with_program(program: &[u8]) -> Machine {
    let mut rom = vec![0u8; 0x3000];
    rom[0x2FFC] = (PROGRAM_ORG & 0xFF) as u8;
    rom[0x2FFD] = (PROGRAM_ORG >> 8) as u8;

    let mut mach = Machine::new();
    mach.load_rom(&rom).expect("synthetic rom should load");

    for (i, &byte) in program.iter().enumerate() {
        mach.mem.main.set(PROGRAM_ORG as usize + i, byte);
    }

    mach.boot();
    mach
}

/// Step the machine until PC reaches `end`, with a runaway guard
pub fn run_until(mach: &mut Machine, end: u16) {
    let mut steps = 0;
    while mach.cpu().state.pc != end {
        mach.step();
        steps += 1;
        assert!(steps < MAX_STEPS, "program never reached {:04X}", end);
    }
}

/// Run a program to its end address (org + length)
pub fn run_program(program: &[u8]) -> Machine {
    let mut mach = boot_with_program(program);
    run_until(&mut mach, PROGRAM_ORG + program.len() as u16);
    mach
}
