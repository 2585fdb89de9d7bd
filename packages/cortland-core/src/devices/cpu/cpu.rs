//! Emulator for the MOS 65C02
//!
//! The execution model is table-driven: one 256-entry decode map picks an
//! addressing mode and a mnemonic, the mode resolver produces an operand
//! value (and effective address), and the mnemonic picks a handler
//! function. Cycle costs are charged from a parallel table, plus one for
//! indexed reads that cross a page boundary.

use tracing::warn;

use super::super::bus::Motherboard;
use super::handlers;
use super::structs::{AddressingMode, CpuState, Instruction, Status, POWERON_CPU_STATE};
use super::utils;
use crate::bytes_to_addr;

pub struct Cpu65C02 {
    pub state: CpuState,

    /// The total number of cycles this CPU has charged
    ///
    /// # Note
    ///
    /// This is allowed to overflow; it exists for host schedulers and
    /// test comparison, not for core emulation.
    pub total_cycles: u64,
}

impl Cpu65C02 {
    /// Create a new CPU with the default power-on state
    pub fn new() -> Cpu65C02 {
        Cpu65C02 {
            state: POWERON_CPU_STATE,
            total_cycles: 0,
        }
    }
}

impl Default for Cpu65C02 {
    fn default() -> Self {
        Cpu65C02::new()
    }
}

/// Trait for a device that owns a CPU, such as the machine or a test
/// harness
pub trait WithCpu {
    fn cpu(&self) -> &Cpu65C02;
    fn cpu_mut(&mut self) -> &mut Cpu65C02;
}

/// Triggers a hardware reset of the CPU: registers go to their power-on
/// defaults and the program counter is loaded from the reset vector.
pub fn reset<T: WithCpu + Motherboard>(mb: &mut T) {
    let fst = mb.read(0xFFFC);
    let snd = mb.read(0xFFFD);
    let cpu = mb.cpu_mut();
    cpu.state = POWERON_CPU_STATE;
    cpu.state.pc = bytes_to_addr!(fst, snd);
}

/// Execute one instruction and return the number of cycles it charged.
///
/// The order of operations matters and is observable through the soft
/// switches: the operand is resolved (possibly firing read hooks) before
/// the program counter advances, and the handler runs after it. The
/// previous instruction's effective address is preserved in `last_addr`
/// until the handler has finished, which is what lets the bank switches
/// detect two consecutive reads of the same address.
pub fn step<T: WithCpu + Motherboard>(mb: &mut T) -> u32 {
    let pc = mb.cpu().state.pc;
    let opcode = mb.read(pc);
    let (mode, instr) = utils::decode_instruction(opcode);

    {
        let cpu = mb.cpu_mut();
        cpu.state.last_opcode = opcode;
        cpu.state.addr_mode = mode;
        cpu.state.instr = instr;
        cpu.state.page_crossed = false;
    }

    let operand = resolve(mb, mode);
    mb.cpu_mut().state.last_operand = operand;

    // Advance past the opcode and its operand bytes; branch and jump
    // handlers overwrite this
    mb.cpu_mut().state.pc = pc.wrapping_add(1 + u16::from(mode.operand_len()));

    if instr == Instruction::BAD {
        warn!("malformed opcode {:02X} at {:04X}; executing as NOP", opcode, pc);
    }

    handlers::match_handler(instr)(mb, operand);

    let cycles = cycle_cost(mb, opcode, mode);
    let cpu = mb.cpu_mut();
    cpu.state.last_addr = cpu.state.eff_addr;
    cpu.total_cycles = cpu.total_cycles.wrapping_add(u64::from(cycles));
    cycles
}

/// Charge the base cost from the cycle table, plus the page-crossing
/// penalty on the indexed read modes
fn cycle_cost<T: WithCpu>(mb: &T, opcode: u8, mode: AddressingMode) -> u32 {
    let base = u32::from(utils::cycle_count(opcode));
    let crossed = mb.cpu().state.page_crossed;
    match mode {
        AddressingMode::AbsX | AddressingMode::AbsY | AddressingMode::IndY if crossed => base + 1,
        _ => base,
    }
}

fn set_eff_addr<T: WithCpu>(mb: &mut T, addr: u16) {
    mb.cpu_mut().state.eff_addr = addr;
}

/// Resolve the operand for the addressing mode of the instruction in
/// flight.
///
/// Resolution reads the operand bytes that follow the opcode, computes the
/// effective address if the mode has one (storing it in `eff_addr`, or 0
/// when it does not apply), and returns the value the instruction handler
/// should act on. Reads performed here go through the bus and can fire
/// soft-switch side effects; that is load-bearing for the disk controller
/// and the bank switches.
fn resolve<T: WithCpu + Motherboard>(mb: &mut T, mode: AddressingMode) -> u8 {
    let pc = mb.cpu().state.pc;

    match mode {
        AddressingMode::Abs => {
            let lo = mb.read(pc.wrapping_add(1));
            let hi = mb.read(pc.wrapping_add(2));
            let addr = bytes_to_addr!(lo, hi);
            set_eff_addr(mb, addr);
            mb.read(addr)
        }
        AddressingMode::AbsX => {
            let lo = mb.read(pc.wrapping_add(1));
            let hi = mb.read(pc.wrapping_add(2));
            let base = bytes_to_addr!(lo, hi);
            let x = mb.cpu().state.x;
            let addr = base.wrapping_add(u16::from(x));
            mb.cpu_mut().state.page_crossed = u16::from(lo) + u16::from(x) > 0xFF;
            set_eff_addr(mb, addr);
            mb.read(addr)
        }
        AddressingMode::AbsY => {
            let lo = mb.read(pc.wrapping_add(1));
            let hi = mb.read(pc.wrapping_add(2));
            let base = bytes_to_addr!(lo, hi);
            let y = mb.cpu().state.y;
            let addr = base.wrapping_add(u16::from(y));
            mb.cpu_mut().state.page_crossed = u16::from(lo) + u16::from(y) > 0xFF;
            set_eff_addr(mb, addr);
            mb.read(addr)
        }
        AddressingMode::AbsInd => {
            let lo = mb.read(pc.wrapping_add(1));
            let hi = mb.read(pc.wrapping_add(2));
            let ptr = bytes_to_addr!(lo, hi);
            let ind_lo = mb.read(ptr);
            let ind_hi = mb.read(ptr.wrapping_add(1));
            let addr = bytes_to_addr!(ind_lo, ind_hi);
            set_eff_addr(mb, addr);
            mb.read(addr)
        }
        AddressingMode::IndX => {
            // The zero-page pointer base is incremented by X before the
            // dereference, with 8-bit wraparound
            let zp = mb.read(pc.wrapping_add(1)).wrapping_add(mb.cpu().state.x);
            let lo = mb.read(u16::from(zp));
            let hi = mb.read(u16::from(zp.wrapping_add(1)));
            let addr = bytes_to_addr!(lo, hi);
            set_eff_addr(mb, addr);
            mb.read(addr)
        }
        AddressingMode::IndY => {
            // Here the zero-page pointer is dereferenced first and Y is
            // added to the 16-bit result
            let zp = mb.read(pc.wrapping_add(1));
            let lo = mb.read(u16::from(zp));
            let hi = mb.read(u16::from(zp.wrapping_add(1)));
            let base = bytes_to_addr!(lo, hi);
            let y = mb.cpu().state.y;
            let addr = base.wrapping_add(u16::from(y));
            mb.cpu_mut().state.page_crossed = u16::from(lo) + u16::from(y) > 0xFF;
            set_eff_addr(mb, addr);
            mb.read(addr)
        }
        AddressingMode::ZP => {
            let addr = u16::from(mb.read(pc.wrapping_add(1)));
            set_eff_addr(mb, addr);
            mb.read(addr)
        }
        AddressingMode::ZPX => {
            let addr = u16::from(mb.read(pc.wrapping_add(1)).wrapping_add(mb.cpu().state.x));
            set_eff_addr(mb, addr);
            mb.read(addr)
        }
        AddressingMode::ZPY => {
            let addr = u16::from(mb.read(pc.wrapping_add(1)).wrapping_add(mb.cpu().state.y));
            set_eff_addr(mb, addr);
            mb.read(addr)
        }
        AddressingMode::Imm => {
            set_eff_addr(mb, 0);
            mb.read(pc.wrapping_add(1))
        }
        AddressingMode::Rel => {
            // The operand is a signed displacement from the instruction,
            // wrapping at the 16-bit boundary
            let oper = mb.read(pc.wrapping_add(1));
            let addr = pc.wrapping_add(oper as i8 as u16);
            set_eff_addr(mb, addr);
            0
        }
        AddressingMode::Impl => {
            set_eff_addr(mb, 0);
            0
        }
        AddressingMode::Accum => {
            set_eff_addr(mb, 0);
            mb.cpu().state.a
        }
    }
}

/// Push one byte; the stack grows downward through page $01
pub fn push_stack<T: WithCpu + Motherboard>(mb: &mut T, data: u8) {
    let s = mb.cpu().state.s;
    mb.write(0x0100 | u16::from(s), data);
    mb.cpu_mut().state.s = s.wrapping_sub(1);
}

/// Pop one byte back off the stack
pub fn pop_stack<T: WithCpu + Motherboard>(mb: &mut T) -> u8 {
    let s = mb.cpu().state.s.wrapping_add(1);
    mb.cpu_mut().state.s = s;
    mb.read(0x0100 | u16::from(s))
}

/// Push a 16-bit value (generally an address) as two bytes, high first,
/// so that popping returns them in little-endian order
pub fn push_stack16<T: WithCpu + Motherboard>(mb: &mut T, addr: u16) {
    push_stack(mb, (addr >> 8) as u8);
    push_stack(mb, (addr & 0xFF) as u8);
}

/// Pop a 16-bit value pushed by `push_stack16`
pub fn pop_stack16<T: WithCpu + Motherboard>(mb: &mut T) -> u16 {
    let lo = pop_stack(mb);
    let hi = pop_stack(mb);
    bytes_to_addr!(lo, hi)
}

/// Conditionally update the status bits named in `mask` from a result
/// value: negative from bit 7, overflow from bit 6, zero from the value
/// being zero, carry from it being non-zero. Instructions with a carry or
/// overflow meaning that cannot be derived from the result alone (ADC,
/// SBC, the compares, the shifts) set those bits themselves.
pub fn modify_status<T: WithCpu>(mb: &mut T, mask: Status, oper: u8) {
    let p = &mut mb.cpu_mut().state.p;

    if mask.contains(Status::NEGATIVE) {
        p.set(Status::NEGATIVE, oper & 0x80 != 0);
    }

    if mask.contains(Status::OVERFLOW) {
        p.set(Status::OVERFLOW, oper & 0x40 != 0);
    }

    if mask.contains(Status::CARRY) {
        p.set(Status::CARRY, oper > 0);
    }

    if mask.contains(Status::ZERO) {
        p.set(Status::ZERO, oper == 0);
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::devices::mem::Segment;

    /// A bare board: one CPU wired to one flat 64K segment, no switches.
    pub struct TestBoard {
        pub cpu: Cpu65C02,
        pub ram: Segment,
    }

    impl TestBoard {
        pub fn new() -> TestBoard {
            TestBoard {
                cpu: Cpu65C02::new(),
                ram: Segment::new(0x10000),
            }
        }

        /// Load a program at an origin and point the PC at it
        pub fn load(&mut self, origin: u16, prog: &[u8]) {
            self.ram.copy_buf(prog, origin as usize);
            self.cpu.state.pc = origin;
        }
    }

    impl WithCpu for TestBoard {
        fn cpu(&self) -> &Cpu65C02 {
            &self.cpu
        }

        fn cpu_mut(&mut self) -> &mut Cpu65C02 {
            &mut self.cpu
        }
    }

    impl Motherboard for TestBoard {
        fn read(&mut self, addr: u16) -> u8 {
            self.ram.get(addr as usize)
        }

        fn write(&mut self, addr: u16, data: u8) {
            self.ram.set(addr as usize, data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::TestBoard;
    use super::*;

    #[test]
    fn stack_round_trips_bytes() {
        let mut mb = TestBoard::new();
        for val in 0..=0xFFu8 {
            push_stack(&mut mb, val);
            assert_eq!(pop_stack(&mut mb), val);
        }
        assert_eq!(mb.cpu.state.s, 0xFF, "stack pointer restored");
    }

    #[test]
    fn stack_round_trips_addresses() {
        let mut mb = TestBoard::new();
        push_stack16(&mut mb, 0xD00D);
        assert_eq!(mb.cpu.state.s, 0xFD);
        assert_eq!(pop_stack16(&mut mb), 0xD00D);
        assert_eq!(mb.cpu.state.s, 0xFF);
    }

    #[test]
    fn modify_status_honors_the_mask() {
        let mut mb = TestBoard::new();
        let all = Status::NEGATIVE | Status::OVERFLOW | Status::ZERO | Status::CARRY;

        for bits in 0..16u8 {
            let mut mask = Status::empty();
            if bits & 1 != 0 {
                mask |= Status::NEGATIVE;
            }
            if bits & 2 != 0 {
                mask |= Status::OVERFLOW;
            }
            if bits & 4 != 0 {
                mask |= Status::ZERO;
            }
            if bits & 8 != 0 {
                mask |= Status::CARRY;
            }

            mb.cpu.state.p = Status::empty();
            modify_status(&mut mb, mask, 0x00);
            assert_eq!(mb.cpu.state.p & all, mask & Status::ZERO, "mask {:?} on zero", mask);

            modify_status(&mut mb, mask, 0x80);
            let expect = mask & (Status::NEGATIVE | Status::CARRY);
            assert_eq!(mb.cpu.state.p & all, expect, "mask {:?} on 0x80", mask);
        }
    }

    #[test]
    fn resolves_zero_page_indexed_with_wraparound() {
        let mut mb = TestBoard::new();
        mb.ram.set(0x007F, 0x42);
        mb.cpu.state.x = 0x90;
        // LDA $EF,X wraps to $7F
        mb.load(0x0300, &[0xB5, 0xEF]);
        step(&mut mb);
        assert_eq!(mb.cpu.state.a, 0x42);
        assert_eq!(mb.cpu.state.eff_addr, 0x007F);
    }

    #[test]
    fn resolves_indirect_indexed() {
        let mut mb = TestBoard::new();
        // ($10),Y with Y=4: pointer at $10/$11 -> $1234, effective $1238
        mb.ram.set(0x0010, 0x34);
        mb.ram.set(0x0011, 0x12);
        mb.ram.set(0x1238, 0x99);
        mb.cpu.state.y = 4;
        mb.load(0x0300, &[0xB1, 0x10]);
        step(&mut mb);
        assert_eq!(mb.cpu.state.a, 0x99);
        assert_eq!(mb.cpu.state.eff_addr, 0x1238);
    }

    #[test]
    fn charges_the_page_cross_penalty() {
        let mut mb = TestBoard::new();
        mb.cpu.state.x = 0x10;
        // LDA $30F8,X crosses into $3108
        mb.load(0x0300, &[0xBD, 0xF8, 0x30]);
        assert_eq!(step(&mut mb), 5, "4 base + 1 for the crossing");

        let mut mb = TestBoard::new();
        mb.cpu.state.x = 0x01;
        mb.load(0x0300, &[0xBD, 0xF8, 0x30]);
        assert_eq!(step(&mut mb), 4, "no crossing, base cost only");
    }

    #[test]
    fn branch_forward_lands_on_the_displacement() {
        let mut mb = TestBoard::new();
        // BCC with carry clear: PC=123, operand=88 -> 211
        mb.load(123, &[0x90, 88]);
        mb.cpu.state.p.remove(Status::CARRY);
        step(&mut mb);
        assert_eq!(mb.cpu.state.pc, 211);
    }

    #[test]
    fn branch_not_taken_falls_through() {
        let mut mb = TestBoard::new();
        mb.load(123, &[0x90, 88]);
        mb.cpu.state.p.insert(Status::CARRY);
        step(&mut mb);
        assert_eq!(mb.cpu.state.pc, 125);
    }

    #[test]
    fn branch_backward_wraps_negative_displacement() {
        let mut mb = TestBoard::new();
        // BRA -2 from $0300
        mb.load(0x0300, &[0x80, 0xFE]);
        step(&mut mb);
        assert_eq!(mb.cpu.state.pc, 0x02FE);
    }

    #[test]
    fn reset_loads_the_reset_vector() {
        let mut mb = TestBoard::new();
        mb.ram.set16(0xFFFC, 0xC600);
        reset(&mut mb);
        assert_eq!(mb.cpu.state.pc, 0xC600);
        assert_eq!(mb.cpu.state.s, 0xFF);
        assert_eq!(mb.cpu.state.p.bits(), 0xB3);
    }

    #[test]
    fn step_records_access_history() {
        let mut mb = TestBoard::new();
        mb.load(0x0300, &[0xAD, 0x34, 0x12, 0xAD, 0x34, 0x12]);
        step(&mut mb);
        assert_eq!(mb.cpu.state.last_addr, 0x1234);
        step(&mut mb);
        assert_eq!(mb.cpu.state.last_addr, 0x1234);
    }

    #[test]
    fn bad_opcode_executes_as_nop() {
        let mut mb = TestBoard::new();
        mb.load(0x0300, &[0x03]);
        let before = mb.cpu.state;
        step(&mut mb);
        assert_eq!(mb.cpu.state.pc, 0x0301);
        assert_eq!(mb.cpu.state.a, before.a);
        assert_eq!(mb.cpu.state.p, before.p);
    }
}
