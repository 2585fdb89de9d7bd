//! Instruction semantics for the 65C02.
//!
//! Each handler receives the machine and the operand value the address
//! resolver produced. Handlers that write memory do so at the effective
//! address recorded during resolution, except when the addressing mode is
//! the accumulator, in which case they operate on A directly.

use super::super::bus::Motherboard;
use super::cpu::{modify_status, pop_stack, pop_stack16, push_stack, push_stack16, WithCpu};
use super::structs::{AddressingMode, Instruction, Status};
use crate::bytes_to_addr;

#[allow(type_alias_bounds)] // left in for self-documenting reasons
pub type OpHandler<T: WithCpu + Motherboard> = fn(mb: &mut T, oper: u8);

pub fn match_handler<T: WithCpu + Motherboard>(mnemonic: Instruction) -> OpHandler<T> {
    match mnemonic {
        Instruction::ADC => op_adc,
        Instruction::AND => op_and,
        Instruction::ASL => op_asl,
        Instruction::BAD => op_bad,
        Instruction::BCC => op_bcc,
        Instruction::BCS => op_bcs,
        Instruction::BEQ => op_beq,
        Instruction::BIT => op_bit,
        Instruction::BMI => op_bmi,
        Instruction::BNE => op_bne,
        Instruction::BPL => op_bpl,
        Instruction::BRA => op_bra,
        Instruction::BRK => op_brk,
        Instruction::BVC => op_bvc,
        Instruction::BVS => op_bvs,
        Instruction::CLC => op_clc,
        Instruction::CLD => op_cld,
        Instruction::CLI => op_cli,
        Instruction::CLV => op_clv,
        Instruction::CMP => op_cmp,
        Instruction::CPX => op_cpx,
        Instruction::CPY => op_cpy,
        Instruction::DEC => op_dec,
        Instruction::DEX => op_dex,
        Instruction::DEY => op_dey,
        Instruction::EOR => op_eor,
        Instruction::INC => op_inc,
        Instruction::INX => op_inx,
        Instruction::INY => op_iny,
        Instruction::JMP => op_jmp,
        Instruction::JSR => op_jsr,
        Instruction::LDA => op_lda,
        Instruction::LDX => op_ldx,
        Instruction::LDY => op_ldy,
        Instruction::LSR => op_lsr,
        Instruction::NOP => op_nop,
        Instruction::ORA => op_ora,
        Instruction::PHA => op_pha,
        Instruction::PHP => op_php,
        Instruction::PHX => op_phx,
        Instruction::PHY => op_phy,
        Instruction::PLA => op_pla,
        Instruction::PLP => op_plp,
        Instruction::PLX => op_plx,
        Instruction::PLY => op_ply,
        Instruction::ROL => op_rol,
        Instruction::ROR => op_ror,
        Instruction::RTI => op_rti,
        Instruction::RTS => op_rts,
        Instruction::SBC => op_sbc,
        Instruction::SEC => op_sec,
        Instruction::SED => op_sed,
        Instruction::SEI => op_sei,
        Instruction::STA => op_sta,
        Instruction::STX => op_stx,
        Instruction::STY => op_sty,
        Instruction::STZ => op_stz,
        Instruction::TAX => op_tax,
        Instruction::TAY => op_tay,
        Instruction::TRB => op_trb,
        Instruction::TSB => op_tsb,
        Instruction::TSX => op_tsx,
        Instruction::TXA => op_txa,
        Instruction::TXS => op_txs,
        Instruction::TYA => op_tya,
    }
}

fn set_nz<T: WithCpu>(mb: &mut T, val: u8) {
    modify_status(mb, Status::NEGATIVE | Status::ZERO, val);
}

fn set_carry<T: WithCpu>(mb: &mut T, carry: bool) {
    mb.cpu_mut().state.p.set(Status::CARRY, carry);
}

fn set_overflow<T: WithCpu>(mb: &mut T, overflow: bool) {
    mb.cpu_mut().state.p.set(Status::OVERFLOW, overflow);
}

/// Write a result either to the accumulator or to the resolved address,
/// depending on the addressing mode of the instruction in flight. The
/// shifts, rotates, and memory increments all store through here.
fn write_back<T: WithCpu + Motherboard>(mb: &mut T, val: u8) {
    match mb.cpu().state.addr_mode {
        AddressingMode::Accum => mb.cpu_mut().state.a = val,
        _ => {
            let addr = mb.cpu().state.eff_addr;
            mb.write(addr, val);
        }
    }
}

fn carry_bit<T: WithCpu>(mb: &T) -> u8 {
    if mb.cpu().state.p.contains(Status::CARRY) {
        1
    } else {
        0
    }
}

/// Both nibbles of a BCD operand must be decimal digits. The hardware
/// leaves other inputs undefined; we skip the instruction entirely.
fn bcd_valid(val: u8) -> bool {
    val & 0x0F <= 9 && val >> 4 <= 9
}

fn from_bcd(val: u8) -> i16 {
    i16::from(val >> 4) * 10 + i16::from(val & 0x0F)
}

fn to_bcd(val: i16) -> u8 {
    (((val / 10) << 4) | (val % 10)) as u8
}

/// The signed-overflow test shared by the binary and decimal paths
fn adc_overflows(a: u8, oper: u8, res: u8) -> bool {
    (a ^ res) & (oper ^ res) & 0x80 != 0
}

//region Arithmetic
// ADC SBC
fn op_adc<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let a = mb.cpu().state.a;
    let carry = carry_bit(mb);

    let res = if mb.cpu().state.p.contains(Status::DECIMAL) {
        if !bcd_valid(a) || !bcd_valid(oper) {
            return;
        }
        let sum = from_bcd(a) + from_bcd(oper) + i16::from(carry);
        set_carry(mb, sum > 99);
        to_bcd(sum % 100)
    } else {
        let sum = u16::from(a) + u16::from(oper) + u16::from(carry);
        set_carry(mb, sum > 0xFF);
        (sum & 0xFF) as u8
    };

    set_overflow(mb, adc_overflows(a, oper, res));
    mb.cpu_mut().state.a = res;
    set_nz(mb, res);
}

fn op_sbc<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let a = mb.cpu().state.a;
    let borrow = 1 - i16::from(carry_bit(mb));

    let res = if mb.cpu().state.p.contains(Status::DECIMAL) {
        if !bcd_valid(a) || !bcd_valid(oper) {
            return;
        }
        let mut diff = from_bcd(a) - from_bcd(oper) - borrow;
        set_carry(mb, diff >= 0);
        if diff < 0 {
            diff += 100;
        }
        to_bcd(diff)
    } else {
        let diff = i16::from(a) - i16::from(oper) - borrow;
        set_carry(mb, diff >= 0);
        (diff & 0xFF) as u8
    };

    set_overflow(mb, (a ^ oper) & (a ^ res) & 0x80 != 0);
    mb.cpu_mut().state.a = res;
    set_nz(mb, res);
}
//endregion

//region Bitwise
// AND ORA EOR BIT TRB TSB
fn op_and<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let res = mb.cpu().state.a & oper;
    mb.cpu_mut().state.a = res;
    set_nz(mb, res);
}

fn op_ora<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let res = mb.cpu().state.a | oper;
    mb.cpu_mut().state.a = res;
    set_nz(mb, res);
}

fn op_eor<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let res = mb.cpu().state.a ^ oper;
    mb.cpu_mut().state.a = res;
    set_nz(mb, res);
}

fn op_bit<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let a = mb.cpu().state.a;
    modify_status(mb, Status::ZERO, a & oper);

    // Immediate mode only tests; the other modes also copy the operand's
    // top two bits into N and V
    if mb.cpu().state.addr_mode != AddressingMode::Imm {
        let p = &mut mb.cpu_mut().state.p;
        p.set(Status::NEGATIVE, oper & 0x80 != 0);
        p.set(Status::OVERFLOW, oper & 0x40 != 0);
    }
}

fn op_trb<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let a = mb.cpu().state.a;
    modify_status(mb, Status::ZERO, a & oper);
    write_back(mb, oper & !a);
}

fn op_tsb<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let a = mb.cpu().state.a;
    modify_status(mb, Status::ZERO, a & oper);
    write_back(mb, oper | a);
}
//endregion

//region Shifts and rotates
// ASL LSR ROL ROR
fn op_asl<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let res = oper << 1;
    set_carry(mb, oper & 0x80 != 0);
    set_nz(mb, res);
    write_back(mb, res);
}

fn op_lsr<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let res = oper >> 1;
    set_carry(mb, oper & 0x01 != 0);
    set_nz(mb, res);
    write_back(mb, res);
}

fn op_rol<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let res = (oper << 1) | carry_bit(mb);
    set_carry(mb, oper & 0x80 != 0);
    set_nz(mb, res);
    write_back(mb, res);
}

fn op_ror<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let res = (oper >> 1) | (carry_bit(mb) << 7);
    set_carry(mb, oper & 0x01 != 0);
    set_nz(mb, res);
    write_back(mb, res);
}
//endregion

//region Compares
// CMP CPX CPY
fn op_cmp<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let a = mb.cpu().state.a;
    set_nz(mb, a.wrapping_sub(oper));
    set_carry(mb, a >= oper);
}

fn op_cpx<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let x = mb.cpu().state.x;
    set_nz(mb, x.wrapping_sub(oper));
    set_carry(mb, x >= oper);
}

fn op_cpy<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let y = mb.cpu().state.y;
    set_nz(mb, y.wrapping_sub(oper));
    set_carry(mb, y >= oper);
}
//endregion

//region Increment and decrement
fn op_dec<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let res = oper.wrapping_sub(1);
    set_nz(mb, res);
    write_back(mb, res);
}

fn op_inc<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    let res = oper.wrapping_add(1);
    set_nz(mb, res);
    write_back(mb, res);
}

fn op_dex<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let res = mb.cpu().state.x.wrapping_sub(1);
    mb.cpu_mut().state.x = res;
    set_nz(mb, res);
}

fn op_dey<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let res = mb.cpu().state.y.wrapping_sub(1);
    mb.cpu_mut().state.y = res;
    set_nz(mb, res);
}

fn op_inx<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let res = mb.cpu().state.x.wrapping_add(1);
    mb.cpu_mut().state.x = res;
    set_nz(mb, res);
}

fn op_iny<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let res = mb.cpu().state.y.wrapping_add(1);
    mb.cpu_mut().state.y = res;
    set_nz(mb, res);
}
//endregion

//region Branches
// BPL BMI BVC BVS BCC BCS BNE BEQ BRA
fn branch_if<T: WithCpu + Motherboard>(mb: &mut T, flag: Status, expect: bool) {
    if mb.cpu().state.p.contains(flag) == expect {
        let addr = mb.cpu().state.eff_addr;
        mb.cpu_mut().state.pc = addr;
    }
}

fn op_bpl<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    branch_if(mb, Status::NEGATIVE, false);
}

fn op_bmi<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    branch_if(mb, Status::NEGATIVE, true);
}

fn op_bvc<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    branch_if(mb, Status::OVERFLOW, false);
}

fn op_bvs<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    branch_if(mb, Status::OVERFLOW, true);
}

fn op_bcc<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    branch_if(mb, Status::CARRY, false);
}

fn op_bcs<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    branch_if(mb, Status::CARRY, true);
}

fn op_bne<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    branch_if(mb, Status::ZERO, false);
}

fn op_beq<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    branch_if(mb, Status::ZERO, true);
}

fn op_bra<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let addr = mb.cpu().state.eff_addr;
    mb.cpu_mut().state.pc = addr;
}
//endregion

//region Jumps and returns
// JMP JSR RTS BRK RTI
fn op_jmp<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let addr = mb.cpu().state.eff_addr;
    mb.cpu_mut().state.pc = addr;
}

fn op_jsr<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    // PC has advanced past the three instruction bytes; the address
    // saved is that of the last byte of the JSR itself
    let ret = mb.cpu().state.pc.wrapping_sub(1);
    push_stack16(mb, ret);
    let addr = mb.cpu().state.eff_addr;
    mb.cpu_mut().state.pc = addr;
}

fn op_rts<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let addr = pop_stack16(mb);
    mb.cpu_mut().state.pc = addr.wrapping_add(1);
}

fn op_brk<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    // PC advanced one byte for the opcode; the saved address skips one
    // more, treating the byte after BRK as a padding byte
    let ret = mb.cpu().state.pc.wrapping_add(1);
    push_stack16(mb, ret);
    let status = mb.cpu().state.p.bits();
    push_stack(mb, status);
    mb.cpu_mut().state.p.insert(Status::IRQ_DISABLE);

    let lo = mb.read(0xFFFE);
    let hi = mb.read(0xFFFF);
    mb.cpu_mut().state.pc = bytes_to_addr!(lo, hi);
}

fn op_rti<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let flags = pop_stack(mb);
    mb.cpu_mut().state.p = Status::from_bits_truncate(flags);
    let addr = pop_stack16(mb);
    mb.cpu_mut().state.pc = addr;
}
//endregion

//region Flag operations
// CLC SEC CLI SEI CLV CLD SED
fn op_clc<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    mb.cpu_mut().state.p.remove(Status::CARRY);
}

fn op_sec<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    mb.cpu_mut().state.p.insert(Status::CARRY);
}

fn op_cli<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    mb.cpu_mut().state.p.remove(Status::IRQ_DISABLE);
}

fn op_sei<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    mb.cpu_mut().state.p.insert(Status::IRQ_DISABLE);
}

fn op_clv<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    mb.cpu_mut().state.p.remove(Status::OVERFLOW);
}

fn op_cld<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    mb.cpu_mut().state.p.remove(Status::DECIMAL);
}

fn op_sed<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    mb.cpu_mut().state.p.insert(Status::DECIMAL);
}
//endregion

//region Loads
fn op_lda<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    mb.cpu_mut().state.a = oper;
    set_nz(mb, oper);
}

fn op_ldx<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    mb.cpu_mut().state.x = oper;
    set_nz(mb, oper);
}

fn op_ldy<T: WithCpu + Motherboard>(mb: &mut T, oper: u8) {
    mb.cpu_mut().state.y = oper;
    set_nz(mb, oper);
}
//endregion

//region Stores
// STA STX STY STZ; stores do not alter flags
fn op_sta<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = mb.cpu().state.a;
    write_back(mb, val);
}

fn op_stx<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = mb.cpu().state.x;
    write_back(mb, val);
}

fn op_sty<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = mb.cpu().state.y;
    write_back(mb, val);
}

fn op_stz<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    write_back(mb, 0);
}
//endregion

//region Register transfers
fn op_tax<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = mb.cpu().state.a;
    mb.cpu_mut().state.x = val;
    set_nz(mb, val);
}

fn op_tay<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = mb.cpu().state.a;
    mb.cpu_mut().state.y = val;
    set_nz(mb, val);
}

fn op_txa<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = mb.cpu().state.x;
    mb.cpu_mut().state.a = val;
    set_nz(mb, val);
}

fn op_tya<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = mb.cpu().state.y;
    mb.cpu_mut().state.a = val;
    set_nz(mb, val);
}

fn op_tsx<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = mb.cpu().state.s;
    mb.cpu_mut().state.x = val;
    set_nz(mb, val);
}

// TXS is the one transfer that leaves the flags alone
fn op_txs<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = mb.cpu().state.x;
    mb.cpu_mut().state.s = val;
}
//endregion

//region Stack pushes and pulls
fn op_pha<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = mb.cpu().state.a;
    push_stack(mb, val);
}

fn op_php<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = mb.cpu().state.p.bits();
    push_stack(mb, val);
}

fn op_phx<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = mb.cpu().state.x;
    push_stack(mb, val);
}

fn op_phy<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = mb.cpu().state.y;
    push_stack(mb, val);
}

fn op_pla<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = pop_stack(mb);
    mb.cpu_mut().state.a = val;
    set_nz(mb, val);
}

fn op_plp<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = pop_stack(mb);
    mb.cpu_mut().state.p = Status::from_bits_truncate(val);
}

fn op_plx<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = pop_stack(mb);
    mb.cpu_mut().state.x = val;
    set_nz(mb, val);
}

fn op_ply<T: WithCpu + Motherboard>(mb: &mut T, _oper: u8) {
    let val = pop_stack(mb);
    mb.cpu_mut().state.y = val;
    set_nz(mb, val);
}
//endregion

fn op_nop<T: WithCpu + Motherboard>(_mb: &mut T, _oper: u8) {
    // no operation
}

// Malformed opcodes were already logged during decode dispatch; beyond
// that they behave as NOP rather than crashing the machine
fn op_bad<T: WithCpu + Motherboard>(_mb: &mut T, _oper: u8) {}

#[cfg(test)]
mod tests {
    use super::super::cpu::{step, testing::TestBoard};
    use super::*;

    fn flags(mb: &TestBoard) -> Status {
        mb.cpu.state.p
    }

    #[test]
    fn adc_binary_sets_carry_and_overflow() {
        let mut mb = TestBoard::new();
        mb.cpu.state.a = 0x7F;
        mb.load(0x0300, &[0x69, 0x01]); // ADC #$01
        step(&mut mb);
        assert_eq!(mb.cpu.state.a, 0x80);
        assert!(flags(&mb).contains(Status::OVERFLOW), "7F+1 overflows signed");
        assert!(flags(&mb).contains(Status::NEGATIVE));
        assert!(!flags(&mb).contains(Status::CARRY));

        mb.cpu.state.a = 0xFF;
        mb.cpu.state.p = Status::empty();
        mb.load(0x0300, &[0x69, 0x01]);
        step(&mut mb);
        assert_eq!(mb.cpu.state.a, 0x00);
        assert!(flags(&mb).contains(Status::CARRY));
        assert!(flags(&mb).contains(Status::ZERO));
    }

    #[test]
    fn adc_decimal_adds_digit_pairs() {
        // A=$05 plus #$10 in decimal mode: $15, no flags
        let mut mb = TestBoard::new();
        mb.cpu.state.a = 0x05;
        mb.cpu.state.p = Status::DECIMAL;
        mb.load(0x0300, &[0x69, 0x10]);
        step(&mut mb);
        assert_eq!(mb.cpu.state.a, 0x15);
        assert!(!flags(&mb).contains(Status::ZERO));
        assert!(!flags(&mb).contains(Status::NEGATIVE));
        assert!(!flags(&mb).contains(Status::CARRY));
    }

    #[test]
    fn adc_decimal_carries_past_99() {
        let mut mb = TestBoard::new();
        mb.cpu.state.a = 0x99;
        mb.cpu.state.p = Status::DECIMAL;
        mb.load(0x0300, &[0x69, 0x02]);
        step(&mut mb);
        assert_eq!(mb.cpu.state.a, 0x01);
        assert!(flags(&mb).contains(Status::CARRY));
    }

    #[test]
    fn adc_decimal_skips_illegal_nibbles() {
        let mut mb = TestBoard::new();
        mb.cpu.state.a = 0x0F;
        mb.cpu.state.p = Status::DECIMAL;
        mb.load(0x0300, &[0x69, 0x01]);
        step(&mut mb);
        assert_eq!(mb.cpu.state.a, 0x0F, "A left unchanged");
    }

    #[test]
    fn sbc_decimal_borrows_below_zero() {
        // A=$02 minus #$03 with carry set: $99 and a borrow
        let mut mb = TestBoard::new();
        mb.cpu.state.a = 0x02;
        mb.cpu.state.p = Status::DECIMAL | Status::CARRY;
        mb.load(0x0300, &[0xE9, 0x03]);
        step(&mut mb);
        assert_eq!(mb.cpu.state.a, 0x99);
        assert!(!flags(&mb).contains(Status::CARRY), "borrow clears carry");
    }

    #[test]
    fn sbc_binary_subtracts_with_borrow() {
        let mut mb = TestBoard::new();
        mb.cpu.state.a = 0x10;
        mb.cpu.state.p = Status::CARRY;
        mb.load(0x0300, &[0xE9, 0x01]); // SBC #$01
        step(&mut mb);
        assert_eq!(mb.cpu.state.a, 0x0F);
        assert!(flags(&mb).contains(Status::CARRY), "no borrow");

        mb.cpu.state.a = 0x00;
        mb.cpu.state.p = Status::CARRY;
        mb.load(0x0300, &[0xE9, 0x01]);
        step(&mut mb);
        assert_eq!(mb.cpu.state.a, 0xFF);
        assert!(!flags(&mb).contains(Status::CARRY), "borrow taken");
    }

    #[test]
    fn cmp_sets_carry_on_greater_or_equal() {
        let mut mb = TestBoard::new();
        mb.cpu.state.a = 0x40;
        mb.load(0x0300, &[0xC9, 0x40]); // CMP #$40
        step(&mut mb);
        assert!(flags(&mb).contains(Status::CARRY));
        assert!(flags(&mb).contains(Status::ZERO));

        mb.cpu.state.a = 0x3F;
        mb.load(0x0300, &[0xC9, 0x40]);
        step(&mut mb);
        assert!(!flags(&mb).contains(Status::CARRY));
        assert!(!flags(&mb).contains(Status::ZERO));
    }

    #[test]
    fn rotates_treat_carry_as_ninth_bit() {
        let mut mb = TestBoard::new();
        mb.cpu.state.a = 0x80;
        mb.cpu.state.p = Status::CARRY;
        mb.load(0x0300, &[0x2A]); // ROL A
        step(&mut mb);
        assert_eq!(mb.cpu.state.a, 0x01, "carry rotated into bit 0");
        assert!(flags(&mb).contains(Status::CARRY), "bit 7 fell into carry");

        mb.cpu.state.a = 0x01;
        mb.cpu.state.p = Status::CARRY;
        mb.load(0x0300, &[0x6A]); // ROR A
        step(&mut mb);
        assert_eq!(mb.cpu.state.a, 0x80);
        assert!(flags(&mb).contains(Status::CARRY));
    }

    #[test]
    fn shifts_operate_on_memory_when_addressed() {
        let mut mb = TestBoard::new();
        mb.ram.set(0x0040, 0x81);
        mb.load(0x0300, &[0x06, 0x40]); // ASL $40
        step(&mut mb);
        assert_eq!(mb.ram.get(0x0040), 0x02);
        assert!(flags(&mb).contains(Status::CARRY));
    }

    #[test]
    fn inc_and_dec_follow_the_addressing_mode() {
        let mut mb = TestBoard::new();
        mb.ram.set(0x0040, 0xFF);
        mb.load(0x0300, &[0xE6, 0x40]); // INC $40
        step(&mut mb);
        assert_eq!(mb.ram.get(0x0040), 0x00);
        assert!(flags(&mb).contains(Status::ZERO));

        mb.cpu.state.a = 0x00;
        mb.load(0x0300, &[0x3A]); // DEC A
        step(&mut mb);
        assert_eq!(mb.cpu.state.a, 0xFF);
        assert!(flags(&mb).contains(Status::NEGATIVE));
    }

    #[test]
    fn bit_immediate_only_touches_zero() {
        let mut mb = TestBoard::new();
        mb.cpu.state.a = 0x01;
        mb.load(0x0300, &[0x89, 0xC0]); // BIT #$C0
        step(&mut mb);
        assert!(flags(&mb).contains(Status::ZERO));
        assert!(!flags(&mb).contains(Status::NEGATIVE));
        assert!(!flags(&mb).contains(Status::OVERFLOW));

        mb.ram.set(0x0040, 0xC0);
        mb.load(0x0300, &[0x24, 0x40]); // BIT $40
        step(&mut mb);
        assert!(flags(&mb).contains(Status::NEGATIVE));
        assert!(flags(&mb).contains(Status::OVERFLOW));
    }

    #[test]
    fn trb_and_tsb_mask_memory_through_the_accumulator() {
        let mut mb = TestBoard::new();
        mb.cpu.state.a = 0x0F;
        mb.ram.set(0x0040, 0x3C);
        mb.load(0x0300, &[0x14, 0x40]); // TRB $40
        step(&mut mb);
        assert_eq!(mb.ram.get(0x0040), 0x30);
        assert!(!flags(&mb).contains(Status::ZERO), "A & oper was non-zero");

        mb.ram.set(0x0040, 0x30);
        mb.load(0x0300, &[0x04, 0x40]); // TSB $40
        step(&mut mb);
        assert_eq!(mb.ram.get(0x0040), 0x3F);
        assert!(flags(&mb).contains(Status::ZERO), "A & oper was zero");
    }

    #[test]
    fn stz_clears_memory_without_flags() {
        let mut mb = TestBoard::new();
        mb.ram.set(0x0040, 0xAA);
        mb.cpu.state.p = Status::NEGATIVE;
        mb.load(0x0300, &[0x64, 0x40]); // STZ $40
        step(&mut mb);
        assert_eq!(mb.ram.get(0x0040), 0x00);
        assert_eq!(flags(&mb), Status::NEGATIVE, "flags untouched");
    }

    #[test]
    fn jsr_and_rts_pair_up() {
        let mut mb = TestBoard::new();
        mb.load(0x0300, &[0x20, 0x00, 0x04]); // JSR $0400
        mb.ram.set(0x0400, 0x60); // RTS
        step(&mut mb);
        assert_eq!(mb.cpu.state.pc, 0x0400);
        assert_eq!(mb.cpu.state.s, 0xFD);
        step(&mut mb);
        assert_eq!(mb.cpu.state.pc, 0x0303, "returns past the JSR");
        assert_eq!(mb.cpu.state.s, 0xFF);
    }

    #[test]
    fn brk_vectors_through_fffe() {
        let mut mb = TestBoard::new();
        mb.ram.set16(0xFFFE, 0x0500);
        mb.load(0x0300, &[0x00]);
        step(&mut mb);
        assert_eq!(mb.cpu.state.pc, 0x0500);
        assert!(flags(&mb).contains(Status::IRQ_DISABLE));

        // RTI at the vector target restores P and comes back past the
        // padding byte
        mb.ram.set(0x0500, 0x40);
        step(&mut mb);
        assert_eq!(mb.cpu.state.pc, 0x0302);
    }

    #[test]
    fn push_pull_register_forms() {
        let mut mb = TestBoard::new();
        mb.cpu.state.x = 0x55;
        mb.cpu.state.y = 0xAA;
        mb.load(0x0300, &[0xDA, 0x5A, 0xFA, 0x7A]); // PHX PHY PLX PLY
        step(&mut mb);
        step(&mut mb);
        mb.cpu.state.x = 0;
        mb.cpu.state.y = 0;
        step(&mut mb);
        assert_eq!(mb.cpu.state.x, 0xAA, "PLX pulls what PHY pushed");
        step(&mut mb);
        assert_eq!(mb.cpu.state.y, 0x55);
        assert!(flags(&mb).contains(Status::NEGATIVE) == false);
    }
}
