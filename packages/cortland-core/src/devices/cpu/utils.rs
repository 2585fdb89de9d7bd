use super::structs::{AddressingMode, Instruction};

#[macro_export]
macro_rules! bytes_to_addr {
    ($fst: expr, $snd: expr) => {{
        (u16::from($snd) << 8) | u16::from($fst)
    }};
}

/// The base cycle cost of every opcode. Holes in the opcode table cost
/// nothing; indexed modes that cross a page add one on top of these.
#[rustfmt::skip]
pub const CYCLES: [u8; 256] = [
//  00  01  02  03  04  05  06  07  08  09  0A  0B  0C  0D  0E  0F
     7,  6,  2,  0,  5,  3,  5,  0,  3,  2,  2,  0,  6,  4,  6,  0, // 0x
     2,  5,  3,  0,  5,  4,  6,  0,  2,  4,  2,  0,  6,  4,  7,  0, // 1x
     6,  6,  2,  0,  3,  3,  5,  0,  4,  2,  2,  0,  4,  4,  6,  0, // 2x
     2,  5,  3,  0,  4,  4,  6,  0,  2,  4,  2,  0,  4,  4,  7,  0, // 3x
     6,  6,  2,  0,  3,  3,  5,  0,  3,  2,  2,  0,  3,  4,  6,  0, // 4x
     2,  5,  3,  0,  4,  4,  6,  0,  2,  4,  3,  0,  8,  4,  7,  0, // 5x
     6,  6,  2,  0,  3,  3,  5,  0,  4,  2,  2,  0,  5,  4,  6,  0, // 6x
     2,  5,  3,  0,  4,  4,  6,  0,  2,  4,  4,  0,  6,  4,  7,  0, // 7x
     3,  6,  2,  0,  3,  3,  3,  0,  2,  2,  2,  0,  4,  4,  4,  0, // 8x
     2,  6,  3,  0,  4,  4,  4,  0,  2,  5,  2,  0,  4,  5,  5,  0, // 9x
     2,  6,  2,  0,  3,  3,  3,  0,  2,  2,  2,  0,  4,  4,  4,  0, // Ax
     2,  5,  3,  0,  4,  4,  4,  0,  2,  4,  2,  0,  4,  4,  4,  0, // Bx
     2,  6,  2,  0,  3,  3,  5,  0,  2,  2,  2,  0,  4,  4,  6,  0, // Cx
     2,  5,  3,  0,  4,  4,  6,  0,  2,  4,  3,  0,  4,  4,  7,  0, // Dx
     2,  6,  2,  0,  3,  3,  5,  0,  2,  2,  2,  0,  4,  4,  6,  0, // Ex
     2,  5,  3,  0,  4,  4,  6,  0,  2,  4,  4,  0,  4,  4,  7,  0, // Fx
];

/// Return the base cycle cost for an opcode
pub fn cycle_count(opcode: u8) -> u8 {
    CYCLES[opcode as usize]
}

/// Decode one opcode byte into its addressing mode and mnemonic.
///
/// Every one of the 256 byte values is mapped. Genuine holes in the 65C02
/// table decode to `BAD`, which the executor treats as a logged NOP; the
/// multi-byte NOP forms decode to `NOP` with the mode that consumes their
/// operand bytes.
#[inline]
pub fn decode_instruction(opcode: u8) -> (AddressingMode, Instruction) {
    use AddressingMode::*;
    use Instruction::*;

    match opcode {
        // 0x0_
        0x00 => (Impl, BRK),
        0x01 => (IndX, ORA),
        0x02 => (Imm, NOP),
        0x04 => (ZP, TSB),
        0x05 => (ZP, ORA),
        0x06 => (ZP, ASL),
        0x08 => (Impl, PHP),
        0x09 => (Imm, ORA),
        0x0A => (Accum, ASL),
        0x0C => (Abs, TSB),
        0x0D => (Abs, ORA),
        0x0E => (Abs, ASL),

        // 0x1_
        0x10 => (Rel, BPL),
        0x11 => (IndY, ORA),
        0x12 => (ZP, NOP),
        0x14 => (ZP, TRB),
        0x15 => (ZPX, ORA),
        0x16 => (ZPX, ASL),
        0x18 => (Impl, CLC),
        0x19 => (AbsY, ORA),
        0x1A => (Accum, INC),
        0x1C => (Abs, TRB),
        0x1D => (AbsX, ORA),
        0x1E => (AbsX, ASL),

        // 0x2_
        0x20 => (Abs, JSR),
        0x21 => (IndX, AND),
        0x22 => (Imm, NOP),
        0x24 => (ZP, BIT),
        0x25 => (ZP, AND),
        0x26 => (ZP, ROL),
        0x28 => (Impl, PLP),
        0x29 => (Imm, AND),
        0x2A => (Accum, ROL),
        0x2C => (Abs, BIT),
        0x2D => (Abs, AND),
        0x2E => (Abs, ROL),

        // 0x3_
        0x30 => (Rel, BMI),
        0x31 => (IndY, AND),
        0x32 => (ZP, NOP),
        0x34 => (ZPX, BIT),
        0x35 => (ZPX, AND),
        0x36 => (ZPX, ROL),
        0x38 => (Impl, SEC),
        0x39 => (AbsY, AND),
        0x3A => (Accum, DEC),
        0x3C => (AbsX, BIT),
        0x3D => (AbsX, AND),
        0x3E => (AbsX, ROL),

        // 0x4_
        0x40 => (Impl, RTI),
        0x41 => (IndX, EOR),
        0x42 => (Imm, NOP),
        0x44 => (ZP, NOP),
        0x45 => (ZP, EOR),
        0x46 => (ZP, LSR),
        0x48 => (Impl, PHA),
        0x49 => (Imm, EOR),
        0x4A => (Accum, LSR),
        0x4C => (Abs, JMP),
        0x4D => (Abs, EOR),
        0x4E => (Abs, LSR),

        // 0x5_
        0x50 => (Rel, BVC),
        0x51 => (IndY, EOR),
        0x52 => (ZP, NOP),
        0x54 => (ZPX, NOP),
        0x55 => (ZPX, EOR),
        0x56 => (ZPX, LSR),
        0x58 => (Impl, CLI),
        0x59 => (AbsY, EOR),
        0x5A => (Impl, PHY),
        0x5C => (Abs, NOP),
        0x5D => (AbsX, EOR),
        0x5E => (AbsX, LSR),

        // 0x6_
        0x60 => (Impl, RTS),
        0x61 => (IndX, ADC),
        0x62 => (Imm, NOP),
        0x64 => (ZP, STZ),
        0x65 => (ZP, ADC),
        0x66 => (ZP, ROR),
        0x68 => (Impl, PLA),
        0x69 => (Imm, ADC),
        0x6A => (Accum, ROR),
        0x6C => (AbsInd, JMP),
        0x6D => (Abs, ADC),
        0x6E => (Abs, ROR),

        // 0x7_
        0x70 => (Rel, BVS),
        0x71 => (IndY, ADC),
        0x72 => (ZP, NOP),
        0x74 => (ZPX, STZ),
        0x75 => (ZPX, ADC),
        0x76 => (ZPX, ROR),
        0x78 => (Impl, SEI),
        0x79 => (AbsY, ADC),
        0x7A => (Impl, PLY),
        0x7C => (AbsX, JMP),
        0x7D => (AbsX, ADC),
        0x7E => (AbsX, ROR),

        // 0x8_
        0x80 => (Rel, BRA),
        0x81 => (IndX, STA),
        0x82 => (Imm, NOP),
        0x84 => (ZP, STY),
        0x85 => (ZP, STA),
        0x86 => (ZP, STX),
        0x88 => (Impl, DEY),
        0x89 => (Imm, BIT),
        0x8A => (Impl, TXA),
        0x8C => (Abs, STY),
        0x8D => (Abs, STA),
        0x8E => (Abs, STX),

        // 0x9_
        0x90 => (Rel, BCC),
        0x91 => (IndY, STA),
        0x92 => (ZP, NOP),
        0x94 => (ZPX, STY),
        0x95 => (ZPX, STA),
        0x96 => (ZPY, STX),
        0x98 => (Impl, TYA),
        0x99 => (AbsY, STA),
        0x9A => (Impl, TXS),
        0x9C => (Abs, STZ),
        0x9D => (AbsX, STA),
        0x9E => (AbsX, STZ),

        // 0xA_
        0xA0 => (Imm, LDY),
        0xA1 => (IndX, LDA),
        0xA2 => (Imm, LDX),
        0xA4 => (ZP, LDY),
        0xA5 => (ZP, LDA),
        0xA6 => (ZP, LDX),
        0xA8 => (Impl, TAY),
        0xA9 => (Imm, LDA),
        0xAA => (Impl, TAX),
        0xAC => (Abs, LDY),
        0xAD => (Abs, LDA),
        0xAE => (Abs, LDX),

        // 0xB_
        0xB0 => (Rel, BCS),
        0xB1 => (IndY, LDA),
        0xB2 => (ZP, NOP),
        0xB4 => (ZPX, LDY),
        0xB5 => (ZPX, LDA),
        0xB6 => (ZPY, LDX),
        0xB8 => (Impl, CLV),
        0xB9 => (AbsY, LDA),
        0xBA => (Impl, TSX),
        0xBC => (AbsX, LDY),
        0xBD => (AbsX, LDA),
        0xBE => (AbsY, LDX),

        // 0xC_
        0xC0 => (Imm, CPY),
        0xC1 => (IndX, CMP),
        0xC2 => (Imm, NOP),
        0xC4 => (ZP, CPY),
        0xC5 => (ZP, CMP),
        0xC6 => (ZP, DEC),
        0xC8 => (Impl, INY),
        0xC9 => (Imm, CMP),
        0xCA => (Impl, DEX),
        0xCC => (Abs, CPY),
        0xCD => (Abs, CMP),
        0xCE => (Abs, DEC),

        // 0xD_
        0xD0 => (Rel, BNE),
        0xD1 => (IndY, CMP),
        0xD2 => (ZP, NOP),
        0xD4 => (ZPX, NOP),
        0xD5 => (ZPX, CMP),
        0xD6 => (ZPX, DEC),
        0xD8 => (Impl, CLD),
        0xD9 => (AbsY, CMP),
        0xDA => (Impl, PHX),
        0xDC => (Abs, NOP),
        0xDD => (AbsX, CMP),
        0xDE => (AbsX, DEC),

        // 0xE_
        0xE0 => (Imm, CPX),
        0xE1 => (IndX, SBC),
        0xE2 => (Imm, NOP),
        0xE4 => (ZP, CPX),
        0xE5 => (ZP, SBC),
        0xE6 => (ZP, INC),
        0xE8 => (Impl, INX),
        0xE9 => (Imm, SBC),
        0xEA => (Impl, NOP),
        0xEC => (Abs, CPX),
        0xED => (Abs, SBC),
        0xEE => (Abs, INC),

        // 0xF_
        0xF0 => (Rel, BEQ),
        0xF1 => (IndY, SBC),
        0xF2 => (ZP, NOP),
        0xF4 => (ZPX, NOP),
        0xF5 => (ZPX, SBC),
        0xF6 => (ZPX, INC),
        0xF8 => (Impl, SED),
        0xF9 => (AbsY, SBC),
        0xFA => (Impl, PLX),
        0xFC => (Abs, NOP),
        0xFD => (AbsX, SBC),
        0xFE => (AbsX, INC),

        _ => (Impl, BAD),
    }
}
