/// A struct holding state information about a 65C02 CPU.
///
/// This struct is held internally, but can be copied to power things like
/// debug formatters or serialization taken at an instruction boundary.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct CpuState {
    /// The Accumulator register
    pub a: u8,

    /// X index register
    pub x: u8,

    /// Y index register
    pub y: u8,

    /// The stack pointer
    ///
    /// # Note
    ///
    /// This register is a pointer to a location on the first page ($01XX)
    /// of memory. The 6502 uses a bottom-up stack, so the 'first' location
    /// on the stack is `$01FF` and the 'last' is `$0100`.
    pub s: u8,

    /// The program counter
    ///
    /// # Note
    ///
    /// This is advanced past the opcode and operand bytes after address
    /// resolution, so instruction handlers observe the address of the
    /// _next_ instruction.
    pub pc: u16,

    /// The program status register.
    pub p: Status,

    /// The effective address resolved for the instruction in flight, or 0
    /// for modes that have none (immediate, implied, accumulator)
    pub eff_addr: u16,

    /// The effective address of the _previous_ instruction.
    ///
    /// Some soft switches (the $C08x bank switches) only act on the second
    /// of two consecutive reads; they compare this field against the
    /// address being read to detect that pattern.
    pub last_addr: u16,

    /// The opcode being executed
    pub last_opcode: u8,

    /// The operand value the current instruction handler was given
    pub last_operand: u8,

    /// The addressing mode of the opcode being executed
    pub addr_mode: AddressingMode,

    /// The decoded instruction being executed
    pub instr: Instruction,

    /// Whether resolving the effective address crossed a page boundary on
    /// an indexed mode; such instructions are charged one extra cycle
    pub page_crossed: bool,
}

/// The addressing mode for the CPU
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum AddressingMode {
    /// Zero-Page
    ZP,
    /// Zero-Page Indexed, X register
    ZPX,
    /// Zero-Page Indexed, Y register
    ZPY,
    /// Absolute Indexed, plus X register
    AbsX,
    /// Absolute Indexed, plus Y register
    AbsY,
    /// Indexed Indirect (d, x)
    IndX,
    /// Indirect Indexed (d), y
    IndY,
    /// Implicit indexing (do nothing, resolve nothing)
    Impl,
    /// Use the Accumulator
    Accum,
    /// Don't fetch anything and use the operand as data
    Imm,
    /// Branch to a displacement relative to the instruction
    Rel,
    /// Dereference a 16-bit pointer given in the operand
    AbsInd,
    /// The 16-bit address is included in the operand
    Abs,
}

impl AddressingMode {
    /// The number of operand bytes the mode consumes after the opcode
    pub fn operand_len(self) -> u8 {
        match self {
            AddressingMode::Abs
            | AddressingMode::AbsX
            | AddressingMode::AbsY
            | AddressingMode::AbsInd => 2,
            AddressingMode::ZP
            | AddressingMode::ZPX
            | AddressingMode::ZPY
            | AddressingMode::IndX
            | AddressingMode::IndY
            | AddressingMode::Imm
            | AddressingMode::Rel => 1,
            AddressingMode::Impl | AddressingMode::Accum => 0,
        }
    }
}

/// The CPU opcode mnemonic
///
/// This is the 65C02 set: the NMOS 6502 instructions plus the Rockwell
/// additions the Apple IIe line shipped with (BRA, STZ, TRB/TSB, the
/// PHX/PHY/PLX/PLY stack forms, and accumulator INC/DEC).
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum Instruction {
    /// ADd with Carry; honors the decimal flag
    ADC,
    /// bitwise AND w/ acc
    AND,
    /// Arithmetic Shift Left
    ASL,
    /// A hole in the opcode table; executes as NOP and logs
    BAD,
    /// test BITs
    BIT,

    //region Branch instructions
    /// Branch on Carry Clear
    BCC,
    /// Branch on Carry Set
    BCS,
    /// Branch on EQual
    BEQ,
    /// Branch on MInus
    BMI,
    /// Branch on Not Equal
    BNE,
    /// Branch on PLus
    BPL,
    /// BRanch Always
    BRA,
    /// Branch on oVerflow Clear
    BVC,
    /// Branch on oVerflow Set
    BVS,
    //endregion
    /// BReaK
    BRK,
    /// CoMPare acc
    CMP,
    /// ComPare X
    CPX,
    /// ComPare Y
    CPY,
    /// DECrement memory (or the accumulator)
    DEC,
    /// bitwise Exclusive OR
    EOR,

    //region Flag instructions
    /// CLear Carry
    CLC,
    /// CLear Decimal
    CLD,
    /// CLear Interrupt mask
    CLI,
    /// CLear oVerflow
    CLV,
    /// SEt Carry
    SEC,
    /// SEt Decimal
    SED,
    /// SEt Interrupt mask
    SEI,
    //endregion
    /// INCrement memory (or the accumulator)
    INC,
    /// JuMP
    JMP,
    /// Jump to SubRoutine
    JSR,
    /// LoaD Acc
    LDA,
    /// LoaD X
    LDX,
    /// LoaD Y
    LDY,
    /// Logical Shift Right
    LSR,
    /// No OPeration
    NOP,
    /// bitwise OR with Acc
    ORA,

    //region Register instructions
    /// DEcrement X
    DEX,
    /// DEcrement Y
    DEY,
    /// INcrement X
    INX,
    /// INcrement Y
    INY,
    /// Transfer A to X
    TAX,
    /// Transfer A to Y
    TAY,
    /// Transfer X to A
    TXA,
    /// Transfer Y to A
    TYA,
    //endregion

    //region Rotation instructions
    // Note: rotation includes the carry bit, as a ninth bit, in the
    // rotation; the bit that falls off the other end lands in carry.
    /// ROtate Left
    ROL,
    /// ROtate Right
    ROR,
    //endregion

    //region Returns
    /// ReTurn from Interrupt
    RTI,
    /// ReTurn from Subroutine
    RTS,
    //endregion
    /// SuBtract with Carry; honors the decimal flag
    SBC,

    //region Store instructions
    /// STore Acc
    STA,
    /// STore X
    STX,
    /// STore Y
    STY,
    /// STore Zero
    STZ,
    //endregion

    /// Test and Reset Bits
    TRB,
    /// Test and Set Bits
    TSB,

    //region Stack instructions
    /// PusH Acc
    PHA,
    /// PusH Processor status
    PHP,
    /// PusH X
    PHX,
    /// PusH Y
    PHY,
    /// PuLl Acc
    PLA,
    /// PuLl Processor status
    PLP,
    /// PuLl X
    PLX,
    /// PuLl Y
    PLY,
    /// Transfer Stack to X
    TSX,
    /// Transfer X to Stack
    TXS,
    //endregion
}

bitflags! {
    pub struct Status: u8 {
        const CARRY = 0x01;
        const ZERO = 0x02;
        const IRQ_DISABLE = 0x04;
        const DECIMAL = 0x08;
        const BREAK = 0x10;
        const UNUSED = 0x20;
        const OVERFLOW = 0x40;
        const NEGATIVE = 0x80;
    }
}

/// The state the CPU boots with: vectors not yet consulted, stack at the
/// top of its page, and the status register at its hardware default.
pub const POWERON_CPU_STATE: CpuState = CpuState {
    a: 0,
    x: 0,
    y: 0,
    s: 0xFF,
    pc: 0,
    p: Status::from_bits_truncate(0xB3),
    eff_addr: 0,
    last_addr: 0,
    last_opcode: 0xEA,
    last_operand: 0,
    addr_mode: AddressingMode::Impl,
    instr: Instruction::NOP,
    page_crossed: false,
};
