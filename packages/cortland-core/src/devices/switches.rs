//! The soft-switch dispatch table and the display/memory-mode switch
//! handlers.
//!
//! A soft switch is an I/O address whose read or write mutates a machine
//! mode flag as a side effect; reads may also return a status byte. The
//! table holds one optional read hook and one optional write hook per
//! address. Hooks are plain functions over the machine, not closures, so
//! the table stays `Copy`-friendly and the machine stays the single owner
//! of all mutable state.

use crate::devices::banked::{self, BankSel, DisplayMode, MemoryMode};
use crate::devices::disk;
use crate::devices::machine::Machine;

pub type ReadHook = fn(&mut Machine, BankSel, u16) -> u8;
pub type WriteHook = fn(&mut Machine, BankSel, u16, u8);

pub struct SwitchTable {
    reads: Vec<Option<ReadHook>>,
    writes: Vec<Option<WriteHook>>,
}

impl SwitchTable {
    pub fn new() -> SwitchTable {
        SwitchTable {
            reads: vec![None; 0x10000],
            writes: vec![None; 0x10000],
        }
    }

    pub fn map_read(&mut self, addr: u16, hook: ReadHook) {
        self.reads[addr as usize] = Some(hook);
    }

    pub fn map_write(&mut self, addr: u16, hook: WriteHook) {
        self.writes[addr as usize] = Some(hook);
    }

    pub fn read_hook(&self, addr: u16) -> Option<ReadHook> {
        self.reads[addr as usize]
    }

    pub fn write_hook(&self, addr: u16) -> Option<WriteHook> {
        self.writes[addr as usize]
    }
}

impl Default for SwitchTable {
    fn default() -> Self {
        SwitchTable::new()
    }
}

/// The addresses answered by `display_switch_read`
const DISPLAY_SWITCH_READS: [u16; 12] = [
    0xC01A, 0xC01B, 0xC01E, 0xC01F, 0xC050, 0xC051, 0xC052, 0xC053, 0xC05E, 0xC05F, 0xC07E, 0xC07F,
];

/// The addresses answered by `display_switch_write`
const DISPLAY_SWITCH_WRITES: [u16; 12] = [
    0xC00C, 0xC00D, 0xC00E, 0xC00F, 0xC050, 0xC051, 0xC052, 0xC053, 0xC05E, 0xC05F, 0xC07E, 0xC07F,
];

/// Populate the dispatch table with everything the machine wires at boot.
/// The keyboard addresses ($C000 read / $C010) are left alone; the
/// keyboard collaborator registers those itself through `Machine::map_read`.
pub fn wire_soft_switches(table: &mut SwitchTable) {
    // Bank switching: the $C08x protocol plus the status queries
    for addr in 0xC080..=0xC08B {
        table.map_read(addr, banked::bank_switch_read);
        table.map_write(addr, banked::bank_switch_write);
    }
    for addr in [0xC011, 0xC012, 0xC016] {
        table.map_read(addr, banked::bank_switch_read);
    }
    for addr in [0xC008, 0xC009] {
        table.map_write(addr, banked::bank_switch_write);
    }

    // Memory-mode routing: aux read/write, 80-store, page 2, hires
    for addr in [0xC000, 0xC001, 0xC002, 0xC003, 0xC004, 0xC005, 0xC006, 0xC007, 0xC00A, 0xC00B]
    {
        table.map_write(addr, mem_switch_write);
    }
    for addr in [0xC013, 0xC014, 0xC015, 0xC017, 0xC018] {
        table.map_read(addr, mem_switch_read);
    }
    // Page-2 and hires selection work from either table, identically
    for addr in 0xC054..=0xC057 {
        table.map_read(addr, mem_switch_read);
        table.map_write(addr, mem_switch_write);
    }

    // Display switches
    for addr in DISPLAY_SWITCH_READS {
        table.map_read(addr, display_switch_read);
    }
    for addr in DISPLAY_SWITCH_WRITES {
        table.map_write(addr, display_switch_write);
    }

    // The disk controller answers a full page per drive pair
    for addr in 0xC0E0..=0xC0FF {
        table.map_read(addr, disk::controller_read);
        table.map_write(addr, disk::controller_write);
    }
}

fn status_bit(set: bool) -> u8 {
    if set {
        0x80
    } else {
        0x00
    }
}

/// Flip one of the memory-mode routing bits. Value bytes are ignored;
/// the address alone names the flag and the polarity.
fn mem_switch_write(mach: &mut Machine, _sel: BankSel, addr: u16, _value: u8) {
    let mode = &mut mach.mem.mode;
    match addr {
        0xC000 => mode.remove(MemoryMode::STORE80),
        0xC001 => mode.insert(MemoryMode::STORE80),
        0xC002 => mode.remove(MemoryMode::READ_AUX),
        0xC003 => mode.insert(MemoryMode::READ_AUX),
        0xC004 => mode.remove(MemoryMode::WRITE_AUX),
        0xC005 => mode.insert(MemoryMode::WRITE_AUX),
        0xC006 => mode.insert(MemoryMode::SLOTCXROM),
        0xC007 => mode.remove(MemoryMode::SLOTCXROM),
        0xC00A => mode.remove(MemoryMode::SLOTC3ROM),
        0xC00B => mode.insert(MemoryMode::SLOTC3ROM),
        0xC054 => mode.remove(MemoryMode::PAGE2),
        0xC055 => mode.insert(MemoryMode::PAGE2),
        0xC056 => mode.remove(MemoryMode::HIRES),
        0xC057 => mode.insert(MemoryMode::HIRES),
        _ => {}
    }
}

/// Memory-mode status queries, plus the read side of the page-2 and
/// hires selects (which switch on read exactly as they do on write)
fn mem_switch_read(mach: &mut Machine, sel: BankSel, addr: u16) -> u8 {
    match addr {
        0xC013 => status_bit(mach.mem.mode.contains(MemoryMode::READ_AUX)),
        0xC014 => status_bit(mach.mem.mode.contains(MemoryMode::WRITE_AUX)),
        0xC015 => status_bit(mach.mem.mode.contains(MemoryMode::SLOTCXROM)),
        0xC017 => status_bit(mach.mem.mode.contains(MemoryMode::SLOTC3ROM)),
        0xC018 => status_bit(mach.mem.mode.contains(MemoryMode::STORE80)),
        0xC054..=0xC057 => {
            mem_switch_write(mach, sel, addr, 0);
            0
        }
        _ => 0,
    }
}

/// Handle all read switches for the display mode. Some switches respond
/// to either reads or writes, so several cases are duplicated in the
/// write handler.
fn display_switch_read(mach: &mut Machine, sel: BankSel, addr: u16) -> u8 {
    let display = mach.mem.display;
    match addr {
        0xC01A => status_bit(display.contains(DisplayMode::TEXT)),
        0xC01B => status_bit(display.contains(DisplayMode::MIXED)),
        0xC01E => status_bit(display.contains(DisplayMode::ALTCHAR)),
        0xC01F => status_bit(display.contains(DisplayMode::COL80)),

        // IOUDIS shares a write address with its own status read; DHIRES
        // reads back on the neighboring address
        0xC07E => status_bit(display.contains(DisplayMode::IOUDIS)),
        0xC07F => status_bit(display.contains(DisplayMode::DHIRES)),

        // These perform the switch as a side effect of the read
        0xC050..=0xC053 | 0xC05E | 0xC05F => {
            display_switch_write(mach, sel, addr, 0);
            0
        }
        _ => 0,
    }
}

/// The write side of the display switches
fn display_switch_write(mach: &mut Machine, _sel: BankSel, addr: u16, _value: u8) {
    let display = &mut mach.mem.display;
    match addr {
        0xC00C => display.insert(DisplayMode::COL80),
        0xC00D => display.remove(DisplayMode::COL80),
        0xC00E => display.insert(DisplayMode::ALTCHAR),
        0xC00F => display.remove(DisplayMode::ALTCHAR),
        0xC050 => display.insert(DisplayMode::TEXT),
        0xC051 => display.remove(DisplayMode::TEXT),
        0xC052 => display.insert(DisplayMode::MIXED),
        0xC053 => display.remove(DisplayMode::MIXED),

        // The double-hires pair only responds while IOUDIS is high
        0xC05E => {
            if display.contains(DisplayMode::IOUDIS) {
                display.insert(DisplayMode::DHIRES);
            }
        }
        0xC05F => {
            if display.contains(DisplayMode::IOUDIS) {
                display.remove(DisplayMode::DHIRES);
            }
        }
        0xC07E => display.insert(DisplayMode::IOUDIS),
        0xC07F => display.remove(DisplayMode::IOUDIS),
        _ => {}
    }
}
