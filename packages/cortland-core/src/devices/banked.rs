//! The banked memory subsystem.
//!
//! The 64K address space is backed by a main and an auxiliary segment,
//! each 0x11000 bytes long: the extra 4K past the 64K mark is the "RAM2"
//! overlay that bank switching can map into $D000-$DFFF. ROM lives in its
//! own write-protected segment. Which store services a given access
//! depends on the region the address falls in and on three families of
//! mode flags, all of which are flipped through soft switches.

use crate::devices::bus::memory_map::{self, Region, HIRES_PAGE1, TEXT_PAGE1};
use crate::devices::cpu::WithCpu;
use crate::devices::machine::Machine;
use crate::devices::mem::Segment;
use crate::errors::{Error, Result};

/// Size of the main and aux segments: 64K plus the 4K RAM2 overlay
pub const BANK_SEGMENT_SIZE: usize = 0x11000;

/// Offset added to a $D000-$DFFF address to land in the RAM2 overlay
pub const RAM2_OFFSET: usize = 0x3000;

/// Start of the bank-switchable window
pub const BANK_OFFSET: usize = 0xD000;

/// ROM segment layout: 12K of system ROM for $D000-$FFFF, then the 4K
/// internal image of the $C000-$CFFF space, then 2K of peripheral-card
/// ROM pages
pub const ROM_SIZE: usize = 0x4800;
pub const INTERNAL_ROM_OFFSET: usize = 0x3000;
pub const PERIPHERAL_ROM_OFFSET: usize = 0x4000;

/// Which of the two RAM banks an access is aimed at. Soft-switch hooks
/// receive the selector that routing picked for the access that fired
/// them.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum BankSel {
    Main,
    Aux,
}

bitflags! {
    /// Bank-switch flags for the $D000-$FFFF window. The default (empty)
    /// state reads ROM, drops writes, and selects the RAM1 mapping.
    pub struct BankSwitch: u8 {
        const RAM_READ = 0x01;
        const WRITE_ENABLE = 0x02;
        const RAM2 = 0x04;
        const ALT_ZP = 0x08;
    }
}

bitflags! {
    /// Memory-routing flags
    pub struct MemoryMode: u8 {
        const READ_AUX = 0x01;
        const WRITE_AUX = 0x02;
        const STORE80 = 0x04;
        const PAGE2 = 0x08;
        const HIRES = 0x10;
        const SLOTCXROM = 0x20;
        const SLOTC3ROM = 0x40;
        const EXPROM = 0x80;
    }
}

bitflags! {
    /// Display flags. The drawing collaborator reads these to pick a
    /// renderer; the core only stores them and answers status queries.
    pub struct DisplayMode: u8 {
        const TEXT = 0x01;
        const MIXED = 0x02;
        const COL80 = 0x04;
        const ALTCHAR = 0x08;
        const DHIRES = 0x10;
        const IOUDIS = 0x20;
    }
}

pub struct BankedMemory {
    pub main: Segment,
    pub aux: Segment,
    pub rom: Segment,
    pub bank: BankSwitch,
    pub mode: MemoryMode,
    pub display: DisplayMode,
}

impl BankedMemory {
    pub fn new() -> BankedMemory {
        BankedMemory {
            main: Segment::new(BANK_SEGMENT_SIZE),
            aux: Segment::new(BANK_SEGMENT_SIZE),
            rom: Segment::new(ROM_SIZE),
            bank: BankSwitch::empty(),
            // Slot-card ROM is visible at reset so that the boot code can
            // find the disk controller at $C600
            mode: MemoryMode::SLOTCXROM,
            display: DisplayMode::TEXT,
        }
    }

    fn segment(&self, sel: BankSel) -> &Segment {
        match sel {
            BankSel::Main => &self.main,
            BankSel::Aux => &self.aux,
        }
    }

    fn segment_mut(&mut self, sel: BankSel) -> &mut Segment {
        match sel {
            BankSel::Main => &mut self.main,
            BankSel::Aux => &mut self.aux,
        }
    }

    /// Load a system ROM image: either a bare 12K sysrom, or a 16K image
    /// whose first 4K is the internal $C000-$CFFF ROM
    pub fn load_rom(&mut self, image: &[u8]) -> Result<()> {
        match image.len() {
            0x3000 => {
                self.rom.copy_buf(image, 0);
                Ok(())
            }
            0x4000 => {
                self.rom.copy_buf(&image[0x1000..], 0);
                self.rom.copy_buf(&image[..0x1000], INTERNAL_ROM_OFFSET);
                Ok(())
            }
            len => Err(Error::BadFile(format!(
                "system rom must be 12K or 16K, got {} bytes",
                len
            ))),
        }
    }

    /// Copy a 256-byte card ROM into the page for the given slot (1-7)
    pub fn load_peripheral_rom(&mut self, slot: usize, image: &[u8]) -> Result<()> {
        if !(1..=7).contains(&slot) {
            return Err(Error::InvalidOp("peripheral slot out of range"));
        }
        if image.len() != 0x100 {
            return Err(Error::BadFile(format!(
                "peripheral rom must be 256 bytes, got {}",
                image.len()
            )));
        }
        self.rom.copy_buf(image, PERIPHERAL_ROM_OFFSET + (slot << 8));
        Ok(())
    }

    pub fn read(&mut self, sel: BankSel, addr: u16) -> u8 {
        match memory_map::match_addr(addr) {
            // The live zero page and stack are always physically in main;
            // the ALT_ZP switch swaps contents, not pointers
            Region::ZeroPage => self.main.get(addr as usize),
            Region::Display => {
                let seg = self.display_segment(sel, addr);
                self.segment(seg).get(addr as usize)
            }
            Region::Ram | Region::Io => self.segment(sel).get(addr as usize),
            Region::SlotRom => self.slot_rom_read(addr),
            Region::Bank => self.bank_read(sel, addr),
        }
    }

    pub fn write(&mut self, sel: BankSel, addr: u16, value: u8) {
        match memory_map::match_addr(addr) {
            Region::ZeroPage => self.main.set(addr as usize, value),
            Region::Display => {
                let seg = self.display_segment(sel, addr);
                self.segment_mut(seg).set(addr as usize, value);
            }
            Region::Ram | Region::Io => self.segment_mut(sel).set(addr as usize, value),
            Region::SlotRom => {
                // ROM ignores stores, but touching $CFFF still drops the
                // expansion window
                if addr == 0xCFFF {
                    self.mode.remove(MemoryMode::EXPROM);
                }
            }
            Region::Bank => self.bank_write(sel, addr, value),
        }
    }

    /// Decide which bank a display-buffer access belongs to. With
    /// 80-store high and page 2 selected, text page 1 accesses are
    /// serviced from aux; hires page 1 accesses follow only if the hires
    /// flag is also high. Everything else keeps the caller's selector.
    fn display_segment(&self, sel: BankSel, addr: u16) -> BankSel {
        if !self.mode.contains(MemoryMode::STORE80) || !self.mode.contains(MemoryMode::PAGE2) {
            return sel;
        }
        if TEXT_PAGE1.contains(addr) {
            return BankSel::Aux;
        }
        if HIRES_PAGE1.contains(addr) && self.mode.contains(MemoryMode::HIRES) {
            return BankSel::Aux;
        }
        sel
    }

    fn slot_rom_read(&mut self, addr: u16) -> u8 {
        if addr == 0xCFFF {
            self.mode.remove(MemoryMode::EXPROM);
        }

        let use_card = match addr {
            0xC300..=0xC3FF => {
                self.mode.contains(MemoryMode::SLOTCXROM)
                    && self.mode.contains(MemoryMode::SLOTC3ROM)
            }
            0xC100..=0xC7FF => self.mode.contains(MemoryMode::SLOTCXROM),
            _ => self.mode.contains(MemoryMode::EXPROM),
        };

        if use_card {
            // Touching a card's slot page points the $C800 expansion
            // window at that card until something touches $CFFF
            if addr <= 0xC7FF {
                self.mode.insert(MemoryMode::EXPROM);
            }
            self.rom
                .get(PERIPHERAL_ROM_OFFSET + (addr as usize & 0x7FF))
        } else {
            self.rom
                .get(INTERNAL_ROM_OFFSET + (addr as usize - 0xC000))
        }
    }

    /// Return a byte from the bank-switchable window. This may come from
    /// ROM, from the segment's own $Dnnn-$Fnnn range, or from the RAM2
    /// overlay held past the 64K mark.
    fn bank_read(&self, sel: BankSel, addr: u16) -> u8 {
        if !self.bank.contains(BankSwitch::RAM_READ) {
            return self.rom.get(addr as usize - BANK_OFFSET);
        }

        let seg = self.segment(sel);
        if addr < 0xE000 && self.bank.contains(BankSwitch::RAM2) {
            return seg.get(addr as usize + RAM2_OFFSET);
        }

        seg.get(addr as usize)
    }

    /// Write into the bank-switchable window. Writes never reach ROM: it
    /// is possible to read ROM and write RAM at the same time, so the
    /// write path only consults the write-enable and RAM2 bits.
    fn bank_write(&mut self, sel: BankSel, addr: u16, value: u8) {
        if !self.bank.contains(BankSwitch::WRITE_ENABLE) {
            return;
        }

        let use_ram2 = addr < 0xE000 && self.bank.contains(BankSwitch::RAM2);
        let seg = self.segment_mut(sel);
        if use_ram2 {
            seg.set(addr as usize + RAM2_OFFSET, value);
            return;
        }

        seg.set(addr as usize, value);
    }

    /// Replace the bank-switch state with one of the $C08x targets,
    /// leaving the zero-page selection alone
    pub fn apply_bank_state(&mut self, target: BankSwitch) {
        let alt_zp = self.bank & BankSwitch::ALT_ZP;
        self.bank = target | alt_zp;
    }

    /// Select the main or aux zero page and stack. The two pages are
    /// independent stores; flipping the switch exchanges the contents so
    /// the live pair is always the one physically in main.
    pub fn set_alt_zp(&mut self, enabled: bool) {
        if self.bank.contains(BankSwitch::ALT_ZP) == enabled {
            return;
        }

        for addr in 0..0x200 {
            let m = self.main.get(addr);
            let a = self.aux.get(addr);
            self.main.set(addr, a);
            self.aux.set(addr, m);
        }

        self.bank.set(BankSwitch::ALT_ZP, enabled);
    }
}

impl Default for BankedMemory {
    fn default() -> Self {
        BankedMemory::new()
    }
}

/// The bank-switch target each $C08x address selects, from the switch
/// protocol: the address's low bits choose among read-ROM/read-RAM,
/// write-enable, and which 4K lives at $Dnnn.
fn bank_switch_target(addr: u16) -> Option<BankSwitch> {
    match addr {
        0xC080 => Some(BankSwitch::RAM_READ | BankSwitch::RAM2),
        0xC081 => Some(BankSwitch::WRITE_ENABLE | BankSwitch::RAM2),
        0xC082 => Some(BankSwitch::RAM2),
        0xC083 => Some(BankSwitch::RAM_READ | BankSwitch::WRITE_ENABLE | BankSwitch::RAM2),
        0xC088 => Some(BankSwitch::RAM_READ),
        0xC089 => Some(BankSwitch::WRITE_ENABLE),
        0xC08A => Some(BankSwitch::empty()),
        0xC08B => Some(BankSwitch::RAM_READ | BankSwitch::WRITE_ENABLE),
        _ => None,
    }
}

/// Read hook for the bank-switch addresses.
///
/// A single read only reports: the high bit answers whether the bits the
/// address would select are already in force. The switch flips on the
/// second of two consecutive reads of the same address, which is visible
/// through the CPU's access history.
pub fn bank_switch_read(mach: &mut Machine, _sel: BankSel, addr: u16) -> u8 {
    if let Some(target) = bank_switch_target(addr) {
        if mach.cpu().state.last_addr == addr {
            mach.mem.apply_bank_state(target);
            return 0x80;
        }

        return if mach.mem.bank.contains(target) {
            0x80
        } else {
            0x00
        };
    }

    match addr {
        // Status queries report on the high bit
        0xC011 => {
            if mach.mem.bank.contains(BankSwitch::RAM2) {
                0x80
            } else {
                0x00
            }
        }
        0xC012 => {
            if mach.mem.bank.contains(BankSwitch::RAM_READ) {
                0x80
            } else {
                0x00
            }
        }
        0xC016 => {
            if mach.mem.bank.contains(BankSwitch::ALT_ZP) {
                0x80
            } else {
                0x00
            }
        }
        _ => 0,
    }
}

/// Write hook for the bank-switch addresses: a write always applies the
/// target state, no double-access protocol required. $C008/$C009 select
/// the zero-page bank.
pub fn bank_switch_write(mach: &mut Machine, _sel: BankSel, addr: u16, _value: u8) {
    if let Some(target) = bank_switch_target(addr) {
        mach.mem.apply_bank_state(target);
        return;
    }

    match addr {
        0xC008 => mach.mem.set_alt_zp(false),
        0xC009 => mach.mem.set_alt_zp(true),
        _ => {}
    }
}
