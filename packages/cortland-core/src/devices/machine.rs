//! The machine as a whole unit: one CPU, the banked memory, two disk
//! drives, and the soft-switch table that stitches them together.

use std::io::Read;
use std::sync::mpsc::Receiver;

use tracing::info;

use super::banked::{BankSel, BankedMemory, MemoryMode};
use super::bus::Motherboard;
use super::cpu::{self, Cpu65C02, WithCpu};
use super::disk::Disk;
use super::switches::{self, ReadHook, SwitchTable, WriteHook};
use crate::errors::Result;

/// Control requests delivered from the host between instructions
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum Control {
    Pause,
    Resume,
    Shutdown,
}

/// Which of the two drives the controller currently addresses
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
enum DriveSelect {
    Drive1,
    Drive2,
}

pub struct Machine {
    cpu: Cpu65C02,
    pub mem: BankedMemory,
    pub drive1: Disk,
    pub drive2: Disk,
    selected: DriveSelect,
    switches: SwitchTable,
    /// Addresses the run loop pauses at, checked against PC between
    /// instructions
    breakpoints: Vec<u16>,
    paused: bool,
    should_exit: bool,
    /// Set when resuming out of a breakpoint so the loop steps off it
    /// instead of immediately re-matching
    stepping_off_break: bool,
}

impl Machine {
    pub fn new() -> Machine {
        let mut switches = SwitchTable::new();
        switches::wire_soft_switches(&mut switches);

        Machine {
            cpu: Cpu65C02::new(),
            mem: BankedMemory::new(),
            drive1: Disk::new(),
            drive2: Disk::new(),
            selected: DriveSelect::Drive1,
            switches,
            breakpoints: Vec::new(),
            paused: false,
            should_exit: false,
            stepping_off_break: false,
        }
    }

    /// Load the system ROM image; see `BankedMemory::load_rom` for the
    /// accepted shapes
    pub fn load_rom(&mut self, image: &[u8]) -> Result<()> {
        self.mem.load_rom(image)
    }

    /// Install a 256-byte card ROM into a peripheral slot page
    pub fn load_peripheral_rom(&mut self, slot: usize, image: &[u8]) -> Result<()> {
        self.mem.load_peripheral_rom(slot, image)
    }

    /// Point the CPU at the reset vector and put the registers in their
    /// boot state
    pub fn boot(&mut self) {
        cpu::reset(self);
        info!("machine booted, pc = {:04X}", self.cpu.state.pc);
    }

    /// Execute one instruction and return the cycles it charged
    pub fn step(&mut self) -> u32 {
        cpu::step(self)
    }

    /// Register a read hook at an I/O address. External collaborators
    /// (the keyboard, most notably) claim their addresses through this.
    pub fn map_read(&mut self, addr: u16, hook: ReadHook) {
        self.switches.map_read(addr, hook);
    }

    /// Register a write hook at an I/O address
    pub fn map_write(&mut self, addr: u16, hook: WriteHook) {
        self.switches.map_write(addr, hook);
    }

    /// Insert a disk image into drive 1 or 2
    pub fn insert_disk<R: Read>(&mut self, drive: usize, stream: &mut R) -> Result<()> {
        match drive {
            2 => self.drive2.insert(stream),
            _ => self.drive1.insert(stream),
        }
    }

    pub fn select_drive(&mut self, drive: usize) {
        self.selected = match drive {
            2 => DriveSelect::Drive2,
            _ => DriveSelect::Drive1,
        };
    }

    pub fn selected_drive(&self) -> &Disk {
        match self.selected {
            DriveSelect::Drive1 => &self.drive1,
            DriveSelect::Drive2 => &self.drive2,
        }
    }

    pub fn selected_drive_mut(&mut self) -> &mut Disk {
        match self.selected {
            DriveSelect::Drive1 => &mut self.drive1,
            DriveSelect::Drive2 => &mut self.drive2,
        }
    }

    pub fn add_breakpoint(&mut self, addr: u16) {
        if !self.breakpoints.contains(&addr) {
            self.breakpoints.push(addr);
        }
    }

    pub fn remove_breakpoint(&mut self, addr: u16) {
        self.breakpoints.retain(|&bp| bp != addr);
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Ask the run loop to stop at the next instruction boundary
    pub fn request_exit(&mut self) {
        self.should_exit = true;
    }

    fn handle_control(&mut self, event: Control) {
        match event {
            Control::Pause => self.paused = true,
            Control::Resume => {
                if self.paused {
                    self.paused = false;
                    self.stepping_off_break = true;
                }
            }
            Control::Shutdown => self.should_exit = true,
        }
    }

    /// The core run loop. Everything inside one instruction is atomic:
    /// control events are drained only between instructions, a pause
    /// blocks until the host resumes (or hangs up), and breakpoints are
    /// matched against PC at the same boundary.
    pub fn run(&mut self, events: &Receiver<Control>) {
        loop {
            while let Ok(event) = events.try_recv() {
                self.handle_control(event);
            }

            if self.should_exit {
                break;
            }

            if self.paused {
                match events.recv() {
                    Ok(event) => {
                        self.handle_control(event);
                        continue;
                    }
                    // The host hung up; nothing will ever resume us
                    Err(_) => break,
                }
            }

            if !self.stepping_off_break && self.breakpoints.contains(&self.cpu.state.pc) {
                info!("breakpoint at {:04X}", self.cpu.state.pc);
                self.paused = true;
                continue;
            }

            self.stepping_off_break = false;
            self.step();
        }
    }

    /// Which bank the next read at this address belongs to. Reads below
    /// the I/O space follow the aux-read flag; the zero page, ROM, and
    /// bank-window rules are applied later by the banked memory itself.
    fn read_sel(&self) -> BankSel {
        if self.mem.mode.contains(MemoryMode::READ_AUX) {
            BankSel::Aux
        } else {
            BankSel::Main
        }
    }

    fn write_sel(&self) -> BankSel {
        if self.mem.mode.contains(MemoryMode::WRITE_AUX) {
            BankSel::Aux
        } else {
            BankSel::Main
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

impl Motherboard for Machine {
    fn read(&mut self, addr: u16) -> u8 {
        let sel = self.read_sel();
        if let Some(hook) = self.switches.read_hook(addr) {
            return hook(self, sel, addr);
        }
        self.mem.read(sel, addr)
    }

    fn write(&mut self, addr: u16, data: u8) {
        let sel = self.write_sel();
        if let Some(hook) = self.switches.write_hook(addr) {
            hook(self, sel, addr, data);
            return;
        }
        self.mem.write(sel, addr, data);
    }
}

impl WithCpu for Machine {
    fn cpu(&self) -> &Cpu65C02 {
        &self.cpu
    }

    fn cpu_mut(&mut self) -> &mut Cpu65C02 {
        &mut self.cpu
    }
}
