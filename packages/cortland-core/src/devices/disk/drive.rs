//! The Disk II drive mechanism: stepper phases, head position, and the
//! latch-based read/write protocol.
//!
//! The drive itself knows nothing about encodings; it hands back whatever
//! byte the head is over and advances. Everything the running machine
//! does to it goes through the controller's sixteen switch addresses.

use std::io::Read;

use tracing::info;

use crate::devices::banked::BankSel;
use crate::devices::machine::Machine;
use crate::devices::mem::Segment;
use crate::errors::{Error, Result};

/// The byte length of a DOS 3.3 or ProDOS ordered disk image
pub const IMAGE_STANDARD: usize = 143_360;

/// The byte length of a nibble image, which is stored pre-encoded
pub const IMAGE_NIBBLE: usize = 232_960;

/// The drive can't step past this many half-tracks (35 tracks)
pub const MAX_DRIVE_STEPS: i32 = 70;

/// The last accessible byte offset within one track of a standard image
pub const MAX_SECTOR_POS: usize = 4095;

/// Track length within a nibble image
const NIB_TRACK_LEN: usize = 0x1A00;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum DriveMode {
    Read,
    Write,
}

pub struct Disk {
    /// The inserted image, or nothing when the drive is empty
    data: Option<Segment>,
    /// Head position in half-tracks, 0..=70
    track_pos: i32,
    /// Byte offset within the current track
    sector_pos: usize,
    /// One bit per stepper phase magnet
    phase_state: u8,
    last_phase: u8,
    mode: DriveMode,
    online: bool,
    write_protect: bool,
    /// A byte parked here by the latch switch waits to be committed by
    /// the next write
    latch: u8,
}

impl Disk {
    pub fn new() -> Disk {
        Disk {
            data: None,
            track_pos: 0,
            sector_pos: 0,
            phase_state: 0,
            last_phase: 0,
            mode: DriveMode::Read,
            online: false,
            write_protect: true,
            latch: 0,
        }
    }

    /// Insert a disk image delivered as a stream. Only the two known
    /// image sizes are accepted; anything else leaves the drive empty.
    pub fn insert<R: Read>(&mut self, stream: &mut R) -> Result<()> {
        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .map_err(|e| Error::BadFile(format!("could not read disk image: {}", e)))?;

        if buf.len() != IMAGE_STANDARD && buf.len() != IMAGE_NIBBLE {
            return Err(Error::BadFile(format!(
                "unexpected disk image size {}",
                buf.len()
            )));
        }

        self.eject();
        self.data = Some(Segment::new_from_buf(&buf));
        info!("inserted {} byte disk image", buf.len());
        Ok(())
    }

    /// Empty the drive and reset the head
    pub fn eject(&mut self) {
        self.data = None;
        self.track_pos = 0;
        self.sector_pos = 0;
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    pub fn track_pos(&self) -> i32 {
        self.track_pos
    }

    pub fn sector_pos(&self) -> usize {
        self.sector_pos
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DriveMode) {
        self.mode = mode;
    }

    pub fn online(&self) -> bool {
        self.online
    }

    pub fn turn_on(&mut self, online: bool) {
        self.online = online;
    }

    pub fn write_protected(&self) -> bool {
        self.write_protect
    }

    /// Cover (or uncover) the disk's write-protect notch
    pub fn set_write_protect(&mut self, protect: bool) {
        self.write_protect = protect;
    }

    pub fn latch(&self) -> u8 {
        self.latch
    }

    /// Step the head by a number of half-tracks, clamped to the physical
    /// range the stepper could reach
    pub fn step(&mut self, steps: i32) {
        self.track_pos += steps;

        if self.track_pos > MAX_DRIVE_STEPS {
            self.track_pos = MAX_DRIVE_STEPS;
        } else if self.track_pos < 0 {
            self.track_pos = 0;
        }
    }

    /// Shift the head along the track surface by some number of bytes.
    /// Running off the end of a track means the surface rotated past a
    /// boundary: wrap the offset and carry the head one full track (two
    /// half-tracks) forward.
    pub fn shift(&mut self, pos: i32) {
        let mut new_pos = self.sector_pos as i64 + i64::from(pos);
        if new_pos < 0 {
            new_pos = 0;
        }
        self.sector_pos = new_pos as usize;

        while self.sector_pos > MAX_SECTOR_POS {
            self.sector_pos -= MAX_SECTOR_POS + 1;
            self.step(2);
        }
    }

    /// Map the head position to a byte offset in the image. Half-track
    /// positions reuse the track below them, as if the half-steps held
    /// no data of their own.
    pub fn position(&self) -> usize {
        let data = match &self.data {
            Some(data) => data,
            None => return 0,
        };

        let track = (self.track_pos / 2) as usize;
        match data.size() {
            IMAGE_NIBBLE => track * NIB_TRACK_LEN + self.sector_pos % NIB_TRACK_LEN,
            _ => track * 4096 + self.sector_pos,
        }
    }

    /// Read the byte under the head and advance by one
    pub fn read_byte(&mut self) -> u8 {
        let pos = self.position();
        let byte = match &self.data {
            Some(data) => data.get(pos),
            None => return 0,
        };
        self.shift(1);
        byte
    }

    /// Commit the latch at the head position and advance by one. Only a
    /// writable drive in write mode does anything.
    pub fn write_byte(&mut self) -> Result<()> {
        if self.data.is_none() {
            return Err(Error::InvalidOp("write to a drive with no disk"));
        }
        if self.write_protect || self.mode != DriveMode::Write {
            return Ok(());
        }

        let pos = self.position();
        let latch = self.latch;
        if let Some(data) = &mut self.data {
            data.set(pos, latch);
        }
        self.shift(1);
        Ok(())
    }

    /// Park a byte in the latch. The latch only accepts data while the
    /// drive is in write mode.
    pub fn latch_switch(&mut self, value: u8) {
        if self.mode == DriveMode::Write {
            self.latch = value;
        }
    }

    /// Turn one stepper phase magnet on or off; the low three bits of
    /// the switch address name the phase and the polarity
    pub fn phase_switch(&mut self, nib: u8) {
        match nib {
            0x0 => self.phase_state &= !0x1,
            0x1 => self.phase_state |= 0x1,
            0x2 => self.phase_state &= !0x2,
            0x3 => self.phase_state |= 0x2,
            0x4 => self.phase_state &= !0x4,
            0x5 => self.phase_state |= 0x4,
            0x6 => self.phase_state &= !0x8,
            0x7 => self.phase_state |= 0x8,
            _ => {}
        }

        self.phaser();
    }

    /// Compare the phase state against the last one and decide whether
    /// the head moved. Only adjacent phases produce motion; energizing
    /// the phase "above" the last one pulls the head a half-track
    /// forward, the one "below" pulls it back, and the 0x8/0x1 pair
    /// wraps in both directions.
    fn phaser(&mut self) {
        let mut phase = u16::from(self.phase_state);
        let last = u16::from(self.last_phase);

        // All magnets off, or no change: not a step in either direction
        if self.phase_state == 0 || phase == last {
            return;
        }

        // The first magnet ever energized seeds the tracker; there is no
        // previous phase to be adjacent to
        if self.last_phase == 0 {
            self.last_phase = self.phase_state;
            return;
        }

        // There is no phase 0x10 or 0x0, but pretending there were puts
        // the wrapped pairs adjacent to each other for the comparison
        if phase == 0x1 && last == 0x8 {
            phase = 0x10;
        } else if phase == 0x8 && last == 0x1 {
            phase = 0x0;
        }

        if phase == last << 1 {
            self.step(1);
        } else if phase == last >> 1 {
            self.step(-1);
        } else {
            return;
        }

        self.last_phase = self.phase_state;
    }
}

impl Default for Disk {
    fn default() -> Self {
        Disk::new()
    }
}

/// Either drive behaves as the selected drive through the shared
/// controller switches; the spindle-motor and select switches name one.
fn touch_controller(mach: &mut Machine, nib: u8) {
    match nib {
        0x0..=0x7 => mach.selected_drive_mut().phase_switch(nib),
        0x8 => {
            mach.drive1.turn_on(false);
            mach.drive2.turn_on(false);
        }
        0x9 => mach.selected_drive_mut().turn_on(true),
        0xA => mach.select_drive(1),
        0xB => mach.select_drive(2),
        0xE => mach.selected_drive_mut().set_mode(DriveMode::Read),
        0xF => mach.selected_drive_mut().set_mode(DriveMode::Write),
        _ => {}
    }
}

/// The $C0nC switch either reads a byte from under the head or commits
/// the latch, depending on the drive mode and the write-protect notch.
/// Read mode and write-protected disks always read.
fn switch_rw(drive: &mut Disk) -> u8 {
    if drive.mode == DriveMode::Read || drive.write_protect {
        return drive.read_byte();
    }

    // An empty drive is the one state that can refuse; the controller
    // treats it as a bus read of nothing
    drive.write_byte().ok();
    0
}

/// Handle reads anywhere in the controller's switch page. Note that a
/// "read" here can commit data to disk: what matters is the specific
/// switch address, not which table dispatched it.
pub fn controller_read(mach: &mut Machine, _sel: BankSel, addr: u16) -> u8 {
    let nib = (addr & 0xF) as u8;
    touch_controller(mach, nib);

    match nib {
        0xC => switch_rw(mach.selected_drive_mut()),
        0xD => {
            // Reading the latch switch passes zero into the latch
            mach.selected_drive_mut().latch_switch(0);
            0
        }
        _ => 0,
    }
}

/// The write half of the controller page. The only difference from the
/// read path is that a write can park a non-zero byte in the latch.
pub fn controller_write(mach: &mut Machine, _sel: BankSel, addr: u16, value: u8) {
    let nib = (addr & 0xF) as u8;
    touch_controller(mach, nib);

    match nib {
        0xC => {
            switch_rw(mach.selected_drive_mut());
        }
        0xD => mach.selected_drive_mut().latch_switch(value),
        _ => {}
    }
}
