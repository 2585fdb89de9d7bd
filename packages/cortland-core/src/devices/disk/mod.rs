mod codec;
mod drive;

pub use codec::{
    decode_4n4, decode_image, decode_sector, decode_track, encode_4n4, encode_image,
    encode_sector, encode_sector_header, encode_track, ImageOrder, TRACK_COUNT, TRACK_ENCODED,
    VOLUME,
};
pub use drive::{
    controller_read, controller_write, Disk, DriveMode, IMAGE_NIBBLE, IMAGE_STANDARD,
    MAX_DRIVE_STEPS, MAX_SECTOR_POS,
};
