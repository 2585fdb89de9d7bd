//! Error kinds shared by the emulator core.
//!
//! Out-of-bounds segment accesses are deliberately _not_ represented here;
//! they indicate that emulation has gone off the rails and the process
//! cannot safely continue, so the segment code panics instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A disk or ROM image that is the wrong size, unreadable, or missing
    /// its markers.
    #[error("bad file: {0}")]
    BadFile(String),

    /// An operation against a component in the wrong state, e.g. writing
    /// to a drive with no disk. The operation is a no-op.
    #[error("invalid operation: {0}")]
    InvalidOp(&'static str),

    /// An encoded sector that failed prologue/epilogue or 6-and-2
    /// validation.
    #[error("could not decode sector data")]
    DecodeFailure,
}

pub type Result<T> = std::result::Result<T, Error>;
