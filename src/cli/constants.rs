//! Program identity and the display-level machinery.
//!
//! Verbosity is a crate-level atomic shared by every module: 0 silent,
//! 1 errors only, 2 normal progress, 3 detail, 4 debug.  The
//! [`crate::displaylevel!`] macro writes to stderr when the current level
//! permits, keeping stdout clean for anything the user pipes.

use std::sync::atomic::{AtomicU32, Ordering};

pub const PROGRAM_NAME: &str = "synthcorpus";

/// Default output path when `file_synth_docs` is not given.
pub const DEFAULT_OUTPUT: &str = "synthetic.starc";

pub static DISPLAY_LEVEL: AtomicU32 = AtomicU32::new(2);

/// Returns the current display level.
#[inline]
pub fn display_level() -> u32 {
    DISPLAY_LEVEL.load(Ordering::Relaxed)
}

/// Sets the display level.
#[inline]
pub fn set_display_level(level: u32) {
    DISPLAY_LEVEL.store(level, Ordering::Relaxed);
}

/// Print to stderr when the display level is at least `$level`.
#[macro_export]
macro_rules! displaylevel {
    ($level:expr, $($arg:tt)*) => {
        if $crate::cli::constants::display_level() >= $level {
            eprint!($($arg)*);
        }
    };
}
