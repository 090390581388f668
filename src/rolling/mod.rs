//! Size- and count-bounded rolling log files
//!
//! The live log file is named exactly `<prefix>`; when it outgrows the size
//! budget it is renamed to `<prefix>.<N>` and a fresh live file is opened.
//! The oldest rotated file is removed when the count budget is exceeded.

mod selector;
mod writer;

pub use selector::choose_file;
pub use writer::{RollingWriter, SharedWriter};
