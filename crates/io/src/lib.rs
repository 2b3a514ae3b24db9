//! Input and output helpers: time based progress messages, readable
//! formatting of large numbers and a lending iterator over lines.

#![forbid(unsafe_code)]

mod format;
mod line_iterator;
mod progress;

pub use format::*;
pub use line_iterator::*;
pub use progress::*;
