//! Library side of the `stgen` command-line tool.

pub mod logging;
pub mod points;
