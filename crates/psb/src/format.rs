//! Wire format: constants and the fixed-layout header.

pub mod constants;
pub mod header;

pub use constants::*;
pub use header::Header;
