pub mod booking;
pub mod macros;

pub use booking::*;
