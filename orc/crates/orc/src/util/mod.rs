//! Util Module - Shared Utilities
//!
//! Helpers used throughout ORC.

pub mod alignment;
pub mod debug;

pub use alignment::Alignment;
pub use debug::format_address;

/// Size of a machine word in bytes
pub const WORD_SIZE: usize = std::mem::size_of::<usize>();
