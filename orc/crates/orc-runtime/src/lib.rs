//! ORC Runtime Library
//!
//! C entry points over a process-wide ORC runtime:
//! - Runtime initialization from the environment
//! - Class construction and publication
//! - Object allocation, retain counting, finalization and deallocation

mod lifecycle;

pub use lifecycle::*;
