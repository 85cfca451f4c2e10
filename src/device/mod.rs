//! Device Module
//!
//! Locates the local block device of an assigned resource and prepares it
//! for use: formatting blank devices and mounting them.

pub mod path;
pub mod filesystem;

pub use path::*;
pub use filesystem::*;
