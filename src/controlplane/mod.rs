//! Control Plane Module
//!
//! Everything that talks to LINSTOR: the command client, status validation,
//! the decoded resource listing, and the resource lifecycle built on them.

pub mod client;
pub mod status;
pub mod snapshot;
pub mod resource;

pub use client::*;
pub use status::*;
pub use snapshot::*;
pub use resource::*;
