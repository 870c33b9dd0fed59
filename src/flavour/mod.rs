//! Built-in flavours: ready-made transforms and their registrations.
//!
//! - [`fs`]: directory trees as source and target
//! - [`mirror`]: the `fs` transform, mirroring source directories into the output

pub mod fs;
pub mod mirror;
