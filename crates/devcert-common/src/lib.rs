//! Leaf utilities shared by the devcert crates.

pub mod hash;
pub mod paths;
pub mod persist;
