//! Ember Core
//!
//! Leaf utilities shared by the Ember engine subsystems: identifier hashing,
//! fast hash collections, logging setup and profiling hooks.

pub mod alloc;
pub mod hash;
pub mod logging;
pub mod profiling;
