//! Configuration and logging setup shared by the studiolaunch crates.

pub mod config;
pub mod observability;
