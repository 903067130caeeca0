//! Utility modules for the builder crate

pub mod fileops;
