//! Core module containing the builder API and pipeline types

pub mod builder;
pub mod context;
pub mod pipeline;
