//! Core types and constants for the dredge tracker

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
