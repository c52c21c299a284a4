//! Overlay configuration module

pub mod overlay;

pub use overlay::*;
