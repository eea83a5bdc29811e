//! Mirage engine crate.
//!
//! This crate owns the GPU runtime pieces and the batched refraction
//! renderer built on top of them.

pub mod device;

pub mod logging;
pub mod coords;
pub mod render;
