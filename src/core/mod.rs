//! Core types and host/device boundary traits

pub mod device;
pub mod host;
pub mod types;
