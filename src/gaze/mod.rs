//! Gaze combination and publishing

pub mod combiner;
pub mod publisher;

pub use combiner::{combine, eye_direction};
pub use publisher::GazePublisher;
