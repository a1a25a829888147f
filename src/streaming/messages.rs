//! Gaze message decoding
//!
//! The only message shape the shim acts on carries exactly four float32
//! arguments, in this order:
//!
//! | # | Argument | Unit |
//! |---|----------|------|
//! | 0 | left pitch | degrees |
//! | 1 | left yaw | degrees |
//! | 2 | right pitch | degrees |
//! | 3 | right yaw | degrees |

use crate::core::types::RawGazeSample;
use crate::streaming::osc::{OscArg, OscMessage};
use thiserror::Error;

/// Gaze message argument shape errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GazeDecodeError {
    #[error("Expected 4 arguments, got {0}")]
    ArgumentCount(usize),

    #[error("Argument {index} has type '{tag}', expected 'f'")]
    ArgumentType { index: usize, tag: char },
}

/// Extract a gaze sample from an OSC message's arguments.
///
/// The address pattern is not checked here; the receiver only calls this for
/// messages addressed to the configured gaze address.
pub fn parse_gaze_message(msg: &OscMessage) -> Result<RawGazeSample, GazeDecodeError> {
    let [left_pitch, left_yaw, right_pitch, right_yaw] = msg.args.as_slice() else {
        return Err(GazeDecodeError::ArgumentCount(msg.args.len()));
    };

    Ok(RawGazeSample {
        left_pitch: float_arg(0, left_pitch)?,
        left_yaw: float_arg(1, left_yaw)?,
        right_pitch: float_arg(2, right_pitch)?,
        right_yaw: float_arg(3, right_yaw)?,
    })
}

/// Build the OSC message a feeder sends for `sample`
pub fn gaze_message(address: &str, sample: &RawGazeSample) -> OscMessage {
    OscMessage::new(
        address,
        vec![
            OscArg::Float(sample.left_pitch),
            OscArg::Float(sample.left_yaw),
            OscArg::Float(sample.right_pitch),
            OscArg::Float(sample.right_yaw),
        ],
    )
}

fn float_arg(index: usize, arg: &OscArg) -> Result<f32, GazeDecodeError> {
    arg.as_f32().ok_or(GazeDecodeError::ArgumentType {
        index,
        tag: arg.tag(),
    })
}
