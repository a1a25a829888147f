//! OSC over UDP ingestion for gaze telemetry

pub mod messages;
pub mod osc;
pub mod osc_receiver;

pub use messages::{GazeDecodeError, gaze_message, parse_gaze_message};
pub use osc::{OscArg, OscError, OscMessage, OscPacket, decode_packet, encode_message};
pub use osc_receiver::{OscReceiver, ReceiverStats};
