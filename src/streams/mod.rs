//! Handling of the transcoder's output stream

pub mod message_parser;

pub use message_parser::{Messages, StreamMessageParser};
