//! Core of the SDR framing toolkit: the streaming pipeline that converts
//! modulated baseband samples into decoded frames and back, through a
//! uniform stage contract shared by modems, framers, and codecs.
//!
//! The receive chain is `SignalSource -> Receiver(demod+sync+deframe) ->
//! Decoder -> FrameSink`; the transmit chain is `FrameSource -> Encoder ->
//! Transmitter(framer+mod) -> SignalSink`. [`pipeline::Assembler`] wires a
//! complete pipeline from a textual configuration file; [`pipeline::Pipeline`]
//! drives it.

pub mod buffer;
pub mod codec;
pub mod coding;
pub mod config;
pub mod crc;
pub mod errors;
pub mod frame;
pub mod framing;
pub mod golay;
pub mod io;
pub mod pipeline;
pub mod receiver;
pub mod scrambler;
pub mod stage;
pub mod transmitter;
pub mod types;

pub use errors::SuoError;
pub use frame::Frame;
pub use pipeline::{Assembler, Pipeline};
