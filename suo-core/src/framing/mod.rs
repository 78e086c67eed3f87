//! Bit-oriented framing state machines.

pub mod golay_framer;
pub mod hdlc;

use crate::buffer::SymbolVector;
use crate::errors::SuoError;
use crate::stage::{FrameSink, FrameSource};
use crate::types::{Bit, Timestamp};

/// Common shape of every transmit-side framer in this crate: pull-driven
/// bit generation, the framer only runs when asked for more symbols. Lets
/// the transmit scheduler (`pipeline::FramerBitSource`) hold either framer
/// behind one trait object.
pub trait Framer {
    fn generate(&mut self, symbols: &mut SymbolVector, deadline: Timestamp) -> Result<bool, SuoError>;

    /// Wire the framer's `source_frame` port to its upstream frame supply.
    /// Called once, at assembly time; a second call is a `ConfigError`.
    fn connect_source(&mut self, source: Box<dyn FrameSource>) -> Result<(), SuoError>;
}

impl Framer for hdlc::HdlcFramer {
    fn generate(&mut self, symbols: &mut SymbolVector, deadline: Timestamp) -> Result<bool, SuoError> {
        hdlc::HdlcFramer::generate(self, symbols, deadline)
    }

    fn connect_source(&mut self, source: Box<dyn FrameSource>) -> Result<(), SuoError> {
        self.source_frame.connect(source)
    }
}

impl Framer for golay_framer::GolayFramer {
    fn generate(&mut self, symbols: &mut SymbolVector, deadline: Timestamp) -> Result<bool, SuoError> {
        golay_framer::GolayFramer::generate(self, symbols, deadline)
    }

    fn connect_source(&mut self, source: Box<dyn FrameSource>) -> Result<(), SuoError> {
        self.source_frame.connect(source)
    }
}

/// Common shape of every receive-side deframer: feed it a hard-bit stream
/// plus the on-air timestamp of its first bit, get zero or more completed
/// frames delivered to `sink`. Lets `receiver::SymbolSlicerReceiver` hold
/// either deframer behind one trait object.
pub trait Deframer {
    fn execute(&mut self, bits: &[Bit], base_timestamp: Timestamp, sink: &mut dyn FrameSink) -> Result<(), SuoError>;
}

impl Deframer for hdlc::HdlcDeframer {
    fn execute(&mut self, bits: &[Bit], base_timestamp: Timestamp, sink: &mut dyn FrameSink) -> Result<(), SuoError> {
        hdlc::HdlcDeframer::execute(self, bits, base_timestamp, sink)
    }
}

impl Deframer for golay_framer::GolayDeframer {
    fn execute(&mut self, bits: &[Bit], base_timestamp: Timestamp, sink: &mut dyn FrameSink) -> Result<(), SuoError> {
        golay_framer::GolayDeframer::execute(self, bits, base_timestamp, sink)
    }
}
