//! The per-role capability traits every stage implements, and the `Port<T>`
//! callback-edge abstraction that wires them together.
//!
//! Rather than a struct of function pointers cast through an opaque
//! `void*`, each role is its own trait; a stage implements exactly the
//! traits its role calls for, and the assembler composes concrete types
//! instead of iterating a heterogeneous array of stages.

use crate::buffer::SymbolVector;
use crate::config::Configurable;
use crate::errors::SuoError;
use crate::frame::Frame;
use crate::types::{Sample, Timestamp};

/// Consumes a contiguous sample buffer, tracking demodulator/deframer
/// state across calls, and forwards zero or more frames to `sink` when
/// synchronisation yields one. Must be non-blocking and must not allocate
/// beyond a bounded working set on the hot path.
pub trait Receiver: Configurable {
    fn execute(
        &mut self,
        samples: &[Sample],
        base_timestamp: Timestamp,
        sink: &mut dyn FrameSink,
    ) -> Result<(), SuoError>;
}

/// Generates a buffer of baseband samples. When idle, pulls the next frame
/// from `source` at the start of the call; `base_timestamp` doubles as the
/// deadline passed to `FrameSource::get_frame`.
pub trait Transmitter: Configurable {
    fn execute(
        &mut self,
        samples: &mut [Sample],
        base_timestamp: Timestamp,
        source: &mut dyn FrameSource,
    ) -> Result<TxReturn, SuoError>;
}

/// Total samples produced and the half-open `[begin, end)` range carrying
/// on-air energy, for a signal sink to key a power amplifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxReturn {
    pub len: usize,
    pub begin: usize,
    pub end: usize,
}

/// Decodes a frame whose payload is a soft-bit (or already-verified byte)
/// sequence into decoded bytes. Must be pure: the same input frame (under
/// the same configuration) always decodes to the same output.
pub trait Decoder: Configurable {
    fn decode(&self, input: &Frame, max_out_bytes: usize) -> Result<Frame, SuoError>;
}

/// Symmetric counterpart of `Decoder`: takes a byte payload, returns a
/// bit/symbol sequence. Same purity requirement.
pub trait Encoder: Configurable {
    fn encode(&self, input: &Frame, max_out_len: usize) -> Result<Frame, SuoError>;
}

/// Called by a framer (or `Transmitter`) to obtain the next frame to
/// transmit. `deadline` is the base timestamp of the buffer being
/// generated; a source may use it to decide whether a frame's schedule has
/// already passed. Returns `None` if there is nothing to send yet.
pub trait FrameSource: Send {
    fn get_frame(&mut self, max_len: usize, deadline: Timestamp) -> Option<Frame>;
}

/// Called by a deframer (or `Receiver`) when a complete frame is
/// available.
pub trait FrameSink: Send {
    fn frame(&mut self, frame: Frame) -> Result<(), SuoError>;
}

/// Owns the main loop: pulls samples from hardware, drives
/// `Receiver::execute`, then `Transmitter::execute` for the next outgoing
/// buffer, and pushes samples back. Opaque to the rest of the core beyond
/// this contract; a real implementation talks to an SDR device and is out
/// of scope for this crate (see `io::LoopbackSignalIo` for the in-process
/// stand-in used by tests and the CLI's default run mode).
pub trait SignalIo: Configurable {
    /// Run one iteration of the main loop (one receive buffer, one
    /// transmit buffer). Returns `Ok(false)` when the implementation has
    /// decided to stop (e.g. a synthetic run reaching its sample budget).
    fn tick(
        &mut self,
        receiver: Option<&mut dyn Receiver>,
        rx_sink: &mut dyn FrameSink,
        transmitter: Option<&mut dyn Transmitter>,
        tx_source: &mut dyn FrameSource,
    ) -> Result<bool, SuoError>;
}

/// A single-slot callback edge: a named emission point that a user of a
/// framer/deframer connects a handler to. Connecting a second handler is
/// an error — ports carry no internal queue.
pub struct Port<T: ?Sized> {
    handler: Option<Box<T>>,
}

impl<T: ?Sized> Port<T> {
    pub fn new() -> Self {
        Self { handler: None }
    }

    pub fn is_connected(&self) -> bool {
        self.handler.is_some()
    }

    pub fn connect(&mut self, handler: Box<T>) -> Result<(), SuoError> {
        if self.handler.is_some() {
            return Err(crate::errors::ConfigError::PortAlreadyConnected.into());
        }
        self.handler = Some(handler);
        Ok(())
    }

    pub fn handler_mut(&mut self) -> Result<&mut T, SuoError> {
        self.handler
            .as_deref_mut()
            .ok_or_else(|| crate::errors::ConfigError::PortNotConnected.into())
    }
}

impl<T: ?Sized> Default for Port<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl Port<dyn FrameSource> {
    /// Pull the next frame through the port: the framer calls the port
    /// synchronously when it needs one.
    pub fn source_frame(&mut self, max_len: usize, deadline: Timestamp) -> Result<Option<Frame>, SuoError> {
        Ok(self.handler_mut()?.get_frame(max_len, deadline))
    }
}

impl Port<dyn FrameSink> {
    /// Emit a completed frame through the port.
    pub fn emit_frame(&mut self, frame: Frame) -> Result<(), SuoError> {
        self.handler_mut()?.frame(frame)
    }
}

/// Symbols destined for the physical layer: a bit stream plus the burst
/// flags a transmitter chain needs. Framers write into this type via
/// `SymbolVector`; kept as a type alias so call sites read naturally.
pub type SymbolOutput = SymbolVector;

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u32);
    impl FrameSource for Counter {
        fn get_frame(&mut self, _max_len: usize, _deadline: Timestamp) -> Option<Frame> {
            self.0 += 1;
            None
        }
    }

    #[test]
    fn connecting_a_second_handler_is_an_error() {
        let mut port: Port<dyn FrameSource> = Port::new();
        assert!(port.connect(Box::new(Counter(0))).is_ok());
        assert!(port.connect(Box::new(Counter(0))).is_err());
    }

    #[test]
    fn unconnected_port_errors_on_use() {
        let mut port: Port<dyn FrameSource> = Port::new();
        assert!(port.source_frame(10, 0).is_err());
    }
}
