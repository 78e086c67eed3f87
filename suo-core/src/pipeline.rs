//! Assembles the fixed seven-stage pipeline from a configuration file and
//! drives it to completion.
//!
//! Stage identities are fixed at assembly time: `receiver`, `decoder`,
//! `rx_output`, `transmitter`, `encoder`, `tx_input`, `signal_io`. The
//! generic framer/deframer pair is the one axis of variation that matters;
//! `Assembler<Fr, De>` is a typed builder over that choice rather than a
//! dynamic stage registry.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::codec::basic::{IdentityEncoder, PassthroughDecoder};
use crate::config::{apply_section, parse_sections, Configurable};
use crate::errors::{ConfigError, SuoError};
use crate::frame::Frame;
use crate::framing::{Deframer, Framer};
use crate::io::test_io::{LoopbackSignalIo, LoopbackSignalIoConfig, TestFrameSink, TestFrameSource};
use crate::receiver::slicer::{SymbolSlicerConfig, SymbolSlicerReceiver};
use crate::stage::{Decoder, Encoder, FrameSink, FrameSource, Receiver, SignalIo, Transmitter};
use crate::transmitter::simple_fsk::{SimpleFskConfig, SimpleFskTransmitter};
use crate::types::Timestamp;

/// Fixed assembly order of the pipeline's configuration sections.
pub const STAGE_ORDER: [&str; 7] = ["receiver", "decoder", "rx_output", "transmitter", "encoder", "tx_input", "signal_io"];

/// Output budget handed to the `decoder` stage and the framers' encoded
/// frame budget; matches `FRAME_LEN_MAX` used by the transmit chain.
const MAX_FRAME_BYTES: usize = 0x900;

/// Adapts a boxed `Framer` into the `FrameSource` a `Transmitter` pulls
/// framed bits from: `transmitter` reads from `tx_input`, with the framer
/// running in between.
struct FramerBitSource {
    framer: Box<dyn Framer>,
}

impl FrameSource for FramerBitSource {
    fn get_frame(&mut self, max_len: usize, deadline: Timestamp) -> Option<Frame> {
        let mut symbols = crate::buffer::SymbolVector::with_capacity(max_len);
        match self.framer.generate(&mut symbols, deadline) {
            Ok(true) => Some(Frame::new(symbols.as_slice().to_vec(), deadline)),
            Ok(false) => None,
            Err(err) => {
                tracing::warn!(error = %err, "framer failed to produce a frame; dropping");
                None
            }
        }
    }
}

/// Adapts a `Decoder` and the true `rx_output` sink into the `FrameSink`
/// that `receiver` (really its inner `Deframer`) delivers completed frames
/// to: `rx_output` reads from `decoder`.
struct DecodingFrameSink<D> {
    decoder: D,
    inner: Box<dyn FrameSink>,
    max_out_bytes: usize,
}

impl<D: Decoder> FrameSink for DecodingFrameSink<D> {
    fn frame(&mut self, frame: Frame) -> Result<(), SuoError> {
        let decoded = self.decoder.decode(&frame, self.max_out_bytes)?;
        self.inner.frame(decoded)
    }
}

/// Adapts an `Encoder` and the true `tx_input` source into the
/// `FrameSource` the framer pulls application frames from: `tx_input`
/// reads from `encoder`.
struct EncodingFrameSource<E> {
    encoder: E,
    inner: Box<dyn FrameSource>,
    max_out_len: usize,
}

impl<E: Encoder> FrameSource for EncodingFrameSource<E> {
    fn get_frame(&mut self, max_len: usize, deadline: Timestamp) -> Option<Frame> {
        let frame = self.inner.get_frame(max_len, deadline)?;
        match self.encoder.encode(&frame, self.max_out_len.min(max_len)) {
            Ok(encoded) => Some(encoded),
            Err(err) => {
                tracing::warn!(error = %err, "encoder failed; dropping frame");
                None
            }
        }
    }
}

/// A fully wired set of stages, ready to run. Built by [`Assembler`] or,
/// for a hand-assembled receive-only/transmit-only pipeline, directly via
/// [`Pipeline::new`].
pub struct Pipeline {
    receiver: Option<Box<dyn Receiver>>,
    rx_sink: Box<dyn FrameSink>,
    transmitter: Option<Box<dyn Transmitter>>,
    tx_source: Box<dyn FrameSource>,
    signal_io: Box<dyn SignalIo>,
}

impl Pipeline {
    pub fn new(
        receiver: Option<Box<dyn Receiver>>,
        rx_sink: Box<dyn FrameSink>,
        transmitter: Option<Box<dyn Transmitter>>,
        tx_source: Box<dyn FrameSource>,
        signal_io: Box<dyn SignalIo>,
    ) -> Self {
        Self {
            receiver,
            rx_sink,
            transmitter,
            tx_source,
            signal_io,
        }
    }

    /// Run one receive/transmit cycle. `Ok(false)` means `signal_io` has
    /// decided to stop.
    pub fn tick(&mut self) -> Result<bool, SuoError> {
        self.signal_io.tick(
            self.receiver.as_deref_mut(),
            self.rx_sink.as_mut(),
            self.transmitter.as_deref_mut(),
            self.tx_source.as_mut(),
        )
    }

    /// Run until `signal_io` stops on its own.
    pub fn run(&mut self) -> Result<(), SuoError> {
        while self.tick()? {}
        Ok(())
    }

    /// Run until `signal_io` stops on its own or `stop` is set, whichever
    /// comes first. This is the pipeline's cooperative shutdown point.
    pub fn run_until(&mut self, stop: &AtomicBool) -> Result<(), SuoError> {
        while !stop.load(Ordering::Relaxed) {
            if !self.tick()? {
                break;
            }
        }
        Ok(())
    }
}

/// Builds a [`Pipeline`] for one choice of framer/deframer pair, from a
/// configuration file in the format `config::parse_sections` understands.
/// The remaining stages (decoder, encoder, transmitter, signal I/O) use
/// this crate's only implementations of each; swap `Fr`/`De` to change
/// framing, or assemble a `Pipeline` by hand for anything else.
pub struct Assembler<Fr, De> {
    _marker: std::marker::PhantomData<(Fr, De)>,
}

impl<Fr, De> Assembler<Fr, De>
where
    Fr: Framer + Configurable + Default + 'static,
    De: Deframer + Configurable + Default + 'static,
{
    /// Assemble a pipeline with every stage at its default configuration.
    pub fn assemble_default() -> Result<Pipeline, SuoError> {
        Self::assemble("")
    }

    /// Assemble a pipeline from configuration file text. Sections are
    /// matched to stages positionally in [`STAGE_ORDER`]; a file shorter
    /// than seven sections leaves the remaining stages at their defaults.
    pub fn assemble(config_text: &str) -> Result<Pipeline, SuoError> {
        let sections = parse_sections(config_text, &STAGE_ORDER)?;

        let mut deframer = De::default();
        let mut decoder = PassthroughDecoder;
        let mut framer = Fr::default();
        let mut encoder = IdentityEncoder;
        let mut transmitter = SimpleFskTransmitter::new(SimpleFskConfig::default());
        let mut signal_io = LoopbackSignalIo::new(LoopbackSignalIoConfig::default());
        let mut receiver_timing = SymbolSlicerConfig::default();

        for section in &sections {
            match section.stage.as_str() {
                // The framer and deframer describe the same on-air framing
                // from opposite ends (HDLC's `mode`, Golay's `syncword`,
                // ...) and share this one section; each ignores whatever
                // keys belong only to its sibling.
                "receiver" => {
                    for (key, value) in &section.params {
                        match key.as_str() {
                            "sample_rate" | "symbol_rate" => {
                                apply_receiver_timing(&mut receiver_timing, key, value)?
                            }
                            other => apply_to_framer_and_deframer(&mut framer, &mut deframer, other, value)?,
                        }
                    }
                }
                "decoder" => apply_section(&mut decoder, section)?,
                "rx_output" => apply_section(&mut NoConfig("rx_output"), section)?,
                "transmitter" => apply_section(&mut transmitter, section)?,
                "encoder" => apply_section(&mut encoder, section)?,
                "tx_input" => apply_section(&mut NoConfig("tx_input"), section)?,
                "signal_io" => apply_section(&mut signal_io, section)?,
                other => return Err(ConfigError::UnknownStage(other.to_string()).into()),
            }
        }

        let true_rx_output: Box<dyn FrameSink> = Box::new(TestFrameSink::new());
        let rx_sink: Box<dyn FrameSink> = Box::new(DecodingFrameSink {
            decoder,
            inner: true_rx_output,
            max_out_bytes: MAX_FRAME_BYTES,
        });
        let receiver: Box<dyn Receiver> = Box::new(SymbolSlicerReceiver::new(receiver_timing, deframer));

        let true_tx_input: Box<dyn FrameSource> = Box::new(TestFrameSource::new());
        let encoding_source: Box<dyn FrameSource> = Box::new(EncodingFrameSource {
            encoder,
            inner: true_tx_input,
            max_out_len: MAX_FRAME_BYTES,
        });
        framer.connect_source(encoding_source)?;

        let tx_source: Box<dyn FrameSource> = Box::new(FramerBitSource { framer: Box::new(framer) });

        Ok(Pipeline::new(
            Some(receiver),
            rx_sink,
            Some(Box::new(transmitter)),
            tx_source,
            Box::new(signal_io),
        ))
    }
}

fn apply_receiver_timing(timing: &mut SymbolSlicerConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "sample_rate" => {
            timing.sample_rate = value.parse().map_err(|_| ConfigError::InvalidValue {
                stage: "symbol_slicer_receiver",
                key: key.to_string(),
                value: value.to_string(),
                reason: "expected an unsigned integer".to_string(),
            })?;
        }
        "symbol_rate" => {
            timing.symbol_rate = value.parse().map_err(|_| ConfigError::InvalidValue {
                stage: "symbol_slicer_receiver",
                key: key.to_string(),
                value: value.to_string(),
                reason: "expected a floating point number".to_string(),
            })?;
        }
        _ => unreachable!("caller only forwards sample_rate/symbol_rate"),
    }
    Ok(())
}

/// Apply one `(key, value)` pair to whichever of `framer`/`deframer`
/// recognises it; a key only one side understands applies cleanly to that
/// side, and a key neither understands is a real `UnknownParameter` error.
fn apply_to_framer_and_deframer<Fr: Configurable, De: Configurable>(
    framer: &mut Fr,
    deframer: &mut De,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let deframer_result = deframer.set_conf(key, value);
    if !matches!(deframer_result, Err(ConfigError::UnknownParameter { .. })) {
        return deframer_result;
    }
    let framer_result = framer.set_conf(key, value);
    if !matches!(framer_result, Err(ConfigError::UnknownParameter { .. })) {
        return framer_result;
    }
    deframer_result
}

/// Stand-in `Configurable` for the two stages (`rx_output`, `tx_input`)
/// that currently have no parameters of their own; any key in their
/// section is necessarily unknown.
struct NoConfig(&'static str);

impl Configurable for NoConfig {
    fn stage_name(&self) -> &'static str {
        self.0
    }

    fn set_conf(&mut self, key: &str, _value: &str) -> Result<(), ConfigError> {
        Err(ConfigError::UnknownParameter {
            stage: self.0,
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::golay_framer::{GolayDeframer, GolayFramer};
    use crate::framing::hdlc::{HdlcDeframer, HdlcFramer};

    #[test]
    fn default_hdlc_pipeline_assembles_and_ticks() {
        let mut pipeline = Assembler::<HdlcFramer, HdlcDeframer>::assemble_default().unwrap();
        assert!(pipeline.tick().unwrap());
    }

    #[test]
    fn default_golay_pipeline_assembles_and_ticks() {
        let mut pipeline = Assembler::<GolayFramer, GolayDeframer>::assemble_default().unwrap();
        assert!(pipeline.tick().unwrap());
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let text = "\
mode AX25
-
-
-
-
-
-
bogus_key 1
";
        let result = Assembler::<HdlcFramer, HdlcDeframer>::assemble(text);
        assert!(result.is_err());
    }

    #[test]
    fn run_until_stops_when_flag_is_set() {
        let text = "\
-
-
-
-
-
-
max_ticks 3
";
        let mut pipeline = Assembler::<HdlcFramer, HdlcDeframer>::assemble(text).unwrap();
        let stop = AtomicBool::new(false);
        pipeline.run_until(&stop).unwrap();
    }

    #[test]
    fn receiver_section_configures_both_timing_and_deframer() {
        let text = "\
sample_rate 2000000
mode AX25
";
        let pipeline = Assembler::<HdlcFramer, HdlcDeframer>::assemble(text);
        assert!(pipeline.is_ok());
    }
}
