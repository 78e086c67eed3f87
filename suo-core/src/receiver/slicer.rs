//! The simplest possible sample-to-bit front end for a `Receiver`: a
//! symbol-clock accumulator (the same wraparound-by-overflow technique as
//! `transmitter::simple_fsk`'s symbol clock, run in reverse) that hard-slices
//! one bit per symbol period from the sample stream and feeds the result to
//! a `framing::Deframer`.
//!
//! This is deliberately not a demodulator: there is no carrier recovery, no
//! matched filtering, and no timing-error feedback. Those DSP primitives
//! are treated as an out-of-scope black box; this slicer is the minimal
//! concrete stand-in needed so a `Deframer`'s bit-level state machine can
//! be wired into the `Receiver` role and driven end-to-end by `SignalIo`
//! in tests and the CLI's default pipeline, not a faithful receive chain.

use crate::config::Configurable;
use crate::errors::{ConfigError, SuoError};
use crate::framing::Deframer;
use crate::stage::{FrameSink, Receiver};
use crate::types::{timestamp_of_sample, Sample, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolSlicerConfig {
    pub sample_rate: u32,
    pub symbol_rate: f32,
}

impl Default for SymbolSlicerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1_000_000,
            symbol_rate: 10_000.0,
        }
    }
}

/// Wraps a `Deframer` (`HdlcDeframer` or `GolayDeframer`) with the symbol
/// timing needed to present it with a hard-bit stream instead of raw
/// samples. The accumulator persists across `execute` calls so symbol
/// timing doesn't reset at every buffer boundary.
pub struct SymbolSlicerReceiver<D> {
    conf: SymbolSlicerConfig,
    symrate: u32,
    symphase: u32,
    deframer: D,
}

impl<D> SymbolSlicerReceiver<D> {
    pub fn new(conf: SymbolSlicerConfig, deframer: D) -> Self {
        let mut r = Self {
            conf,
            symrate: 0,
            symphase: 0,
            deframer,
        };
        r.recompute();
        r
    }

    fn recompute(&mut self) {
        self.symrate = (4294967296.0f64 * self.conf.symbol_rate as f64 / self.conf.sample_rate as f64) as u32;
    }
}

impl<D: Deframer + Configurable> Receiver for SymbolSlicerReceiver<D> {
    fn execute(&mut self, samples: &[Sample], base_timestamp: Timestamp, sink: &mut dyn FrameSink) -> Result<(), SuoError> {
        let mut bits = Vec::new();
        let mut first_bit_sample: Option<usize> = None;

        for (i, sample) in samples.iter().enumerate() {
            let before = self.symphase;
            self.symphase = self.symphase.wrapping_add(self.symrate);
            if self.symphase < before {
                if first_bit_sample.is_none() {
                    first_bit_sample = Some(i);
                }
                bits.push((sample.re >= 0.0) as u8);
            }
        }

        let Some(first_bit_sample) = first_bit_sample else {
            return Ok(());
        };

        let bits_base_timestamp = timestamp_of_sample(base_timestamp, first_bit_sample as u64, self.conf.sample_rate);
        match self.deframer.execute(&bits, bits_base_timestamp, sink) {
            Ok(()) => Ok(()),
            // Runtime demod failures (no sync, excessive BER) are silent:
            // sync-not-found and decode failures are exactly that; anything
            // else propagates.
            Err(SuoError::Decode(_)) => Ok(()),
            Err(other) => Err(other),
        }
    }
}

/// Delegates any key it doesn't own (`sample_rate`/`symbol_rate`) to the
/// wrapped deframer, so a single `receiver` config section can carry both
/// the symbol timing and the deframer's own parameters (e.g. HDLC's `mode`).
impl<D: Configurable> Configurable for SymbolSlicerReceiver<D> {
    fn stage_name(&self) -> &'static str {
        "symbol_slicer_receiver"
    }

    fn set_conf(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "sample_rate" => {
                self.conf.sample_rate = value.parse().map_err(|_| ConfigError::InvalidValue {
                    stage: self.stage_name(),
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected an unsigned integer".to_string(),
                })?;
                self.recompute();
            }
            "symbol_rate" => {
                self.conf.symbol_rate = value.parse().map_err(|_| ConfigError::InvalidValue {
                    stage: self.stage_name(),
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected a floating point number".to_string(),
                })?;
                self.recompute();
            }
            other => return self.deframer.set_conf(other, value),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::hdlc::{HdlcDeframer, HdlcDeframerConfig};
    use crate::framing::hdlc::{HdlcFramer, HdlcFramerConfig, HdlcMode};
    use crate::frame::Frame;
    use crate::stage::FrameSource;

    struct OneShotSource(Option<Frame>);
    impl FrameSource for OneShotSource {
        fn get_frame(&mut self, _max_len: usize, _deadline: Timestamp) -> Option<Frame> {
            self.0.take()
        }
    }

    #[derive(Default)]
    struct CollectingSink(Vec<Frame>);
    impl FrameSink for CollectingSink {
        fn frame(&mut self, frame: Frame) -> Result<(), SuoError> {
            self.0.push(frame);
            Ok(())
        }
    }

    /// Two samples per symbol (sample_rate = 2 * symbol_rate, a ratio that
    /// divides the 32-bit accumulator exactly, so the wrap lands on the
    /// same sample every symbol with no drift) so the slicer's timing
    /// recovers bits directly from sign; feed the framer's bits straight
    /// through as +1/-1 sample pairs.
    #[test]
    fn slicer_recovers_a_frame_from_a_bipolar_sample_stream() {
        let mut framer = HdlcFramer::new(HdlcFramerConfig {
            mode: HdlcMode::Ax25,
            preamble_length: 2,
            trailer_length: 2,
            append_crc: true,
        });
        framer
            .source_frame
            .connect(Box::new(OneShotSource(Some(Frame::new(vec![0x11, 0x22, 0x33], 0)))))
            .unwrap();

        let mut symbols = crate::buffer::SymbolVector::with_capacity(1024);
        use crate::framing::Framer;
        assert!(Framer::generate(&mut framer, &mut symbols, 0).unwrap());

        let samples: Vec<Sample> = symbols
            .as_slice()
            .iter()
            .flat_map(|&bit| {
                let v = if bit == 1 { 1.0 } else { -1.0 };
                [Sample::new(v, 0.0), Sample::new(v, 0.0)]
            })
            .collect();

        let deframer = HdlcDeframer::new(HdlcDeframerConfig {
            mode: HdlcMode::Ax25,
            check_crc: true,
        });
        let mut receiver = SymbolSlicerReceiver::new(
            SymbolSlicerConfig {
                sample_rate: 2,
                symbol_rate: 1.0,
            },
            deframer,
        );

        let mut sink = CollectingSink::default();
        receiver.execute(&samples, 0, &mut sink).unwrap();
        assert_eq!(sink.0.len(), 1);
        assert_eq!(sink.0[0].data, vec![0x11, 0x22, 0x33]);
    }

    #[test]
    fn no_signal_yields_no_frame_and_no_error() {
        let deframer = HdlcDeframer::new(HdlcDeframerConfig::default());
        let mut receiver = SymbolSlicerReceiver::new(SymbolSlicerConfig::default(), deframer);
        let samples = vec![Sample::new(0.0, 0.0); 1000];
        let mut sink = CollectingSink::default();
        receiver.execute(&samples, 0, &mut sink).unwrap();
        assert!(sink.0.is_empty());
    }
}
