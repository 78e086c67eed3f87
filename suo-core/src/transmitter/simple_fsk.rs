//! Sample-accurate 2-FSK transmitter: an NCO driven at one of two
//! frequencies selected by the current bit, stepped by a 32-bit
//! symbol-clock accumulator whose wraparound (not floating point) decides
//! when to advance to the next bit.

use std::f32::consts::TAU;

use crate::config::Configurable;
use crate::errors::ConfigError;
use crate::stage::{FrameSource, Transmitter, TxReturn};
use crate::types::{Sample, Timestamp};

const FRAME_LEN_MAX: usize = 0x900;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleFskConfig {
    pub sample_rate: f32,
    pub symbol_rate: f32,
    pub modindex: f32,
    pub center_freq: f32,
}

impl Default for SimpleFskConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1_000_000.0,
            symbol_rate: 10_000.0,
            modindex: 0.5,
            center_freq: 0.0,
        }
    }
}

/// A free-running numerically-controlled oscillator: holds a phase in
/// radians and emits `exp(i * phase)`, advancing by whatever frequency
/// (radians/sample) `step` is called with.
#[derive(Debug, Clone, Copy, Default)]
struct Nco {
    phase: f32,
}

impl Nco {
    fn step(&mut self, freq: f32) -> Sample {
        self.phase += freq;
        if self.phase > TAU {
            self.phase -= TAU;
        } else if self.phase < -TAU {
            self.phase += TAU;
        }
        Sample::new(self.phase.cos(), self.phase.sin())
    }
}

pub struct SimpleFskTransmitter {
    conf: SimpleFskConfig,
    symrate: u32,
    freq0: f32,
    freq1: f32,
    nco: Nco,
    transmitting: bool,
    frame_bits: Vec<u8>,
    frame_pos: usize,
    symphase: u32,
}

impl SimpleFskTransmitter {
    pub fn new(conf: SimpleFskConfig) -> Self {
        let mut tx = Self {
            conf,
            symrate: 0,
            freq0: 0.0,
            freq1: 0.0,
            nco: Nco::default(),
            transmitting: false,
            frame_bits: Vec::new(),
            frame_pos: 0,
            symphase: 0,
        };
        tx.recompute();
        tx
    }

    fn recompute(&mut self) {
        self.symrate = (4294967296.0f64 * self.conf.symbol_rate as f64 / self.conf.sample_rate as f64) as u32;
        let deviation = std::f32::consts::PI * self.conf.modindex * self.conf.symbol_rate / self.conf.sample_rate;
        let center = TAU * self.conf.center_freq / self.conf.sample_rate;
        self.freq0 = center - deviation;
        self.freq1 = center + deviation;
    }
}

impl Transmitter for SimpleFskTransmitter {
    fn execute(
        &mut self,
        samples: &mut [Sample],
        base_timestamp: Timestamp,
        source: &mut dyn FrameSource,
    ) -> Result<TxReturn, crate::errors::SuoError> {
        if !self.transmitting {
            if let Some(frame) = source.get_frame(FRAME_LEN_MAX, base_timestamp) {
                // A late NO_LATE frame is simply dropped; the transmitter
                // stays idle and will ask again on the next call.
                if !frame.is_late(base_timestamp) {
                    self.transmitting = true;
                    self.frame_bits = frame.data;
                    self.frame_pos = 0;
                }
            }
        }

        let mut produced = 0usize;
        let mut begin = 0usize;
        let mut end = 0usize;
        let mut in_burst = false;

        if self.transmitting {
            for (i, sample_slot) in samples.iter_mut().enumerate() {
                let bit = match self.frame_bits.get(self.frame_pos) {
                    Some(&b) if b != 0 => self.freq1,
                    Some(_) => self.freq0,
                    None => {
                        self.transmitting = false;
                        break;
                    }
                };

                if !in_burst {
                    begin = i;
                    in_burst = true;
                }

                *sample_slot = self.nco.step(bit);

                let before = self.symphase;
                self.symphase = self.symphase.wrapping_add(self.symrate);
                if self.symphase < before {
                    self.frame_pos += 1;
                }

                produced = i + 1;
                end = i + 1;
            }
        }

        Ok(TxReturn {
            len: produced,
            begin,
            end,
        })
    }
}

impl Configurable for SimpleFskTransmitter {
    fn stage_name(&self) -> &'static str {
        "simple_fsk_transmitter"
    }

    fn set_conf(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let parsed: f32 = value.parse().map_err(|_| ConfigError::InvalidValue {
            stage: self.stage_name(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected a floating point number".to_string(),
        })?;
        match key {
            "sample_rate" => self.conf.sample_rate = parsed,
            "symbol_rate" => self.conf.symbol_rate = parsed,
            "modindex" => self.conf.modindex = parsed,
            "center_freq" => self.conf.center_freq = parsed,
            other => {
                return Err(ConfigError::UnknownParameter {
                    stage: self.stage_name(),
                    key: other.to_string(),
                })
            }
        }
        self.recompute();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneShotSource(Option<crate::frame::Frame>);
    impl FrameSource for OneShotSource {
        fn get_frame(&mut self, _max_len: usize, _deadline: Timestamp) -> Option<crate::frame::Frame> {
            self.0.take()
        }
    }

    #[test]
    fn phase_continuity_and_frequency_selection() {
        let conf = SimpleFskConfig {
            sample_rate: 1_000_000.0,
            symbol_rate: 10_000.0,
            modindex: 0.5,
            center_freq: 0.0,
        };
        let mut tx = SimpleFskTransmitter::new(conf);
        let mut source = OneShotSource(Some(crate::frame::Frame::new(vec![0, 1, 0, 1], 0)));

        let mut samples = vec![Sample::new(0.0, 0.0); 1000];
        let result = tx.execute(&mut samples, 0, &mut source).unwrap();
        assert!(result.len > 0);

        let deviation = std::f32::consts::PI * conf.modindex * conf.symbol_rate / conf.sample_rate;
        let max_step = deviation.abs() * 2.0 + 0.01;
        for pair in samples[..result.len].windows(2) {
            let a = pair[0].arg();
            let b = pair[1].arg();
            let mut delta = b - a;
            if delta > std::f32::consts::PI {
                delta -= TAU;
            } else if delta < -std::f32::consts::PI {
                delta += TAU;
            }
            assert!(delta.abs() <= max_step, "phase jumped by {delta}, expected <= {max_step}");
        }
    }

    #[test]
    fn symbol_clock_accuracy_over_one_second() {
        let conf = SimpleFskConfig {
            sample_rate: 1_000_000.0,
            symbol_rate: 10_000.0,
            modindex: 0.5,
            center_freq: 0.0,
        };
        let mut tx = SimpleFskTransmitter::new(conf);
        let bits: Vec<u8> = (0..20_000).map(|i| (i % 2) as u8).collect();
        let mut source = OneShotSource(Some(crate::frame::Frame::new(bits, 0)));

        let mut samples = vec![Sample::new(0.0, 0.0); 1_000_000];
        let _ = tx.execute(&mut samples, 0, &mut source);

        let advances = tx.frame_pos;
        assert!((advances as i64 - 10_000).abs() <= 1, "expected ~10000 bit advances, got {advances}");
    }

    #[test]
    fn idle_transmitter_produces_nothing_without_a_frame() {
        let conf = SimpleFskConfig::default();
        let mut tx = SimpleFskTransmitter::new(conf);
        let mut source = OneShotSource(None);
        let mut samples = vec![Sample::new(0.0, 0.0); 100];
        let result = tx.execute(&mut samples, 0, &mut source).unwrap();
        assert_eq!(result.len, 0);
    }
}
