//! HDLC bit-oriented framer and deframer.

use crate::buffer::{BurstFlags, SymbolVector};
use crate::config::Configurable;
use crate::crc::crc16_ccitt;
use crate::errors::{ConfigError, DecodeError, SuoError};
use crate::frame::Frame;
use crate::scrambler::G3ruhScrambler;
use crate::stage::{FrameSink, Port};
use crate::types::{Bit, Timestamp};

const FLAG_BYTE: u8 = 0x7E;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdlcMode {
    G3ruh,
    Ax25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HdlcFramerConfig {
    pub mode: HdlcMode,
    pub preamble_length: usize,
    pub trailer_length: usize,
    pub append_crc: bool,
}

impl Default for HdlcFramerConfig {
    fn default() -> Self {
        Self {
            mode: HdlcMode::G3ruh,
            preamble_length: 4,
            trailer_length: 4,
            append_crc: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramerState {
    Idle,
    GenerateData,
}

/// Generates the on-air bit sequence for one frame at a time: preamble,
/// bit-stuffed (and optionally scrambled) data, trailer. Pulls its input
/// frames through `source_frame`.
pub struct HdlcFramer {
    conf: HdlcFramerConfig,
    state: FramerState,
    scrambler: G3ruhScrambler,
    pending: Vec<u8>,
    stuffing_counter: u32,
    pub source_frame: Port<dyn crate::stage::FrameSource>,
}

impl HdlcFramer {
    pub fn new(conf: HdlcFramerConfig) -> Self {
        Self {
            conf,
            state: FramerState::Idle,
            scrambler: G3ruhScrambler::new(),
            pending: Vec::new(),
            stuffing_counter: 0,
            source_frame: Port::new(),
        }
    }

    fn scramble_bit(&mut self, bit: Bit) -> Bit {
        match self.conf.mode {
            HdlcMode::G3ruh => self.scrambler.scramble_bit(bit),
            HdlcMode::Ax25 => bit,
        }
    }

    fn emit_flag_bytes(&mut self, symbols: &mut SymbolVector, count: usize) -> Result<(), SuoError> {
        symbols.require_remaining(count * 8)?;
        for _ in 0..count {
            let mut byte = FLAG_BYTE;
            for _ in 0..8 {
                let bit = (byte & 0x80 != 0) as u8;
                byte <<= 1;
                let out = self.scramble_bit(bit);
                symbols.push(out)?;
            }
        }
        Ok(())
    }

    /// Produce the complete bit sequence for one frame into `symbols`,
    /// pulling a frame from `source_frame` if currently idle. Returns
    /// `Ok(false)` if there was nothing to send.
    pub fn generate(&mut self, symbols: &mut SymbolVector, deadline: Timestamp) -> Result<bool, SuoError> {
        if self.state == FramerState::Idle {
            let frame = self.source_frame.source_frame(usize::MAX, deadline)?;
            let Some(frame) = frame else {
                return Ok(false);
            };

            let mut data = frame.data;
            if self.conf.append_crc {
                let crc = crc16_ccitt(&data);
                data.push(((crc >> 8) & 0xff) as u8);
                data.push((crc & 0xff) as u8);
            }
            self.pending = data;
            self.scrambler.reset();
            self.stuffing_counter = 0;
            self.state = FramerState::GenerateData;
        }

        symbols.flags.insert(BurstFlags::START_OF_BURST);
        self.emit_flag_bytes(symbols, self.conf.preamble_length)?;

        symbols.require_remaining(self.pending.len() * 9)?;
        for &byte in &self.pending {
            let mut byte = byte;
            for _ in 0..8 {
                let bit = (byte & 0x80 != 0) as u8;
                byte <<= 1;

                if self.stuffing_counter >= 5 {
                    let stuffed = self.scramble_bit(0);
                    symbols.push(stuffed)?;
                    self.stuffing_counter = 0;
                }

                self.stuffing_counter = if bit == 1 { self.stuffing_counter + 1 } else { 0 };
                let out = self.scramble_bit(bit);
                symbols.push(out)?;
            }
        }

        self.emit_flag_bytes(symbols, self.conf.trailer_length)?;
        symbols.flags.insert(BurstFlags::END_OF_BURST);

        self.state = FramerState::Idle;
        self.pending.clear();
        Ok(true)
    }
}

impl Default for HdlcFramer {
    fn default() -> Self {
        Self::new(HdlcFramerConfig::default())
    }
}

impl Configurable for HdlcFramer {
    fn stage_name(&self) -> &'static str {
        "hdlc_framer"
    }

    fn set_conf(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "mode" => {
                self.conf.mode = match value {
                    "G3RUH" => HdlcMode::G3ruh,
                    "AX25" => HdlcMode::Ax25,
                    other => {
                        return Err(ConfigError::InvalidValue {
                            stage: self.stage_name(),
                            key: key.to_string(),
                            value: other.to_string(),
                            reason: "expected G3RUH or AX25".to_string(),
                        })
                    }
                };
                Ok(())
            }
            "preamble_length" => {
                self.conf.preamble_length = parse_usize(self, key, value)?;
                Ok(())
            }
            "trailer_length" => {
                self.conf.trailer_length = parse_usize(self, key, value)?;
                Ok(())
            }
            "append_crc" => {
                self.conf.append_crc = parse_bool(self, key, value)?;
                Ok(())
            }
            other => Err(ConfigError::UnknownParameter {
                stage: self.stage_name(),
                key: other.to_string(),
            }),
        }
    }
}

fn parse_usize(stage: &dyn Configurable, key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        stage: stage.stage_name(),
        key: key.to_string(),
        value: value.to_string(),
        reason: "expected an unsigned integer".to_string(),
    })
}

fn parse_bool(stage: &dyn Configurable, key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            stage: stage.stage_name(),
            key: key.to_string(),
            value: other.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HdlcDeframerConfig {
    pub mode: HdlcMode,
    pub check_crc: bool,
}

impl Default for HdlcDeframerConfig {
    fn default() -> Self {
        Self {
            mode: HdlcMode::G3ruh,
            check_crc: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeframerState {
    Hunting,
    InFrame,
}

/// Recovers frames from a hard-bit stream: descrambles (if configured),
/// detects flag bytes, destuffs, accumulates bytes, and checks CRC.
/// Synchronisation state (descrambler register, bit shift register,
/// stuffing counter) persists across calls to `execute`.
pub struct HdlcDeframer {
    conf: HdlcDeframerConfig,
    descrambler: G3ruhScrambler,
    state: DeframerState,
    shift_reg: u16,
    ones_run: u32,
    current_bit_count: u32,
    current_byte: u8,
    frame_bytes: Vec<u8>,
    base_timestamp: Timestamp,
    sample_rate: Option<u32>,
}

impl HdlcDeframer {
    pub fn new(conf: HdlcDeframerConfig) -> Self {
        Self {
            conf,
            descrambler: G3ruhScrambler::new(),
            state: DeframerState::Hunting,
            shift_reg: 0,
            ones_run: 0,
            current_bit_count: 0,
            current_byte: 0,
            frame_bytes: Vec::new(),
            base_timestamp: 0,
            sample_rate: None,
        }
    }

    fn descramble(&mut self, bit: Bit) -> Bit {
        match self.conf.mode {
            HdlcMode::G3ruh => self.descrambler.descramble_bit(bit),
            HdlcMode::Ax25 => bit,
        }
    }

    /// Feed `bits` (already demodulated hard bits, one `0`/`1` per entry)
    /// through the state machine, emitting every completed frame to
    /// `sink`. `base_timestamp` is the on-air time of `bits[0]`.
    pub fn execute(&mut self, bits: &[Bit], base_timestamp: Timestamp, sink: &mut dyn FrameSink) -> Result<(), SuoError> {
        for (i, &raw_bit) in bits.iter().enumerate() {
            let bit = self.descramble(raw_bit);

            self.shift_reg = (self.shift_reg >> 1) | ((bit as u16) << 7);
            let last_byte = (self.shift_reg & 0xFF) as u8;

            match self.state {
                DeframerState::Hunting => {
                    if last_byte == FLAG_BYTE {
                        self.state = DeframerState::InFrame;
                        self.ones_run = 0;
                        self.current_bit_count = 0;
                        self.current_byte = 0;
                        self.frame_bytes.clear();
                        self.base_timestamp = base_timestamp + i as Timestamp;
                    }
                }
                DeframerState::InFrame => {
                    // A freshly-seen flag byte (in the unstuffed bit
                    // window) always ends the current frame, whether or
                    // not it is also the start of the next one.
                    if last_byte == FLAG_BYTE {
                        self.finish_frame(sink)?;
                        self.state = DeframerState::InFrame;
                        self.ones_run = 0;
                        self.current_bit_count = 0;
                        self.current_byte = 0;
                        self.base_timestamp = base_timestamp + i as Timestamp + 1;
                        continue;
                    }

                    if self.ones_run >= 5 {
                        // This bit is a stuffed zero: consume it, don't
                        // add it to the data stream.
                        self.ones_run = 0;
                        continue;
                    }

                    self.ones_run = if bit == 1 { self.ones_run + 1 } else { 0 };

                    self.current_byte = (self.current_byte << 1) | bit;
                    self.current_bit_count += 1;
                    if self.current_bit_count == 8 {
                        self.frame_bytes.push(self.current_byte);
                        self.current_byte = 0;
                        self.current_bit_count = 0;
                    }
                }
            }
        }
        Ok(())
    }

    fn finish_frame(&mut self, sink: &mut dyn FrameSink) -> Result<(), SuoError> {
        // An empty flag-to-flag gap (two adjacent flag bytes with nothing
        // in between, e.g. inside a multi-byte preamble/trailer) is never
        // a frame, CRC or no CRC.
        if self.frame_bytes.is_empty() {
            return Ok(());
        }

        let mut data = std::mem::take(&mut self.frame_bytes);
        if self.conf.check_crc {
            if data.len() < 2 {
                return Err(DecodeError::TooShort {
                    needed: 2,
                    available: data.len(),
                }
                .into());
            }
            let crc_len = data.len() - 2;
            let received_crc = ((data[crc_len] as u16) << 8) | (data[crc_len + 1] as u16);
            let computed_crc = crc16_ccitt(&data[..crc_len]);
            if received_crc != computed_crc {
                return Err(DecodeError::CrcMismatch {
                    expected: received_crc,
                    computed: computed_crc,
                }
                .into());
            }
            data.truncate(crc_len);
        }

        let frame = Frame::new(data, self.base_timestamp);
        sink.frame(frame)
    }
}

impl Default for HdlcDeframer {
    fn default() -> Self {
        Self::new(HdlcDeframerConfig::default())
    }
}

impl Configurable for HdlcDeframer {
    fn stage_name(&self) -> &'static str {
        "hdlc_deframer"
    }

    fn set_conf(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "mode" => {
                self.conf.mode = match value {
                    "G3RUH" => HdlcMode::G3ruh,
                    "AX25" => HdlcMode::Ax25,
                    other => {
                        return Err(ConfigError::InvalidValue {
                            stage: self.stage_name(),
                            key: key.to_string(),
                            value: other.to_string(),
                            reason: "expected G3RUH or AX25".to_string(),
                        })
                    }
                };
                Ok(())
            }
            "check_crc" => {
                self.conf.check_crc = parse_bool(self, key, value)?;
                Ok(())
            }
            other => Err(ConfigError::UnknownParameter {
                stage: self.stage_name(),
                key: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::FrameSource;

    struct OneShotSource(Option<Frame>);
    impl FrameSource for OneShotSource {
        fn get_frame(&mut self, _max_len: usize, _deadline: Timestamp) -> Option<Frame> {
            self.0.take()
        }
    }

    struct CollectingSink(Vec<Frame>);
    impl FrameSink for CollectingSink {
        fn frame(&mut self, frame: Frame) -> Result<(), SuoError> {
            self.0.push(frame);
            Ok(())
        }
    }

    fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
        let mut bits = Vec::new();
        for &byte in bytes {
            let mut byte = byte;
            for _ in 0..8 {
                bits.push((byte & 0x80 != 0) as u8);
                byte <<= 1;
            }
        }
        bits
    }

    #[test]
    fn ax25_no_scrambler_frame_layout() {
        let conf = HdlcFramerConfig {
            mode: HdlcMode::Ax25,
            preamble_length: 2,
            trailer_length: 2,
            append_crc: false,
        };
        let mut framer = HdlcFramer::new(conf);
        framer
            .source_frame
            .connect(Box::new(OneShotSource(Some(Frame::new(vec![0xA5], 0)))))
            .unwrap();

        let mut symbols = SymbolVector::with_capacity(256);
        assert!(framer.generate(&mut symbols, 0).unwrap());

        let expected_preamble_and_trailer = bytes_to_bits(&[0x7E, 0x7E]);
        let bits = symbols.as_slice();
        assert_eq!(&bits[0..16], &expected_preamble_and_trailer[..]);
        assert_eq!(&bits[16..24], &bytes_to_bits(&[0xA5])[..]);
        assert_eq!(&bits[24..40], &expected_preamble_and_trailer[..]);
        assert!(symbols.flags.contains(BurstFlags::START_OF_BURST));
        assert!(symbols.flags.contains(BurstFlags::END_OF_BURST));
    }

    #[test]
    fn stuffing_on_0xff() {
        let conf = HdlcFramerConfig {
            mode: HdlcMode::Ax25,
            preamble_length: 1,
            trailer_length: 1,
            append_crc: false,
        };
        let mut framer = HdlcFramer::new(conf);
        framer
            .source_frame
            .connect(Box::new(OneShotSource(Some(Frame::new(vec![0xFF], 0)))))
            .unwrap();

        let mut symbols = SymbolVector::with_capacity(256);
        framer.generate(&mut symbols, 0).unwrap();

        let data_region = &symbols.as_slice()[8..17];
        assert_eq!(data_region, &[1, 1, 1, 1, 1, 0, 1, 1, 1]);
    }

    #[test]
    fn crc_round_trip_with_big_endian_trailer() {
        let framer_conf = HdlcFramerConfig {
            mode: HdlcMode::Ax25,
            preamble_length: 1,
            trailer_length: 1,
            append_crc: true,
        };
        let mut framer = HdlcFramer::new(framer_conf);
        let payload = vec![0x01, 0x02, 0x03];
        framer
            .source_frame
            .connect(Box::new(OneShotSource(Some(Frame::new(payload.clone(), 0)))))
            .unwrap();

        let mut symbols = SymbolVector::with_capacity(512);
        framer.generate(&mut symbols, 0).unwrap();

        let mut deframer = HdlcDeframer::new(HdlcDeframerConfig {
            mode: HdlcMode::Ax25,
            check_crc: true,
        });
        let mut sink = CollectingSink(Vec::new());
        deframer.execute(symbols.as_slice(), 0, &mut sink).unwrap();

        assert_eq!(sink.0.len(), 1);
        assert_eq!(sink.0[0].data, payload);
    }

    #[test]
    fn bit_stuffing_never_emits_six_consecutive_ones() {
        let conf = HdlcFramerConfig {
            mode: HdlcMode::Ax25,
            preamble_length: 1,
            trailer_length: 1,
            append_crc: false,
        };
        let mut framer = HdlcFramer::new(conf);
        framer
            .source_frame
            .connect(Box::new(OneShotSource(Some(Frame::new(vec![0xFF, 0xFF, 0xFF], 0)))))
            .unwrap();

        let mut symbols = SymbolVector::with_capacity(512);
        framer.generate(&mut symbols, 0).unwrap();

        let data_region = &symbols.as_slice()[8..symbols.len() - 8];
        let mut run = 0;
        for &bit in data_region {
            run = if bit == 1 { run + 1 } else { 0 };
            assert!(run < 6, "found six consecutive set bits before scrambling");
        }
    }

    #[test]
    fn g3ruh_round_trip_with_crc() {
        let framer_conf = HdlcFramerConfig::default();
        let mut framer = HdlcFramer::new(framer_conf);
        let payload = vec![0xDE, 0xAD, 0xBE, 0xEF];
        framer
            .source_frame
            .connect(Box::new(OneShotSource(Some(Frame::new(payload.clone(), 0)))))
            .unwrap();

        let mut symbols = SymbolVector::with_capacity(1024);
        framer.generate(&mut symbols, 0).unwrap();

        let mut deframer = HdlcDeframer::new(HdlcDeframerConfig::default());
        let mut sink = CollectingSink(Vec::new());
        deframer.execute(symbols.as_slice(), 0, &mut sink).unwrap();

        assert_eq!(sink.0.len(), 1);
        assert_eq!(sink.0[0].data, payload);
    }
}
