//! Golay-header framer/deframer: syncword, then a Golay(24,12)-protected
//! header (payload length plus which optional coding stages were
//! applied), then the optionally randomised / RS-encoded /
//! convolutionally-encoded payload.

use crate::buffer::{BurstFlags, SymbolVector};
use crate::coding::{convolutional, reed_solomon};
use crate::config::Configurable;
use crate::errors::{ConfigError, DecodeError, SuoError};
use crate::frame::Frame;
use crate::golay;
use crate::scrambler::CcsdsRandomizer;
use crate::stage::{FrameSink, Port};
use crate::types::Timestamp;

const USE_REED_SOLOMON: u16 = 0x200;
const USE_RANDOMIZER: u16 = 0x400;
const USE_VITERBI: u16 = 0x800;

/// Maximum payload length the 9-bit length field in the header can
/// express.
const MAX_LENGTH: usize = (1 << 9) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GolayFramerConfig {
    pub syncword: u32,
    pub syncword_len: u32,
    pub preamble_len: u32,
    pub use_viterbi: bool,
    pub use_randomizer: bool,
    pub use_rs: bool,
}

impl Default for GolayFramerConfig {
    fn default() -> Self {
        Self {
            syncword: 0x1ACFFC1D,
            syncword_len: 32,
            preamble_len: 32,
            use_viterbi: false,
            use_randomizer: false,
            use_rs: false,
        }
    }
}

fn header_value(conf: &GolayFramerConfig, length: usize) -> Result<u16, SuoError> {
    if length > MAX_LENGTH {
        return Err(ConfigError::Inconsistent {
            stage: "golay_framer",
            reason: format!("payload of {length} bytes exceeds the {MAX_LENGTH}-byte header limit"),
        }
        .into());
    }
    let mut flags = 0u16;
    if conf.use_rs {
        flags |= USE_REED_SOLOMON;
    }
    if conf.use_randomizer {
        flags |= USE_RANDOMIZER;
    }
    if conf.use_viterbi {
        flags |= USE_VITERBI;
    }
    Ok((length as u16) | flags)
}

fn push_bits_msb(symbols: &mut SymbolVector, value: u32, num_bits: u32) -> Result<(), SuoError> {
    symbols.require_remaining(num_bits as usize)?;
    for i in (0..num_bits).rev() {
        symbols.push(((value >> i) & 1) as u8)?;
    }
    Ok(())
}

fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for i in (0..8).rev() {
            bits.push((byte >> i) & 1);
        }
    }
    bits
}

fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .filter(|chunk| chunk.len() == 8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | b))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramerState {
    Idle,
}

pub struct GolayFramer {
    conf: GolayFramerConfig,
    state: FramerState,
    pub source_frame: Port<dyn crate::stage::FrameSource>,
}

impl GolayFramer {
    pub fn new(conf: GolayFramerConfig) -> Self {
        Self {
            conf,
            state: FramerState::Idle,
            source_frame: Port::new(),
        }
    }

    pub fn generate(&mut self, symbols: &mut SymbolVector, deadline: Timestamp) -> Result<bool, SuoError> {
        let _ = self.state;
        let Some(frame) = self.source_frame.source_frame(usize::MAX, deadline)? else {
            return Ok(false);
        };

        let original_len = frame.data.len();
        let mut payload = frame.data;
        if self.conf.use_rs {
            payload = reed_solomon::encode(&payload);
        }

        // The header's length field records the payload length *before*
        // RS/convolutional expansion; the deframer derives the RS block
        // size and the convolutional flush length from it.
        let header = header_value(&self.conf, original_len)?;
        let header_codeword = golay::encode(header);

        let mut payload_bits = bytes_to_bits(&payload);
        if self.conf.use_viterbi {
            payload_bits = convolutional::encode(&payload_bits);
        }
        let mut payload_bytes = bits_to_bytes(&payload_bits);
        // Pad to a whole number of bytes so the randomizer (byte-oriented)
        // can run over the full span; the deframer reconstructs the exact
        // bit count from the header-derived lengths.
        while payload_bytes.len() * 8 < payload_bits.len() {
            payload_bytes.push(0);
        }
        if self.conf.use_randomizer {
            CcsdsRandomizer::new().apply(&mut payload_bytes);
        }

        symbols.flags.insert(BurstFlags::START_OF_BURST);
        push_bits_msb(symbols, 0xAAAA_AAAA, self.conf.preamble_len)?;
        push_bits_msb(symbols, self.conf.syncword, self.conf.syncword_len)?;
        push_bits_msb(symbols, header_codeword, 24)?;

        let payload_bits_out = bytes_to_bits(&payload_bytes);
        symbols.require_remaining(payload_bits_out.len())?;
        for bit in payload_bits_out {
            symbols.push(bit)?;
        }
        symbols.flags.insert(BurstFlags::END_OF_BURST);

        Ok(true)
    }
}

impl Default for GolayFramer {
    fn default() -> Self {
        Self::new(GolayFramerConfig::default())
    }
}

impl Configurable for GolayFramer {
    fn stage_name(&self) -> &'static str {
        "golay_framer"
    }

    fn set_conf(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "syncword" => {
                self.conf.syncword = parse_hex_or_dec(self, key, value)?;
                Ok(())
            }
            "syncword_len" => {
                self.conf.syncword_len = parse_dec(self, key, value)?;
                Ok(())
            }
            "preamble_len" => {
                self.conf.preamble_len = parse_dec(self, key, value)?;
                Ok(())
            }
            "use_viterbi" => {
                self.conf.use_viterbi = parse_flag(self, key, value)?;
                Ok(())
            }
            "use_randomizer" => {
                self.conf.use_randomizer = parse_flag(self, key, value)?;
                Ok(())
            }
            "use_rs" => {
                self.conf.use_rs = parse_flag(self, key, value)?;
                Ok(())
            }
            other => Err(ConfigError::UnknownParameter {
                stage: self.stage_name(),
                key: other.to_string(),
            }),
        }
    }
}

fn parse_dec(stage: &dyn Configurable, key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        stage: stage.stage_name(),
        key: key.to_string(),
        value: value.to_string(),
        reason: "expected an unsigned integer".to_string(),
    })
}

fn parse_hex_or_dec(stage: &dyn Configurable, key: &str, value: &str) -> Result<u32, ConfigError> {
    let parsed = if let Some(hex) = value.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else {
        value.parse()
    };
    parsed.map_err(|_| ConfigError::InvalidValue {
        stage: stage.stage_name(),
        key: key.to_string(),
        value: value.to_string(),
        reason: "expected a decimal or 0x-prefixed hex integer".to_string(),
    })
}

fn parse_flag(stage: &dyn Configurable, key: &str, value: &str) -> Result<bool, ConfigError> {
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
pub struct GolayDeframerConfig {
    pub syncword: u32,
    pub syncword_len: u32,
}

impl Default for GolayDeframerConfig {
    fn default() -> Self {
        Self {
            syncword: 0x1ACFFC1D,
            syncword_len: 32,
        }
    }
}

/// Hunts for the syncword in a hard-bit stream, Golay-decodes the header
/// that follows, then reverses whichever optional stages the header says
/// were applied.
pub struct GolayDeframer {
    conf: GolayDeframerConfig,
}

impl GolayDeframer {
    pub fn new(conf: GolayDeframerConfig) -> Self {
        Self { conf }
    }

    fn find_syncword(&self, bits: &[u8]) -> Option<usize> {
        let len = self.conf.syncword_len as usize;
        if bits.len() < len {
            return None;
        }
        'outer: for start in 0..=(bits.len() - len) {
            for i in 0..len {
                let expected = (self.conf.syncword >> (len - 1 - i)) & 1;
                if bits[start + i] as u32 != expected {
                    continue 'outer;
                }
            }
            return Some(start + len);
        }
        None
    }

    /// Decode the single frame found in `bits`, if any. `base_timestamp`
    /// is the on-air time of `bits[0]`.
    pub fn execute(&mut self, bits: &[u8], base_timestamp: Timestamp, sink: &mut dyn FrameSink) -> Result<(), SuoError> {
        let Some(header_start) = self.find_syncword(bits) else {
            return Err(DecodeError::SyncNotFound.into());
        };

        if bits.len() < header_start + 24 {
            return Err(DecodeError::TooShort {
                needed: header_start + 24,
                available: bits.len(),
            }
            .into());
        }

        let header_codeword = bits[header_start..header_start + 24]
            .iter()
            .fold(0u32, |acc, &b| (acc << 1) | b as u32);
        let header = golay::decode(header_codeword).ok_or(DecodeError::GolayUncorrectable)?;

        let length = (header & 0x01FF) as usize;
        let use_rs = header & USE_REED_SOLOMON != 0;
        let use_randomizer = header & USE_RANDOMIZER != 0;
        let use_viterbi = header & USE_VITERBI != 0;

        let rs_len = if use_rs { reed_solomon::encoded_len(length) } else { length };
        let mut coded_bit_len = rs_len * 8;
        if use_viterbi {
            coded_bit_len = (coded_bit_len + convolutional::FLUSH_BITS) * 2;
        }
        let coded_byte_len = (coded_bit_len + 7) / 8;
        let payload_bit_len = coded_byte_len * 8;

        let payload_start = header_start + 24;
        if bits.len() < payload_start + payload_bit_len {
            return Err(DecodeError::TooShort {
                needed: payload_start + payload_bit_len,
                available: bits.len(),
            }
            .into());
        }
        let remaining_bits = &bits[payload_start..payload_start + payload_bit_len];
        let mut payload_bytes = bits_to_bytes(remaining_bits);

        if use_randomizer {
            CcsdsRandomizer::new().apply(&mut payload_bytes);
        }

        let decoded = if use_viterbi {
            let coded_bits = bytes_to_bits(&payload_bytes);
            let decoded_bits = convolutional::decode(&coded_bits);
            bits_to_bytes(&decoded_bits)
        } else {
            payload_bytes
        };

        let final_bytes = if use_rs {
            reed_solomon::decode(&decoded, length)?
        } else {
            decoded
        };

        let mut final_bytes = final_bytes;
        final_bytes.truncate(length);

        sink.frame(Frame::new(final_bytes, base_timestamp + header_start as Timestamp))
    }
}

impl Default for GolayDeframer {
    fn default() -> Self {
        Self::new(GolayDeframerConfig::default())
    }
}

impl Configurable for GolayDeframer {
    fn stage_name(&self) -> &'static str {
        "golay_deframer"
    }

    fn set_conf(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "syncword" => {
                self.conf.syncword = parse_hex_or_dec(self, key, value)?;
                Ok(())
            }
            "syncword_len" => {
                self.conf.syncword_len = parse_dec(self, key, value)?;
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

    fn round_trip(conf: GolayFramerConfig, payload: Vec<u8>) -> Vec<u8> {
        let mut framer = GolayFramer::new(conf);
        framer
            .source_frame
            .connect(Box::new(OneShotSource(Some(Frame::new(payload, 0)))))
            .unwrap();
        let mut symbols = SymbolVector::with_capacity(8192);
        assert!(framer.generate(&mut symbols, 0).unwrap());

        let mut deframer = GolayDeframer::new(GolayDeframerConfig {
            syncword: conf.syncword,
            syncword_len: conf.syncword_len,
        });
        let mut sink = CollectingSink(Vec::new());
        deframer.execute(symbols.as_slice(), 0, &mut sink).unwrap();
        assert_eq!(sink.0.len(), 1);
        sink.0.remove(0).data
    }

    #[test]
    fn plain_round_trip() {
        let conf = GolayFramerConfig::default();
        let payload = vec![0x11, 0x22, 0x33, 0x44];
        assert_eq!(round_trip(conf, payload.clone()), payload);
    }

    #[test]
    fn round_trip_with_randomizer() {
        let conf = GolayFramerConfig {
            use_randomizer: true,
            ..GolayFramerConfig::default()
        };
        let payload = vec![0xAA, 0xBB, 0xCC];
        assert_eq!(round_trip(conf, payload.clone()), payload);
    }

    #[test]
    fn round_trip_with_viterbi() {
        let conf = GolayFramerConfig {
            use_viterbi: true,
            ..GolayFramerConfig::default()
        };
        let payload = vec![0x01, 0x02, 0x03, 0x04, 0x05];
        assert_eq!(round_trip(conf, payload.clone()), payload);
    }

    #[test]
    fn round_trip_with_reed_solomon() {
        let conf = GolayFramerConfig {
            use_rs: true,
            ..GolayFramerConfig::default()
        };
        let payload = vec![0x42; 20];
        assert_eq!(round_trip(conf, payload.clone()), payload);
    }

    #[test]
    fn header_records_combined_flags() {
        let conf = GolayFramerConfig {
            use_rs: true,
            use_randomizer: true,
            use_viterbi: false,
            ..GolayFramerConfig::default()
        };
        let header = header_value(&conf, 10).unwrap();
        assert_eq!(header & USE_REED_SOLOMON, USE_REED_SOLOMON);
        assert_eq!(header & USE_RANDOMIZER, USE_RANDOMIZER);
        assert_eq!(header & USE_VITERBI, 0);
    }
}
