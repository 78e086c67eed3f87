//! Degenerate `Decoder`/`Encoder` implementations.
//!
//! The HDLC/Golay deframers already perform full CRC/FEC reversal as part
//! of the receiver role, so the generic `Decoder`/`Encoder` stage in the
//! default assembled pipeline has nothing left to do.
//! `CrcCheckDecoder` is kept available for a hand-assembled pipeline that
//! wants a standalone soft-bit-to-bytes decode stage without a full
//! framer in front of it.

use crate::config::Configurable;
use crate::crc::crc16_ccitt;
use crate::errors::{ConfigError, DecodeError, SuoError};
use crate::frame::Frame;
use crate::stage::Decoder;
use crate::stage::Encoder;
use crate::types::soft_to_hard;

/// Forwards a frame unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughDecoder;

impl Decoder for PassthroughDecoder {
    fn decode(&self, input: &Frame, max_out_bytes: usize) -> Result<Frame, SuoError> {
        if input.len() > max_out_bytes {
            return Err(DecodeError::TooShort {
                needed: input.len(),
                available: max_out_bytes,
            }
            .into());
        }
        Ok(input.clone())
    }
}

impl Configurable for PassthroughDecoder {
    fn stage_name(&self) -> &'static str {
        "passthrough_decoder"
    }

    fn set_conf(&mut self, key: &str, _value: &str) -> Result<(), ConfigError> {
        Err(ConfigError::UnknownParameter {
            stage: self.stage_name(),
            key: key.to_string(),
        })
    }
}

/// Forwards a frame unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityEncoder;

impl Encoder for IdentityEncoder {
    fn encode(&self, input: &Frame, max_out_len: usize) -> Result<Frame, SuoError> {
        if input.len() > max_out_len {
            return Err(DecodeError::TooShort {
                needed: input.len(),
                available: max_out_len,
            }
            .into());
        }
        Ok(input.clone())
    }
}

impl Configurable for IdentityEncoder {
    fn stage_name(&self) -> &'static str {
        "identity_encoder"
    }

    fn set_conf(&mut self, key: &str, _value: &str) -> Result<(), ConfigError> {
        Err(ConfigError::UnknownParameter {
            stage: self.stage_name(),
            key: key.to_string(),
        })
    }
}

/// Treats the input frame's bytes as packed soft bits (one byte per bit,
/// thresholded per [`SOFT_BIT_THRESHOLD`]), packs them MSB-first into
/// bytes, and verifies a trailing CRC-16/CCITT.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrcCheckDecoder;

impl Decoder for CrcCheckDecoder {
    fn decode(&self, input: &Frame, max_out_bytes: usize) -> Result<Frame, SuoError> {
        let hard_bits: Vec<u8> = input.data.iter().map(|&soft| soft_to_hard(soft)).collect();
        let mut bytes = Vec::with_capacity(hard_bits.len() / 8);
        for chunk in hard_bits.chunks(8) {
            if chunk.len() < 8 {
                break;
            }
            bytes.push(chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | bit));
        }

        if bytes.len() < 2 {
            return Err(DecodeError::TooShort {
                needed: 2,
                available: bytes.len(),
            }
            .into());
        }
        if bytes.len() > max_out_bytes + 2 {
            return Err(DecodeError::TooShort {
                needed: bytes.len() - 2,
                available: max_out_bytes,
            }
            .into());
        }

        let payload_len = bytes.len() - 2;
        let received_crc = ((bytes[payload_len] as u16) << 8) | (bytes[payload_len + 1] as u16);
        let computed_crc = crc16_ccitt(&bytes[..payload_len]);
        if received_crc != computed_crc {
            return Err(DecodeError::CrcMismatch {
                expected: received_crc,
                computed: computed_crc,
            }
            .into());
        }

        bytes.truncate(payload_len);
        Ok(Frame::new(bytes, input.timestamp).with_metadata(input.metadata))
    }
}

impl Configurable for CrcCheckDecoder {
    fn stage_name(&self) -> &'static str {
        "crc_check_decoder"
    }

    fn set_conf(&mut self, key: &str, _value: &str) -> Result<(), ConfigError> {
        Err(ConfigError::UnknownParameter {
            stage: self.stage_name(),
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_returns_an_equal_frame() {
        let frame = Frame::new(vec![1, 2, 3], 42);
        let out = PassthroughDecoder.decode(&frame, 16).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn passthrough_rejects_output_over_budget() {
        let frame = Frame::new(vec![1, 2, 3], 0);
        assert!(PassthroughDecoder.decode(&frame, 1).is_err());
    }

    #[test]
    fn crc_check_decoder_accepts_a_correct_frame() {
        let payload = vec![0xAB, 0xCD];
        let crc = crc16_ccitt(&payload);
        let mut bytes = payload.clone();
        bytes.push(((crc >> 8) & 0xff) as u8);
        bytes.push((crc & 0xff) as u8);

        let mut soft_bits = Vec::new();
        for byte in &bytes {
            for i in (0..8).rev() {
                let bit = (byte >> i) & 1;
                soft_bits.push(if bit == 1 { 255 } else { 0 });
            }
        }

        let input = Frame::new(soft_bits, 0);
        let decoded = CrcCheckDecoder.decode(&input, 64).unwrap();
        assert_eq!(decoded.data, payload);
    }

    #[test]
    fn crc_check_decoder_rejects_a_corrupted_frame() {
        let payload = vec![0xAB, 0xCD];
        let crc = crc16_ccitt(&payload) ^ 0xFFFF;
        let mut bytes = payload.clone();
        bytes.push(((crc >> 8) & 0xff) as u8);
        bytes.push((crc & 0xff) as u8);

        let mut soft_bits = Vec::new();
        for byte in &bytes {
            for i in (0..8).rev() {
                let bit = (byte >> i) & 1;
                soft_bits.push(if bit == 1 { 255 } else { 0 });
            }
        }

        let input = Frame::new(soft_bits, 0);
        assert!(CrcCheckDecoder.decode(&input, 64).is_err());
    }
}
