//! RS(255,223) outer code for the Golay framer's optional FEC stage.

use reed_solomon::{Decoder, Encoder};

use crate::errors::DecodeError;

/// Parity symbols appended per RS(255,223) codeword.
const ECC_LEN: usize = 32;
/// Maximum message length a single codeword can carry.
pub const MAX_MESSAGE_LEN: usize = 255 - ECC_LEN;

/// Length `encode` would produce for a message of `n` bytes, without
/// actually encoding anything — used by callers that need to know a
/// framed payload's on-air length ahead of time.
pub fn encoded_len(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let full_blocks = n / MAX_MESSAGE_LEN;
    let remainder = n % MAX_MESSAGE_LEN;
    let mut total = full_blocks * (MAX_MESSAGE_LEN + ECC_LEN);
    if remainder > 0 {
        total += remainder + ECC_LEN;
    }
    total
}

/// Append RS parity to `data`, chunked into `MAX_MESSAGE_LEN`-byte blocks.
/// The last block may be shorter; each block is encoded independently, so
/// the output grows by `ECC_LEN` bytes per block.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let encoder = Encoder::new(ECC_LEN);
    let mut out = Vec::with_capacity(data.len() + ECC_LEN * (data.len() / MAX_MESSAGE_LEN + 1));
    for chunk in data.chunks(MAX_MESSAGE_LEN) {
        let encoded = encoder.encode(chunk);
        out.extend_from_slice(&encoded);
    }
    out
}

/// Reverse `encode`, correcting up to `ECC_LEN / 2` symbol errors per
/// block. `message_len` is the total original (pre-ECC) message length;
/// blocks are the same `MAX_MESSAGE_LEN`-byte size `encode` used, with the
/// final block carrying whatever remainder is left over.
pub fn decode(data: &[u8], message_len: usize) -> Result<Vec<u8>, DecodeError> {
    let decoder = Decoder::new(ECC_LEN);
    let mut out = Vec::with_capacity(message_len);
    let mut offset = 0usize;
    let mut remaining = message_len;

    while remaining > 0 {
        let block_message_len = remaining.min(MAX_MESSAGE_LEN);
        let block_coded_len = block_message_len + ECC_LEN;
        let chunk = data
            .get(offset..offset + block_coded_len)
            .ok_or(DecodeError::TooShort {
                needed: offset + block_coded_len,
                available: data.len(),
            })?;
        let recovered = decoder
            .correct(chunk, None)
            .map_err(|_| DecodeError::ReedSolomonUncorrectable)?;
        out.extend_from_slice(&recovered[..block_message_len]);
        offset += block_coded_len;
        remaining -= block_message_len;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_without_errors() {
        let data = b"the quick brown fox jumps over the lazy dog".to_vec();
        let encoded = encode(&data);
        let decoded = decode(&encoded, data.len()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn corrects_symbol_errors_within_budget() {
        let data = vec![0x42u8; 100];
        let mut encoded = encode(&data);
        for i in 0..10 {
            encoded[i] ^= 0xFF;
        }
        let decoded = decode(&encoded, data.len()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn roundtrips_a_message_spanning_multiple_blocks() {
        let data: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        let encoded = encode(&data);
        assert_eq!(encoded.len(), encoded_len(data.len()));
        let decoded = decode(&encoded, data.len()).unwrap();
        assert_eq!(decoded, data);
    }
}
