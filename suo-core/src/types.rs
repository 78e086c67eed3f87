//! Fundamental scalar types shared by every stage.

use num_complex::Complex32;

/// Complex baseband sample (in-phase, quadrature).
pub type Sample = Complex32;

/// A hard bit, value in {0, 1}.
pub type Bit = u8;

/// A soft decision bit: 0 = very likely '0', 255 = very likely '1'.
/// The mapping to log-likelihood ratio beyond that is decoder-defined
/// (see `codec::CrcCheckDecoder` for the one decoder in this crate that
/// consumes soft bits).
pub type SoftBit = u8;

/// Nanoseconds since an arbitrary pipeline-wide epoch. Monotonically
/// non-decreasing within a sample stream.
pub type Timestamp = i64;

/// Threshold at/above which a soft bit is read as a hard `1`.
pub const SOFT_BIT_THRESHOLD: SoftBit = 128;

/// Map a soft bit to a hard bit using the crate-wide midpoint threshold.
pub fn soft_to_hard(bit: SoftBit) -> Bit {
    (bit >= SOFT_BIT_THRESHOLD) as Bit
}

/// Map a hard bit to its saturated soft-bit representation (0 or 255).
pub fn hard_to_soft(bit: Bit) -> SoftBit {
    if bit != 0 {
        255
    } else {
        0
    }
}

/// Nanoseconds spanned by `n` samples at `sample_rate` Hz.
pub fn samples_to_ns(n: u64, sample_rate: u32) -> i64 {
    debug_assert!(sample_rate > 0);
    ((n as u128 * 1_000_000_000u128) / sample_rate as u128) as i64
}

/// The on-air timestamp of sample index `i` within a buffer starting at
/// `base_timestamp`.
pub fn timestamp_of_sample(base_timestamp: Timestamp, i: u64, sample_rate: u32) -> Timestamp {
    base_timestamp + samples_to_ns(i, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_hard_roundtrip_endpoints() {
        assert_eq!(soft_to_hard(0), 0);
        assert_eq!(soft_to_hard(255), 1);
        assert_eq!(hard_to_soft(0), 0);
        assert_eq!(hard_to_soft(1), 255);
    }

    #[test]
    fn soft_to_hard_is_monotonic_around_threshold() {
        assert_eq!(soft_to_hard(127), 0);
        assert_eq!(soft_to_hard(128), 1);
    }

    #[test]
    fn samples_to_ns_at_one_mhz() {
        assert_eq!(samples_to_ns(1_000_000, 1_000_000), 1_000_000_000);
        assert_eq!(samples_to_ns(1, 1_000_000), 1_000);
    }
}
