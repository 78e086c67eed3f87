//! Sample and symbol buffers that carry timing across a pipeline.

use crate::errors::BufferCapacityError;
use crate::types::{Sample, Timestamp};

/// A contiguous span of baseband samples together with the timestamp of
/// its first sample. Position `i` corresponds to on-air time
/// `base_timestamp + i / sample_rate`.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub samples: Vec<Sample>,
    pub base_timestamp: Timestamp,
}

impl SampleBuffer {
    pub fn new(samples: Vec<Sample>, base_timestamp: Timestamp) -> Self {
        Self {
            samples,
            base_timestamp,
        }
    }

    pub fn silence(len: usize, base_timestamp: Timestamp) -> Self {
        Self::new(vec![Sample::new(0.0, 0.0); len], base_timestamp)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Minimal bespoke bitflags so the crate doesn't pull in the `bitflags`
/// crate for two booleans.
macro_rules! bitflags_lite {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $ty:ty {
            $(const $flag:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name($ty);

        impl $name {
            $(pub const $flag: $name = $name($value);)*

            pub const fn empty() -> Self {
                $name(0)
            }

            pub fn contains(&self, other: $name) -> bool {
                (self.0 & other.0) == other.0
            }

            pub fn insert(&mut self, other: $name) {
                self.0 |= other.0;
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }
    };
}

bitflags_lite! {
    /// Burst edge markers on a `SymbolVector`, delimiting the span of a
    /// transmit envelope for the signal sink.
    pub struct BurstFlags: u8 {
        const START_OF_BURST = 0b01;
        const END_OF_BURST   = 0b10;
    }
}

/// An ordered sequence of symbols (hard bits, soft bits, or encoded
/// symbols depending on context) with a bounded capacity and burst edge
/// flags. Mirrors the source's `SymbolVector`: callers size the backing
/// store once at init and every stage writes in place up to `capacity()`.
#[derive(Debug, Clone)]
pub struct SymbolVector {
    data: Vec<u8>,
    capacity: usize,
    pub flags: BurstFlags,
}

impl SymbolVector {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            flags: BurstFlags::empty(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.flags = BurstFlags::empty();
    }

    /// Append one symbol, failing with no partial write if the vector is
    /// already at capacity.
    pub fn push(&mut self, symbol: u8) -> Result<(), BufferCapacityError> {
        if self.data.len() >= self.capacity {
            return Err(BufferCapacityError {
                needed: self.data.len() + 1,
                available: self.capacity,
            });
        }
        self.data.push(symbol);
        Ok(())
    }

    /// Reserve room for `n` more symbols without writing any, returning an
    /// error (and leaving the vector untouched) if there isn't enough
    /// remaining capacity. Used by framers that must emit an atomic unit
    /// (a full preamble or trailer) or not at all.
    pub fn require_remaining(&self, n: usize) -> Result<(), BufferCapacityError> {
        if self.capacity - self.data.len() < n {
            return Err(BufferCapacityError {
                needed: self.data.len() + n,
                available: self.capacity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_vector_rejects_overflow_without_partial_write() {
        let mut sv = SymbolVector::with_capacity(2);
        sv.push(1).unwrap();
        sv.push(0).unwrap();
        assert!(sv.push(1).is_err());
        assert_eq!(sv.len(), 2);
    }

    #[test]
    fn require_remaining_does_not_mutate() {
        let sv = SymbolVector::with_capacity(4);
        assert!(sv.require_remaining(4).is_ok());
        assert!(sv.require_remaining(5).is_err());
        assert_eq!(sv.len(), 0);
    }

    #[test]
    fn burst_flags_combine() {
        let mut flags = BurstFlags::empty();
        flags.insert(BurstFlags::START_OF_BURST);
        assert!(flags.contains(BurstFlags::START_OF_BURST));
        assert!(!flags.contains(BurstFlags::END_OF_BURST));
        flags.insert(BurstFlags::END_OF_BURST);
        assert!(flags.contains(BurstFlags::END_OF_BURST));
    }
}
