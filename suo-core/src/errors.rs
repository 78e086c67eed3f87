//! Error categories for the core pipeline.
//!
//! Per-frame errors (`BufferCapacity`, `Decode`, `DeadlineMiss`) are meant to
//! be recovered locally by the caller (drop the frame, log, carry on).
//! Per-pipeline errors (`Config`, `Io`) are fatal and expected to propagate
//! to the main loop.

use thiserror::Error;

/// Top-level error type for all core operations.
#[derive(Debug, Error)]
pub enum SuoError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("buffer capacity error: {0}")]
    BufferCapacity(#[from] BufferCapacityError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("deadline miss: {0}")]
    DeadlineMiss(#[from] DeadlineMiss),

    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// Unknown parameter, unparsable value, or inconsistent configuration.
/// Fatal at init; prevents pipeline start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown parameter {key:?} for stage {stage}")]
    UnknownParameter { stage: &'static str, key: String },

    #[error("invalid value {value:?} for parameter {key:?} of stage {stage}: {reason}")]
    InvalidValue {
        stage: &'static str,
        key: String,
        value: String,
        reason: String,
    },

    #[error("inconsistent configuration for stage {stage}: {reason}")]
    Inconsistent { stage: &'static str, reason: String },

    #[error("a port already has a handler connected")]
    PortAlreadyConnected,

    #[error("a required port has no handler connected")]
    PortNotConnected,

    #[error("malformed configuration file at line {line}: {reason}")]
    MalformedFile { line: usize, reason: String },

    #[error("unknown stage section {0:?}")]
    UnknownStage(String),
}

/// A stage required more output space than the caller offered for an
/// atomic emission unit (e.g. a full HDLC preamble). Fatal for that frame
/// only; no partial write is made.
#[derive(Debug, Error)]
#[error("buffer too small: needed at least {needed}, offered {available}")]
pub struct BufferCapacityError {
    pub needed: usize,
    pub available: usize,
}

/// CRC/RS/convolutional decode failed. Non-fatal; the frame is dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("CRC mismatch: expected {expected:#06x}, computed {computed:#06x}")]
    CrcMismatch { expected: u16, computed: u16 },

    #[error("Reed-Solomon decode failed: uncorrectable")]
    ReedSolomonUncorrectable,

    #[error("Golay decode failed: more than 3 bit errors")]
    GolayUncorrectable,

    #[error("no flag/syncword found in input")]
    SyncNotFound,

    #[error("frame too short: need at least {needed} bytes, have {available}")]
    TooShort { needed: usize, available: usize },
}

/// The transmit frame's timestamp is already in the past and `NO_LATE` is
/// set. The frame is dropped silently (a diagnostic is logged by the
/// caller); this variant exists so the caller can distinguish the case.
#[derive(Debug, Error)]
#[error("frame timestamp {timestamp} is before deadline {deadline} and NO_LATE is set")]
pub struct DeadlineMiss {
    pub timestamp: i64,
    pub deadline: i64,
}

/// Device-level error surfaced by a `SignalIo` implementation. Causes the
/// main loop to terminate.
#[derive(Debug, Error)]
#[error("signal I/O error: {0}")]
pub struct IoError(pub String);

/// Result alias for fallible core operations.
pub type Result<T> = std::result::Result<T, SuoError>;
