//! Generic `Decoder`/`Encoder` stage implementations.

pub mod basic;
