//! Stand-ins for the external collaborators this crate doesn't own: the
//! SDR device driver behind `SignalIo`, and the frame message bus behind
//! `FrameSource`/`FrameSink`. Neither talks to real hardware or a network;
//! both exist so a complete pipeline can be assembled, run, and tested
//! in-process.

pub mod test_io;
