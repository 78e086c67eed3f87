//! In-process stand-ins for the frame message bus and the SDR device
//! driver: neither one is this crate's concern, but a complete pipeline
//! needs something to plug into both sockets to run end-to-end.

use std::collections::VecDeque;

use crate::buffer::SampleBuffer;
use crate::config::Configurable;
use crate::errors::{ConfigError, SuoError};
use crate::frame::Frame;
use crate::stage::{FrameSink, FrameSource, Receiver, SignalIo, Transmitter};
use crate::types::{Sample, Timestamp};

/// A `FrameSink` that logs every completed frame (hex dump, printable-ASCII
/// rendering, and metadata, matching `test_output_frame`'s console report)
/// and keeps every frame it has seen for the caller to inspect afterwards.
#[derive(Debug, Default)]
pub struct TestFrameSink {
    pub received: Vec<Frame>,
}

impl TestFrameSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for TestFrameSink {
    fn frame(&mut self, frame: Frame) -> Result<(), SuoError> {
        let hex: String = frame.data.iter().map(|b| format!("{b:02x} ")).collect();
        let ascii: String = frame
            .data
            .iter()
            .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
            .collect();
        tracing::info!(
            timestamp = frame.timestamp,
            cfo = ?frame.metadata.cfo,
            rssi = ?frame.metadata.rssi,
            snr = ?frame.metadata.snr,
            ber = ?frame.metadata.ber,
            oer = ?frame.metadata.oer,
            mode = ?frame.metadata.mode,
            hex = %hex,
            ascii = %ascii,
            "frame received"
        );
        self.received.push(frame);
        Ok(())
    }
}

/// A `FrameSource` backed by a plain FIFO queue, standing in for the
/// out-of-scope message bus that would otherwise hand the transmit chain
/// its outgoing frames. `get_frame` drops (and logs) any queued frame whose
/// `NO_LATE` flag is set and whose schedule has already passed `deadline`,
/// then returns the next one that hasn't.
#[derive(Debug, Default)]
pub struct TestFrameSource {
    queue: VecDeque<Frame>,
}

impl TestFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.queue.push_back(frame);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl FrameSource for TestFrameSource {
    fn get_frame(&mut self, max_len: usize, deadline: Timestamp) -> Option<Frame> {
        while let Some(frame) = self.queue.pop_front() {
            if frame.is_late(deadline) {
                tracing::debug!(timestamp = frame.timestamp, deadline, "dropping late NO_LATE frame");
                continue;
            }
            if frame.len() > max_len {
                tracing::debug!(len = frame.len(), max_len, "dropping frame exceeding max_len");
                continue;
            }
            return Some(frame);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopbackSignalIoConfig {
    pub sample_rate: u32,
    pub buffer_len: usize,
    /// Stop after this many ticks; `None` runs until `tick` is no longer
    /// called (the cooperative stop point lives one level up, in
    /// `Pipeline::run`/`run_until`).
    pub max_ticks: Option<u64>,
}

impl Default for LoopbackSignalIoConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1_000_000,
            buffer_len: 4096,
            max_ticks: None,
        }
    }
}

/// Stands in for the SDR device driver: generates silence-filled receive
/// buffers at a fixed rate and discards whatever the transmit chain
/// produces, advancing a monotonically increasing timestamp each tick. Real
/// sample I/O (reading from / writing to hardware, and the fixed-point
/// format conversions at that boundary) is out of this crate's scope.
pub struct LoopbackSignalIo {
    conf: LoopbackSignalIoConfig,
    timestamp: Timestamp,
    ticks: u64,
    tx_buffer: Vec<Sample>,
}

impl LoopbackSignalIo {
    pub fn new(conf: LoopbackSignalIoConfig) -> Self {
        let buffer_len = conf.buffer_len;
        Self {
            conf,
            timestamp: 0,
            ticks: 0,
            tx_buffer: vec![Sample::new(0.0, 0.0); buffer_len],
        }
    }
}

impl SignalIo for LoopbackSignalIo {
    fn tick(
        &mut self,
        receiver: Option<&mut dyn Receiver>,
        rx_sink: &mut dyn FrameSink,
        transmitter: Option<&mut dyn Transmitter>,
        tx_source: &mut dyn FrameSource,
    ) -> Result<bool, SuoError> {
        if let Some(max_ticks) = self.conf.max_ticks {
            if self.ticks >= max_ticks {
                return Ok(false);
            }
        }

        let rx_buffer = SampleBuffer::silence(self.conf.buffer_len, self.timestamp);
        if let Some(receiver) = receiver {
            receiver.execute(&rx_buffer.samples, rx_buffer.base_timestamp, rx_sink)?;
        }

        if let Some(transmitter) = transmitter {
            self.tx_buffer.fill(Sample::new(0.0, 0.0));
            transmitter.execute(&mut self.tx_buffer, self.timestamp, tx_source)?;
        }

        self.timestamp = crate::types::timestamp_of_sample(self.timestamp, self.conf.buffer_len as u64, self.conf.sample_rate);
        self.ticks += 1;
        Ok(true)
    }
}

impl Configurable for LoopbackSignalIo {
    fn stage_name(&self) -> &'static str {
        "loopback_signal_io"
    }

    fn set_conf(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "sample_rate" => {
                self.conf.sample_rate = value.parse().map_err(|_| ConfigError::InvalidValue {
                    stage: self.stage_name(),
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected an unsigned integer".to_string(),
                })?;
            }
            "buffer_len" => {
                self.conf.buffer_len = value.parse().map_err(|_| ConfigError::InvalidValue {
                    stage: self.stage_name(),
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected an unsigned integer".to_string(),
                })?;
                self.tx_buffer = vec![Sample::new(0.0, 0.0); self.conf.buffer_len];
            }
            "max_ticks" => {
                self.conf.max_ticks = Some(value.parse().map_err(|_| ConfigError::InvalidValue {
                    stage: self.stage_name(),
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected an unsigned integer".to_string(),
                })?);
            }
            other => {
                return Err(ConfigError::UnknownParameter {
                    stage: self.stage_name(),
                    key: other.to_string(),
                })
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    struct NullReceiver;
    impl Configurable for NullReceiver {
        fn stage_name(&self) -> &'static str {
            "null_receiver"
        }
        fn set_conf(&mut self, key: &str, _value: &str) -> Result<(), ConfigError> {
            Err(ConfigError::UnknownParameter {
                stage: self.stage_name(),
                key: key.to_string(),
            })
        }
    }
    impl Receiver for NullReceiver {
        fn execute(&mut self, _samples: &[Sample], _base_timestamp: Timestamp, _sink: &mut dyn FrameSink) -> Result<(), SuoError> {
            Ok(())
        }
    }

    #[test]
    fn tick_advances_timestamp_and_stops_at_max_ticks() {
        let mut io = LoopbackSignalIo::new(LoopbackSignalIoConfig {
            sample_rate: 1000,
            buffer_len: 10,
            max_ticks: Some(2),
        });
        let mut receiver = NullReceiver;
        let mut sink = TestFrameSink::new();
        let mut source = TestFrameSource::new();

        assert!(io.tick(Some(&mut receiver), &mut sink, None, &mut source).unwrap());
        assert!(io.tick(Some(&mut receiver), &mut sink, None, &mut source).unwrap());
        assert!(!io.tick(Some(&mut receiver), &mut sink, None, &mut source).unwrap());
    }

    #[test]
    fn frame_source_drops_late_no_late_frames() {
        let mut source = TestFrameSource::new();
        source.push_frame(Frame::new(vec![1], 0).with_flags(crate::frame::FrameFlags::NO_LATE));
        source.push_frame(Frame::new(vec![2], 100));

        let frame = source.get_frame(10, 50).unwrap();
        assert_eq!(frame.data, vec![2]);
        assert!(source.is_empty());
    }

    #[test]
    fn sink_collects_every_frame() {
        let mut sink = TestFrameSink::new();
        sink.frame(Frame::new(vec![1, 2, 3], 0)).unwrap();
        sink.frame(Frame::new(vec![4, 5], 10)).unwrap();
        assert_eq!(sink.received.len(), 2);
    }
}
