//! # Frame Decoder Module
//!
//! Transport-specific decoding of raw input bytes into validated channel frames.
//!
//! This module handles:
//! - The `{feed, frame_ready, take_frame}` capability set shared by all transports
//! - Streaming binary frames from a serial byte source ([`stream`])
//! - Command messages over a connection-oriented socket ([`message`])
//!
//! `feed` is called once per raw byte as it arrives, potentially from an
//! interrupt or socket-read context, and must never block or allocate.
//! Malformed frames are expected under RF noise: decoders silently discard
//! them and resynchronize, never raising an error.

pub mod message;
pub mod stream;

use crate::protocol::MAX_CHANNELS;

/// One complete, validated frame of normalized channel values.
///
/// Fixed-capacity so it can live in interrupt-fed buffers without
/// allocation; `len` is the channel count configured for the transport.
/// A frame is always overwritten wholesale, never partially updated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawChannels {
    values: [f32; MAX_CHANNELS],
    len: usize,
}

impl RawChannels {
    /// Creates a zeroed frame holding `len` channels.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self {
            values: [0.0; MAX_CHANNELS],
            len,
        }
    }

    /// Creates a frame from a slice of channel values.
    #[must_use]
    pub fn from_slice(values: &[f32]) -> Self {
        let mut frame = Self::zeroed(values.len());
        frame.values[..values.len()].copy_from_slice(values);
        frame
    }

    /// Number of active channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the frame holds no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Active channel values.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.values[..self.len]
    }

    /// Channel value at `index`, or `None` if out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<f32> {
        self.as_slice().get(index).copied()
    }

    pub(crate) fn set(&mut self, index: usize, value: f32) {
        self.values[index] = value;
    }
}

/// Capability set implemented by every transport decoder.
///
/// Composed into the receiver facade rather than inherited, so transports
/// stay independent of generic receiver behavior.
pub trait FrameDecoder {
    /// Consume one raw input byte.
    ///
    /// Called from the input-arrival context; must complete in bounded,
    /// short time and must not block or allocate.
    fn feed(&mut self, byte: u8);

    /// True if a complete, validated frame is buffered.
    ///
    /// O(1) and side-effect-free.
    fn frame_ready(&self) -> bool;

    /// Consume the buffered frame and clear the ready flag.
    ///
    /// Calling this when no frame is ready returns the last decoded frame
    /// unchanged; callers must check [`frame_ready`](Self::frame_ready) first.
    fn take_frame(&mut self) -> RawChannels;
}

/// Running counters kept by each decoder for status reporting.
///
/// Read-only outside the decoder; malformed input shows up here instead of
/// as an error value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames that passed validation.
    pub frames_decoded: u64,

    /// Frames dropped for a checksum mismatch.
    pub checksum_errors: u64,

    /// Bytes skipped while scanning for a frame start.
    pub bytes_discarded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_channels_zeroed() {
        let frame = RawChannels::zeroed(6);
        assert_eq!(frame.len(), 6);
        assert!(!frame.is_empty());
        assert_eq!(frame.as_slice(), &[0.0; 6]);
    }

    #[test]
    fn test_raw_channels_from_slice() {
        let frame = RawChannels::from_slice(&[0.5, -0.5, 0.25, -0.25, 1.0, 0.0]);
        assert_eq!(frame.len(), 6);
        assert_eq!(frame.get(0), Some(0.5));
        assert_eq!(frame.get(5), Some(0.0));
        assert_eq!(frame.get(6), None);
    }

    #[test]
    fn test_raw_channels_overwritten_wholesale() {
        let mut frame = RawChannels::from_slice(&[1.0; 6]);
        frame = RawChannels::from_slice(&[0.0; 6]);
        assert_eq!(frame.as_slice(), &[0.0; 6]);
    }

    #[test]
    fn test_decoder_stats_default() {
        let stats = DecoderStats::default();
        assert_eq!(stats.frames_decoded, 0);
        assert_eq!(stats.checksum_errors, 0);
        assert_eq!(stats.bytes_discarded, 0);
    }
}
