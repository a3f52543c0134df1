//! # Streaming Binary Frame Decoder
//!
//! Byte-at-a-time parser for the serial pilot-input protocol.
//!
//! ## Frame Layout
//!
//! | Field | Size | Content |
//! |-------|------|---------|
//! | Sync | 1 byte | [`STREAM_SYNC_BYTE`] (0xA5) |
//! | Payload | 4 × N bytes | N channel values, f32 little-endian |
//! | Checksum | 1 byte | XOR fold of the payload |
//!
//! The payload length is fixed per link and implied by the configured
//! channel count. A checksum mismatch silently discards the in-progress
//! frame and resumes scanning for the next sync byte: malformed frames are
//! expected under RF noise and must never be fatal.

use tracing::trace;

use super::{DecoderStats, FrameDecoder, RawChannels};
use crate::error::Result;
use crate::protocol::checksum::RunningChecksum;
use crate::protocol::{
    stream_payload_len, validate_channel_count, STREAM_BYTES_PER_CHANNEL, STREAM_MAX_PAYLOAD_SIZE,
    STREAM_SYNC_BYTE,
};

/// Parser position within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Scanning for the sync byte.
    Sync,
    /// Accumulating payload bytes; the count already received.
    Payload(usize),
    /// Payload complete, next byte is the checksum.
    Checksum,
}

/// Streaming binary frame decoder.
///
/// Feeds one byte at a time; marks a frame ready only after the trailing
/// checksum verifies. Once synchronized, a sync byte inside the payload is
/// treated as payload.
#[derive(Debug)]
pub struct StreamDecoder {
    channel_count: usize,
    payload_len: usize,
    state: ParseState,
    payload: [u8; STREAM_MAX_PAYLOAD_SIZE],
    checksum: RunningChecksum,
    frame: RawChannels,
    ready: bool,
    stats: DecoderStats,
}

impl StreamDecoder {
    /// Creates a decoder for frames carrying `channel_count` channels.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RcLinkError::Config`] if the channel count is
    /// outside the supported range.
    pub fn new(channel_count: usize) -> Result<Self> {
        validate_channel_count(channel_count)?;

        Ok(Self {
            channel_count,
            payload_len: stream_payload_len(channel_count),
            state: ParseState::Sync,
            payload: [0; STREAM_MAX_PAYLOAD_SIZE],
            checksum: RunningChecksum::new(),
            frame: RawChannels::zeroed(channel_count),
            ready: false,
            stats: DecoderStats::default(),
        })
    }

    /// Decoder counters for status reporting.
    #[must_use]
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Decodes the accumulated payload into the frame buffer.
    ///
    /// Only called after the checksum verified, so the payload is complete.
    fn commit_payload(&mut self) {
        for channel in 0..self.channel_count {
            let offset = channel * STREAM_BYTES_PER_CHANNEL;
            let bytes = [
                self.payload[offset],
                self.payload[offset + 1],
                self.payload[offset + 2],
                self.payload[offset + 3],
            ];
            self.frame.set(channel, f32::from_le_bytes(bytes));
        }
        self.ready = true;
        self.stats.frames_decoded += 1;
    }
}

impl FrameDecoder for StreamDecoder {
    fn feed(&mut self, byte: u8) {
        match self.state {
            ParseState::Sync => {
                if byte == STREAM_SYNC_BYTE {
                    self.checksum.reset();
                    self.state = ParseState::Payload(0);
                } else {
                    self.stats.bytes_discarded += 1;
                }
            }
            ParseState::Payload(received) => {
                self.payload[received] = byte;
                self.checksum.update(byte);

                let received = received + 1;
                if received == self.payload_len {
                    self.state = ParseState::Checksum;
                } else {
                    self.state = ParseState::Payload(received);
                }
            }
            ParseState::Checksum => {
                if byte == self.checksum.value() {
                    self.commit_payload();
                } else {
                    // Discard and resynchronize; the retry is the next frame.
                    self.stats.checksum_errors += 1;
                    trace!(
                        expected = self.checksum.value(),
                        received = byte,
                        "Stream frame checksum mismatch, discarding"
                    );
                }
                self.state = ParseState::Sync;
            }
        }
    }

    fn frame_ready(&self) -> bool {
        self.ready
    }

    fn take_frame(&mut self) -> RawChannels {
        self.ready = false;
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::checksum::checksum_xor;

    /// Encodes one well-formed frame for the given channel values.
    fn encode_frame(values: &[f32]) -> Vec<u8> {
        let mut payload = Vec::new();
        for &value in values {
            payload.extend_from_slice(&value.to_le_bytes());
        }

        let mut frame = vec![STREAM_SYNC_BYTE];
        frame.extend_from_slice(&payload);
        frame.push(checksum_xor(&payload));
        frame
    }

    fn feed_all(decoder: &mut StreamDecoder, bytes: &[u8]) {
        for &byte in bytes {
            decoder.feed(byte);
        }
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_new_with_valid_channel_count() {
        let decoder = StreamDecoder::new(6);
        assert!(decoder.is_ok());
    }

    #[test]
    fn test_new_rejects_zero_channels() {
        assert!(StreamDecoder::new(0).is_err());
    }

    #[test]
    fn test_new_rejects_oversized_channel_count() {
        assert!(StreamDecoder::new(17).is_err());
    }

    // ==================== Decoding Tests ====================

    #[test]
    fn test_decode_well_formed_frame() {
        let values = [0.5, -0.5, 0.25, -0.25, 1.0, 0.0];
        let mut decoder = StreamDecoder::new(6).unwrap();

        feed_all(&mut decoder, &encode_frame(&values));

        assert!(decoder.frame_ready());
        assert_eq!(decoder.take_frame().as_slice(), &values);
        assert!(!decoder.frame_ready(), "take_frame must clear ready");
    }

    #[test]
    fn test_decode_through_leading_noise() {
        let values = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let mut decoder = StreamDecoder::new(6).unwrap();

        feed_all(&mut decoder, &[0x00, 0xFF, 0x42, 0x13]);
        feed_all(&mut decoder, &encode_frame(&values));

        assert!(decoder.frame_ready());
        assert_eq!(decoder.take_frame().as_slice(), &values);
        assert_eq!(decoder.stats().bytes_discarded, 4);
    }

    #[test]
    fn test_latest_frame_wins() {
        let first = [0.1; 6];
        let second = [0.9; 6];
        let mut decoder = StreamDecoder::new(6).unwrap();

        feed_all(&mut decoder, &encode_frame(&first));
        feed_all(&mut decoder, &encode_frame(&second));

        // Frame values are bit-identical to the most recently fed payload.
        assert!(decoder.frame_ready());
        assert_eq!(decoder.take_frame().as_slice(), &second);
        assert_eq!(decoder.stats().frames_decoded, 2);
    }

    #[test]
    fn test_sync_byte_inside_payload() {
        // 0xA5 as a payload byte must not restart frame parsing.
        let value = f32::from_le_bytes([STREAM_SYNC_BYTE; 4]);
        let values = [value, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mut decoder = StreamDecoder::new(6).unwrap();

        feed_all(&mut decoder, &encode_frame(&values));

        assert!(decoder.frame_ready());
        assert_eq!(decoder.take_frame().get(0), Some(value));
    }

    // ==================== Checksum Failure Tests ====================

    #[test]
    fn test_checksum_mismatch_discards_frame() {
        let values = [0.5; 6];
        let mut frame = encode_frame(&values);
        *frame.last_mut().unwrap() ^= 0xFF;

        let mut decoder = StreamDecoder::new(6).unwrap();
        feed_all(&mut decoder, &frame);

        assert!(!decoder.frame_ready());
        assert_eq!(decoder.stats().checksum_errors, 1);
        assert_eq!(decoder.stats().frames_decoded, 0);
    }

    #[test]
    fn test_corrupted_frame_leaves_last_good_frame() {
        let good = [0.5, -0.5, 0.25, -0.25, 1.0, 0.0];
        let mut decoder = StreamDecoder::new(6).unwrap();

        feed_all(&mut decoder, &encode_frame(&good));
        assert!(decoder.frame_ready());
        assert_eq!(decoder.take_frame().as_slice(), &good);

        let mut corrupted = encode_frame(&[0.9; 6]);
        *corrupted.last_mut().unwrap() ^= 0x01;
        feed_all(&mut decoder, &corrupted);

        assert!(!decoder.frame_ready());
        // take_frame with no frame ready yields the last decoded vector.
        assert_eq!(decoder.take_frame().as_slice(), &good);
    }

    #[test]
    fn test_resync_after_checksum_failure() {
        let good = [0.25; 6];
        let mut corrupted = encode_frame(&[0.75; 6]);
        *corrupted.last_mut().unwrap() ^= 0x80;

        let mut decoder = StreamDecoder::new(6).unwrap();
        feed_all(&mut decoder, &corrupted);
        feed_all(&mut decoder, &encode_frame(&good));

        assert!(decoder.frame_ready());
        assert_eq!(decoder.take_frame().as_slice(), &good);
    }

    #[test]
    fn test_take_frame_before_any_frame() {
        let mut decoder = StreamDecoder::new(6).unwrap();
        assert!(!decoder.frame_ready());
        assert_eq!(decoder.take_frame().as_slice(), &[0.0; 6]);
    }
}
