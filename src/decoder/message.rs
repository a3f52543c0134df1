//! # Command Message Decoder
//!
//! Parser for the connection-oriented pilot-input protocol carried over a
//! stream socket.
//!
//! ## Message Layout
//!
//! | Field | Size | Content |
//! |-------|------|---------|
//! | Header | 3 bytes | `$`, `M`, `<` |
//! | Size | 1 byte | Payload length in bytes |
//! | Id | 1 byte | Message id ([`MSG_SET_RC_NORMAL`] carries channels) |
//! | Payload | Size bytes | Six f32 channel values, little-endian |
//! | Checksum | 1 byte | XOR fold of size + id + payload |
//!
//! The connect/disconnect lifecycle is tracked independently of message
//! parsing: a disconnect is the authoritative signal for instantaneous link
//! loss, while "connected but no new data" must not trigger a failsafe.

use tracing::{debug, trace};

use super::{DecoderStats, FrameDecoder, RawChannels};
use crate::protocol::checksum::RunningChecksum;
use crate::protocol::{
    MSG_DIRECTION_IN, MSG_HEADER_DOLLAR, MSG_HEADER_M, MSG_RC_CHANNEL_COUNT, MSG_RC_PAYLOAD_SIZE,
    MSG_SET_RC_NORMAL,
};

/// Largest payload the parser will accumulate; larger sizes are treated as
/// framing corruption and discarded.
const MSG_MAX_PAYLOAD_SIZE: usize = 64;

/// Parser position within a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Scanning for `$`.
    Idle,
    /// Got `$`, expecting `M`.
    HeaderM,
    /// Got `M`, expecting `<`.
    Direction,
    /// Expecting the payload size byte.
    Size,
    /// Expecting the message id byte.
    Id,
    /// Accumulating payload bytes; the count already received.
    Payload(usize),
    /// Payload complete, next byte is the checksum.
    Checksum,
}

/// Command message decoder with connection lifecycle tracking.
///
/// The socket owner reports connect/disconnect events out of band via
/// [`client_connected`](MessageDecoder::client_connected) and
/// [`client_disconnected`](MessageDecoder::client_disconnected); `feed`
/// only parses bytes while a client is connected.
#[derive(Debug)]
pub struct MessageDecoder {
    state: ParseState,
    size: usize,
    id: u8,
    payload: [u8; MSG_MAX_PAYLOAD_SIZE],
    checksum: RunningChecksum,
    frame: RawChannels,
    ready: bool,
    connected: bool,
    had_client: bool,
    stats: DecoderStats,
}

impl Default for MessageDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageDecoder {
    /// Creates a decoder with no client connected.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ParseState::Idle,
            size: 0,
            id: 0,
            payload: [0; MSG_MAX_PAYLOAD_SIZE],
            checksum: RunningChecksum::new(),
            frame: RawChannels::zeroed(MSG_RC_CHANNEL_COUNT),
            ready: false,
            connected: false,
            had_client: false,
            stats: DecoderStats::default(),
        }
    }

    /// Report that a client connected.
    ///
    /// Resets the parser so a partial message from a previous session cannot
    /// bleed into the new one.
    pub fn client_connected(&mut self) {
        debug!("Command client connected");
        self.connected = true;
        self.had_client = true;
        self.state = ParseState::Idle;
    }

    /// Report that the client disconnected.
    pub fn client_disconnected(&mut self) {
        debug!("Command client disconnected");
        self.connected = false;
        self.state = ParseState::Idle;
    }

    /// True while a client is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// True once a client has connected at least once.
    #[must_use]
    pub fn had_client(&self) -> bool {
        self.had_client
    }

    /// Decoder counters for status reporting.
    #[must_use]
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Decodes a validated SET_RC_NORMAL payload into the frame buffer.
    fn commit_rc_payload(&mut self) {
        for channel in 0..MSG_RC_CHANNEL_COUNT {
            let offset = channel * 4;
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

impl FrameDecoder for MessageDecoder {
    fn feed(&mut self, byte: u8) {
        if !self.connected {
            self.stats.bytes_discarded += 1;
            return;
        }

        match self.state {
            ParseState::Idle => {
                if byte == MSG_HEADER_DOLLAR {
                    self.state = ParseState::HeaderM;
                } else {
                    self.stats.bytes_discarded += 1;
                }
            }
            ParseState::HeaderM => {
                self.state = if byte == MSG_HEADER_M {
                    ParseState::Direction
                } else {
                    self.stats.bytes_discarded += 1;
                    ParseState::Idle
                };
            }
            ParseState::Direction => {
                self.state = if byte == MSG_DIRECTION_IN {
                    ParseState::Size
                } else {
                    self.stats.bytes_discarded += 1;
                    ParseState::Idle
                };
            }
            ParseState::Size => {
                let size = byte as usize;
                if size > MSG_MAX_PAYLOAD_SIZE {
                    // Framing corruption; resynchronize on the next header.
                    self.stats.bytes_discarded += 1;
                    self.state = ParseState::Idle;
                    return;
                }
                self.size = size;
                self.checksum.reset();
                self.checksum.update(byte);
                self.state = ParseState::Id;
            }
            ParseState::Id => {
                self.id = byte;
                self.checksum.update(byte);
                self.state = if self.size == 0 {
                    ParseState::Checksum
                } else {
                    ParseState::Payload(0)
                };
            }
            ParseState::Payload(received) => {
                self.payload[received] = byte;
                self.checksum.update(byte);

                let received = received + 1;
                self.state = if received == self.size {
                    ParseState::Checksum
                } else {
                    ParseState::Payload(received)
                };
            }
            ParseState::Checksum => {
                if byte == self.checksum.value() {
                    if self.id == MSG_SET_RC_NORMAL && self.size == MSG_RC_PAYLOAD_SIZE {
                        self.commit_rc_payload();
                    } else {
                        // Valid message we don't consume; channel state is untouched.
                        trace!(id = self.id, size = self.size, "Ignoring non-RC message");
                    }
                } else {
                    self.stats.checksum_errors += 1;
                    trace!(
                        expected = self.checksum.value(),
                        received = byte,
                        "Command message checksum mismatch, discarding"
                    );
                }
                self.state = ParseState::Idle;
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
