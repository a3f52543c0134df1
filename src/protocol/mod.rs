//! # Wire Protocol Module
//!
//! Bit-level contracts for both pilot-input transports.
//!
//! This module defines:
//! - Streaming binary frame layout (sync byte, f32 channel payload, XOR checksum)
//! - Connection-oriented command message layout (MSP-style `$M<` framing)
//! - XOR checksum calculation shared by both

pub mod checksum;

use crate::error::{RcLinkError, Result};

/// Maximum number of physical input channels any transport can carry.
pub const MAX_CHANNELS: usize = 16;

/// Minimum number of physical input channels a transport must carry.
pub const MIN_CHANNELS: usize = 6;

// ---------------------------------------------------------------------------
// Streaming binary protocol (serial byte stream)
// ---------------------------------------------------------------------------

/// Frame-start marker for the streaming binary protocol.
pub const STREAM_SYNC_BYTE: u8 = 0xA5;

/// Bytes per channel value in a streaming frame (f32, little-endian).
pub const STREAM_BYTES_PER_CHANNEL: usize = 4;

/// Maximum streaming payload size in bytes.
pub const STREAM_MAX_PAYLOAD_SIZE: usize = MAX_CHANNELS * STREAM_BYTES_PER_CHANNEL;

/// Payload length in bytes for a streaming frame carrying `channel_count` channels.
///
/// The payload length is fixed per link: it is implied by the configured
/// channel count, not carried on the wire.
#[must_use]
pub const fn stream_payload_len(channel_count: usize) -> usize {
    channel_count * STREAM_BYTES_PER_CHANNEL
}

// ---------------------------------------------------------------------------
// Connection-oriented command protocol (stream socket)
// ---------------------------------------------------------------------------

/// First header byte of a command message.
pub const MSG_HEADER_DOLLAR: u8 = b'$';

/// Second header byte of a command message.
pub const MSG_HEADER_M: u8 = b'M';

/// Direction byte for messages sent *to* the vehicle.
pub const MSG_DIRECTION_IN: u8 = b'<';

/// Message id for a normalized RC channel update (six f32 values).
pub const MSG_SET_RC_NORMAL: u8 = 222;

/// Number of channel values carried per command message.
pub const MSG_RC_CHANNEL_COUNT: usize = 6;

/// Payload size of a SET_RC_NORMAL message (six f32, little-endian).
pub const MSG_RC_PAYLOAD_SIZE: usize = MSG_RC_CHANNEL_COUNT * 4;

/// Validate a channel count supplied by configuration.
///
/// # Errors
///
/// Returns [`RcLinkError::Config`] if the count is zero or outside the
/// supported range. A bad channel count is a build/config defect and must
/// abort startup rather than degrade at runtime.
pub fn validate_channel_count(channel_count: usize) -> Result<()> {
    if channel_count < MIN_CHANNELS || channel_count > MAX_CHANNELS {
        return Err(RcLinkError::Config(format!(
            "Channel count {} outside supported range {}..={}",
            channel_count, MIN_CHANNELS, MAX_CHANNELS
        )));
    }
    Ok(())
}
