//! # XOR Checksum Implementation
//!
//! Single-byte XOR fold used by both pilot-input transports.
//!
//! The streaming binary protocol appends the checksum of the payload; the
//! command message protocol appends the checksum of size + id + payload.
//! An XOR fold catches single-byte corruption, which is the dominant failure
//! under RF noise, and is cheap enough to run per byte in interrupt context.

/// Calculate the XOR checksum of a byte slice.
///
/// # Arguments
///
/// * `data` - Bytes covered by the checksum
///
/// # Returns
///
/// * `u8` - XOR fold of all bytes (0x00 for empty input)
#[must_use]
pub fn checksum_xor(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &byte| acc ^ byte)
}

/// Incremental XOR checksum for byte-at-a-time parsers.
///
/// Decoders feed bytes as they arrive and cannot buffer the whole frame
/// before checksumming, so they accumulate the running value instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningChecksum {
    value: u8,
}

impl RunningChecksum {
    /// Creates a fresh checksum accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self { value: 0 }
    }

    /// Folds one byte into the running value.
    pub fn update(&mut self, byte: u8) {
        self.value ^= byte;
    }

    /// Current accumulated checksum.
    #[must_use]
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Resets the accumulator for the next frame.
    pub fn reset(&mut self) {
        self.value = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum_xor(&[]), 0x00);
    }

    #[test]
    fn test_checksum_single_byte() {
        assert_eq!(checksum_xor(&[0xA5]), 0xA5);
    }

    #[test]
    fn test_checksum_self_cancels() {
        // XOR of a byte with itself is zero
        assert_eq!(checksum_xor(&[0x5A, 0x5A]), 0x00);
    }

    #[test]
    fn test_checksum_known_vector() {
        assert_eq!(checksum_xor(&[0x01, 0x02, 0x04]), 0x07);
    }

    #[test]
    fn test_checksum_changes_with_data() {
        let a = checksum_xor(&[0x18, 0x16, 0x00, 0x04]);
        let b = checksum_xor(&[0x18, 0x16, 0x00, 0x05]);
        assert_ne!(a, b, "Checksum should change when data changes");
    }

    #[test]
    fn test_running_matches_slice() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF, 0xA5, 0x00, 0x42];
        let mut running = RunningChecksum::new();
        for &byte in &data {
            running.update(byte);
        }
        assert_eq!(running.value(), checksum_xor(&data));
    }

    #[test]
    fn test_running_reset() {
        let mut running = RunningChecksum::new();
        running.update(0xFF);
        running.reset();
        assert_eq!(running.value(), 0x00);
    }
}
