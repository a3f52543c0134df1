//! # Channel Mapper Module
//!
//! Maps transport-specific channel order to canonical flight axes.
//!
//! ## Canonical Axis Order
//!
//! | Axis | Index | Function |
//! |------|-------|----------|
//! | Throttle | 0 | Collective thrust demand |
//! | Roll | 1 | Lateral stick |
//! | Pitch | 2 | Longitudinal stick |
//! | Yaw | 3 | Rudder stick |
//! | Aux 1.. | 4.. | Switches (arm, flight mode, ...) |
//!
//! The transform is a pure function: `demand[i] = raw[map[i]] * scale`.
//! No clamping or deadband is applied here; that is the control loop's
//! concern, keeping this component stateless and side-effect-free.

use crate::decoder::RawChannels;
use crate::error::{RcLinkError, Result};
use crate::protocol::MAX_CHANNELS;

/// Canonical axis indices for semantic access.
pub mod axes {
    /// Throttle demand
    pub const THROTTLE: usize = 0;
    /// Roll demand
    pub const ROLL: usize = 1;
    /// Pitch demand
    pub const PITCH: usize = 2;
    /// Yaw demand
    pub const YAW: usize = 3;
    /// First auxiliary channel
    pub const AUX1: usize = 4;
}

/// Immutable mapping from canonical axis to raw channel index.
///
/// Fixed at construction for the life of a receiver. Every index must
/// reference a valid position in the raw channel vector; an out-of-range
/// index is a construction-time error, never a runtime one.
#[derive(Debug, Clone)]
pub struct ChannelMap {
    indices: [usize; MAX_CHANNELS],
    len: usize,
}

impl ChannelMap {
    /// Creates a map with one raw-channel index per canonical axis.
    ///
    /// # Arguments
    ///
    /// * `indices` - Raw channel index for each canonical axis, in axis order
    /// * `channel_count` - Number of raw channels the transport delivers
    ///
    /// # Errors
    ///
    /// Returns [`RcLinkError::Config`] if `indices` is empty, has more
    /// entries than `channel_count`, or contains an index outside
    /// `0..channel_count`.
    pub fn new(indices: &[usize], channel_count: usize) -> Result<Self> {
        if indices.is_empty() {
            return Err(RcLinkError::Config(
                "Channel map must have at least one entry".to_string(),
            ));
        }

        if indices.len() > channel_count {
            return Err(RcLinkError::Config(format!(
                "Channel map has {} entries but transport delivers only {} channels",
                indices.len(),
                channel_count
            )));
        }

        for (axis, &index) in indices.iter().enumerate() {
            if index >= channel_count {
                return Err(RcLinkError::Config(format!(
                    "Channel map entry {} for axis {} exceeds channel count {}",
                    index, axis, channel_count
                )));
            }
        }

        let mut map = [0usize; MAX_CHANNELS];
        map[..indices.len()].copy_from_slice(indices);

        Ok(Self {
            indices: map,
            len: indices.len(),
        })
    }

    /// Number of mapped axes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the map has no entries (never constructible).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mapped raw channel indices in axis order.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.indices[..self.len]
    }
}

/// Canonical demand values produced from one consumed frame.
///
/// Read-only outside the receiver facade; recomputed wholesale every time
/// a new frame is consumed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandVector {
    values: [f32; MAX_CHANNELS],
    len: usize,
}

impl DemandVector {
    /// Creates a zeroed demand vector with `len` axes.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self {
            values: [0.0; MAX_CHANNELS],
            len,
        }
    }

    /// Throttle demand.
    #[must_use]
    pub fn throttle(&self) -> f32 {
        self.values[axes::THROTTLE]
    }

    /// Roll demand.
    #[must_use]
    pub fn roll(&self) -> f32 {
        self.values[axes::ROLL]
    }

    /// Pitch demand.
    #[must_use]
    pub fn pitch(&self) -> f32 {
        self.values[axes::PITCH]
    }

    /// Yaw demand.
    #[must_use]
    pub fn yaw(&self) -> f32 {
        self.values[axes::YAW]
    }

    /// Auxiliary demand `n` (0-based), or `None` if not mapped.
    #[must_use]
    pub fn aux(&self, n: usize) -> Option<f32> {
        self.as_slice().get(axes::AUX1 + n).copied()
    }

    /// All demand values in canonical axis order.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.values[..self.len]
    }
}

/// Applies a channel map and demand scale to a raw frame.
///
/// Pure and deterministic; no axis is special-cased.
///
/// # Arguments
///
/// * `raw` - Most recently decoded raw channel frame
/// * `map` - Canonical-axis-to-raw-index mapping
/// * `scale` - Demand scale factor applied uniformly
///
/// # Returns
///
/// * `DemandVector` - `demand[i] = raw[map[i]] * scale` for each axis
#[must_use]
pub fn map_channels(raw: &RawChannels, map: &ChannelMap, scale: f32) -> DemandVector {
    let mut demands = DemandVector::zeroed(map.len());
    for (axis, &index) in map.as_slice().iter().enumerate() {
        // ChannelMap construction guarantees the index is in range.
        demands.values[axis] = raw.as_slice()[index] * scale;
    }
    demands
}
