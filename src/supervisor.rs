//! # Link Supervisor Module
//!
//! State machine deciding whether the command link is currently trustworthy.
//!
//! ## States and Transitions
//!
//! - `NoLinkEverSeen` → `LinkUp`: first successful frame ever decoded.
//! - `LinkUp` → `LinkLost`: transport-specific loss condition: elapsed time
//!   since the last decoded frame for streaming transports, the explicit
//!   disconnect event for connection-oriented transports.
//! - `LinkLost` → `LinkUp`: a new client connecting, on connection-oriented
//!   transports only.
//!
//! Streaming transports deliberately do not auto-recover from `LinkLost`
//! within a supervisory session; recovery requires a restart. The asymmetry
//! is a fail-safe bias: a spurious failsafe is preferred over masking a real
//! loss.
//!
//! Timeout detection is driven by the polled context reading a monotonic
//! clock. It must not depend on input arriving: a dead transport stops
//! producing input events by definition.

use tracing::{info, warn};

/// Link presence over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No frame has ever been decoded on this link.
    NoLinkEverSeen,
    /// Frames are arriving and the link is trusted.
    LinkUp,
    /// The link is no longer trusted; the consumer should fail safe.
    LinkLost,
}

/// Transport-specific loss condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossPolicy {
    /// Streaming transport: lost when no frame decodes within the window.
    /// Sticky once tripped.
    Timeout {
        /// Supervision window in microseconds.
        timeout_micros: u64,
    },
    /// Connection-oriented transport: lost on explicit disconnect,
    /// recovered when a new client connects.
    Disconnect,
}

/// Link supervisor state machine.
///
/// Observes decoder activity from the polled context and converts it into
/// the binary `lost_signal` flag queried every control cycle. Runs for the
/// life of the receiver; there is no terminal state.
#[derive(Debug)]
pub struct LinkSupervisor {
    state: LinkState,
    policy: LossPolicy,
    last_frame_micros: Option<u64>,
}

impl LinkSupervisor {
    /// Creates a supervisor with the given loss policy.
    #[must_use]
    pub fn new(policy: LossPolicy) -> Self {
        Self {
            state: LinkState::NoLinkEverSeen,
            policy,
            last_frame_micros: None,
        }
    }

    /// Current link state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// True iff the link is currently untrusted.
    #[must_use]
    pub fn lost_signal(&self) -> bool {
        self.state == LinkState::LinkLost
    }

    /// Record a successfully decoded frame at `now_micros`.
    ///
    /// Brings the link up on the first frame ever. Under the timeout policy
    /// a frame arriving after `LinkLost` does *not* restore the link.
    pub fn frame_received(&mut self, now_micros: u64) {
        self.last_frame_micros = Some(now_micros);

        if self.state == LinkState::NoLinkEverSeen {
            info!("First frame decoded, link up");
            self.state = LinkState::LinkUp;
        }
    }

    /// Record a new client connecting (connection-oriented transports).
    ///
    /// Clears `LinkLost`; sustained frame arrival is then re-established by
    /// the client's own message stream.
    pub fn client_connected(&mut self) {
        if self.policy == LossPolicy::Disconnect && self.state == LinkState::LinkLost {
            info!("New client connected, link restored");
            self.state = LinkState::LinkUp;
        }
    }

    /// Record the client disconnecting (connection-oriented transports).
    pub fn client_disconnected(&mut self) {
        if self.policy == LossPolicy::Disconnect && self.state == LinkState::LinkUp {
            warn!("Client disconnected, link lost");
            self.state = LinkState::LinkLost;
        }
    }

    /// Evaluate elapsed-time loss at `now_micros`.
    ///
    /// Called once per control cycle from the polled context. Only the
    /// timeout policy observes the clock; disconnect-driven links are
    /// transitioned by their explicit events.
    pub fn check(&mut self, now_micros: u64) {
        let LossPolicy::Timeout { timeout_micros } = self.policy else {
            return;
        };

        if self.state != LinkState::LinkUp {
            return;
        }

        if let Some(last) = self.last_frame_micros {
            if now_micros.saturating_sub(last) > timeout_micros {
                warn!(
                    elapsed_micros = now_micros.saturating_sub(last),
                    timeout_micros, "Frame timeout, link lost"
                );
                self.state = LinkState::LinkLost;
            }
        }
    }
}
