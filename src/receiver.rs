//! # Receiver Facade Module
//!
//! The single interface the control loop polls once per cycle.
//!
//! A receiver is built in two halves joined by the wait-free frame handoff:
//!
//! - a [`FeedHandle`] owned by the input-arrival context (interrupt
//!   trampoline or socket read task), which runs the transport decoder and
//!   publishes each validated frame;
//! - the [`Receiver`] owned by the control-loop context, which drains
//!   published frames, applies the channel map and demand scale, and keeps
//!   the link supervisor current.
//!
//! Per control cycle the consumer calls, in order: [`Receiver::poll`],
//! [`Receiver::demands`], [`Receiver::lost_signal`]. When the signal is
//! lost, `demands` keeps returning the last known values: the consumer, not
//! the facade, decides what failsafe demand set to substitute.

use crate::clock::MonotonicClock;
use crate::config::ReceiverConfig;
use crate::decoder::message::MessageDecoder;
use crate::decoder::stream::StreamDecoder;
use crate::decoder::{DecoderStats, FrameDecoder};
use crate::error::{RcLinkError, Result};
use crate::handoff::{
    frame_handoff, link_events, FrameConsumer, FrameProducer, LinkEventReader, LinkEventSender,
};
use crate::mapper::{map_channels, ChannelMap, DemandVector};
use crate::protocol::MSG_RC_CHANNEL_COUNT;
use crate::supervisor::{LinkState, LinkSupervisor, LossPolicy};

/// Input-arrival half of a receiver.
///
/// Owns the transport decoder and the producer side of the frame handoff.
/// `feed` must be driven by the byte source's push callback; it never
/// blocks and never allocates.
pub struct FeedHandle<D: FrameDecoder> {
    decoder: D,
    producer: FrameProducer,
    events: Option<LinkEventSender>,
}

/// Feed handle for the streaming binary transport.
pub type StreamFeed = FeedHandle<StreamDecoder>;

/// Feed handle for the connection-oriented command transport.
pub type MessageFeed = FeedHandle<MessageDecoder>;

impl<D: FrameDecoder> FeedHandle<D> {
    /// Consume one raw input byte, publishing any frame it completes.
    pub fn feed(&mut self, byte: u8) {
        self.decoder.feed(byte);
        if self.decoder.frame_ready() {
            self.producer.publish(self.decoder.take_frame());
        }
    }

    /// Consume a run of raw input bytes.
    pub fn feed_all(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.feed(byte);
        }
    }
}

impl FeedHandle<StreamDecoder> {
    /// Decoder counters for status reporting.
    #[must_use]
    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }
}

impl FeedHandle<MessageDecoder> {
    /// Report that a command client connected.
    pub fn client_connected(&mut self) {
        self.decoder.client_connected();
        if let Some(events) = &self.events {
            events.note_connected();
        }
    }

    /// Report that the command client disconnected.
    pub fn client_disconnected(&mut self) {
        self.decoder.client_disconnected();
        if let Some(events) = &self.events {
            events.note_disconnected();
        }
    }

    /// Decoder counters for status reporting.
    #[must_use]
    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }
}

/// Control-loop half of a receiver.
///
/// Exclusively owns the channel map, demand buffer and link supervisor.
pub struct Receiver<C: MonotonicClock> {
    frames: FrameConsumer,
    events: Option<LinkEventReader>,
    map: ChannelMap,
    demand_scale: f32,
    supervisor: LinkSupervisor,
    clock: C,
    demands: DemandVector,
}

impl<C: MonotonicClock> Receiver<C> {
    /// Builds a receiver for the streaming binary transport.
    ///
    /// # Arguments
    ///
    /// * `config` - Immutable receiver parameters
    /// * `clock` - Monotonic clock used for timeout supervision
    ///
    /// # Returns
    ///
    /// The control-loop facade plus the feed handle to hand to the serial
    /// byte source.
    ///
    /// # Errors
    ///
    /// Returns [`RcLinkError::Config`] for an invalid channel count,
    /// channel map, or demand scale.
    pub fn stream(config: &ReceiverConfig, clock: C) -> Result<(Self, StreamFeed)> {
        let decoder = StreamDecoder::new(config.channel_count)?;
        Self::build(
            config,
            clock,
            decoder,
            LossPolicy::Timeout {
                timeout_micros: config.failsafe_timeout_ms * 1_000,
            },
            false,
        )
    }

    /// Builds a receiver for the connection-oriented command transport.
    ///
    /// # Errors
    ///
    /// Returns [`RcLinkError::Config`] if the configured channel count does
    /// not match the six channels a command message carries, or for an
    /// invalid channel map or demand scale.
    pub fn message(config: &ReceiverConfig, clock: C) -> Result<(Self, MessageFeed)> {
        if config.channel_count != MSG_RC_CHANNEL_COUNT {
            return Err(RcLinkError::Config(format!(
                "Command transport carries {} channels, configured for {}",
                MSG_RC_CHANNEL_COUNT, config.channel_count
            )));
        }

        let decoder = MessageDecoder::new();
        Self::build(config, clock, decoder, LossPolicy::Disconnect, true)
    }

    fn build<D: FrameDecoder>(
        config: &ReceiverConfig,
        clock: C,
        decoder: D,
        policy: LossPolicy,
        with_events: bool,
    ) -> Result<(Self, FeedHandle<D>)> {
        let map = ChannelMap::new(&config.channel_map, config.channel_count)?;

        if !config.demand_scale.is_finite() || config.demand_scale == 0.0 {
            return Err(RcLinkError::Config(format!(
                "Demand scale {} must be finite and non-zero",
                config.demand_scale
            )));
        }

        let (producer, consumer) = frame_handoff(config.channel_count);
        let (event_sender, event_reader) = if with_events {
            let (sender, reader) = link_events();
            (Some(sender), Some(reader))
        } else {
            (None, None)
        };

        let demands = DemandVector::zeroed(map.len());

        Ok((
            Self {
                frames: consumer,
                events: event_reader,
                map,
                demand_scale: config.demand_scale,
                supervisor: LinkSupervisor::new(policy),
                clock,
                demands,
            },
            FeedHandle {
                decoder,
                producer,
                events: event_sender,
            },
        ))
    }

    /// Drain buffered frames and refresh link supervision.
    ///
    /// Called once per control cycle. Returns whether a new demand vector
    /// was produced this cycle; `false` on a cycle with no new input is
    /// normal, not an error.
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now_micros();

        let mut fresh = false;
        while let Some(raw) = self.frames.take() {
            self.demands = map_channels(&raw, &self.map, self.demand_scale);
            self.supervisor.frame_received(now);
            fresh = true;
        }

        // Lifecycle events are applied after the frames that preceded them:
        // bytes a client sent before disconnecting were decoded above, and
        // the disconnect still overrides frame freshness.
        if let Some(events) = &mut self.events {
            let snapshot = events.poll_events();
            if snapshot.disconnect_seen {
                self.supervisor.client_disconnected();
            }
            if snapshot.connected {
                self.supervisor.client_connected();
            }
        }

        self.supervisor.check(now);
        fresh
    }

    /// Most recently computed demand vector.
    ///
    /// Stable across cycles without new frames, including while the signal
    /// is lost; the facade never fabricates zeroed or synthetic demands.
    #[must_use]
    pub fn demands(&self) -> &DemandVector {
        &self.demands
    }

    /// True iff the link supervisor has declared the link untrusted.
    #[must_use]
    pub fn lost_signal(&self) -> bool {
        self.supervisor.lost_signal()
    }

    /// Current link supervision state.
    #[must_use]
    pub fn link_state(&self) -> LinkState {
        self.supervisor.state()
    }
}
