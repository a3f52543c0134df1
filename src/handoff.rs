//! # Frame Handoff Module
//!
//! Wait-free single-producer/single-consumer handoff between the
//! input-arrival context and the control-loop context.
//!
//! The input-arrival context (interrupt trampoline or socket read task)
//! frequently runs at higher priority than the control loop, so neither
//! side may take a lock the other could hold. The handoff is a classic
//! triple buffer: the producer always has a private slot to write, the
//! consumer always has a private slot to read, and an atomic exchange of
//! the third slot publishes each completed frame. A consumer therefore
//! observes either a fully-formed frame or the previous one, never a
//! partially overwritten vector.
//!
//! The producer handle is the one registered handle passed explicitly into
//! the input callback; its lifetime is tied to the single receiver instance
//! per physical port.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::decoder::RawChannels;

/// Bit set in `latest` while the published slot holds an unconsumed frame.
const FRESH_BIT: usize = 0b100;

/// Mask extracting the slot index from `latest`.
const INDEX_MASK: usize = 0b011;

/// Shared triple-buffer state.
///
/// `latest` holds the index of the most recently published slot plus the
/// fresh bit. The producer and consumer each own one of the remaining two
/// slots exclusively between exchanges.
struct FrameSlotShared {
    slots: [UnsafeCell<RawChannels>; 3],
    latest: AtomicUsize,
}

// SAFETY: the triple-buffer protocol guarantees each slot is owned by
// exactly one side at a time. The producer writes only its private slot and
// publishes it with a Release exchange; the consumer claims the published
// slot with an Acquire exchange before reading it. The exchanges provide
// the synchronization barrier between the write and the read.
unsafe impl Sync for FrameSlotShared {}
unsafe impl Send for FrameSlotShared {}

/// Producer half of the frame handoff.
///
/// Owned by the input-arrival context. Publishing never blocks and never
/// allocates.
pub struct FrameProducer {
    shared: Arc<FrameSlotShared>,
    write_idx: usize,
}

impl FrameProducer {
    /// Publish a completed frame, replacing any unconsumed one.
    ///
    /// A frame the control loop never got around to reading is stale input;
    /// the newest frame always wins.
    pub fn publish(&mut self, frame: RawChannels) {
        // SAFETY: `write_idx` is owned exclusively by this producer until
        // the exchange below hands it to the consumer side.
        unsafe {
            *self.shared.slots[self.write_idx].get() = frame;
        }

        let previous = self
            .shared
            .latest
            .swap(self.write_idx | FRESH_BIT, Ordering::AcqRel);
        self.write_idx = previous & INDEX_MASK;
    }
}

/// Consumer half of the frame handoff.
///
/// Owned by the control-loop context.
pub struct FrameConsumer {
    shared: Arc<FrameSlotShared>,
    read_idx: usize,
}

impl FrameConsumer {
    /// Take the most recently published frame, if one arrived since the
    /// last call.
    pub fn take(&mut self) -> Option<RawChannels> {
        if self.shared.latest.load(Ordering::Acquire) & FRESH_BIT == 0 {
            return None;
        }

        let previous = self.shared.latest.swap(self.read_idx, Ordering::AcqRel);
        if previous & FRESH_BIT == 0 {
            // Raced with nothing: only this consumer clears the bit, so the
            // load above already claimed it. Unreachable in SPSC use.
            self.read_idx = previous & INDEX_MASK;
            return None;
        }

        self.read_idx = previous & INDEX_MASK;

        // SAFETY: the exchange transferred exclusive ownership of
        // `read_idx` to this consumer; the producer no longer writes it.
        let frame = unsafe { *self.shared.slots[self.read_idx].get() };
        Some(frame)
    }
}

/// Creates a connected producer/consumer pair for frames of
/// `channel_count` channels.
#[must_use]
pub fn frame_handoff(channel_count: usize) -> (FrameProducer, FrameConsumer) {
    let shared = Arc::new(FrameSlotShared {
        slots: [
            UnsafeCell::new(RawChannels::zeroed(channel_count)),
            UnsafeCell::new(RawChannels::zeroed(channel_count)),
            UnsafeCell::new(RawChannels::zeroed(channel_count)),
        ],
        latest: AtomicUsize::new(0),
    });

    (
        FrameProducer {
            shared: Arc::clone(&shared),
            write_idx: 1,
        },
        FrameConsumer {
            shared,
            read_idx: 2,
        },
    )
}

/// Shared connection-lifecycle state for connection-oriented transports.
///
/// The feed context flips `connected` and counts disconnects; the poll
/// context drains them once per cycle. Counting disconnects (rather than
/// sharing only the boolean) ensures a disconnect-reconnect sequence
/// inside one control cycle is still observed as a loss.
struct LinkEventShared {
    connected: AtomicBool,
    disconnects: AtomicU32,
}

/// Feed-context half of the link event channel.
pub struct LinkEventSender {
    shared: Arc<LinkEventShared>,
}

impl LinkEventSender {
    /// Record a client connecting.
    pub fn note_connected(&self) {
        self.shared.connected.store(true, Ordering::Release);
    }

    /// Record the client disconnecting.
    pub fn note_disconnected(&self) {
        self.shared.connected.store(false, Ordering::Release);
        self.shared.disconnects.fetch_add(1, Ordering::AcqRel);
    }
}

/// Poll-context half of the link event channel.
pub struct LinkEventReader {
    shared: Arc<LinkEventShared>,
    seen_disconnects: u32,
}

/// Connection lifecycle observed over one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEventSnapshot {
    /// At least one disconnect happened since the previous poll.
    pub disconnect_seen: bool,
    /// A client is connected right now.
    pub connected: bool,
}

impl LinkEventReader {
    /// Drain lifecycle events accumulated since the previous call.
    pub fn poll_events(&mut self) -> LinkEventSnapshot {
        let disconnects = self.shared.disconnects.load(Ordering::Acquire);
        let disconnect_seen = disconnects != self.seen_disconnects;
        self.seen_disconnects = disconnects;

        LinkEventSnapshot {
            disconnect_seen,
            connected: self.shared.connected.load(Ordering::Acquire),
        }
    }
}

/// Creates a connected link-event sender/reader pair.
#[must_use]
pub fn link_events() -> (LinkEventSender, LinkEventReader) {
    let shared = Arc::new(LinkEventShared {
        connected: AtomicBool::new(false),
        disconnects: AtomicU32::new(0),
    });

    (
        LinkEventSender {
            shared: Arc::clone(&shared),
        },
        LinkEventReader {
            shared,
            seen_disconnects: 0,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    // ==================== Frame Slot Tests ====================

    #[test]
    fn test_empty_slot_yields_none() {
        let (_producer, mut consumer) = frame_handoff(6);
        assert_eq!(consumer.take(), None);
    }

    #[test]
    fn test_publish_then_take() {
        let (mut producer, mut consumer) = frame_handoff(6);
        let frame = RawChannels::from_slice(&[0.5, -0.5, 0.25, -0.25, 1.0, 0.0]);

        producer.publish(frame);
        assert_eq!(consumer.take(), Some(frame));
    }

    #[test]
    fn test_take_consumes_freshness() {
        let (mut producer, mut consumer) = frame_handoff(6);
        producer.publish(RawChannels::from_slice(&[0.1; 6]));

        assert!(consumer.take().is_some());
        assert_eq!(consumer.take(), None);
    }

    #[test]
    fn test_newest_frame_wins() {
        let (mut producer, mut consumer) = frame_handoff(6);
        producer.publish(RawChannels::from_slice(&[0.1; 6]));
        producer.publish(RawChannels::from_slice(&[0.2; 6]));
        producer.publish(RawChannels::from_slice(&[0.3; 6]));

        assert_eq!(consumer.take(), Some(RawChannels::from_slice(&[0.3; 6])));
        assert_eq!(consumer.take(), None);
    }

    #[test]
    fn test_cross_thread_handoff() {
        let (mut producer, mut consumer) = frame_handoff(6);

        let writer = thread::spawn(move || {
            for i in 0..1_000u32 {
                let value = i as f32;
                producer.publish(RawChannels::from_slice(&[value; 6]));
            }
        });

        // The writer's final frame stays fresh until consumed, so this
        // terminates once 999.0 is observed.
        let mut last_seen = -1.0f32;
        while last_seen < 999.0 {
            if let Some(frame) = consumer.take() {
                let value = frame.get(0).unwrap();
                // Frames are fully formed and move forward, never backward.
                assert_eq!(frame.as_slice(), &[value; 6], "torn frame observed");
                assert!(value > last_seen, "stale frame observed");
                last_seen = value;
            } else {
                thread::yield_now();
            }
        }

        writer.join().unwrap();
    }

    // ==================== Link Event Tests ====================

    #[test]
    fn test_no_events_initially() {
        let (_sender, mut reader) = link_events();
        let snapshot = reader.poll_events();
        assert!(!snapshot.disconnect_seen);
        assert!(!snapshot.connected);
    }

    #[test]
    fn test_connect_visible_to_reader() {
        let (sender, mut reader) = link_events();
        sender.note_connected();

        let snapshot = reader.poll_events();
        assert!(snapshot.connected);
        assert!(!snapshot.disconnect_seen);
    }

    #[test]
    fn test_disconnect_seen_once() {
        let (sender, mut reader) = link_events();
        sender.note_connected();
        sender.note_disconnected();

        let snapshot = reader.poll_events();
        assert!(snapshot.disconnect_seen);
        assert!(!snapshot.connected);

        // Drained; not reported again.
        let snapshot = reader.poll_events();
        assert!(!snapshot.disconnect_seen);
    }

    #[test]
    fn test_disconnect_reconnect_within_one_cycle() {
        let (sender, mut reader) = link_events();
        sender.note_connected();
        assert!(reader.poll_events().connected);

        sender.note_disconnected();
        sender.note_connected();

        // The transient loss is still observed even though a client is back.
        let snapshot = reader.poll_events();
        assert!(snapshot.disconnect_seen);
        assert!(snapshot.connected);
    }
}
