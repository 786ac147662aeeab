//! The event publisher: a bounded, non-blocking fan-out of state-change
//! notifications to every current subscriber. Dropping a slow subscriber's
//! events under backpressure is deliberate — events are a diagnostic side
//! channel, not a correctness channel, and a stuck observer must never be
//! able to stall the engine thread.

use std::sync::Mutex;

use chrono::Local;
use crossbeam_channel as cbc;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::DoorSide;
use crate::state::{DoorPhase, Direction, Mode};

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const DROP_WARN_THROTTLE: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType", content = "payload")]
pub enum EventPayload {
    FloorChange(i64),
    DirectionChange(Direction),
    DoorChange { side: DoorSide, state: DoorPhase },
    ModeChange(Mode),
    Arrived { floor: i64, open_door_side: DoorSide },
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub payload: EventPayload,
    /// Wall-clock time of emission, formatted `HH:MM:SS`.
    pub timestamp: String,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Event {
            payload,
            timestamp: Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

/// Owns the registry of subscriber channels and the dropped-event counter's
/// throttled warning cadence. `dropped_events` itself lives on
/// `EngineState`, shared across all subscribers; this publisher only
/// decides whether a send succeeded per subscriber.
///
/// Each `subscribe()` gets its own bounded channel rather than a clone of
/// one shared receiver — a `crossbeam_channel` receiver is a competing
/// consumer, so cloning it would split one event stream across observers
/// instead of delivering the full stream to each. A real fan-out needs a
/// registry of senders written to on every emission.
pub struct EventPublisher {
    subscribers: Mutex<Vec<cbc::Sender<Event>>>,
}

pub struct EventSubscription {
    rx: cbc::Receiver<Event>,
}

impl EventSubscription {
    pub fn recv(&self) -> Result<Event, cbc::RecvError> {
        self.rx.recv()
    }

    pub fn try_recv(&self) -> Result<Event, cbc::TryRecvError> {
        self.rx.try_recv()
    }

    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<Event, cbc::RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn iter(&self) -> cbc::Iter<'_, Event> {
        self.rx.iter()
    }
}

impl EventPublisher {
    pub fn new() -> (EventPublisher, EventSubscription) {
        let publisher = EventPublisher {
            subscribers: Mutex::new(Vec::new()),
        };
        let subscription = publisher.subscribe();
        (publisher, subscription)
    }

    /// Register a new, independent receiver: every subsequent `emit` is
    /// delivered to it (subject to its own backpressure), not shared with
    /// any other subscriber.
    pub fn subscribe(&self) -> EventSubscription {
        let (tx, rx) = cbc::bounded(EVENT_CHANNEL_CAPACITY);
        self.subscribers.lock().unwrap().push(tx);
        EventSubscription { rx }
    }

    /// Emit `payload` to every current subscriber, non-blocking. Returns
    /// `true` if every subscriber received it, `false` if at least one
    /// subscriber's sink was full and missed it. Caller is expected to bump
    /// `EngineState::dropped_events` on `false`, and to have produced
    /// `payload` while still holding the state lock, so ordering across
    /// callers is preserved.
    pub fn emit(&self, payload: EventPayload, dropped_so_far: u64) -> bool {
        let event = Event::new(payload);
        let mut subscribers = self.subscribers.lock().unwrap();
        let mut all_delivered = true;
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(cbc::TrySendError::Full(_)) => {
                all_delivered = false;
                true
            }
            Err(cbc::TrySendError::Disconnected(_)) => false,
        });

        if !all_delivered {
            let total = dropped_so_far + 1;
            if total == 1 || total % DROP_WARN_THROTTLE == 0 {
                warn!("event sink full, dropping event for a subscriber (dropped_events={total})");
            }
        }
        all_delivered
    }
}
