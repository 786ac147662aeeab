//! The mutable state block, guarded by one lock in [`crate::engine::Engine`].

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::DoorSide;

/// Serializes as `"Up"`/`"Down"`/`"None"`, matching the wire state frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Auto,
    Manual,
    Moving,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorPhase {
    Close,
    Opening,
    Open,
    Closing,
}

/// Both car doors. `Front`/`Rear` are tracked independently; `Both` from
/// [`DoorSide`] expands to a pair of per-side operations at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doors {
    pub front: DoorPhase,
    pub rear: DoorPhase,
}

impl Default for Doors {
    fn default() -> Self {
        Doors {
            front: DoorPhase::Close,
            rear: DoorPhase::Close,
        }
    }
}

impl Doors {
    pub fn get(&self, side: DoorSide) -> DoorPhase {
        match side {
            DoorSide::Front | DoorSide::Both => self.front,
            DoorSide::Rear => self.rear,
        }
    }

    pub fn set(&mut self, side: DoorSide, phase: DoorPhase) {
        match side {
            DoorSide::Front => self.front = phase,
            DoorSide::Rear => self.rear = phase,
            DoorSide::Both => {
                self.front = phase;
                self.rear = phase;
            }
        }
    }

    pub fn all_close(&self) -> bool {
        self.front == DoorPhase::Close && self.rear == DoorPhase::Close
    }

    /// Iterate over the sides that are not `Close`, for applying a symmetric
    /// transition (e.g. both doors opened on arrival advance together).
    pub fn active_sides(&self) -> Vec<DoorSide> {
        let mut sides = Vec::new();
        if self.front != DoorPhase::Close {
            sides.push(DoorSide::Front);
        }
        if self.rear != DoorPhase::Close {
            sides.push(DoorSide::Rear);
        }
        sides
    }
}

/// The full mutable state block.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub floor: i64,
    pub direction: Direction,
    pub doors: Doors,
    pub weight: i64,
    pub mode: Mode,
    pub calls: BTreeSet<i64>,
    pub open_button_held: bool,
    pub open_wait_time: Duration,
    pub dropped_events: u64,
    /// `true` while a hop is in flight (motion in progress).
    pub travel_in_progress: bool,
}

impl EngineState {
    pub fn new(initial_floor: i64, door_open_time: Duration) -> Self {
        EngineState {
            floor: initial_floor,
            direction: Direction::None,
            doors: Doors::default(),
            weight: 0,
            mode: Mode::Auto,
            calls: BTreeSet::new(),
            open_button_held: false,
            open_wait_time: door_open_time,
            dropped_events: 0,
            travel_in_progress: false,
        }
    }

    pub fn overloaded(&self, max_weight: i64) -> bool {
        max_weight > 0 && self.weight > max_weight
    }
}

/// A deep, atomic snapshot of the engine's observable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub floor: i64,
    pub direction: Direction,
    pub doors: Doors,
    pub weight: i64,
    pub mode: Mode,
    pub call_floors: Vec<i64>,
    pub dropped_events: u64,
}

impl From<&EngineState> for Snapshot {
    fn from(state: &EngineState) -> Self {
        Snapshot {
            floor: state.floor,
            direction: state.direction,
            doors: state.doors,
            weight: state.weight,
            mode: state.mode,
            call_floors: state.calls.iter().copied().collect(),
            dropped_events: state.dropped_events,
        }
    }
}
