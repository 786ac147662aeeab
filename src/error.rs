//! Error kinds surfaced to callers of the engine.
//!
//! The engine never panics on caller input: configuration mistakes and
//! invalid commands come back as `Err`, not a process exit. Event
//! backpressure is not an error at all — it increments `dropped_events` and
//! logs, see [`crate::event`].

use thiserror::Error;

/// Raised by [`crate::Engine::start`] when the supplied configuration is
/// invalid. The engine does not start.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("min_floor ({min_floor}) is greater than max_floor ({max_floor})")]
    InvertedFloorRange { min_floor: i64, max_floor: i64 },

    #[error("initial_floor ({initial_floor}) is outside [{min_floor}, {max_floor}]")]
    InitialFloorOutOfRange {
        initial_floor: i64,
        min_floor: i64,
        max_floor: i64,
    },
}

/// Raised by command-surface calls. No state change accompanies an `Err`.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CommandError {
    #[error("floor {floor} is outside [{min_floor}, {max_floor}]")]
    FloorOutOfRange {
        floor: i64,
        min_floor: i64,
        max_floor: i64,
    },

    #[error("floor {floor} is not accessible")]
    FloorInaccessible { floor: i64 },
}
