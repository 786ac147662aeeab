//! A single-car elevator engine: a SCAN scheduler, a door state machine, a
//! bounded event publisher, and a lock-guarded command surface driven by
//! one background loop. Internal modules stay private; the types callers
//! actually need come out through this facade.

mod config;
mod door;
mod engine;
mod error;
mod event;
pub mod logging;
mod motion;
mod scheduler;
mod state;
mod timer;
pub mod wire;

pub use config::{load_config_file, Config, DoorSide, FloorConfig, RawConfig};
pub use engine::Engine;
pub use error::{CommandError, ConfigError};
pub use event::{Event, EventPayload, EventSubscription};
pub use state::{DoorPhase, Doors, Direction, Mode, Snapshot};
