//! JSON wire types for the external transport. The core never opens a
//! socket — this module only documents and types the frames a
//! JSON-over-WebSocket layer built on top of [`crate::Engine`] would send
//! and receive, so that such a layer (and anything testing against it)
//! shares one definition of the wire format instead of re-deriving it.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::config::{DoorSide, RawConfig};
use crate::event::Event;
use crate::state::{Doors, Mode};

/// One client → server frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action")]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Init { config: RawConfig },
    AddCall { floor: i64 },
    RemoveCall { floor: i64 },
    PressOpen,
    ReleaseOpen,
    PressClose,
    SetMode { mode: WireMode },
    AddWeight { weight: i64 },
    SetWeight { weight: i64 },
    Reset,
    Stop,
    GetState,
}

/// `setMode`'s wire encoding is the numeric `0|1|2|3`, not the lowercase
/// string [`Mode`] otherwise serializes to — `serde_repr` derives
/// Serialize/Deserialize straight off the `#[repr(u8)]` discriminant instead
/// of the variant name, so `{"mode":3}` round-trips as a plain integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum WireMode {
    Auto = 0,
    Manual = 1,
    Moving = 2,
    Emergency = 3,
}

impl From<WireMode> for Mode {
    fn from(mode: WireMode) -> Self {
        match mode {
            WireMode::Auto => Mode::Auto,
            WireMode::Manual => Mode::Manual,
            WireMode::Moving => Mode::Moving,
            WireMode::Emergency => Mode::Emergency,
        }
    }
}

impl From<Mode> for WireMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Auto => WireMode::Auto,
            Mode::Manual => WireMode::Manual,
            Mode::Moving => WireMode::Moving,
            Mode::Emergency => WireMode::Emergency,
        }
    }
}

/// Server → client state frame: sent after every event and on demand
/// (`getState`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub floor: i64,
    pub direction: crate::state::Direction,
    pub doors: Doors,
    pub mode: WireMode,
    pub call_floors: Vec<i64>,
    pub weight: i64,
    pub max_weight: i64,
}

impl StateFrame {
    pub fn from_snapshot(snapshot: &crate::state::Snapshot, max_weight: i64) -> Self {
        StateFrame {
            frame_type: "state",
            floor: snapshot.floor,
            direction: snapshot.direction,
            doors: snapshot.doors,
            mode: snapshot.mode.into(),
            call_floors: snapshot.call_floors.clone(),
            weight: snapshot.weight,
            max_weight,
        }
    }
}

/// Server → client event frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    #[serde(flatten)]
    pub event: Event,
}

impl From<Event> for EventFrame {
    fn from(event: Event) -> Self {
        EventFrame {
            frame_type: "event",
            event,
        }
    }
}

/// Translate a parsed [`ClientMessage`] into a call against an [`Engine`](crate::Engine).
/// Returns `Err` for anything the lock-based command surface itself
/// rejects; a transport layer is responsible for frames that fail to parse
/// at all, which never reach this function.
pub fn dispatch(engine: &crate::Engine, message: ClientMessage) -> Result<(), crate::error::CommandError> {
    match message {
        ClientMessage::Init { .. } => {
            // `init` builds a new engine rather than mutating one in place;
            // a transport layer calls `Engine::start` itself and swaps the
            // handle it holds. Nothing to dispatch against an existing one.
        }
        ClientMessage::AddCall { floor } => engine.add_call(floor)?,
        ClientMessage::RemoveCall { floor } => engine.remove_call(floor),
        ClientMessage::PressOpen => engine.press_open(),
        ClientMessage::ReleaseOpen => engine.release_open(),
        ClientMessage::PressClose => engine.press_close(),
        ClientMessage::SetMode { mode } => engine.set_mode(mode.into()),
        ClientMessage::AddWeight { weight } => engine.add_weight(weight),
        ClientMessage::SetWeight { weight } => engine.set_weight(weight),
        ClientMessage::Reset => engine.reset(),
        ClientMessage::Stop => engine.stop(),
        ClientMessage::GetState => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_call_frame() {
        let json = r#"{"action":"addCall","floor":5}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::AddCall { floor: 5 }));
    }

    #[test]
    fn parses_set_mode_frame_numerically() {
        let json = r#"{"action":"setMode","mode":3}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::SetMode { mode } => assert_eq!(mode, WireMode::Emergency),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn state_frame_round_trips_through_json() {
        let snapshot = crate::state::Snapshot {
            floor: 3,
            direction: crate::state::Direction::Up,
            doors: Doors { front: crate::state::DoorPhase::Close, rear: crate::state::DoorPhase::Close },
            weight: 10,
            mode: Mode::Auto,
            call_floors: vec![5, 7],
            dropped_events: 0,
        };
        let frame = StateFrame::from_snapshot(&snapshot, 1000);
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"type\":\"state\""));
        assert!(json.contains("\"callFloors\":[5,7]"));
    }
}
