//! The motion controller: starting a hop, completing a hop, and arriving
//! at a floor. These functions take the state block and timer handles
//! directly rather than being pure, because motion is inherently about
//! arming the travel timer — unlike [`crate::scheduler`] or [`crate::door`],
//! there is no useful pure core to extract here.

use crate::config::Config;
use crate::door;
use crate::event::{EventPayload, EventPublisher};
use crate::scheduler::{self, ScanDecision};
use crate::state::{Direction, EngineState};
use crate::timer::OneShotTimer;

/// Start a hop toward `target` in `direction`. Precondition: all doors
/// `Close`, `mode == Auto` (checked by the caller).
pub fn start(
    state: &mut EngineState,
    direction: Direction,
    travel_timer: &OneShotTimer,
    events: &EventPublisher,
    cfg: &Config,
) {
    if state.direction != direction {
        state.direction = direction;
        emit(state, events, EventPayload::DirectionChange(direction));
    }
    state.travel_in_progress = true;
    // Departing from rest always uses the edge duration.
    travel_timer.arm(cfg.travel_time_edge);
}

/// The single-floor hop armed by `start`/`on_travel_complete` has finished:
/// advance `floor`, then decide what happens next.
pub fn on_travel_complete(
    state: &mut EngineState,
    cfg: &Config,
    travel_timer: &OneShotTimer,
    door_timer: &OneShotTimer,
    events: &EventPublisher,
) {
    state.travel_in_progress = false;
    state.floor += match state.direction {
        Direction::Up => 1,
        Direction::Down => -1,
        Direction::None => 0,
    };
    emit(state, events, EventPayload::FloorChange(state.floor));

    if state.mode == crate::state::Mode::Emergency {
        // Defensive: a Fire can clear the timer's identity check just
        // before Emergency's critical section force-disarms the timer.
        // Land the hop already in flight, then stop without re-arming.
        state.direction = Direction::None;
        emit(state, events, EventPayload::DirectionChange(Direction::None));
        return;
    }

    if state.calls.contains(&state.floor) {
        // "Stop and arrive": the motion state machine goes Moving -> Idle,
        // but `direction` (the last committed heading) is left alone until
        // `step()` next re-evaluates with the doors back to Close.
        arrive(state, cfg, door_timer, events);
        return;
    }

    // The scheduler is only trusted to *continue* the current heading here.
    // A reversal is never taken mid-hop: it always stops first and lets the
    // idle engine (`step()`) restart it, one tick later, in the new heading.
    let continues = match scheduler::decide(state.floor, state.direction, &state.calls) {
        ScanDecision::Move { direction, target } if direction == state.direction => {
            Some(target)
        }
        _ => None,
    };

    match continues {
        Some(target) => {
            let one_hop = (target - state.floor).abs() == 1;
            travel_timer.arm(if one_hop { cfg.travel_time_edge } else { cfg.travel_time });
        }
        None => {
            state.direction = Direction::None;
            emit(state, events, EventPayload::DirectionChange(Direction::None));
        }
    }
}

/// Arrive at the current floor: open the configured side(s), drop the call,
/// emit `Arrived`, arm the door timer.
pub fn arrive(
    state: &mut EngineState,
    cfg: &Config,
    door_timer: &OneShotTimer,
    events: &EventPublisher,
) {
    let floor_config = cfg.floor_config(state.floor);
    state.calls.remove(&state.floor);

    emit(
        state,
        events,
        EventPayload::Arrived {
            floor: state.floor,
            open_door_side: floor_config.open_door_side,
        },
    );

    let outcome = door::open_on_arrival(&mut state.doors, floor_config, cfg);
    for (side, phase) in &outcome.changes {
        emit(
            state,
            events,
            EventPayload::DoorChange {
                side: *side,
                state: *phase,
            },
        );
    }
    if let Some(wait) = outcome.open_wait_time {
        state.open_wait_time = wait;
    }
    if let Some(rearm) = outcome.rearm {
        door_timer.arm(rearm);
    }
}

fn emit(state: &mut EngineState, events: &EventPublisher, payload: EventPayload) {
    if !events.emit(payload, state.dropped_events) {
        state.dropped_events += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DoorSide;
    use crate::event::EventPublisher;
    use crate::state::Mode;
    use crate::timer::OneShotTimer;
    use std::collections::HashMap;
    use std::time::Duration;

    fn cfg() -> Config {
        Config {
            id: None,
            min_floor: 1,
            max_floor: 10,
            initial_floor: 1,
            travel_time: Duration::from_secs(1),
            travel_time_edge: Duration::from_millis(1500),
            door_speed: Duration::from_millis(500),
            door_open_time: Duration::from_secs(3),
            door_reopen_time: Duration::from_secs(3),
            max_weight: 1000,
            floor_configs: HashMap::new(),
        }
    }

    #[test]
    fn start_sets_direction_and_emits_once() {
        let cfg = cfg();
        let mut state = EngineState::new(1, cfg.door_open_time);
        let (travel_timer, _rx) = OneShotTimer::new();
        let (events, sub) = EventPublisher::new();

        start(&mut state, Direction::Up, &travel_timer, &events, &cfg);

        assert_eq!(state.direction, Direction::Up);
        assert!(state.travel_in_progress);
        assert_eq!(sub.recv().unwrap().payload, EventPayload::DirectionChange(Direction::Up));
    }

    #[test]
    fn on_travel_complete_continues_same_heading_without_resetting_direction() {
        let cfg = cfg();
        let mut state = EngineState::new(1, cfg.door_open_time);
        state.direction = Direction::Up;
        state.calls.insert(8);
        let (travel_timer, _trx) = OneShotTimer::new();
        let (door_timer, _drx) = OneShotTimer::new();
        let (events, sub) = EventPublisher::new();

        on_travel_complete(&mut state, &cfg, &travel_timer, &door_timer, &events);

        assert_eq!(state.floor, 2);
        assert_eq!(state.direction, Direction::Up);
        assert_eq!(sub.recv().unwrap().payload, EventPayload::FloorChange(2));
        assert!(sub.try_recv().is_err(), "no DirectionChange while continuing");
    }

    #[test]
    fn on_travel_complete_stops_instead_of_reversing_mid_hop() {
        // Car moving up with nothing ahead but a call behind it: must stop
        // (direction -> None) rather than reverse mid-hop.
        let cfg = cfg();
        let mut state = EngineState::new(3, cfg.door_open_time);
        state.direction = Direction::Up;
        state.calls.insert(1);
        let (travel_timer, _trx) = OneShotTimer::new();
        let (door_timer, _drx) = OneShotTimer::new();
        let (events, sub) = EventPublisher::new();

        on_travel_complete(&mut state, &cfg, &travel_timer, &door_timer, &events);

        assert_eq!(state.floor, 4);
        assert_eq!(state.direction, Direction::None);
        let _ = sub.recv().unwrap(); // FloorChange(4)
        assert_eq!(sub.recv().unwrap().payload, EventPayload::DirectionChange(Direction::None));
    }

    #[test]
    fn on_travel_complete_arrives_without_resetting_direction_first() {
        let cfg = cfg();
        let mut state = EngineState::new(4, cfg.door_open_time);
        state.direction = Direction::Up;
        state.calls.insert(5);
        let (travel_timer, _trx) = OneShotTimer::new();
        let (door_timer, _drx) = OneShotTimer::new();
        let (events, sub) = EventPublisher::new();

        on_travel_complete(&mut state, &cfg, &travel_timer, &door_timer, &events);

        assert_eq!(state.floor, 5);
        assert!(state.calls.is_empty());
        // direction stays Up through arrival; step() retires it once doors close.
        assert_eq!(state.direction, Direction::Up);
        let _ = sub.recv().unwrap(); // FloorChange(5)
        assert_eq!(
            sub.recv().unwrap().payload,
            EventPayload::Arrived { floor: 5, open_door_side: crate::config::DoorSide::Front }
        );
    }

    #[test]
    fn emergency_mid_travel_lands_the_in_flight_hop_then_stops() {
        let cfg = cfg();
        let mut state = EngineState::new(3, cfg.door_open_time);
        state.direction = Direction::Up;
        state.mode = Mode::Emergency;
        let (travel_timer, _trx) = OneShotTimer::new();
        let (door_timer, _drx) = OneShotTimer::new();
        let (events, sub) = EventPublisher::new();

        on_travel_complete(&mut state, &cfg, &travel_timer, &door_timer, &events);

        assert_eq!(state.floor, 4);
        assert_eq!(state.direction, Direction::None);
        let _ = sub.recv().unwrap(); // FloorChange(4)
        assert_eq!(sub.recv().unwrap().payload, EventPayload::DirectionChange(Direction::None));
    }

    #[test]
    fn arrive_opens_configured_side_and_arms_door_timer() {
        let cfg = cfg();
        let mut state = EngineState::new(5, cfg.door_open_time);
        state.calls.insert(5);
        let (door_timer, drx) = OneShotTimer::new();
        let (events, sub) = EventPublisher::new();

        arrive(&mut state, &cfg, &door_timer, &events);

        assert!(state.calls.is_empty());
        assert_eq!(state.doors.front, crate::state::DoorPhase::Opening);
        assert_eq!(state.open_wait_time, cfg.door_open_time);
        assert!(drx.try_recv().is_err(), "timer armed, not yet fired");
        assert_eq!(sub.recv().unwrap().payload, EventPayload::Arrived { floor: 5, open_door_side: DoorSide::Front });
        assert_eq!(
            sub.recv().unwrap().payload,
            EventPayload::DoorChange { side: DoorSide::Front, state: crate::state::DoorPhase::Opening }
        );
    }
}
