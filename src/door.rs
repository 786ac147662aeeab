//! The door state machine: `Close -> Opening -> Open -> Closing -> Close`,
//! with the reopen (`Closing -> Opening`) and hold/overload guards. These
//! functions are pure over their explicit arguments — no lock, no timer, no
//! channel — so the transition table can be unit-tested directly by calling
//! them and inspecting the returned [`Outcome`].

use std::time::Duration;

use crate::config::{Config, DoorSide, FloorConfig};
use crate::state::{DoorPhase, Doors};

/// What a transition did: the sides whose phase changed (in the order they
/// should be emitted as `DoorChange` events) and what, if anything, the
/// door timer should be rearmed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub changes: Vec<(DoorSide, DoorPhase)>,
    pub rearm: Option<Duration>,
    /// Set when the transition also pins `open_wait_time` to
    /// `door_reopen_time`: a button-triggered reopen or hold always uses
    /// the reopen hold, never the (usually longer) arrival hold.
    pub open_wait_time: Option<Duration>,
}

impl Outcome {
    fn none() -> Self {
        Outcome {
            changes: Vec::new(),
            rearm: None,
            open_wait_time: None,
        }
    }
}

/// Doors opening on arrival: sets the floor's configured side(s) to
/// `Opening`, arms for `door_speed`.
pub fn open_on_arrival(doors: &mut Doors, floor_config: FloorConfig, cfg: &Config) -> Outcome {
    let mut changes = Vec::new();
    for side in expand(floor_config.open_door_side) {
        doors.set(side, DoorPhase::Opening);
        changes.push((side, DoorPhase::Opening));
    }
    Outcome {
        changes,
        rearm: Some(cfg.door_speed),
        open_wait_time: Some(cfg.door_open_time),
    }
}

/// The door timer fired. Every currently-active side advances together,
/// since both sides on a symmetric transition share one timer.
pub fn on_timer_fired(
    doors: &mut Doors,
    open_wait_time: Duration,
    weight: i64,
    held: bool,
    cfg: &Config,
) -> Outcome {
    let active = doors.active_sides();
    if active.is_empty() {
        return Outcome::none();
    }
    // All active sides share one timer and therefore one current phase.
    let phase = doors.get(active[0]);
    let overloaded = cfg.max_weight > 0 && weight > cfg.max_weight;

    match phase {
        DoorPhase::Opening => {
            let changes = advance(doors, &active, DoorPhase::Open);
            Outcome {
                changes,
                rearm: Some(open_wait_time),
                open_wait_time: None,
            }
        }
        DoorPhase::Open if held || overloaded => {
            // Stay open; held takes the reopen hold, overload-only keeps
            // whatever hold is already in effect.
            let new_wait = if held { Some(cfg.door_reopen_time) } else { None };
            Outcome {
                changes: Vec::new(),
                rearm: Some(new_wait.unwrap_or(open_wait_time)),
                open_wait_time: new_wait,
            }
        }
        DoorPhase::Open => {
            let changes = advance(doors, &active, DoorPhase::Closing);
            Outcome {
                changes,
                rearm: Some(cfg.door_speed),
                open_wait_time: None,
            }
        }
        DoorPhase::Closing => {
            let changes = advance(doors, &active, DoorPhase::Close);
            Outcome {
                changes,
                rearm: None,
                open_wait_time: None,
            }
        }
        DoorPhase::Close => Outcome::none(),
    }
}

/// OPEN button pressed: reopens from `Closing`, reopens from idle `Close`
/// (only meaningful when the car is not moving — the engine checks
/// `direction == None` before calling this for the idle-close case), or
/// just refreshes the hold while already `Open`.
pub fn on_open_pressed(doors: &mut Doors, idle_floor_config: FloorConfig, cfg: &Config) -> Outcome {
    let active = doors.active_sides();

    if active.is_empty() {
        // Close, idle: open the side(s) configured for the current floor.
        let mut changes = Vec::new();
        for side in expand(idle_floor_config.open_door_side) {
            doors.set(side, DoorPhase::Opening);
            changes.push((side, DoorPhase::Opening));
        }
        return Outcome {
            changes,
            rearm: Some(cfg.door_speed),
            open_wait_time: Some(cfg.door_reopen_time),
        };
    }

    let phase = doors.get(active[0]);
    match phase {
        DoorPhase::Closing => {
            let changes = advance(doors, &active, DoorPhase::Opening);
            Outcome {
                changes,
                rearm: Some(cfg.door_speed),
                open_wait_time: Some(cfg.door_reopen_time),
            }
        }
        DoorPhase::Open => Outcome {
            changes: Vec::new(),
            rearm: Some(cfg.door_reopen_time),
            open_wait_time: Some(cfg.door_reopen_time),
        },
        DoorPhase::Opening | DoorPhase::Close => Outcome::none(),
    }
}

/// OPEN button released while doors are `Open`: the hold countdown starts
/// now, using `door_reopen_time`.
pub fn on_open_released(doors: &Doors, cfg: &Config) -> Option<Duration> {
    if doors.front == DoorPhase::Open || doors.rear == DoorPhase::Open {
        Some(cfg.door_reopen_time)
    } else {
        None
    }
}

/// CLOSE button pressed while `Open` and not held: close immediately,
/// bypassing the remaining hold, unless the car is overloaded — same guard
/// as the timer-fired path, since this is just another way to reach an
/// `Open -> Closing` transition.
pub fn on_close_pressed(doors: &mut Doors, held: bool, weight: i64, cfg: &Config) -> Outcome {
    if held {
        return Outcome::none();
    }
    let active = doors.active_sides();
    if active.is_empty() || doors.get(active[0]) != DoorPhase::Open {
        return Outcome::none();
    }
    if cfg.max_weight > 0 && weight > cfg.max_weight {
        return Outcome::none();
    }
    let changes = advance(doors, &active, DoorPhase::Closing);
    Outcome {
        changes,
        rearm: Some(cfg.door_speed),
        open_wait_time: None,
    }
}

fn advance(doors: &mut Doors, sides: &[DoorSide], to: DoorPhase) -> Vec<(DoorSide, DoorPhase)> {
    sides
        .iter()
        .map(|&side| {
            doors.set(side, to);
            (side, to)
        })
        .collect()
}

pub(crate) fn expand(side: DoorSide) -> Vec<DoorSide> {
    match side {
        DoorSide::Both => vec![DoorSide::Front, DoorSide::Rear],
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn opening_then_open_then_closing_then_close() {
        let cfg = cfg();
        let mut doors = Doors::default();
        let o = open_on_arrival(&mut doors, FloorConfig::default(), &cfg);
        assert_eq!(doors.front, DoorPhase::Opening);
        assert_eq!(o.rearm, Some(cfg.door_speed));

        let o = on_timer_fired(&mut doors, o.open_wait_time.unwrap(), 0, false, &cfg);
        assert_eq!(doors.front, DoorPhase::Open);
        assert_eq!(o.rearm, Some(cfg.door_open_time));

        let o = on_timer_fired(&mut doors, cfg.door_open_time, 0, false, &cfg);
        assert_eq!(doors.front, DoorPhase::Closing);
        assert_eq!(o.rearm, Some(cfg.door_speed));

        let o = on_timer_fired(&mut doors, cfg.door_speed, 0, false, &cfg);
        assert_eq!(doors.front, DoorPhase::Close);
        assert_eq!(o.rearm, None);
    }

    #[test]
    fn overload_blocks_closing_until_cleared() {
        let cfg = cfg();
        let mut doors = Doors::default();
        doors.front = DoorPhase::Open;

        let o = on_timer_fired(&mut doors, cfg.door_open_time, 1500, false, &cfg);
        assert_eq!(doors.front, DoorPhase::Open);
        assert!(o.changes.is_empty());

        let o = on_timer_fired(&mut doors, cfg.door_open_time, 900, false, &cfg);
        assert_eq!(doors.front, DoorPhase::Closing);
        assert_eq!(o.rearm, Some(cfg.door_speed));
    }

    #[test]
    fn held_blocks_closing_and_uses_reopen_time() {
        let cfg = cfg();
        let mut doors = Doors::default();
        doors.front = DoorPhase::Open;

        let o = on_timer_fired(&mut doors, cfg.door_open_time, 0, true, &cfg);
        assert_eq!(doors.front, DoorPhase::Open);
        assert_eq!(o.open_wait_time, Some(cfg.door_reopen_time));
    }

    #[test]
    fn reopen_on_closing() {
        let cfg = cfg();
        let mut doors = Doors::default();
        doors.front = DoorPhase::Closing;

        let o = on_open_pressed(&mut doors, FloorConfig::default(), &cfg);
        assert_eq!(doors.front, DoorPhase::Opening);
        assert_eq!(o.open_wait_time, Some(cfg.door_reopen_time));
    }

    #[test]
    fn open_press_while_idle_close_opens_configured_side() {
        let cfg = cfg();
        let mut doors = Doors::default();
        let fc = FloorConfig {
            accessible: true,
            open_door_side: crate::config::DoorSide::Rear,
        };
        let o = on_open_pressed(&mut doors, fc, &cfg);
        assert_eq!(doors.rear, DoorPhase::Opening);
        assert_eq!(doors.front, DoorPhase::Close);
        assert_eq!(o.rearm, Some(cfg.door_speed));
    }

    #[test]
    fn close_press_ignored_while_held() {
        let cfg = cfg();
        let mut doors = Doors::default();
        doors.front = DoorPhase::Open;
        let o = on_close_pressed(&mut doors, true, 0, &cfg);
        assert_eq!(doors.front, DoorPhase::Open);
        assert!(o.changes.is_empty());
    }

    #[test]
    fn close_press_closes_immediately() {
        let cfg = cfg();
        let mut doors = Doors::default();
        doors.front = DoorPhase::Open;
        let o = on_close_pressed(&mut doors, false, 0, &cfg);
        assert_eq!(doors.front, DoorPhase::Closing);
        assert_eq!(o.rearm, Some(cfg.door_speed));
    }

    #[test]
    fn close_press_refused_while_overloaded() {
        let cfg = cfg();
        let mut doors = Doors::default();
        doors.front = DoorPhase::Open;
        let o = on_close_pressed(&mut doors, false, cfg.max_weight + 1, &cfg);
        assert_eq!(doors.front, DoorPhase::Open);
        assert!(o.changes.is_empty());
    }

    #[test]
    fn release_while_open_restarts_hold_from_release() {
        let cfg = cfg();
        let mut doors = Doors::default();
        doors.front = DoorPhase::Open;
        assert_eq!(on_open_released(&doors, &cfg), Some(cfg.door_reopen_time));

        doors.front = DoorPhase::Close;
        assert_eq!(on_open_released(&doors, &cfg), None);
    }
}
