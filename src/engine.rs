//! The engine loop and lifecycle, and the public handle ([`Engine`]) that
//! owns it: one background thread runs a `cbc::select!` over timers and a
//! cancellation channel, while external callers mutate state only through
//! a single shared lock — one lock means no lock-ordering hazard.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel as cbc;
use log::{info, warn};

use crate::config::{Config, DoorSide, RawConfig};
use crate::door;
use crate::error::{CommandError, ConfigError};
use crate::event::{EventPayload, EventPublisher, EventSubscription};
use crate::scheduler::{self, ScanDecision};
use crate::state::{DoorPhase, Direction, EngineState, Mode, Snapshot};
use crate::timer::OneShotTimer;

/// How often the loop wakes up even if nothing else fired, so the engine
/// makes forward progress even when no command or timer triggers it.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

struct Inner {
    state: Mutex<EngineState>,
    cfg: Config,
    travel_timer: OneShotTimer,
    door_timer: OneShotTimer,
    events: EventPublisher,
}

/// A running engine: one car, one background loop, one lock.
///
/// Cloning is not provided — callers share an `Engine` by holding a
/// reference or wrapping it in an `Arc` themselves.
pub struct Engine {
    inner: Arc<Inner>,
    cancel_tx: cbc::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Validate the raw wire/file config, build initial state, and start
    /// the loop. The engine does not start on a validation error.
    pub fn start(raw: RawConfig) -> Result<Engine, ConfigError> {
        let cfg = Config::from_raw(raw)?;
        Ok(Engine::start_with_config(cfg))
    }

    pub fn start_with_config(cfg: Config) -> Engine {
        let state = Mutex::new(EngineState::new(cfg.initial_floor, cfg.door_open_time));
        let (events, _initial_subscription) = EventPublisher::new();
        let (travel_timer, travel_fire_rx) = OneShotTimer::new();
        let (door_timer, door_fire_rx) = OneShotTimer::new();
        let (cancel_tx, cancel_rx) = cbc::bounded(1);

        let inner = Arc::new(Inner {
            state,
            cfg,
            travel_timer,
            door_timer,
            events,
        });

        let loop_inner = Arc::clone(&inner);
        let handle = thread::spawn(move || run_loop(loop_inner, cancel_rx, travel_fire_rx, door_fire_rx));

        info!("engine started");
        Engine {
            inner,
            cancel_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Cancel the loop and join the background thread. Idempotent.
    pub fn stop(&self) {
        let _ = self.cancel_tx.send(());
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    pub fn events(&self) -> EventSubscription {
        self.inner.events.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.inner.state.lock().unwrap();
        Snapshot::from(&*state)
    }

    pub fn add_call(&self, floor: i64) -> Result<(), CommandError> {
        let cfg = &self.inner.cfg;
        if !cfg.in_bounds(floor) {
            warn!("rejected addCall({floor}): outside [{}, {}]", cfg.min_floor, cfg.max_floor);
            return Err(CommandError::FloorOutOfRange {
                floor,
                min_floor: cfg.min_floor,
                max_floor: cfg.max_floor,
            });
        }
        if !cfg.floor_config(floor).accessible {
            warn!("rejected addCall({floor}): floor not accessible");
            return Err(CommandError::FloorInaccessible { floor });
        }
        let mut state = self.inner.state.lock().unwrap();
        state.calls.insert(floor);
        Ok(())
    }

    /// Idempotent delete: removing a floor not currently in `calls` is a
    /// no-op.
    pub fn remove_call(&self, floor: i64) {
        let mut state = self.inner.state.lock().unwrap();
        state.calls.remove(&floor);
    }

    pub fn clear_calls(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.calls.clear();
    }

    /// OPEN button pressed. The idle-close reopen only applies while the
    /// car isn't moving; a press while under way has nothing to act on, so
    /// it only latches the hold for when the car next stops.
    pub fn press_open(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.open_button_held = true;
        if state.doors.active_sides().is_empty() && state.direction != Direction::None {
            return;
        }
        let floor_config = self.inner.cfg.floor_config(state.floor);
        let outcome = door::on_open_pressed(&mut state.doors, floor_config, &self.inner.cfg);
        self.apply_door_outcome(&mut state, outcome);
    }

    /// OPEN button released: the hold countdown starts now.
    pub fn release_open(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.open_button_held = false;
        if let Some(hold) = door::on_open_released(&state.doors, &self.inner.cfg) {
            state.open_wait_time = hold;
            self.inner.door_timer.arm(hold);
        }
    }

    pub fn press_close(&self) {
        let mut state = self.inner.state.lock().unwrap();
        let held = state.open_button_held;
        let weight = state.weight;
        let outcome = door::on_close_pressed(&mut state.doors, held, weight, &self.inner.cfg);
        self.apply_door_outcome(&mut state, outcome);
    }

    /// Change operating mode: no-op if unchanged. Entering `Emergency`
    /// force-stops both timers and forces `direction = None` immediately,
    /// rather than waiting for an in-flight travel timer to land naturally
    /// — a car in `Emergency` must never have a pending travel timer, and
    /// force-stopping is the only way to guarantee that the instant the
    /// mode changes instead of only after the next timer fire.
    pub fn set_mode(&self, mode: Mode) {
        let mut state = self.inner.state.lock().unwrap();
        if state.mode == mode {
            return;
        }
        state.mode = mode;
        emit(&mut state, &self.inner.events, EventPayload::ModeChange(mode));
        if mode == Mode::Emergency {
            self.inner.travel_timer.disarm();
            state.travel_in_progress = false;
            self.inner.door_timer.disarm();
            if state.direction != Direction::None {
                state.direction = Direction::None;
                emit(&mut state, &self.inner.events, EventPayload::DirectionChange(Direction::None));
            }
        }
    }

    /// Manual override of a door's phase, intended for use in `Manual`
    /// mode but not gated on it — a caller mistake should produce an
    /// observable door change, not a silent no-op. Emits only for sides
    /// whose phase actually changes.
    pub fn set_door(&self, side: DoorSide, phase: DoorPhase) {
        let mut state = self.inner.state.lock().unwrap();
        for s in door::expand(side) {
            if state.doors.get(s) != phase {
                state.doors.set(s, phase);
                emit(&mut state, &self.inner.events, EventPayload::DoorChange { side: s, state: phase });
            }
        }
    }

    /// Clamped at 0 — cumulative weight is never negative in practice, and
    /// an unclamped negative value could spuriously clear the overload
    /// guard.
    pub fn add_weight(&self, delta: i64) {
        let mut state = self.inner.state.lock().unwrap();
        state.weight = (state.weight + delta).max(0);
    }

    /// Set the cumulative weight directly. Equivalent to
    /// `addWeight(absolute - weight)`, written directly since the net
    /// effect is the same and the intermediate delta is of no further use.
    /// Clamped at 0.
    pub fn set_weight(&self, absolute: i64) {
        let mut state = self.inner.state.lock().unwrap();
        state.weight = absolute.max(0);
    }

    /// Clear calls, force `direction = None`, close both doors, emit the
    /// corresponding events; `floor` is preserved. Also force-stops any
    /// in-flight hop — otherwise a travel timer armed before the reset
    /// would later fire against a `direction` that is no longer `Up`/
    /// `Down`, advancing the floor by zero instead of landing where the car
    /// physically was headed.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.calls.clear();

        self.inner.travel_timer.disarm();
        state.travel_in_progress = false;

        if state.direction != Direction::None {
            state.direction = Direction::None;
            emit(&mut state, &self.inner.events, EventPayload::DirectionChange(Direction::None));
        }

        self.inner.door_timer.disarm();
        for side in [DoorSide::Front, DoorSide::Rear] {
            if state.doors.get(side) != DoorPhase::Close {
                state.doors.set(side, DoorPhase::Close);
                emit(&mut state, &self.inner.events, EventPayload::DoorChange { side, state: DoorPhase::Close });
            }
        }
    }

    fn apply_door_outcome(&self, state: &mut EngineState, outcome: door::Outcome) {
        apply_door_outcome(state, &self.inner.door_timer, &self.inner.events, outcome);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    inner: Arc<Inner>,
    cancel_rx: cbc::Receiver<()>,
    travel_fire_rx: cbc::Receiver<crate::timer::Fire>,
    door_fire_rx: cbc::Receiver<crate::timer::Fire>,
) {
    let tick = cbc::tick(TICK_INTERVAL);
    loop {
        cbc::select! {
            recv(cancel_rx) -> _ => {
                inner.travel_timer.disarm();
                inner.door_timer.disarm();
                info!("engine stopped");
                return;
            }
            recv(tick) -> _ => {
                let mut state = inner.state.lock().unwrap();
                step(&mut state, &inner.cfg, &inner.travel_timer, &inner.door_timer, &inner.events);
            }
            recv(travel_fire_rx) -> fire => {
                match fire {
                    Ok(fire) if inner.travel_timer.is_current(fire) => {
                        let mut state = inner.state.lock().unwrap();
                        crate::motion::on_travel_complete(
                            &mut state, &inner.cfg, &inner.travel_timer, &inner.door_timer, &inner.events,
                        );
                    }
                    Ok(_) => {} // stale fire from a timer since rearmed or disarmed
                    Err(_) => return,
                }
            }
            recv(door_fire_rx) -> fire => {
                match fire {
                    Ok(fire) if inner.door_timer.is_current(fire) => {
                        let mut state = inner.state.lock().unwrap();
                        let outcome = door::on_timer_fired(
                            &mut state.doors,
                            state.open_wait_time,
                            state.weight,
                            state.open_button_held,
                            &inner.cfg,
                        );
                        apply_door_outcome(&mut state, &inner.door_timer, &inner.events, outcome);
                    }
                    Ok(_) => {}
                    Err(_) => return,
                }
            }
        }
    }
}

/// Re-evaluate the scheduler and advance the car if it's free to move.
/// Run once per tick, and whenever a caller wants immediate forward
/// progress re-evaluated under the same rules.
fn step(
    state: &mut EngineState,
    cfg: &Config,
    travel_timer: &OneShotTimer,
    door_timer: &OneShotTimer,
    events: &EventPublisher,
) {
    if state.mode != Mode::Auto {
        return;
    }
    if state.travel_in_progress {
        return;
    }
    if !state.doors.all_close() {
        return;
    }

    match scheduler::decide(state.floor, state.direction, &state.calls) {
        ScanDecision::Idle => {
            if state.direction != Direction::None {
                state.direction = Direction::None;
                emit(state, events, EventPayload::DirectionChange(Direction::None));
            }
        }
        ScanDecision::ArriveHere => crate::motion::arrive(state, cfg, door_timer, events),
        ScanDecision::Move { direction, .. } => {
            crate::motion::start(state, direction, travel_timer, events, cfg);
        }
    }
}

fn apply_door_outcome(
    state: &mut EngineState,
    door_timer: &OneShotTimer,
    events: &EventPublisher,
    outcome: door::Outcome,
) {
    for (side, phase) in outcome.changes {
        emit(state, events, EventPayload::DoorChange { side, state: phase });
    }
    if let Some(wait) = outcome.open_wait_time {
        state.open_wait_time = wait;
    }
    match outcome.rearm {
        Some(duration) => door_timer.arm(duration),
        None => door_timer.disarm(),
    }
}

fn emit(state: &mut EngineState, events: &EventPublisher, payload: EventPayload) {
    if !events.emit(payload, state.dropped_events) {
        state.dropped_events += 1;
        warn!("event dropped (dropped_events={})", state.dropped_events);
    }
}
