//! The SCAN/LOOK scheduler. Pure function of `(floor, direction, calls)`;
//! no lock, no side effects — unit-testable in isolation as a free-standing
//! query over a cloned state.

use std::collections::BTreeSet;

use crate::state::Direction;

/// What the scheduler wants the engine to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDecision {
    Idle,
    ArriveHere,
    Move { direction: Direction, target: i64 },
}

/// Decide the next target given the current floor, heading, and the set of
/// pending calls. The current floor is never itself consulted here — the
/// engine handles "arrive here" for the current floor before invoking the
/// scheduler at all.
pub fn decide(floor: i64, direction: Direction, calls: &BTreeSet<i64>) -> ScanDecision {
    if calls.is_empty() {
        return ScanDecision::Idle;
    }

    let target = phase_one(floor, direction, calls).or_else(|| phase_two(floor, calls));

    match target {
        None => ScanDecision::Idle,
        Some(f) if f == floor => ScanDecision::ArriveHere,
        Some(f) => ScanDecision::Move {
            direction: if f > floor { Direction::Up } else { Direction::Down },
            target: f,
        },
    }
}

/// Phase 1: continue in the current heading. Strict inequality — the
/// current floor is never a Phase 1 candidate.
fn phase_one(floor: i64, direction: Direction, calls: &BTreeSet<i64>) -> Option<i64> {
    match direction {
        Direction::Up => calls
            .iter()
            .copied()
            .filter(|&f| f > floor)
            .min_by_key(|&f| f - floor),
        Direction::Down => calls
            .iter()
            .copied()
            .filter(|&f| f < floor)
            .min_by_key(|&f| floor - f),
        Direction::None => None,
    }
}

/// Phase 2: reversal/idle fallback — nearest call, ties broken toward the
/// lower floor for a deterministic choice.
fn phase_two(floor: i64, calls: &BTreeSet<i64>) -> Option<i64> {
    calls
        .iter()
        .copied()
        .min_by_key(|&f| ((f - floor).abs(), f))
}
