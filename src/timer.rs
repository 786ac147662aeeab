//! A restartable one-shot timer. A bare `Instant` comparison polled on a
//! tick can't safely express "cancel and rearm": a fire already in flight
//! when the timer gets rearmed would otherwise land and be mistaken for
//! the new arm. [`OneShotTimer`] tags every arm with a generation; a fire
//! is only honored if its generation still matches — stale fires already
//! sitting in the channel are silently ignored rather than needing an
//! explicit drain.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel as cbc;

/// A fire notification, tagged with the generation that armed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fire(u64);

pub struct OneShotTimer {
    generation: Arc<AtomicU64>,
    fire_tx: cbc::Sender<Fire>,
}

impl OneShotTimer {
    /// Build a timer and the receiver the engine loop selects on.
    pub fn new() -> (OneShotTimer, cbc::Receiver<Fire>) {
        let (fire_tx, fire_rx) = cbc::unbounded();
        (
            OneShotTimer {
                generation: Arc::new(AtomicU64::new(0)),
                fire_tx,
            },
            fire_rx,
        )
    }

    /// Arm (or rearm) the timer for `duration`. Any previously armed fire
    /// is invalidated: it will still arrive on the channel eventually, but
    /// [`OneShotTimer::is_current`] will reject it.
    pub fn arm(&self, duration: Duration) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let tx = self.fire_tx.clone();
        thread::spawn(move || {
            thread::sleep(duration);
            let _ = tx.send(Fire(generation));
        });
    }

    /// Cancel any pending fire without arming a new one.
    pub fn disarm(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// `true` if `fire` corresponds to the most recent `arm` call, i.e. it
    /// is not a stale fire left over from a timer that was since rearmed
    /// or disarmed.
    pub fn is_current(&self, fire: Fire) -> bool {
        fire.0 == self.generation.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_duration() {
        let (timer, rx) = OneShotTimer::new();
        timer.arm(Duration::from_millis(10));
        let fire = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(timer.is_current(fire));
    }

    #[test]
    fn rearm_invalidates_stale_fire() {
        let (timer, rx) = OneShotTimer::new();
        timer.arm(Duration::from_millis(5));
        // Let the first fire land in the channel before rearming.
        thread::sleep(Duration::from_millis(20));
        timer.arm(Duration::from_millis(5));

        let stale = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(!timer.is_current(stale), "first fire should now be stale");

        let fresh = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(timer.is_current(fresh));
    }

    #[test]
    fn disarm_invalidates_pending_fire() {
        let (timer, rx) = OneShotTimer::new();
        timer.arm(Duration::from_millis(10));
        timer.disarm();
        let fire = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(!timer.is_current(fire));
    }
}
