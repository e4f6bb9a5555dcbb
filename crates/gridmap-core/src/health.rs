//! Edge health and blink animation.
//!
//! An edge is "down" when both endpoints are [`Status::Stopped`]. A down edge owns exactly one
//! running blink timer; a healthy edge owns none. [`apply_health`] is the only place that
//! starts timers and [`release`] the only place that cancels them outside a transition, so
//! the invariant holds for every store mutation that routes through them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use gridmap_graphlib::EdgeId;

use crate::model::{Edge, Status};

/// Opaque handle returned by a [`BlinkTimers`] scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

/// Repeating timer service provided by the host.
///
/// When a timer fires the host calls [`Editor::blink_tick`](crate::Editor::blink_tick) with the
/// edge id it was started for.
pub trait BlinkTimers {
    fn start(&mut self, edge: EdgeId, interval: Duration) -> TimerHandle;
    fn cancel(&mut self, handle: TimerHandle);
}

pub fn both_endpoints_down(a: Status, b: Status) -> bool {
    a == Status::Stopped && b == Status::Stopped
}

/// Outcome of re-deriving one edge's health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    Unchanged,
    WentDown,
    Recovered,
}

/// Sets `edge.both_down` and starts/cancels its blink timer to match.
pub fn apply_health<T: BlinkTimers + ?Sized>(
    id: EdgeId,
    edge: &mut Edge,
    both_down: bool,
    timers: &mut T,
    interval: Duration,
) -> HealthTransition {
    let was_down = edge.both_down;
    edge.both_down = both_down;

    if both_down {
        if edge.blink.is_none() {
            edge.blink = Some(timers.start(id, interval));
            tracing::debug!(edge = id.get(), "blink started");
        }
    } else if let Some(handle) = edge.blink.take() {
        timers.cancel(handle);
        tracing::debug!(edge = id.get(), "blink stopped");
    }
    if !both_down {
        edge.opacity = 1.0;
    }

    match (was_down, both_down) {
        (false, true) => HealthTransition::WentDown,
        (true, false) => HealthTransition::Recovered,
        _ => HealthTransition::Unchanged,
    }
}

/// Cancels the edge's timer, if any. Used when the edge leaves the store.
pub fn release<T: BlinkTimers + ?Sized>(edge: &mut Edge, timers: &mut T) {
    if let Some(handle) = edge.blink.take() {
        timers.cancel(handle);
    }
}

/// Flips opacity between full and `dim`. Returns `false` for edges that are not blinking.
pub fn toggle_blink(edge: &mut Edge, dim: f64) -> bool {
    if edge.blink.is_none() {
        return false;
    }
    edge.opacity = if edge.opacity < 1.0 { 1.0 } else { dim };
    true
}

#[derive(Debug, Clone)]
struct ManualTimer {
    edge: EdgeId,
    interval: Duration,
    elapsed: Duration,
}

/// Deterministic scheduler driven by [`ManualTimers::advance`].
#[derive(Debug, Clone, Default)]
pub struct ManualTimers {
    next: u64,
    active: IndexMap<TimerHandle, ManualTimer>,
    started: u64,
    cancelled: u64,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward and returns one edge id per fire, in start order.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<EdgeId> {
        let mut fired = Vec::new();
        for timer in self.active.values_mut() {
            if timer.interval.is_zero() {
                continue;
            }
            timer.elapsed += elapsed;
            while timer.elapsed >= timer.interval {
                timer.elapsed -= timer.interval;
                fired.push(timer.edge);
            }
        }
        fired
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn started_total(&self) -> u64 {
        self.started
    }

    pub fn cancelled_total(&self) -> u64 {
        self.cancelled
    }
}

impl BlinkTimers for ManualTimers {
    fn start(&mut self, edge: EdgeId, interval: Duration) -> TimerHandle {
        self.next += 1;
        let handle = TimerHandle(self.next);
        self.active.insert(
            handle,
            ManualTimer {
                edge,
                interval,
                elapsed: Duration::ZERO,
            },
        );
        self.started += 1;
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if self.active.shift_remove(&handle).is_some() {
            self.cancelled += 1;
        }
    }
}
