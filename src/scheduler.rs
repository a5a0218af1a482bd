// SPDX-License-Identifier: MPL-2.0
//! Injectable repeating-timer abstraction for cine playback.
//!
//! The cine loop never talks to an ambient clock directly: it asks a
//! [`Scheduler`] for a repeating tick and cancels it through the returned
//! handle. Production code uses [`TokioScheduler`]; tests drive a manual
//! scheduler that advances virtual time deterministically.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Opaque identifier for one scheduled repeating tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Source of repeating ticks.
///
/// Callbacks run on the single UI thread; implementations must guarantee
/// that no tick fires after [`Scheduler::cancel`] returns.
pub trait Scheduler {
    /// Schedules `tick` to run every `period`, starting one period from
    /// now.
    fn schedule_repeating(&self, period: Duration, tick: Box<dyn FnMut()>) -> TimerHandle;

    /// Cancels a scheduled tick. Unknown or already-cancelled handles are
    /// ignored.
    fn cancel(&self, handle: TimerHandle);
}

/// Tokio-backed scheduler for production use.
///
/// Each timer is a task on the current thread's `LocalSet`, so callbacks
/// (which are not `Send`) run on the UI thread between other events.
/// Cancellation aborts the task; because ticks run on this same thread,
/// no tick can fire after `cancel` returns.
#[derive(Default)]
pub struct TokioScheduler {
    next_id: Cell<u64>,
    tasks: RefCell<HashMap<u64, tokio::task::JoinHandle<()>>>,
}

impl TokioScheduler {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Number of currently scheduled timers.
    #[must_use]
    pub fn active_timers(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&self, period: Duration, mut tick: Box<dyn FnMut()>) -> TimerHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let task = tokio::task::spawn_local(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first interval tick completes immediately; consume it so
            // the first callback fires one period after scheduling.
            interval.tick().await;
            loop {
                interval.tick().await;
                tick();
            }
        });
        self.tasks.borrow_mut().insert(id, task);
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(task) = self.tasks.borrow_mut().remove(&handle.raw()) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.borrow_mut().drain() {
            task.abort();
        }
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("active_timers", &self.active_timers())
            .finish_non_exhaustive()
    }
}
