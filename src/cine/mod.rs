// SPDX-License-Identifier: MPL-2.0
//! Timed frame-by-frame playback (cine) over an image sequence.
//!
//! A [`CinePlayer`] is bound to exactly one panel surface. It is a
//! two-state machine, `Idle` and `Playing`: `play` schedules a repeating
//! tick on the injected [`Scheduler`], `pause` cancels it synchronously.
//! Each tick advances the shared sequence with wraparound and issues a
//! display request through the last-requested-wins dispatcher; ticks are
//! never stalled waiting for a load to complete, so a slow frame is
//! simply superseded by the next one.

use crate::config::defaults::{DEFAULT_CINE_RATE_HZ, MAX_CINE_RATE_HZ, MIN_CINE_RATE_HZ};
use crate::engine::{FrameDispatcher, SurfaceId};
use crate::error::{Error, Result};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::sequence::ImageSequence;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Playback rate in frames per second, clamped to the supported range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRate(f64);

impl FrameRate {
    /// Creates a frame rate, clamping the value into
    /// [`MIN_CINE_RATE_HZ`]..=[`MAX_CINE_RATE_HZ`]. Non-finite input
    /// falls back to the default rate.
    #[must_use]
    pub fn new(hz: f64) -> Self {
        if !hz.is_finite() {
            return Self(DEFAULT_CINE_RATE_HZ);
        }
        Self(hz.clamp(MIN_CINE_RATE_HZ, MAX_CINE_RATE_HZ))
    }

    /// Returns the rate in frames per second.
    #[must_use]
    pub fn hz(self) -> f64 {
        self.0
    }

    /// Returns the tick period, `1000 / hz` milliseconds.
    #[must_use]
    pub fn period(self) -> Duration {
        Duration::from_secs_f64(1.0 / self.0)
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self(DEFAULT_CINE_RATE_HZ)
    }
}

/// Callback invoked with the new sequence index after each frame change.
pub type FrameChangeCallback = Box<dyn FnMut(usize)>;

struct CineInner {
    surface: SurfaceId,
    sequence: Rc<RefCell<ImageSequence>>,
    dispatcher: Rc<FrameDispatcher>,
    scheduler: Rc<dyn Scheduler>,
    frame_rate: FrameRate,
    timer: Option<TimerHandle>,
    on_frame_change: Option<FrameChangeCallback>,
    disposed: bool,
}

impl CineInner {
    /// Advances one frame with wraparound and requests its display.
    ///
    /// Runs both from the scheduler tick and from the manual next/prev
    /// controls. The inner borrow is released before the frame-change
    /// callback runs, so the callback may freely call back into the
    /// player.
    fn step(inner: &Rc<RefCell<CineInner>>, forward: bool) {
        let (index, surface, image_id, dispatcher) = {
            let state = inner.borrow();
            let mut sequence = state.sequence.borrow_mut();
            if sequence.is_empty() {
                return;
            }
            let index = if forward {
                sequence.advance_wrapping()
            } else {
                sequence.retreat_wrapping()
            };
            let image_id = sequence.current_id().cloned();
            drop(sequence);
            let Some(image_id) = image_id else { return };
            (
                index,
                state.surface,
                image_id,
                Rc::clone(&state.dispatcher),
            )
        };

        dispatcher.request(surface, &image_id);

        let callback = inner.borrow_mut().on_frame_change.take();
        if let Some(mut callback) = callback {
            callback(index);
            let mut state = inner.borrow_mut();
            // Keep a callback installed mid-step only if none replaced it.
            if state.on_frame_change.is_none() {
                state.on_frame_change = Some(callback);
            }
        }
    }
}

/// Timed, cancellable frame-advance loop bound to one panel.
pub struct CinePlayer {
    inner: Rc<RefCell<CineInner>>,
}

impl CinePlayer {
    /// Creates a player in the `Idle` state.
    #[must_use]
    pub fn new(
        surface: SurfaceId,
        sequence: Rc<RefCell<ImageSequence>>,
        dispatcher: Rc<FrameDispatcher>,
        scheduler: Rc<dyn Scheduler>,
        frame_rate: FrameRate,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CineInner {
                surface,
                sequence,
                dispatcher,
                scheduler,
                frame_rate,
                timer: None,
                on_frame_change: None,
                disposed: false,
            })),
        }
    }

    /// The panel surface this player advances frames on.
    #[must_use]
    pub fn surface(&self) -> SurfaceId {
        self.inner.borrow().surface
    }

    /// Returns whether the player is in the `Playing` state.
    ///
    /// The timer handle is held iff playing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.inner.borrow().timer.is_some()
    }

    /// Returns the current frame rate.
    #[must_use]
    pub fn frame_rate(&self) -> FrameRate {
        self.inner.borrow().frame_rate
    }

    /// Registers the callback invoked with the new index on every frame
    /// change.
    pub fn set_frame_change_callback(&self, callback: FrameChangeCallback) {
        self.inner.borrow_mut().on_frame_change = Some(callback);
    }

    /// Transitions `Idle -> Playing`. No-op when already playing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty sequence or a
    /// disposed player; playback over zero frames is undefined.
    pub fn play(&self) -> Result<()> {
        let mut state = self.inner.borrow_mut();
        if state.disposed {
            return Err(Error::InvalidArgument(
                "cine player already disposed".to_string(),
            ));
        }
        if state.sequence.borrow().is_empty() {
            return Err(Error::InvalidArgument(
                "cannot start cine over an empty sequence".to_string(),
            ));
        }
        if state.timer.is_some() {
            return Ok(());
        }

        let weak: Weak<RefCell<CineInner>> = Rc::downgrade(&self.inner);
        let tick = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                CineInner::step(&inner, true);
            }
        });
        let handle = state
            .scheduler
            .schedule_repeating(state.frame_rate.period(), tick);
        state.timer = Some(handle);
        Ok(())
    }

    /// Transitions `Playing -> Idle`, cancelling the pending tick
    /// synchronously. No-op when already idle.
    pub fn pause(&self) {
        let mut state = self.inner.borrow_mut();
        if let Some(handle) = state.timer.take() {
            state.scheduler.cancel(handle);
        }
    }

    /// Pauses when playing, plays when idle. Returns the resulting
    /// playing flag.
    ///
    /// # Errors
    ///
    /// Propagates the [`CinePlayer::play`] error when starting.
    pub fn toggle(&self) -> Result<bool> {
        if self.is_playing() {
            self.pause();
            Ok(false)
        } else {
            self.play()?;
            Ok(true)
        }
    }

    /// Advances one frame manually (wrapping). Usable while idle.
    pub fn next_frame(&self) {
        CineInner::step(&self.inner, true);
    }

    /// Retreats one frame manually (wrapping). Usable while idle.
    pub fn previous_frame(&self) {
        CineInner::step(&self.inner, false);
    }

    /// Updates the frame rate.
    ///
    /// While playing, the running tick is cancelled and rescheduled in
    /// one step so the new period takes effect immediately and exactly
    /// one timer stays active. While idle, only the stored rate changes.
    pub fn set_frame_rate(&self, hz: f64) {
        let rate = FrameRate::new(hz);
        let was_playing = {
            let mut state = self.inner.borrow_mut();
            state.frame_rate = rate;
            if let Some(handle) = state.timer.take() {
                state.scheduler.cancel(handle);
                true
            } else {
                false
            }
        };
        if was_playing {
            // The sequence was non-empty when playback started, so the
            // restart cannot fail.
            let _ = self.play();
        }
    }

    /// Forces `Playing -> Idle` and releases the timer for good.
    ///
    /// Must be called when the owning panel is torn down; a skipped
    /// dispose would leave the tick firing against a dead panel. Calling
    /// it again is a no-op.
    pub fn dispose(&self) {
        self.pause();
        self.inner.borrow_mut().disposed = true;
    }
}

impl Drop for CinePlayer {
    fn drop(&mut self) {
        // Backstop for a missed dispose: the timer must not outlive the
        // player.
        self.pause();
    }
}

impl fmt::Debug for CinePlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("CinePlayer")
            .field("surface", &state.surface)
            .field("frame_rate", &state.frame_rate)
            .field("playing", &state.timer.is_some())
            .field("disposed", &state.disposed)
            .finish_non_exhaustive()
    }
}
