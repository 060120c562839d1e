//! crates/study_planner_core/src/focus.rs
//!
//! Pomodoro-style countdown. The caller drives it with `tick`; the timer itself
//! owns no clock.

use serde::Serialize;
use std::time::Duration;

pub const MIN_FOCUS_MINUTES: u32 = 1;
pub const MAX_FOCUS_MINUTES: u32 = 180;
pub const FOCUS_PRESETS: [u32; 3] = [25, 50, 90];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Finished,
}

/// What a single `tick` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer is not running; nothing changed.
    Ignored,
    Running,
    /// Remaining time just reached zero.
    Finished,
}

#[derive(Debug, Clone)]
pub struct FocusTimer {
    duration: Duration,
    remaining: Duration,
    state: TimerState,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self::new(FOCUS_PRESETS[0])
    }
}

impl FocusTimer {
    pub fn new(minutes: u32) -> Self {
        let duration = Self::clamped(minutes);
        Self {
            duration,
            remaining: duration,
            state: TimerState::Idle,
        }
    }

    fn clamped(minutes: u32) -> Duration {
        let minutes = minutes.clamp(MIN_FOCUS_MINUTES, MAX_FOCUS_MINUTES);
        Duration::from_secs(u64::from(minutes) * 60)
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn duration_minutes(&self) -> u32 {
        (self.duration.as_secs() / 60) as u32
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Changes the length and resets the countdown. Ignored while running.
    pub fn set_duration(&mut self, minutes: u32) {
        if self.state == TimerState::Running {
            return;
        }
        self.duration = Self::clamped(minutes);
        self.reset();
    }

    pub fn start(&mut self) {
        match self.state {
            TimerState::Finished => {
                self.remaining = self.duration;
                self.state = TimerState::Running;
            }
            TimerState::Idle | TimerState::Paused => self.state = TimerState::Running,
            TimerState::Running => {}
        }
    }

    pub fn pause(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused;
        }
    }

    /// The start/pause button.
    pub fn toggle(&mut self) {
        if self.state == TimerState::Running {
            self.pause();
        } else {
            self.start();
        }
    }

    pub fn reset(&mut self) {
        self.remaining = self.duration;
        self.state = TimerState::Idle;
    }

    pub fn tick(&mut self, elapsed: Duration) -> TickOutcome {
        if self.state != TimerState::Running {
            return TickOutcome::Ignored;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            self.state = TimerState::Finished;
            TickOutcome::Finished
        } else {
            TickOutcome::Running
        }
    }

    pub fn progress_percent(&self) -> f64 {
        let total = self.duration.as_secs_f64();
        if total == 0.0 {
            return 0.0;
        }
        (total - self.remaining.as_secs_f64()) / total * 100.0
    }

    /// `MM:SS`; minutes are not wrapped, so 90 minutes shows as `90:00`.
    pub fn remaining_display(&self) -> String {
        // Round partial seconds up so the display never shows 00:00 early.
        let secs = self.remaining.as_secs() + u64::from(self.remaining.subsec_nanos() > 0);
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}
