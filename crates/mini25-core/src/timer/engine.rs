//! Timer engine implementation.
//!
//! The engine is a pure countdown state machine. It owns no thread and no
//! clock: the caller invokes `tick()` once per elapsed second while the timer
//! is running (see [`Ticker`](super::Ticker)).
//!
//! ## State Transitions
//!
//! ```text
//! Focus --complete--> ShortBreak --complete--> Focus
//!       \--every 4th focus--> LongBreak --complete--> Focus
//! ```
//!
//! Each mode carries a running/paused flag and the remaining seconds.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new();
//! engine.start();
//! // Once per second:
//! if let Some(Event::SessionCompleted { completed_mode, .. }) = engine.tick() {
//!     // record history for focus sessions
//! }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::mode::{format_clock, Durations, TimerMode, POMODOROS_UNTIL_LONG_BREAK};
use crate::events::Event;

/// Core timer engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    durations: Durations,
    long_break_interval: u32,
    mode: TimerMode,
    remaining_secs: u64,
    running: bool,
    /// Focus completions since the engine was created.
    completed_focus_count: u32,
}

impl TimerEngine {
    /// Create an engine with the default durations, paused in Focus mode.
    pub fn new() -> Self {
        Self::with_durations(Durations::default(), POMODOROS_UNTIL_LONG_BREAK)
    }

    pub fn with_durations(durations: Durations, long_break_interval: u32) -> Self {
        Self {
            durations,
            long_break_interval: long_break_interval.max(1),
            mode: TimerMode::Focus,
            remaining_secs: durations.of(TimerMode::Focus),
            running: false,
            completed_focus_count: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_focus_count(&self) -> u32 {
        self.completed_focus_count
    }

    pub fn durations(&self) -> &Durations {
        &self.durations
    }

    pub fn total_secs(&self) -> u64 {
        self.durations.of(self.mode)
    }

    /// `MM:SS` of the current countdown.
    pub fn clock(&self) -> String {
        format_clock(self.remaining_secs)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs(),
            running: self.running,
            completed_focus_count: self.completed_focus_count,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        if self.running {
            return None;
        }
        self.running = true;
        Some(Event::TimerStarted {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.running = false;
        Some(Event::TimerPaused {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Start when paused, pause when running.
    pub fn toggle(&mut self) -> Option<Event> {
        if self.running {
            self.pause()
        } else {
            self.start()
        }
    }

    pub fn reset(&mut self) -> Option<Event> {
        self.running = false;
        self.remaining_secs = self.total_secs();
        Some(Event::TimerReset {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Switch mode by hand. This never counts as a completion.
    pub fn select_mode(&mut self, mode: TimerMode) -> Option<Event> {
        self.running = false;
        self.mode = mode;
        self.remaining_secs = self.durations.of(mode);
        Some(Event::ModeSelected {
            mode,
            duration_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `None` while paused. The tick that would bring the countdown to
    /// zero completes the session instead: the mode advances and the new
    /// mode's full duration is loaded in the same step, with the timer left
    /// running.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        if self.remaining_secs > 1 {
            self.remaining_secs -= 1;
            return Some(Event::TimerTicked {
                mode: self.mode,
                remaining_secs: self.remaining_secs,
            });
        }
        Some(self.complete())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete(&mut self) -> Event {
        let completed_mode = self.mode;
        let next_mode = match completed_mode {
            TimerMode::Focus => {
                self.completed_focus_count = self.completed_focus_count.saturating_add(1);
                if self.completed_focus_count % self.long_break_interval == 0 {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                }
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Focus,
        };
        self.mode = next_mode;
        self.remaining_secs = self.durations.of(next_mode);
        self.running = true;
        Event::SessionCompleted {
            completed_mode,
            next_mode,
            completed_focus_count: self.completed_focus_count,
            at: Utc::now(),
        }
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Tick until the next completion and return its event.
    fn run_to_completion(engine: &mut TimerEngine) -> Event {
        loop {
            if let Some(ev @ Event::SessionCompleted { .. }) = engine.tick() {
                return ev;
            }
        }
    }

    #[test]
    fn start_pause_resume() {
        let mut engine = TimerEngine::new();
        assert!(!engine.is_running());

        assert!(engine.start().is_some());
        assert!(engine.is_running());
        assert!(engine.start().is_none(), "start while running is a no-op");

        engine.tick();
        assert!(engine.pause().is_some());
        assert!(!engine.is_running());
        assert_eq!(engine.remaining_secs(), 1499);
        assert!(engine.pause().is_none());

        assert!(engine.start().is_some());
        assert_eq!(engine.remaining_secs(), 1499);
    }

    #[test]
    fn tick_ignored_while_paused() {
        let mut engine = TimerEngine::new();
        assert!(engine.tick().is_none());
        assert_eq!(engine.remaining_secs(), 1500);
    }

    #[test]
    fn full_focus_session_completes_once() {
        let mut engine = TimerEngine::new();
        engine.start();

        let mut completions = Vec::new();
        for _ in 0..1500 {
            if let Some(mode) = engine.tick().and_then(|e| e.completed_mode()) {
                completions.push(mode);
            }
        }

        assert_eq!(completions, vec![TimerMode::Focus]);
        assert_eq!(engine.mode(), TimerMode::ShortBreak);
        assert_eq!(engine.remaining_secs(), 300);
        assert!(engine.is_running());
    }

    #[test]
    fn fourth_focus_leads_to_long_break() {
        let mut engine = TimerEngine::new();
        engine.start();

        for n in 1..=4 {
            let ev = run_to_completion(&mut engine);
            let expected = if n == 4 { TimerMode::LongBreak } else { TimerMode::ShortBreak };
            match ev {
                Event::SessionCompleted {
                    completed_mode,
                    next_mode,
                    completed_focus_count,
                    ..
                } => {
                    assert_eq!(completed_mode, TimerMode::Focus);
                    assert_eq!(next_mode, expected);
                    assert_eq!(completed_focus_count, n);
                }
                other => panic!("Expected SessionCompleted, got {other:?}"),
            }
            // Finish the break.
            let ev = run_to_completion(&mut engine);
            assert_eq!(ev.completed_mode(), Some(expected));
            assert_eq!(engine.mode(), TimerMode::Focus);
        }

        // The counter keeps going: the 8th focus is the next long break.
        for _ in 0..3 {
            run_to_completion(&mut engine);
            run_to_completion(&mut engine);
        }
        run_to_completion(&mut engine);
        assert_eq!(engine.mode(), TimerMode::LongBreak);
        assert_eq!(engine.completed_focus_count(), 8);
    }

    #[test]
    fn select_mode_is_not_a_completion() {
        let mut engine = TimerEngine::new();
        engine.start();
        engine.tick();

        let ev = engine.select_mode(TimerMode::LongBreak);
        assert!(matches!(ev, Some(Event::ModeSelected { duration_secs: 900, .. })));
        assert_eq!(engine.mode(), TimerMode::LongBreak);
        assert_eq!(engine.remaining_secs(), 900);
        assert!(!engine.is_running());
        assert_eq!(engine.completed_focus_count(), 0);
    }

    #[test]
    fn completion_from_selected_break_returns_to_focus() {
        let mut engine = TimerEngine::new();
        engine.select_mode(TimerMode::ShortBreak);
        engine.start();
        let ev = run_to_completion(&mut engine);
        assert_eq!(ev.completed_mode(), Some(TimerMode::ShortBreak));
        assert_eq!(engine.mode(), TimerMode::Focus);
        assert_eq!(engine.remaining_secs(), 1500);
        assert_eq!(engine.completed_focus_count(), 0);
    }

    #[test]
    fn custom_durations_and_interval() {
        let durations = Durations {
            focus_secs: 3,
            short_break_secs: 2,
            long_break_secs: 5,
        };
        let mut engine = TimerEngine::with_durations(durations, 2);
        engine.start();
        run_to_completion(&mut engine);
        assert_eq!(engine.mode(), TimerMode::ShortBreak);
        assert_eq!(engine.remaining_secs(), 2);
        run_to_completion(&mut engine);
        run_to_completion(&mut engine);
        assert_eq!(engine.mode(), TimerMode::LongBreak);
        assert_eq!(engine.remaining_secs(), 5);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let engine = TimerEngine::new();
        match engine.snapshot() {
            Event::StateSnapshot {
                mode,
                remaining_secs,
                total_secs,
                running,
                ..
            } => {
                assert_eq!(mode, TimerMode::Focus);
                assert_eq!(remaining_secs, 1500);
                assert_eq!(total_secs, 1500);
                assert!(!running);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }

    #[test]
    fn engine_state_roundtrips_through_json() {
        let mut engine = TimerEngine::new();
        engine.start();
        engine.tick();
        let json = serde_json::to_string(&engine).unwrap();
        let restored: TimerEngine = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.remaining_secs(), 1499);
        assert!(restored.is_running());
    }

    proptest! {
        #[test]
        fn ticks_decrement_by_one_until_completion(ticks in 1u64..1500) {
            let mut engine = TimerEngine::new();
            engine.start();
            let mut previous = engine.remaining_secs();
            for _ in 0..ticks {
                let ev = engine.tick();
                prop_assert!(ev.as_ref().and_then(Event::completed_mode).is_none());
                prop_assert_eq!(engine.remaining_secs(), previous - 1);
                previous = engine.remaining_secs();
            }
        }

        #[test]
        fn reset_restores_full_duration(ticks in 0u64..4000, mode_idx in 0usize..3) {
            let mut engine = TimerEngine::new();
            engine.select_mode(TimerMode::ALL[mode_idx]);
            engine.start();
            for _ in 0..ticks {
                engine.tick();
            }
            engine.reset();
            prop_assert!(!engine.is_running());
            prop_assert_eq!(engine.remaining_secs(), engine.total_secs());
        }

        #[test]
        fn remaining_never_exceeds_mode_duration(ticks in 0u64..5000) {
            let mut engine = TimerEngine::new();
            engine.start();
            for _ in 0..ticks {
                engine.tick();
                prop_assert!(engine.remaining_secs() <= engine.total_secs());
                prop_assert!(engine.remaining_secs() > 0);
            }
        }
    }
}
