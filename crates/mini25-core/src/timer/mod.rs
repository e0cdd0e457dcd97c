mod engine;
mod mode;
mod ticker;

pub use engine::TimerEngine;
pub use mode::{format_clock, Durations, TimerMode, POMODOROS_UNTIL_LONG_BREAK};
pub use ticker::{Ticker, TICK_PERIOD};
