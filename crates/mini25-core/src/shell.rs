//! Composition of the timer engine and the history store.
//!
//! The shell is the only place where components meet: it applies a command
//! to the engine, records focus completions into history, reports the side
//! effects to an [`Effects`] handler, and only then publishes the event.

use serde::Serialize;

use crate::events::{Event, EventBus};
use crate::history::{HistoryEntry, HistoryStore};
use crate::timer::{TimerEngine, TimerMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Focus,
    Progress,
}

impl Tab {
    pub fn label(self) -> &'static str {
        match self {
            Tab::Focus => "Focus",
            Tab::Progress => "Progress",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Pause,
    Toggle,
    Reset,
    SelectMode(TimerMode),
    Tick,
}

/// Side effects requested by the shell after a transition.
///
/// Both hooks default to doing nothing.
pub trait Effects {
    /// The countdown title changed (only while the focus tab is active).
    fn title_changed(&mut self, _title: &str) {}

    /// A session finished. `recorded` is the history entry written for it,
    /// present only for focus sessions.
    fn session_completed(&mut self, _event: &Event, _recorded: Option<&HistoryEntry>) {}
}

/// Effects handler that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEffects;

impl Effects for NoEffects {}

#[derive(Debug)]
pub struct Shell {
    engine: TimerEngine,
    history: HistoryStore,
    task_draft: String,
    tab: Tab,
    bus: EventBus,
}

impl Shell {
    pub fn new(engine: TimerEngine, history: HistoryStore) -> Self {
        Self {
            engine,
            history,
            task_draft: String::new(),
            tab: Tab::Focus,
            bus: EventBus::new(),
        }
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryStore {
        &mut self.history
    }

    pub fn task_draft(&self) -> &str {
        &self.task_draft
    }

    pub fn set_task_draft(&mut self, task: impl Into<String>) {
        self.task_draft = task.into();
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// `MM:SS - Focus` while the focus tab is showing.
    pub fn title(&self) -> Option<String> {
        (self.tab == Tab::Focus).then(|| format!("{} - Focus", self.engine.clock()))
    }

    /// Apply `command` and run its consequences.
    ///
    /// Order: engine transition, history append (focus completions only),
    /// effects, then event listeners.
    pub fn dispatch(&mut self, command: TimerCommand, effects: &mut dyn Effects) -> Option<Event> {
        let event = match command {
            TimerCommand::Start => self.engine.start(),
            TimerCommand::Pause => self.engine.pause(),
            TimerCommand::Toggle => self.engine.toggle(),
            TimerCommand::Reset => self.engine.reset(),
            TimerCommand::SelectMode(mode) => self.engine.select_mode(mode),
            TimerCommand::Tick => self.engine.tick(),
        }?;

        if let Some(completed) = event.completed_mode() {
            let recorded = if completed == TimerMode::Focus {
                let task = std::mem::take(&mut self.task_draft);
                Some(self.history.append(&task).clone())
            } else {
                None
            };
            tracing::info!(?completed, next = ?self.engine.mode(), "session completed");
            effects.session_completed(&event, recorded.as_ref());
        }

        if let Some(title) = self.title() {
            effects.title_changed(&title);
        }
        self.bus.publish(&event);
        Some(event)
    }
}
