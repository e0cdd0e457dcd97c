//! Interactive focus view.
//!
//! One current-thread event loop multiplexes the one-second ticker and stdin
//! lines. The ticker is re-synced with the engine after every transition, so
//! a pause typed by the user disarms it before another tick can be polled.

use std::io::IsTerminal;
use std::time::Duration;

use clap::Args;
use crossterm::cursor::MoveToColumn;
use crossterm::execute;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType, SetTitle};
use mini25_core::dashboard::summarize_local;
use mini25_core::{
    format_clock, AudioBackend, Config, Effects, Event, HistoryEntry, Player, Shell, Tab, Ticker,
    TimerCommand, TimerEngine, TimerMode, TrackId,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::open_history;
use crate::audio::ProcessBackend;

#[derive(Args)]
pub struct FocusArgs {
    /// What you're working on
    #[arg(long, short)]
    task: Option<String>,
    /// Mode to begin in (focus, short-break, long-break)
    #[arg(long, short)]
    mode: Option<TimerMode>,
    /// Catalog id of the ambient track (see `mini25 tracks`)
    #[arg(long)]
    track: Option<usize>,
    /// Music volume, 0-100
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    volume: Option<u32>,
    /// Start the music right away
    #[arg(long)]
    music: bool,
    /// Start the countdown right away
    #[arg(long)]
    start: bool,
}

const HELP: &str = "\
  s        start / pause        r   reset
  1 2 3    focus / short / long break
  t NAME   set the task         m   play / pause music
  n p      next / previous track
  + -      volume up / down     v N set volume (0-100)
  d        progress             f   back to focus
  h        help                 q   quit";

const VOLUME_STEP: f32 = 0.1;

/// How often a playing track is checked for having died.
const PLAYBACK_CHECK: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
enum Input {
    Timer(TimerCommand),
    Task(String),
    ToggleMusic,
    NextTrack,
    PreviousTrack,
    VolumeBy(f32),
    Volume(f32),
    Show(Tab),
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let input = match head {
        "s" | "" => Input::Timer(TimerCommand::Toggle),
        "r" => Input::Timer(TimerCommand::Reset),
        "1" => Input::Timer(TimerCommand::SelectMode(TimerMode::Focus)),
        "2" => Input::Timer(TimerCommand::SelectMode(TimerMode::ShortBreak)),
        "3" => Input::Timer(TimerCommand::SelectMode(TimerMode::LongBreak)),
        "t" => Input::Task(rest.to_string()),
        "m" => Input::ToggleMusic,
        "n" => Input::NextTrack,
        "p" => Input::PreviousTrack,
        "+" => Input::VolumeBy(VOLUME_STEP),
        "-" => Input::VolumeBy(-VOLUME_STEP),
        "v" => {
            let pct: u32 = rest
                .parse()
                .map_err(|_| format!("volume must be 0-100, got '{rest}'"))?;
            Input::Volume(pct.min(100) as f32 / 100.0)
        }
        "d" => Input::Show(Tab::Progress),
        "f" => Input::Show(Tab::Focus),
        "h" | "?" => Input::Help,
        "q" => Input::Quit,
        other => return Err(format!("unknown command '{other}' (h for help)")),
    };
    Ok(input)
}

/// Terminal title, completion sound and desktop notification.
struct TerminalEffects {
    set_title: bool,
    notify: bool,
    sound_url: Option<String>,
    sound: ProcessBackend,
}

impl TerminalEffects {
    fn new(config: &Config) -> Self {
        let enabled = config.notifications.enabled;
        Self {
            set_title: std::io::stdout().is_terminal(),
            notify: enabled,
            sound_url: (enabled && config.notifications.sound)
                .then(|| config.notifications.sound_url.clone()),
            sound: ProcessBackend::new(config.player.command.clone()),
        }
    }
}

impl Effects for TerminalEffects {
    fn title_changed(&mut self, title: &str) {
        if self.set_title {
            if let Err(e) = execute!(std::io::stdout(), SetTitle(title)) {
                tracing::debug!(error = %e, "could not set terminal title");
            }
        }
    }

    fn session_completed(&mut self, event: &Event, recorded: Option<&HistoryEntry>) {
        let Event::SessionCompleted { next_mode, .. } = event else {
            return;
        };
        let message = match recorded {
            Some(entry) => format!(
                "Done: {}. Next up: {}.",
                entry.display_name(),
                next_mode.label()
            ),
            None => format!("Break's over. Next up: {}.", next_mode.label()),
        };
        println!("\n{message}");

        if let Some(url) = &self.sound_url {
            if let Err(e) = self.sound.play_once(url) {
                tracing::warn!(error = %e, "error playing notification sound");
            }
        }
        if self.notify {
            if let Err(e) = notify_rust::Notification::new()
                .summary("Mini25")
                .body(&message)
                .show()
            {
                tracing::warn!(error = %e, "desktop notification failed");
            }
        }
    }
}

fn status_line(shell: &Shell, player: &Player) -> String {
    let engine = shell.engine();
    let state = if engine.is_running() { "running" } else { "paused" };
    let task = match shell.task_draft() {
        "" => String::new(),
        task => format!("  | {task}"),
    };
    let music = if player.is_playing() { "on" } else { "off" };
    format!(
        "{clock} {word} ({state}, {done} done){task}  | music {music}: {track} {vol}%",
        clock = format_clock(engine.remaining_secs()),
        word = engine.mode().status_word(),
        done = engine.completed_focus_count(),
        track = player.track().track().name,
        vol = (player.volume() * 100.0).round() as u32,
    )
}

fn redraw(shell: &Shell, player: &Player) {
    if shell.tab() != Tab::Focus {
        return;
    }
    if let Err(e) = execute!(
        std::io::stdout(),
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(status_line(shell, player)),
    ) {
        tracing::debug!(error = %e, "status line redraw failed");
    }
}

pub fn run(args: FocusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_loop(args));
    // stdin is read on a blocking thread that may still be parked in read().
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn run_loop(args: FocusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let engine = TimerEngine::with_durations(
        config.durations(),
        config.timer.pomodoros_before_long_break,
    );
    let mut shell = Shell::new(engine, open_history(&config));
    let mut effects = TerminalEffects::new(&config);

    if let Some(task) = args.task {
        shell.set_task_draft(task);
    }
    if let Some(mode) = args.mode {
        shell.dispatch(TimerCommand::SelectMode(mode), &mut effects);
    }

    let track_index = args.track.unwrap_or(config.player.default_track);
    let track = TrackId::new(track_index)
        .ok_or_else(|| format!("no track with id {track_index} (see `mini25 tracks`)"))?;
    let volume = args
        .volume
        .map(|v| v as f32 / 100.0)
        .unwrap_or_else(|| config.default_volume());
    let mut player = Player::with(track, volume);
    let mut audio = ProcessBackend::new(config.player.command.clone());
    player.set_playing(args.music);
    player.apply(&mut audio);

    if args.start {
        shell.dispatch(TimerCommand::Start, &mut effects);
    }

    println!("Mini25 - your little bubble of focus.\n{HELP}\n");
    let mut ticker = Ticker::new();
    ticker.sync(shell.engine().is_running());
    let mut health = tokio::time::interval(PLAYBACK_CHECK);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    redraw(&shell, &player);

    loop {
        tokio::select! {
            _ = ticker.next() => {
                shell.dispatch(TimerCommand::Tick, &mut effects);
            }
            _ = health.tick(), if player.is_playing() => {}
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line) {
                    Ok(Input::Quit) => break,
                    Ok(input) => handle_input(input, &mut shell, &mut player, &mut effects),
                    Err(message) => println!("{message}"),
                }
            }
        }
        settle(&shell, &mut player, &mut audio, &mut ticker);
        redraw(&shell, &player);
    }

    player.set_playing(false);
    player.apply(&mut audio);
    println!();
    Ok(())
}

/// Bring the ticker and the audio backend in line with the new state.
fn settle(shell: &Shell, player: &mut Player, audio: &mut dyn AudioBackend, ticker: &mut Ticker) {
    ticker.sync(shell.engine().is_running());
    player.apply(audio);
}

fn handle_input(input: Input, shell: &mut Shell, player: &mut Player, effects: &mut dyn Effects) {
    match input {
        Input::Timer(command) => {
            shell.dispatch(command, effects);
        }
        Input::Task(task) => shell.set_task_draft(task),
        Input::ToggleMusic => player.toggle_play(),
        Input::NextTrack => player.select_track(player.track().next()),
        Input::PreviousTrack => player.select_track(player.track().previous()),
        Input::VolumeBy(delta) => player.set_volume(player.volume() + delta),
        Input::Volume(volume) => player.set_volume(volume),
        Input::Show(Tab::Progress) => {
            shell.set_tab(Tab::Progress);
            shell.history_mut().refresh();
            let summary = summarize_local(shell.history().entries());
            println!("\n{}", super::dashboard::render(&summary));
        }
        Input::Show(Tab::Focus) => {
            shell.set_tab(Tab::Focus);
            if let Some(title) = shell.title() {
                effects.title_changed(&title);
            }
        }
        Input::Help => println!("\n{HELP}"),
        Input::Quit => {}
    }
}
