//! Ambient music player.
//!
//! [`Player`] holds the user's intent (track, playing, volume). The audio
//! side effects live behind [`AudioBackend`] and are driven by
//! [`Player::apply`], which only touches the backend when the intent differs
//! from what was last applied.

use serde::Serialize;

use crate::error::PlaybackError;

/// Played once per completed session.
pub const NOTIFICATION_SOUND_URL: &str = "https://actions.google.com/sounds/v1/alarms/alarm_clock.ogg";

pub const DEFAULT_VOLUME: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LofiTrack {
    pub name: &'static str,
    pub url: &'static str,
}

pub const CATALOG: &[LofiTrack] = &[
    LofiTrack { name: "Lofi Study", url: "https://cdn.pixabay.com/download/audio/2022/02/07/audio_c3a071b35b.mp3" },
    LofiTrack { name: "Just Relax", url: "https://cdn.pixabay.com/download/audio/2022/11/22/audio_2d02518b57.mp3" },
    LofiTrack { name: "Rainy Day", url: "https://cdn.pixabay.com/download/audio/2022/08/04/audio_3c3b529792.mp3" },
    LofiTrack { name: "Ocean Waves", url: "https://cdn.pixabay.com/download/audio/2022/08/03/audio_51c633a69a.mp3" },
    LofiTrack { name: "Cafe Vibes", url: "https://cdn.pixabay.com/download/audio/2022/04/18/audio_34bcf1b873.mp3" },
    LofiTrack { name: "Forest Sounds", url: "https://cdn.pixabay.com/download/audio/2022/05/17/audio_38294451b6.mp3" },
    LofiTrack { name: "Campfire", url: "https://cdn.pixabay.com/download/audio/2022/11/17/audio_84f932f520.mp3" },
    LofiTrack { name: "Jazz Cafe", url: "https://cdn.pixabay.com/download/audio/2023/05/26/audio_4f0c7657b9.mp3" },
    LofiTrack { name: "Synthwave", url: "https://cdn.pixabay.com/download/audio/2023/03/23/audio_903067195d.mp3" },
    LofiTrack { name: "Ambient", url: "https://cdn.pixabay.com/download/audio/2022/12/16/audio_29118e7786.mp3" },
];

/// Stable index into [`CATALOG`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TrackId(usize);

impl TrackId {
    /// `None` when `index` is outside the catalog.
    pub fn new(index: usize) -> Option<Self> {
        (index < CATALOG.len()).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn track(self) -> &'static LofiTrack {
        &CATALOG[self.0]
    }

    pub fn next(self) -> Self {
        Self((self.0 + 1) % CATALOG.len())
    }

    pub fn previous(self) -> Self {
        Self((self.0 + CATALOG.len() - 1) % CATALOG.len())
    }
}

/// Where audio actually happens.
pub trait AudioBackend {
    /// Make `url` the current source. Does not start playback.
    fn load(&mut self, url: &str);
    /// A backend that has to restart playback to change volume reports a
    /// failed restart here.
    fn set_volume(&mut self, volume: f32) -> Result<(), PlaybackError>;
    /// Start (or restart after `load`) playback of the current source.
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    /// Fire-and-forget playback of a short sound, independent of the loop.
    fn play_once(&mut self, url: &str) -> Result<(), PlaybackError>;

    /// Check that playback started earlier is still going.
    fn poll(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Applied {
    track: TrackId,
    playing: bool,
    volume: f32,
}

#[derive(Debug, Clone)]
pub struct Player {
    track: TrackId,
    playing: bool,
    volume: f32,
    applied: Option<Applied>,
}

impl Player {
    pub fn new() -> Self {
        Self::with(TrackId::default(), DEFAULT_VOLUME)
    }

    pub fn with(track: TrackId, volume: f32) -> Self {
        Self {
            track,
            playing: false,
            volume: clamp_volume(volume),
            applied: None,
        }
    }

    pub fn track(&self) -> TrackId {
        self.track
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn toggle_play(&mut self) {
        self.playing = !self.playing;
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn select_track(&mut self, track: TrackId) {
        self.track = track;
    }

    /// Clamped to 0.0..=1.0; NaN counts as silence.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }

    /// Reconcile the backend with the current intent.
    ///
    /// Re-applying an unchanged state only checks that playback is still
    /// alive. A rejected play, a failed restart or playback that died since
    /// the last call is logged and turns `playing` back off.
    pub fn apply(&mut self, backend: &mut dyn AudioBackend) {
        if let Some(applied) = self.applied.filter(|a| a.playing) {
            if let Err(e) = backend.poll() {
                self.playback_stopped(&e, applied);
            }
        }

        let target = Applied {
            track: self.track,
            playing: self.playing,
            volume: self.volume,
        };
        let previous = self.applied;
        if previous == Some(target) {
            return;
        }

        let track_changed = previous.map_or(true, |p| p.track != target.track);
        if track_changed {
            backend.load(target.track.track().url);
        }
        if previous.map_or(true, |p| p.volume != target.volume) {
            if let Err(e) = backend.set_volume(target.volume) {
                self.playback_stopped(&e, target);
                return;
            }
        }

        let must_play = target.playing && (track_changed || previous.map_or(true, |p| !p.playing));
        if must_play {
            if let Err(e) = backend.play() {
                self.playback_stopped(&e, target);
                return;
            }
        } else if !target.playing && previous.map_or(false, |p| p.playing) {
            backend.pause();
        }
        self.applied = Some(target);
    }

    fn playback_stopped(&mut self, error: &PlaybackError, state: Applied) {
        tracing::warn!(error = %error, track = state.track.track().name, "audio playback stopped");
        self.playing = false;
        self.applied = Some(Applied {
            playing: false,
            ..state
        });
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
