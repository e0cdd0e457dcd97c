//! Audio through an external player process.
//!
//! Playback is a child process (`mpv` unless configured otherwise) streaming
//! the track URL. Pausing stops the process; playing again restarts the
//! stream from the beginning, which is fine for looping ambient tracks.

use std::process::{Child, Command, Stdio};

use mini25_core::{AudioBackend, PlaybackError};

pub struct ProcessBackend {
    command: String,
    url: Option<String>,
    volume: f32,
    child: Option<Child>,
    one_shots: Vec<Child>,
}

impl ProcessBackend {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            url: None,
            volume: mini25_core::player::DEFAULT_VOLUME,
            child: None,
            one_shots: Vec::new(),
        }
    }

    fn volume_arg(&self) -> String {
        format!("--volume={}", (self.volume * 100.0).round() as u32)
    }

    fn spawn(&self, url: &str, looped: bool) -> Result<Child, PlaybackError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("--no-video").arg("--really-quiet").arg(self.volume_arg());
        if looped {
            cmd.arg("--loop=inf");
        }
        cmd.arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlaybackError::PlaybackRejected(format!("{}: {e}", self.command)))
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                tracing::debug!(error = %e, "player process already gone");
            }
            let _ = child.wait();
        }
    }

    fn is_playing(&self) -> bool {
        self.child.is_some()
    }
}

impl AudioBackend for ProcessBackend {
    fn load(&mut self, url: &str) {
        self.stop();
        self.url = Some(url.to_string());
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), PlaybackError> {
        self.volume = volume;
        // The process takes its volume at spawn; restart to apply.
        if self.is_playing() {
            self.play()?;
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let url = self
            .url
            .clone()
            .ok_or_else(|| PlaybackError::PlaybackRejected("no track loaded".into()))?;
        self.stop();
        let child = self.spawn(&url, true)?;
        tracing::debug!(pid = child.id(), %url, "playback started");
        self.child = Some(child);
        Ok(())
    }

    fn pause(&mut self) {
        self.stop();
    }

    fn play_once(&mut self, url: &str) -> Result<(), PlaybackError> {
        // Reap finished one-shots.
        self.one_shots
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
        let child = self.spawn(url, false)?;
        self.one_shots.push(child);
        Ok(())
    }

    fn poll(&mut self) -> Result<(), PlaybackError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        // The loop never ends on its own, so any exit means playback stopped.
        let exited = child
            .try_wait()
            .map_err(|e| PlaybackError::PlaybackRejected(format!("{}: {e}", self.command)))?;
        match exited {
            None => Ok(()),
            Some(status) => {
                self.child = None;
                Err(PlaybackError::PlaybackRejected(format!(
                    "{} exited ({status})",
                    self.command
                )))
            }
        }
    }
}

impl Drop for ProcessBackend {
    fn drop(&mut self) {
        self.stop();
    }
}
