//! External video viewer.
//!
//! The viewer knows nothing about the catalog: it is addressed by an item id
//! and an autoplay flag. Playback runs in an `mpv` child process whose status
//! line is parsed into position reports.

use anyhow::{Context, Result, anyhow};
use std::process::Stdio;
use tokio::{
  io::{AsyncBufReadExt, BufReader},
  process::{Child, Command},
  sync::mpsc,
  task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::catalog::ItemId;
use crate::constants::constants;

/// Browser embed URL for `id`, mirroring the web player parameters.
pub fn embed_url(id: &str, autoplay: bool) -> String {
  let c = constants();
  format!("{}{}?autoplay={}&{}", c.embed_base_url, id, u8::from(autoplay), c.embed_params)
}

pub fn watch_url(id: &str) -> String {
  format!("{}{}", constants().watch_base_url, id)
}

/// One parsed status line from the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerStatus {
  /// Seconds into the video.
  pub position: f64,
  pub percent: Option<f64>,
}

/// Parse a `pos=<secs> pct=<percent>` status line. Unknown values (mpv prints
/// nothing or "(unavailable)" before the stream opens) yield `None`.
pub fn parse_status_line(line: &str) -> Option<PlayerStatus> {
  let mut position = None;
  let mut percent = None;
  for field in line.split_whitespace() {
    if let Some(v) = field.strip_prefix("pos=") {
      position = v.parse::<f64>().ok().filter(|p| p.is_finite() && *p >= 0.0);
    } else if let Some(v) = field.strip_prefix("pct=") {
      percent = v.parse::<f64>().ok().filter(|p| p.is_finite());
    }
  }
  position.map(|position| PlayerStatus { position, percent })
}

/// Something the App should apply to the progress ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
  Position { id: ItemId, position: f64 },
  /// The player exited on its own. `completed` when it got past the threshold.
  Finished { id: ItemId, completed: bool },
}

#[derive(Default)]
pub struct Viewer {
  process: Option<Child>,
  monitor_handle: Option<JoinHandle<()>>,
  status_rx: Option<mpsc::Receiver<PlayerStatus>>,
  current: Option<ItemId>,
  last_status: Option<PlayerStatus>,
  pub paused: bool,
}

impl Viewer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_playing(&self) -> bool {
    self.process.is_some()
  }

  pub fn current(&self) -> Option<&str> {
    self.current.as_deref()
  }

  pub fn last_status(&self) -> Option<PlayerStatus> {
    self.last_status
  }

  /// Start the player on `id`, replacing any running one. Without autoplay
  /// the video opens paused. `resume_at` seeks to a saved position.
  pub async fn open(&mut self, id: &str, autoplay: bool, resume_at: Option<f64>) -> Result<()> {
    self.stop().await.context("Failed to stop previous playback")?;

    let c = constants();
    let mut cmd = Command::new(&c.player_command);
    cmd.arg(format!("--term-status-msg={}", c.player_status_format));
    if !autoplay {
      cmd.arg("--pause");
    }
    if let Some(pos) = resume_at.filter(|p| *p > 0.0) {
      cmd.arg(format!("--start={:.1}", pos));
    }
    cmd.arg(watch_url(id));
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    // Piped but never drained stderr fills the buffer and blocks mpv.
    cmd.stderr(Stdio::null());
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("{} not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)", c.player_command)
      } else {
        anyhow!(e).context("Failed to spawn player process")
      }
    })?;

    let stdout = child.stdout.take().context("Failed to get player stdout")?;
    let (tx, rx) = mpsc::channel::<PlayerStatus>(16);
    let monitor_handle = tokio::spawn(async move {
      // The status line is redrawn with '\r'; full lines end with '\n'.
      let mut segments = BufReader::new(stdout).split(b'\r');
      while let Ok(Some(segment)) = segments.next_segment().await {
        let text = String::from_utf8_lossy(&segment);
        for line in text.lines() {
          if let Some(status) = parse_status_line(line)
            && tx.send(status).await.is_err()
          {
            return;
          }
        }
      }
    });

    info!(id = %id, autoplay, resume_at = ?resume_at, "viewer: player started");
    self.process = Some(child);
    self.monitor_handle = Some(monitor_handle);
    self.status_rx = Some(rx);
    self.current = Some(id.to_string());
    self.last_status = None;
    self.paused = !autoplay;
    Ok(())
  }

  /// Drain status updates and detect a player that exited by itself.
  pub fn poll(&mut self) -> Vec<ViewerEvent> {
    let mut events = Vec::new();
    let Some(id) = self.current.clone() else { return events };

    if let Some(rx) = &mut self.status_rx {
      let mut latest = None;
      while let Ok(status) = rx.try_recv() {
        latest = Some(status);
      }
      if let Some(status) = latest {
        self.last_status = Some(status);
        events.push(ViewerEvent::Position { id: id.clone(), position: status.position });
      }
    }

    let exited = match self.process.as_mut().map(|p| p.try_wait()) {
      Some(Ok(Some(status))) => {
        debug!(id = %id, code = ?status.code(), "viewer: player exited");
        true
      }
      Some(Ok(None)) | None => false,
      Some(Err(e)) => {
        warn!(err = %e, "viewer: failed to poll player process");
        false
      }
    };
    if exited {
      let threshold = constants().completion_threshold_pct;
      let completed = self.last_status.and_then(|s| s.percent).is_some_and(|p| p >= threshold);
      self.process = None;
      self.status_rx = None;
      if let Some(handle) = self.monitor_handle.take() {
        handle.abort();
      }
      self.current = None;
      self.paused = false;
      events.push(ViewerEvent::Finished { id, completed });
    }
    events
  }

  pub async fn stop(&mut self) -> Result<()> {
    if let Some(handle) = self.monitor_handle.take() {
      handle.abort();
      let _ = handle.await;
    }
    self.status_rx = None;
    self.last_status = None;

    if let Some(mut child) = self.process.take() {
      child.kill().await.context("Failed to kill player process")?;
      let _ = child.wait().await;
      debug!(id = ?self.current, "viewer: player stopped");
    }

    self.current = None;
    self.paused = false;
    Ok(())
  }
}

/// Open the embed URL for `id` in the default browser.
pub fn open_in_browser(id: &str, autoplay: bool) -> Result<()> {
  let url = embed_url(id, autoplay);
  #[cfg(target_os = "macos")]
  let cmd = "open";
  #[cfg(not(target_os = "macos"))]
  let cmd = "xdg-open";
  let mut child = std::process::Command::new(cmd)
    .arg(&url)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .spawn()
    .with_context(|| format!("Failed to open browser with {}", cmd))?;
  // Reap the child in a background thread to avoid zombie processes.
  std::thread::spawn(move || {
    let _ = child.wait();
  });
  info!(url = %url, "viewer: opened in browser");
  Ok(())
}
