//! OS capability: processes, screen capture, input synthesis
//!
//! Screen capture and input need the `desktop` feature (xcap + enigo);
//! without it those calls report `OsError::Unsupported`.

use crate::error::OsError;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// None when the process was ended by a signal
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Synthetic keyboard or mouse event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    Type { text: String },
    Key { key: String },
    MoveMouse { x: i32, y: i32 },
    Click { x: i32, y: i32 },
    Scroll { dy: i32 },
}

#[async_trait]
pub trait OsCapability: Send + Sync {
    /// Run through the platform shell and wait, killing it after `timeout`
    async fn run(&self, command: &str, timeout: Duration) -> Result<CommandOutput, OsError>;

    /// Start a program and return without waiting for it
    async fn launch(&self, command: &str) -> Result<(), OsError>;

    /// Full-screen capture into `dir`, returning the file written
    async fn screenshot(&self, dir: &Path) -> Result<PathBuf, OsError>;

    async fn synthesize_input(&self, event: &InputEvent) -> Result<(), OsError>;
}

/// `<dir>/screenshot_YYYYmmdd_HHMMSS.png`
pub fn screenshot_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("screenshot_{}.png", at.format("%Y%m%d_%H%M%S")))
}

fn shell_command(command: &str) -> tokio::process::Command {
    let (shell, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
    let mut cmd = tokio::process::Command::new(shell);
    cmd.arg(flag).arg(command);
    cmd
}

/// The real operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOs;

#[async_trait]
impl OsCapability for SystemOs {
    async fn run(&self, command: &str, timeout: Duration) -> Result<CommandOutput, OsError> {
        log::debug!("running '{}'", command);

        let child = shell_command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OsError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| OsError::Timeout(timeout.as_secs()))??;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        })
    }

    async fn launch(&self, command: &str) -> Result<(), OsError> {
        log::info!("launching '{}'", command);

        let mut child = shell_command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| OsError::Spawn {
                command: command.to_string(),
                source,
            })?;

        // Reap in the background so the launched program never turns zombie
        tokio::spawn(async move {
            let _ = child.wait().await;
        });
        Ok(())
    }

    async fn screenshot(&self, dir: &Path) -> Result<PathBuf, OsError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = screenshot_path(dir, Local::now());
        capture_screen(path).await
    }

    async fn synthesize_input(&self, event: &InputEvent) -> Result<(), OsError> {
        send_input(event.clone()).await
    }
}

#[cfg(feature = "desktop")]
async fn capture_screen(path: PathBuf) -> Result<PathBuf, OsError> {
    tokio::task::spawn_blocking(move || {
        let monitors = xcap::Monitor::all().map_err(|e| OsError::Capture(e.to_string()))?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary())
            .or_else(|| monitors.first())
            .ok_or_else(|| OsError::Capture("no monitor found".to_string()))?;

        let image = monitor
            .capture_image()
            .map_err(|e| OsError::Capture(e.to_string()))?;
        image
            .save(&path)
            .map_err(|e| OsError::Capture(e.to_string()))?;

        log::info!("screenshot saved to {}", path.display());
        Ok(path)
    })
    .await
    .map_err(|e| OsError::Capture(e.to_string()))?
}

#[cfg(not(feature = "desktop"))]
async fn capture_screen(_path: PathBuf) -> Result<PathBuf, OsError> {
    Err(OsError::Unsupported("screen capture"))
}

#[cfg(feature = "desktop")]
fn parse_key(key: &str) -> Result<enigo::Key, OsError> {
    use enigo::Key;

    match key.to_lowercase().as_str() {
        "enter" | "return" => Ok(Key::Return),
        "tab" => Ok(Key::Tab),
        "escape" | "esc" => Ok(Key::Escape),
        "backspace" => Ok(Key::Backspace),
        "space" => Ok(Key::Space),
        "up" => Ok(Key::UpArrow),
        "down" => Ok(Key::DownArrow),
        "left" => Ok(Key::LeftArrow),
        "right" => Ok(Key::RightArrow),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Key::Unicode(c)),
                _ => Err(OsError::Input(format!("unknown key '{}'", key))),
            }
        }
    }
}

#[cfg(feature = "desktop")]
async fn send_input(event: InputEvent) -> Result<(), OsError> {
    use enigo::{Axis, Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};

    tokio::task::spawn_blocking(move || {
        let input_err = |e: &dyn std::fmt::Debug| OsError::Input(format!("{:?}", e));
        let mut enigo = Enigo::new(&Settings::default()).map_err(|e| input_err(&e))?;

        match event {
            InputEvent::Type { text } => enigo.text(&text).map_err(|e| input_err(&e)),
            InputEvent::Key { key } => enigo
                .key(parse_key(&key)?, Direction::Click)
                .map_err(|e| input_err(&e)),
            InputEvent::MoveMouse { x, y } => enigo
                .move_mouse(x, y, Coordinate::Abs)
                .map_err(|e| input_err(&e)),
            InputEvent::Click { x, y } => {
                enigo
                    .move_mouse(x, y, Coordinate::Abs)
                    .map_err(|e| input_err(&e))?;
                enigo
                    .button(Button::Left, Direction::Click)
                    .map_err(|e| input_err(&e))
            }
            InputEvent::Scroll { dy } => enigo.scroll(dy, Axis::Vertical).map_err(|e| input_err(&e)),
        }
    })
    .await
    .map_err(|e| OsError::Input(e.to_string()))?
}

#[cfg(not(feature = "desktop"))]
async fn send_input(_event: InputEvent) -> Result<(), OsError> {
    Err(OsError::Unsupported("input synthesis"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_screenshot_path() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let path = screenshot_path(Path::new("shots"), at);

        assert_eq!(path, PathBuf::from("shots/screenshot_20240309_140507.png"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_output() {
        let output = SystemOs
            .run("echo hello; echo oops 1>&2; exit 3", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
        assert_eq!(output.code, Some(3));
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_times_out() {
        let err = SystemOs
            .run("sleep 5", Duration::from_millis(100))
            .await
            .unwrap_err();

        assert!(matches!(err, OsError::Timeout(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_returns_immediately() {
        let started = std::time::Instant::now();
        SystemOs.launch("sleep 2").await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[cfg(not(feature = "desktop"))]
    #[tokio::test]
    async fn test_screen_features_need_desktop_build() {
        let dir = tempfile::tempdir().unwrap();

        let err = SystemOs.screenshot(dir.path()).await.unwrap_err();
        assert!(matches!(err, OsError::Unsupported(_)));

        let err = SystemOs
            .synthesize_input(&InputEvent::Type {
                text: "hi".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OsError::Unsupported(_)));
    }
}
