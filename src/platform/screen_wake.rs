use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};

use crate::config::ScreenWakeOptions;

/// Keeps the display awake while the slideshow runs by shelling out to
/// user-provided inhibit/release commands.
#[derive(Debug, Clone)]
pub struct ScreenWakeController {
    inhibit_command: Option<String>,
    release_command: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum WakeAction {
    Inhibit,
    Release,
}

impl ScreenWakeController {
    pub fn new(opts: &ScreenWakeOptions) -> Self {
        Self {
            inhibit_command: opts.inhibit_command.clone(),
            release_command: opts.release_command.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inhibit_command.is_some() || self.release_command.is_some()
    }

    /// Failures are logged; a missing screensaver tool must not stop the slideshow.
    pub fn inhibit(&self) {
        self.perform(WakeAction::Inhibit);
    }

    pub fn release(&self) {
        self.perform(WakeAction::Release);
    }

    fn perform(&self, action: WakeAction) {
        let Some(command) = self.command_for(action) else {
            return;
        };
        match run_command(command) {
            Ok(()) => debug!(?action, command, "screen wake command succeeded"),
            Err(err) => warn!(?action, command, "screen wake command failed: {err:#}"),
        }
    }

    fn command_for(&self, action: WakeAction) -> Option<&str> {
        match action {
            WakeAction::Inhibit => self.inhibit_command.as_deref(),
            WakeAction::Release => self.release_command.as_deref(),
        }
    }
}

fn run_command(command: &str) -> Result<()> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .with_context(|| format!("failed to spawn shell for command: {command}"))?;

    if status.success() {
        Ok(())
    } else {
        Err(anyhow!(
            "command exited with status {}: {command}",
            status.code().unwrap_or(-1)
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn runs_inhibit_and_release_commands() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("state");
        let opts = ScreenWakeOptions {
            inhibit_command: Some(format!("echo on > {}", marker.display())),
            release_command: Some(format!("echo off > {}", marker.display())),
        };
        let wake = ScreenWakeController::new(&opts);
        assert!(wake.is_configured());

        wake.inhibit();
        assert_eq!(std::fs::read_to_string(&marker).unwrap().trim(), "on");
        wake.release();
        assert_eq!(std::fs::read_to_string(&marker).unwrap().trim(), "off");
    }

    #[test]
    fn unconfigured_controller_is_a_no_op() {
        let wake = ScreenWakeController::new(&ScreenWakeOptions::default());
        assert!(!wake.is_configured());
        wake.inhibit();
        wake.release();
    }
}
