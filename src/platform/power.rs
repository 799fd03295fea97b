use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::trace;

use crate::config::PowerSource;

pub const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerStatus {
    Charging,
    Full,
    Discharging,
    NotCharging,
    Unknown,
}

impl PowerStatus {
    /// Accepts battery `status` words as well as the `0`/`1` of an `online` attribute.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "charging" | "1" => Self::Charging,
            "full" => Self::Full,
            "discharging" | "0" => Self::Discharging,
            "not charging" | "not-charging" => Self::NotCharging,
            _ => Self::Unknown,
        }
    }

    /// A full battery still sits on the charger, so it counts as charging.
    pub fn is_charging(self) -> bool {
        matches!(self, Self::Charging | Self::Full)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerMonitor {
    /// Every supply below the root directory is consulted.
    Auto { root: PathBuf },
    File(PathBuf),
    Command(String),
    Fixed(PowerStatus),
}

impl PowerMonitor {
    pub fn from_source(source: &PowerSource) -> Self {
        match source {
            PowerSource::Auto => Self::Auto {
                root: PathBuf::from(POWER_SUPPLY_ROOT),
            },
            PowerSource::Sysfs { path } => Self::File(path.clone()),
            PowerSource::Command { command } => Self::Command(command.clone()),
            PowerSource::Always => Self::Fixed(PowerStatus::Charging),
            PowerSource::Never => Self::Fixed(PowerStatus::Discharging),
        }
    }

    pub fn read(&self) -> Result<PowerStatus> {
        match self {
            Self::Auto { root } => scan_supplies(root),
            Self::File(path) => read_attribute(path),
            Self::Command(command) => run_status_command(command),
            Self::Fixed(status) => Ok(*status),
        }
    }
}

/// Charging if any external supply (mains, USB*, wireless) is online or any battery reports charging/full.
fn scan_supplies(root: &Path) -> Result<PowerStatus> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(PowerStatus::Unknown);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to list {}", root.display()));
        }
    };

    let mut overall = PowerStatus::Unknown;
    for entry in entries.filter_map(Result::ok) {
        let dir = entry.path();
        let kind = fs::read_to_string(dir.join("type")).unwrap_or_default();
        let status = match kind.trim() {
            "Battery" => read_attribute(&dir.join("status")).unwrap_or(PowerStatus::Unknown),
            kind if is_external_supply(kind) => match read_attribute(&dir.join("online")) {
                Ok(PowerStatus::Charging) => PowerStatus::Charging,
                Ok(_) => PowerStatus::Discharging,
                Err(_) => PowerStatus::Unknown,
            },
            _ => continue,
        };
        trace!(supply = %dir.display(), ?status, "power supply reading");
        if status.is_charging() {
            return Ok(status);
        }
        if overall == PowerStatus::Unknown {
            overall = status;
        }
    }
    Ok(overall)
}

/// `USB` also covers `USB_C`, `USB_PD`, `USB_DCP` and friends.
fn is_external_supply(kind: &str) -> bool {
    kind == "Mains" || kind == "Wireless" || kind.starts_with("USB")
}

fn read_attribute(path: &Path) -> Result<PowerStatus> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read power status from {}", path.display()))?;
    Ok(PowerStatus::parse(&raw))
}

fn run_status_command(command: &str) -> Result<PowerStatus> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .with_context(|| format!("failed to spawn shell for command: {command}"))?;

    if !output.status.success() {
        return Err(anyhow!(
            "command exited with status {}: {command}",
            output.status.code().unwrap_or(-1)
        ));
    }
    Ok(PowerStatus::parse(&String::from_utf8_lossy(&output.stdout)))
}
