use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use palette::{LinSrgba, Srgb, Srgba};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// Root directory to scan recursively for images.
    pub photo_library_path: PathBuf,
    /// Optional deterministic seed for the startup shuffle.
    #[serde(default)]
    pub startup_shuffle_seed: Option<u64>,
    /// Maximum number of concurrent image decodes in the loader.
    #[serde(default = "Configuration::default_loader_max_concurrent_decodes")]
    pub loader_max_concurrent_decodes: usize,
    /// Browsing view shown unless the slideshow conditions hold.
    #[serde(default)]
    pub grid: GridOptions,
    /// Full-screen auto-advancing view.
    #[serde(default)]
    pub slideshow: SlideshowOptions,
    /// Where the charging signal comes from.
    #[serde(default)]
    pub power: PowerOptions,
    /// Where the orientation signal comes from.
    #[serde(default)]
    pub orientation: OrientationSource,
    /// Commands keeping the screen on while the slideshow runs.
    #[serde(default)]
    pub screen_wake: ScreenWakeOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.photo_library_path.as_os_str().is_empty(),
            "photo-library-path must not be empty"
        );
        ensure!(
            self.loader_max_concurrent_decodes > 0,
            "loader-max-concurrent-decodes must be greater than zero"
        );
        self.grid.validate()?;
        self.slideshow.validate()?;
        self.power.validate()?;
        self.screen_wake.validate()?;
        Ok(self)
    }

    const fn default_loader_max_concurrent_decodes() -> usize {
        4
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct GridOptions {
    pub columns: u32,
    /// Edge length of the square thumbnails produced by the loader.
    pub thumbnail_size: u32,
    /// Gap between cells in physical pixels.
    pub spacing: u32,
    pub background: String,
}

impl GridOptions {
    fn validate(&self) -> Result<()> {
        ensure!(self.columns >= 1, "grid.columns must be at least 1");
        ensure!(
            self.thumbnail_size > 0,
            "grid.thumbnail-size must be greater than zero"
        );
        ensure!(
            parse_hex_color(&self.background).is_some(),
            "grid.background must be a hex colour such as #FFFFFF"
        );
        Ok(())
    }

    pub fn background_color(&self) -> LinSrgba<f32> {
        parse_hex_color(&self.background).unwrap_or_else(white)
    }
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            columns: 4,
            thumbnail_size: 200,
            spacing: 2,
            background: "#FFFFFF".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SlideshowOptions {
    /// Time each picture stays on screen before the next one starts fading in.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Cross-fade duration; zero switches pictures instantly.
    #[serde(with = "humantime_serde")]
    pub transition: Duration,
    pub background: String,
}

impl SlideshowOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.interval > Duration::ZERO,
            "slideshow.interval must be positive"
        );
        ensure!(
            self.transition < self.interval,
            "slideshow.transition must be shorter than slideshow.interval"
        );
        ensure!(
            parse_hex_color(&self.background).is_some(),
            "slideshow.background must be a hex colour such as #000000"
        );
        Ok(())
    }

    pub fn background_color(&self) -> LinSrgba<f32> {
        parse_hex_color(&self.background).unwrap_or_else(black)
    }
}

impl Default for SlideshowOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            transition: Duration::from_millis(500),
            background: "#000000".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PowerOptions {
    pub source: PowerSource,
    /// How often the power source is re-read.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl PowerOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.poll_interval >= Duration::from_millis(100),
            "power.poll-interval must be at least 100ms"
        );
        match &self.source {
            PowerSource::Sysfs { path } => ensure!(
                !path.as_os_str().is_empty(),
                "power.source.path must not be empty"
            ),
            PowerSource::Command { command } => ensure!(
                !command.trim().is_empty(),
                "power.source.command must not be blank"
            ),
            PowerSource::Auto | PowerSource::Always | PowerSource::Never => {}
        }
        Ok(())
    }
}

impl Default for PowerOptions {
    fn default() -> Self {
        Self {
            source: PowerSource::default(),
            poll_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PowerSource {
    /// Scan `/sys/class/power_supply` for batteries and mains adapters.
    #[default]
    Auto,
    /// Read a single `status` or `online` attribute.
    Sysfs { path: PathBuf },
    /// Run a shell command whose stdout names the power status.
    Command { command: String },
    /// Treat the device as permanently charging.
    Always,
    /// Treat the device as never charging.
    Never,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrientationSource {
    /// Landscape whenever the window is wider than it is tall.
    #[default]
    Auto,
    Landscape,
    Portrait,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ScreenWakeOptions {
    /// Run when the slideshow starts, e.g. `xset s off -dpms`.
    pub inhibit_command: Option<String>,
    /// Run when the slideshow stops, e.g. `xset s on +dpms`.
    pub release_command: Option<String>,
}

impl ScreenWakeOptions {
    fn validate(&self) -> Result<()> {
        for (label, cmd) in [
            ("screen-wake.inhibit-command", &self.inhibit_command),
            ("screen-wake.release-command", &self.release_command),
        ] {
            if let Some(cmd) = cmd {
                ensure!(!cmd.trim().is_empty(), "{label} must not be blank");
            }
        }
        Ok(())
    }
}

pub fn parse_hex_color(input: &str) -> Option<LinSrgba<f32>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(rgba) = Srgba::<u8>::from_str(trimmed) {
        let rgba_f32: Srgba<f32> = rgba.into_format();
        return Some(rgba_f32.into_linear());
    }

    let rgb = Srgb::<u8>::from_str(trimmed).ok()?;
    let rgba = Srgba::new(rgb.red, rgb.green, rgb.blue, 255);
    let rgba_f32: Srgba<f32> = rgba.into_format();
    Some(rgba_f32.into_linear())
}

fn white() -> LinSrgba<f32> {
    LinSrgba::new(1.0, 1.0, 1.0, 1.0)
}

fn black() -> LinSrgba<f32> {
    LinSrgba::new(0.0, 0.0, 0.0, 1.0)
}
