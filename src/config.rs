//! Configuration file and command-line handling.
//!
//! Settings come from `text-rain.toml` (or `--config <path>`), then CLI flags override them.

use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::app::{DEFAULT_THRESHOLD, Settings};
use crate::error::Error;
use crate::rain::SpawnText;

pub const DEFAULT_CONFIG_FILE: &str = "text-rain.toml";

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub rain: RainConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CameraConfig {
    #[serde(default)]
    pub device: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Shown instead of the camera when the camera cannot be opened.
    #[serde(default)]
    pub fallback_image: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: 0,
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            fallback_image: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RainConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub text_file: Option<PathBuf>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            debug: false,
            text: None,
            text_file: None,
            seed: None,
        }
    }
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn default_fps() -> u32 {
    30
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

impl Config {
    /// Load configuration from a file path.
    /// Returns the default config if the file doesn't exist, an error if it exists but is malformed.
    /// Values are not range-checked here; see [`Config::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let path = path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| Error::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| Error::ConfigParse { path, source })
    }

    /// Range checks. Run after CLI flags are applied, since a flag may fix a bad file value.
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.rain.threshold) {
            return Err(Error::InvalidSetting(format!(
                "threshold must be between 0.0 and 1.0, got {}",
                self.rain.threshold
            )));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(Error::InvalidSetting(
                "camera width and height must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Starting values for the runtime settings.
    pub fn settings(&self) -> Settings {
        Settings {
            debug: self.rain.debug,
            threshold: self.rain.threshold,
        }
    }

    /// The words to rain: `text_file` wins over `text`, which wins over the built-in poem.
    pub fn spawn_text(&self) -> Result<SpawnText, Error> {
        if let Some(path) = &self.rain.text_file {
            let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
                path: path.clone(),
                source,
            })?;
            return Ok(SpawnText::from_text(&text));
        }
        Ok(match &self.rain.text {
            Some(text) => SpawnText::from_text(text),
            None => SpawnText::default(),
        })
    }
}

/// Parse and validate threshold (0.0-1.0)
fn parse_threshold(s: &str) -> Result<f32, String> {
    let t: f32 = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(0.0..=1.0).contains(&t) {
        return Err(format!("Threshold must be between 0.0 and 1.0, got {}", t));
    }
    Ok(t)
}

/// Letters that rain down on whatever the camera sees.
#[derive(Parser, Debug, Default)]
#[command(name = "text-rain", version)]
pub struct Args {
    /// Config file (defaults to ./text-rain.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Camera device index
    #[arg(long)]
    pub device: Option<u32>,

    /// Use a still image instead of the camera
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Brightness cutoff for the obstacle mask (0.0-1.0)
    #[arg(long, value_parser = parse_threshold)]
    pub threshold: Option<f32>,

    /// Start with the obstacle mask on screen
    #[arg(long)]
    pub debug: bool,

    /// Seed for word and position picks
    #[arg(long)]
    pub seed: Option<u64>,

    /// Read the words to rain from this file
    #[arg(long)]
    pub text_file: Option<PathBuf>,
}

impl Args {
    /// Overlay the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(device) = self.device {
            config.camera.device = device;
        }
        if let Some(t) = self.threshold {
            config.rain.threshold = t;
        }
        if self.debug {
            config.rain.debug = true;
        }
        if let Some(seed) = self.seed {
            config.rain.seed = Some(seed);
        }
        if let Some(path) = &self.text_file {
            config.rain.text_file = Some(path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.rain.threshold, DEFAULT_THRESHOLD);
        assert_eq!((config.camera.width, config.camera.height), (640, 480));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rain]\nthreshold = 0.3\nseed = 42\n\n[camera]\ndevice = 2").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.rain.threshold, 0.3);
        assert_eq!(config.rain.seed, Some(42));
        assert_eq!(config.camera.device, 2);
        assert_eq!(config.camera.fps, 30);
        assert!(!config.rain.debug);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rain\nthreshold = ").unwrap();
        assert!(matches!(
            Config::load(Some(file.path())),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rain]\nthreshold = 1.5").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert!(matches!(config.validate(), Err(Error::InvalidSetting(_))));
    }

    #[test]
    fn cli_threshold_rescues_bad_file_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rain]\nthreshold = 1.5").unwrap();
        let mut config = Config::load(Some(file.path())).unwrap();
        Args::parse_from(["text-rain", "--threshold", "0.5"]).apply(&mut config);
        assert!(config.validate().is_ok());
        assert_eq!(config.rain.threshold, 0.5);
    }

    #[test]
    fn zero_sized_camera_is_rejected() {
        let mut config = Config::default();
        config.camera.width = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidSetting(_))));
    }

    #[test]
    fn text_file_wins_over_inline_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "rain on me").unwrap();
        let mut config = Config::default();
        config.rain.text = Some("ignored".into());
        config.rain.text_file = Some(file.path().to_path_buf());
        let text = config.spawn_text().unwrap();
        assert_eq!(text.words(), ["rain", "on", "me"]);
    }

    #[test]
    fn cli_overrides_file() {
        let args = Args::parse_from([
            "text-rain",
            "--threshold",
            "0.25",
            "--debug",
            "--seed",
            "9",
            "--device",
            "1",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.settings(), Settings { debug: true, threshold: 0.25 });
        assert_eq!(config.rain.seed, Some(9));
        assert_eq!(config.camera.device, 1);
    }

    #[test]
    fn cli_rejects_bad_threshold() {
        assert!(Args::try_parse_from(["text-rain", "--threshold", "2"]).is_err());
        assert!(parse_threshold("abc").is_err());
        assert_eq!(parse_threshold("0.5"), Ok(0.5));
    }
}
