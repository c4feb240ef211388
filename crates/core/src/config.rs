use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

pub const DEFAULT_SCAN_FRAMES: usize = 30;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 100;
pub const DEFAULT_LISTEN_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_SPEECH_RATE: u32 = 150;
pub const DEFAULT_SPEECH_VOLUME: f32 = 0.9;
pub const DEFAULT_HISTORY_FILE: &str = "mood_history.json";
pub const ENV_HISTORY_FILE: &str = "MOODCHECK_HISTORY_FILE";
pub const ENV_MOTIVATIONS_FILE: &str = "MOODCHECK_MOTIVATIONS";
pub const ENV_SCAN_FRAMES: &str = "MOODCHECK_SCAN_FRAMES";

/// Number of frames a scan intends to capture.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanWindow(usize);

impl ScanWindow {
    pub fn new(frames: usize) -> Result<Self, ConfigError> {
        if frames == 0 {
            return Err(ConfigError::EmptyScanWindow);
        }
        Ok(Self(frames))
    }

    pub fn frames(&self) -> usize {
        self.0
    }
}

impl Default for ScanWindow {
    fn default() -> Self {
        Self(DEFAULT_SCAN_FRAMES)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpeechSettings {
    /// Words per minute.
    pub rate: u32,
    pub volume: f32,
}

impl SpeechSettings {
    pub fn new(rate: u32, volume: f32) -> Result<Self, ConfigError> {
        if rate == 0 {
            return Err(ConfigError::ZeroSpeechRate);
        }
        if !(0.0..=1.0).contains(&volume) {
            return Err(ConfigError::VolumeOutOfRange(volume));
        }
        Ok(Self { rate, volume })
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            rate: DEFAULT_SPEECH_RATE,
            volume: DEFAULT_SPEECH_VOLUME,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(DEFAULT_HISTORY_FILE),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub scan: ScanWindow,
    pub frame_interval: Duration,
    pub listen_timeout: Duration,
    pub speech: SpeechSettings,
    pub history: HistoryConfig,
    pub motivations: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scan: ScanWindow::default(),
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
            listen_timeout: Duration::from_millis(DEFAULT_LISTEN_TIMEOUT_MS),
            speech: SpeechSettings::default(),
            history: HistoryConfig::default(),
            motivations: None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("scan window must capture at least one frame")]
    EmptyScanWindow,
    #[error("speech rate must be > 0")]
    ZeroSpeechRate,
    #[error("speech volume must be within 0.0..=1.0, got {0}")]
    VolumeOutOfRange(f32),
    #[error("invalid value for {key}: {value}")]
    InvalidEnvValue { key: String, value: String },
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_path_with_default(
    cli_value: Option<PathBuf>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> PathBuf {
    match cli_value {
        Some(v) => v,
        None => env
            .var(env_key)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(default)),
    }
}

pub fn resolve_optional_path(
    cli_value: Option<PathBuf>,
    env_key: &str,
    env: &impl Env,
) -> Option<PathBuf> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key).map(PathBuf::from),
    }
}

pub fn resolve_scan_window(
    cli_value: Option<usize>,
    env_key: &str,
    env: &impl Env,
) -> Result<ScanWindow, ConfigError> {
    let frames = match cli_value {
        Some(v) => v,
        None => match env.var(env_key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnvValue {
                    key: env_key.to_owned(),
                    value: raw.clone(),
                })?,
            None => DEFAULT_SCAN_FRAMES,
        },
    };
    ScanWindow::new(frames)
}
