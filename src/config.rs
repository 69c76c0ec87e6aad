//! Configuration management

use crate::voice::VoiceSelector;
use crate::{Result, WinttsError};
use ini::Ini;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// SAPI volume range is 0-100
const MAX_VOLUME: u8 = 100;
/// SAPI rate range is -10 to 10
const MIN_RATE: i8 = -10;
const MAX_RATE: i8 = 10;

/// Application configuration
///
/// Persists the default voice, volume/rate settings, and an optional
/// PowerShell path override in ~/.wintts.cfg.
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path (~/.wintts.cfg)
    path: PathBuf,
}

impl Config {
    /// Load configuration from the default location or create it
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from an explicit path, creating defaults if
    /// the file does not exist
    pub fn load_from(path: PathBuf) -> Result<Self> {
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| WinttsError::Config(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| WinttsError::Config(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| WinttsError::Config(format!("Failed to save config: {}", e)))
    }

    /// Get config file path (~/.wintts.cfg)
    fn config_path() -> PathBuf {
        let home = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into())));
        home.join(".wintts.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create default configuration
    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("speech"))
            .set("voice", VoiceSelector::default().config_name())
            .set("volume", "100")
            .set("rate", "0");

        ini.with_section(Some("engine")).set("powershell", "auto");

        ini
    }

    fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.ini.section(Some(section)).and_then(|s| s.get(key))
    }

    /// Default voice selection
    pub fn voice(&self) -> VoiceSelector {
        self.get("speech", "voice")
            .map(VoiceSelector::parse)
            .unwrap_or_default()
    }

    /// Set and persistably record the voice selection
    pub fn set_voice(&mut self, voice: VoiceSelector) {
        self.ini
            .with_section(Some("speech"))
            .set("voice", voice.config_name());
    }

    /// Speech volume, clamped to 0-100 (default 100)
    pub fn volume(&self) -> u8 {
        self.get("speech", "volume")
            .and_then(|v| v.parse::<i64>().ok())
            .map(|v| v.clamp(0, MAX_VOLUME as i64) as u8)
            .unwrap_or(MAX_VOLUME)
    }

    /// Speech rate, clamped to -10..=10 (default 0)
    pub fn rate(&self) -> i8 {
        self.get("speech", "rate")
            .and_then(|v| v.parse::<i64>().ok())
            .map(|v| v.clamp(MIN_RATE as i64, MAX_RATE as i64) as i8)
            .unwrap_or(0)
    }

    /// PowerShell path override, if configured
    ///
    /// "auto" (the default) means discover the interpreter at startup.
    pub fn powershell_override(&self) -> Option<String> {
        match self.get("engine", "powershell") {
            None => None,
            Some(v) if v.trim().is_empty() || v.trim() == "auto" => None,
            Some(v) => Some(v.trim().to_string()),
        }
    }
}
