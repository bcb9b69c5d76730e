//! Player preferences
//!
//! Persisted as JSON next to the binary (or wherever `--settings` points).

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{FLOW_TICK_MS, SLIDE_SETTLE_MS};
use crate::level::Difficulty;

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Generator tier for new boards
    pub difficulty: Difficulty,
    /// Any spill loses the run
    pub no_spill: bool,

    // === Timing ===
    /// Delay between flow wavefronts
    pub flow_tick_ms: u64,
    /// Movement lock after each slide
    pub slide_settle_ms: u64,

    // === Generator ===
    /// Candidates generated per new board before falling back
    pub batch_size: usize,
    /// Random slides applied to a freshly generated board
    pub scramble_moves: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            no_spill: false,

            flow_tick_ms: FLOW_TICK_MS,
            slide_settle_ms: SLIDE_SETTLE_MS,

            batch_size: 8,
            scramble_moves: 30,
        }
    }
}

impl Settings {
    /// Defaults with a different tier
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Load settings from a JSON file, falling back to defaults when the file
    /// is missing or unreadable
    pub fn load(path: &Path) -> Self {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("Using default settings");
                return Self::default();
            }
            Err(e) => {
                log::warn!("Could not read {}: {e}", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str(&json) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring malformed settings in {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pipe-slide-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn test_defaults_use_timing_constants() {
        let settings = Settings::default();
        assert_eq!(settings.flow_tick_ms, 500);
        assert_eq!(settings.slide_settle_ms, 300);
        assert_eq!(Settings::for_difficulty(Difficulty::Hard).difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = temp_path("missing");
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("saved");
        let settings = Settings {
            difficulty: Difficulty::Easy,
            no_spill: true,
            scramble_moves: 5,
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_partial_and_malformed_files() {
        let path = temp_path("partial");
        fs::write(&path, r#"{ "difficulty": "hard" }"#).unwrap();
        let settings = Settings::load(&path);
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert_eq!(settings.batch_size, Settings::default().batch_size);

        fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
        fs::remove_file(&path).unwrap();
    }
}
