use crate::error::SessionError;
use mindmap_graph::SurfaceConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Window in which repeated moves of one node coalesce into one write.
    pub move_debounce_ms: u64,
    pub ready_timeout_ms: u64,
    /// Seed an empty document with a central node when it is opened.
    pub seed_empty: bool,
    pub seed_label: String,
    /// Use the pseudo-random id fallback instead of the OS generator.
    pub pseudo_random_ids: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            move_debounce_ms: 500,
            ready_timeout_ms: 12_000,
            seed_empty: true,
            seed_label: "Central idea".to_string(),
            pseudo_random_ids: false,
        }
    }
}

impl SessionSettings {
    pub fn move_debounce(&self) -> Duration {
        Duration::from_millis(self.move_debounce_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MindmapSettings {
    pub session: SessionSettings,
    /// Gestures, physics, emphasis and screen of the rendering surface.
    pub surface: SurfaceConfig,
}

impl MindmapSettings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mindmap").join("settings.json"))
    }

    /// A missing file yields defaults; an unreadable or malformed one is an
    /// error rather than a silent fallback.
    pub fn load_from(path: &Path) -> Result<Self, SessionError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| SessionError::SettingsIo {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self =
            serde_json::from_str(&content).map_err(|source| SessionError::SettingsFormat {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        tracing::info!(path = %path.display(), "Settings loaded");
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SessionError> {
        let io_error = |source| SessionError::SettingsIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| {
            SessionError::SettingsFormat {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, content).map_err(io_error)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.session.ready_timeout_ms == 0 {
            return Err(SessionError::Settings(
                "session.ready_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.session.seed_empty && self.session.seed_label.trim().is_empty() {
            return Err(SessionError::Settings(
                "session.seed_label must not be empty when seeding".to_string(),
            ));
        }
        self.surface
            .validate()
            .map_err(|e| SessionError::Settings(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = MindmapSettings::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, MindmapSettings::default());
        assert_eq!(settings.session.move_debounce(), Duration::from_millis(500));
        assert_eq!(settings.surface.gestures.long_press_ms, 450);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "session": { "move_debounce_ms": 250 }, "surface": { "layout": { "max_iterations": 50 } } }"#,
        )
        .unwrap();
        let settings = MindmapSettings::load_from(&path).unwrap();
        assert_eq!(settings.session.move_debounce_ms, 250);
        assert_eq!(settings.session.ready_timeout_ms, 12_000);
        assert_eq!(settings.surface.layout.max_iterations, 50);
        assert_eq!(settings.surface.layout.spring_length, 200.0);
    }

    #[test]
    fn test_malformed_and_invalid_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            MindmapSettings::load_from(&path),
            Err(SessionError::SettingsFormat { .. })
        ));

        std::fs::write(&path, r#"{ "surface": { "gestures": { "min_zoom": 5.0 } } }"#).unwrap();
        assert!(matches!(
            MindmapSettings::load_from(&path),
            Err(SessionError::Settings(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = MindmapSettings::default();
        settings.session.seed_empty = false;
        settings.save_to(&path).unwrap();
        assert_eq!(MindmapSettings::load_from(&path).unwrap(), settings);
    }
}
