//! Application settings management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::pipeline::PipelineOptions;

/// Application theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
    System,
}

impl Theme {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
            Self::System => "System",
        }
    }

    pub fn all() -> &'static [Theme] {
        &[Theme::Dark, Theme::Light, Theme::System]
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // General
    /// Application theme
    pub theme: Theme,

    // Automation
    /// Start a session when a bound executable is launched
    pub process_detection_enabled: bool,
    /// Process detector poll interval in ms
    pub detector_interval_ms: u32,

    // Tracking
    /// Delay between two pipeline frames in ms
    pub pipeline_interval_ms: u32,
    /// How often the pose display is redrawn in ms
    pub pose_refresh_ms: u32,

    // Advanced
    /// Custom data directory
    pub data_directory: Option<PathBuf>,

    // UI State (not user-configurable, just persisted)
    /// Profile active when the application last closed
    pub last_profile: Option<String>,
    /// Window size
    pub window_size: Option<(u32, u32)>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            process_detection_enabled: true,
            detector_interval_ms: 1000,
            pipeline_interval_ms: 4,
            pose_refresh_ms: 50,
            data_directory: None,
            last_profile: None,
            window_size: None,
        }
    }
}

impl Settings {
    /// Get the data directory, using default if not set
    pub fn get_data_directory(&self) -> PathBuf {
        self.data_directory.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(crate::APP_NAME)
        })
    }

    /// Validate settings and fix any invalid values
    pub fn validate(&mut self) {
        self.detector_interval_ms = self.detector_interval_ms.max(250);
        self.pipeline_interval_ms = self.pipeline_interval_ms.clamp(1, 100);
        self.pose_refresh_ms = self.pose_refresh_ms.max(16);
    }

    pub fn detector_interval(&self) -> Duration {
        Duration::from_millis(self.detector_interval_ms as u64)
    }

    pub fn pose_refresh(&self) -> Duration {
        Duration::from_millis(self.pose_refresh_ms as u64)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            interval: Duration::from_millis(self.pipeline_interval_ms as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_clamps_intervals() {
        let mut settings = Settings {
            detector_interval_ms: 10,
            pipeline_interval_ms: 0,
            pose_refresh_ms: 1,
            ..Default::default()
        };
        settings.validate();
        assert_eq!(settings.detector_interval_ms, 250);
        assert_eq!(settings.pipeline_interval_ms, 1);
        assert_eq!(settings.pose_refresh_ms, 16);

        settings.pipeline_interval_ms = 5000;
        settings.validate();
        assert_eq!(settings.pipeline_options().interval, Duration::from_millis(100));
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"theme":"Light"}"#).unwrap();
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.detector_interval_ms, 1000);
        assert!(settings.process_detection_enabled);
    }
}
