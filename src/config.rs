use std::fs;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::ClassifierConfig;
use crate::error::Error;
use crate::filter::FilterConfig;
use crate::monitor::MonitorConfig;
use crate::scheduler::SamplerConfig;

/// All tunables of the pipeline. Every section and key is optional in TOML.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub classifier: ClassifierConfig,
    pub filter: FilterConfig,
    pub monitor: MonitorConfig,
    pub sampler: SamplerConfig,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        debug!("loading settings from {}", path.display());

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, Error> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;

        Ok(settings)
    }

    /// Rejects confidences outside `[0, 1]` (or NaN) and empty windows.
    pub fn validate(&self) -> Result<(), Error> {
        let c = &self.classifier;
        let m = &self.monitor;

        for confidence in [
            c.no_face_confidence,
            c.sleeping_confidence,
            c.moving_confidence,
            c.idle_confidence,
            c.working_confidence,
            c.keypoint_min_score,
            m.fallback_confidence,
            m.fallback_threshold,
        ] {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(Error::InvalidConfidence(confidence));
            }
        }

        for (key, value) in [
            ("classifier.closed_eye_threshold", c.closed_eye_threshold),
            ("classifier.movement_threshold", c.movement_threshold),
            ("classifier.idle_threshold", c.idle_threshold),
            ("filter.hysteresis_ratio", self.filter.hysteresis_ratio),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(key, value));
            }
        }

        if self.filter.recent_window_ms <= 0 {
            return Err(invalid("filter.recent_window_ms", self.filter.recent_window_ms));
        }

        for (key, value) in [
            ("classifier.min_pose_window", c.min_pose_window),
            ("monitor.pose_capacity", m.pose_capacity),
            ("monitor.behavior_capacity", m.behavior_capacity),
        ] {
            if value == 0 {
                return Err(invalid(key, value));
            }
        }

        if m.fallback_timeout_ms == 0 {
            return Err(invalid("monitor.fallback_timeout_ms", m.fallback_timeout_ms));
        }

        if self.sampler.interval_ms == 0 {
            return Err(invalid("sampler.interval_ms", self.sampler.interval_ms));
        }

        Ok(())
    }
}

fn invalid(key: &'static str, value: impl std::fmt::Display) -> Error {
    Error::InvalidSetting {
        key,
        reason: format!("{value} is out of range"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(Settings::from_toml("").unwrap(), Settings::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let settings = Settings::from_toml(
            r#"
            [classifier]
            movement_threshold = 8.0

            [filter]
            recent_window_ms = 10000

            [monitor]
            fallback_timeout_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(settings.classifier.movement_threshold, 8.0);
        assert_eq!(settings.classifier.idle_threshold, 2.0);
        assert_eq!(settings.filter.recent_window_ms, 10_000);
        assert_eq!(settings.filter.min_sleeping_entries, 2);
        assert_eq!(settings.monitor.fallback_timeout_ms, 500);
        assert_eq!(settings.monitor.behavior_capacity, 10);
        assert_eq!(settings.sampler, SamplerConfig::default());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = Settings::from_toml("[filter]\nrecent_window_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn out_of_range_confidences_are_rejected() {
        for doc in [
            "[classifier]\nworking_confidence = nan",
            "[classifier]\nno_face_confidence = 1.5",
            "[monitor]\nfallback_threshold = 7.0",
            "[monitor]\nfallback_confidence = -0.1",
        ] {
            let err = Settings::from_toml(doc).unwrap_err();
            assert!(matches!(err, Error::InvalidConfidence(_)), "{doc}: {err}");
        }
    }

    #[test]
    fn empty_windows_are_rejected() {
        for (doc, expected) in [
            ("[filter]\nrecent_window_ms = -1", "filter.recent_window_ms"),
            ("[filter]\nrecent_window_ms = 0", "filter.recent_window_ms"),
            ("[classifier]\nmin_pose_window = 0", "classifier.min_pose_window"),
            ("[monitor]\nbehavior_capacity = 0", "monitor.behavior_capacity"),
            ("[classifier]\nmovement_threshold = inf", "classifier.movement_threshold"),
        ] {
            match Settings::from_toml(doc) {
                Err(Error::InvalidSetting { key, .. }) => assert_eq!(key, expected),
                other => panic!("{doc}: expected invalid setting, got {other:?}"),
            }
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Settings::load("/nonexistent/behavior-filter.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
