use serde::Deserialize;

use super::error::DetectorError;

/// Encoding used by the default evidence sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceFormat {
    #[default]
    Png,
    Jpeg { quality: u8 },
}

/// Tunables for the detector. Every field has a default, so a partial JSON
/// document is enough to override a single value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Processed frames per second; ticks arriving faster are gated out.
    pub target_fps: u32,
    /// Background blend factor per processed tick.
    pub background_alpha: f64,
    /// Blend factor for the noise and brightness statistics.
    pub ema_alpha: f64,
    pub sensitivity_factor: f64,
    /// Consecutive qualifying ticks needed before motion is confirmed.
    pub confirm_frames: u32,
    pub pause_duration_ms: u64,
    /// How long the foreground mask shields the background after a detection.
    pub occlusion_hold_ms: u64,
    /// Cadence of remaining-time notifications while paused.
    pub pause_notify_interval_ms: u64,
    /// (width, height) of the marked evidence crop.
    pub evidence_output_size: (u32, u32),
    pub evidence_format: EvidenceFormat,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            target_fps: 10,
            background_alpha: 0.02,
            ema_alpha: 0.05,
            sensitivity_factor: 1.8,
            confirm_frames: 2,
            pause_duration_ms: 3000,
            occlusion_hold_ms: 3000,
            pause_notify_interval_ms: 200,
            evidence_output_size: (240, 160),
            evidence_format: EvidenceFormat::Png,
        }
    }
}

impl DetectorConfig {
    /// Flickering or grainy scenes: demand one more confirming frame and
    /// learn the background a little faster.
    pub fn for_noisy_scene() -> Self {
        Self {
            background_alpha: 0.04,
            sensitivity_factor: 2.4,
            confirm_frames: 3,
            ..Self::default()
        }
    }

    /// Still, evenly lit scenes.
    pub fn for_calm_scene() -> Self {
        Self {
            background_alpha: 0.01,
            sensitivity_factor: 1.2,
            confirm_frames: 2,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, DetectorError> {
        let config: DetectorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn frame_interval_ms(&self) -> u64 {
        1000 / self.target_fps.max(1) as u64
    }

    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.target_fps == 0 {
            return Err(DetectorError::InvalidConfig("target_fps must be > 0".into()));
        }
        if !(self.background_alpha > 0.0 && self.background_alpha <= 1.0) {
            return Err(DetectorError::InvalidConfig(format!(
                "background_alpha must be in (0, 1], got {}",
                self.background_alpha
            )));
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(DetectorError::InvalidConfig(format!(
                "ema_alpha must be in (0, 1], got {}",
                self.ema_alpha
            )));
        }
        if !(self.sensitivity_factor > 0.0) {
            return Err(DetectorError::InvalidConfig(
                "sensitivity_factor must be > 0".into(),
            ));
        }
        if self.confirm_frames == 0 {
            return Err(DetectorError::InvalidConfig("confirm_frames must be >= 1".into()));
        }
        let (w, h) = self.evidence_output_size;
        if w == 0 || h == 0 {
            return Err(DetectorError::InvalidConfig(
                "evidence_output_size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DetectorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_interval_ms(), 100);
        assert!(DetectorConfig::for_noisy_scene().validate().is_ok());
        assert!(DetectorConfig::for_calm_scene().validate().is_ok());
    }

    #[test]
    fn test_partial_json_override() {
        let config =
            DetectorConfig::from_json_str(r#"{ "confirm_frames": 4, "pause_duration_ms": 500 }"#)
                .unwrap();
        assert_eq!(config.confirm_frames, 4);
        assert_eq!(config.pause_duration_ms, 500);
        assert_eq!(config.target_fps, 10);
    }

    #[test]
    fn test_evidence_format_from_json() {
        let config = DetectorConfig::from_json_str(
            r#"{ "evidence_format": { "jpeg": { "quality": 70 } }, "evidence_output_size": [320, 200] }"#,
        )
        .unwrap();
        assert_eq!(config.evidence_format, EvidenceFormat::Jpeg { quality: 70 });
        assert_eq!(config.evidence_output_size, (320, 200));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero_fps = DetectorConfig {
            target_fps: 0,
            ..Default::default()
        };
        assert!(matches!(zero_fps.validate(), Err(DetectorError::InvalidConfig(_))));

        let bad_alpha = DetectorConfig {
            background_alpha: 1.5,
            ..Default::default()
        };
        assert!(bad_alpha.validate().is_err());

        let no_confirm = DetectorConfig {
            confirm_frames: 0,
            ..Default::default()
        };
        assert!(no_confirm.validate().is_err());

        assert!(matches!(
            DetectorConfig::from_json_str("{ not json"),
            Err(DetectorError::ConfigParse(_))
        ));
    }
}
