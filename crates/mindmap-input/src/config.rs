use mindmap_core::view::{MAX_ZOOM, MIN_ZOOM};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum GestureConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("Zoom bounds are inverted: min {min} > max {max}")]
    InvertedZoom { min: f64, max: f64 },
    #[error("Tap duration ({tap_ms} ms) must be shorter than long press ({long_press_ms} ms)")]
    TapOutlastsLongPress { tap_ms: u64, long_press_ms: u64 },
    #[error("Pan needs at least one pointer")]
    NoPanPointers,
}

/// Timing and distance thresholds for gesture disambiguation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Screen-space movement that turns a press into a drag.
    pub drag_threshold: f64,
    pub long_press_ms: u64,
    /// Longest press that still counts as a tap.
    pub tap_max_ms: u64,
    pub double_tap_window_ms: u64,
    /// Max distance between the two releases of a double tap.
    pub double_tap_slop: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Contact points needed before a drag on empty canvas pans.
    pub pan_min_pointers: usize,
    /// Zoom factor per wheel notch or toolbar step.
    pub zoom_step: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 8.0,
            long_press_ms: 450,
            tap_max_ms: 280,
            double_tap_window_ms: 300,
            double_tap_slop: 24.0,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            pan_min_pointers: 1,
            zoom_step: 1.2,
        }
    }
}

impl GestureConfig {
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn tap_max(&self) -> Duration {
        Duration::from_millis(self.tap_max_ms)
    }

    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_window_ms)
    }

    pub fn validate(&self) -> Result<(), GestureConfigError> {
        for (field, value) in [
            ("drag_threshold", self.drag_threshold),
            ("double_tap_slop", self.double_tap_slop),
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom),
            ("zoom_step", self.zoom_step),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(GestureConfigError::NotPositive { field, value });
            }
        }
        if self.min_zoom > self.max_zoom {
            return Err(GestureConfigError::InvertedZoom {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        if self.tap_max_ms >= self.long_press_ms {
            return Err(GestureConfigError::TapOutlastsLongPress {
                tap_ms: self.tap_max_ms,
                long_press_ms: self.long_press_ms,
            });
        }
        if self.pan_min_pointers == 0 {
            return Err(GestureConfigError::NoPanPointers);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(GestureConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: GestureConfig = serde_json::from_str(r#"{"long_press_ms": 600}"#).unwrap();
        assert_eq!(config.long_press_ms, 600);
        assert_eq!(config.tap_max_ms, 280);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = GestureConfig {
            tap_max_ms: 500,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GestureConfigError::TapOutlastsLongPress { .. })
        ));

        let config = GestureConfig {
            min_zoom: 5.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(GestureConfigError::InvertedZoom { .. })));

        let config = GestureConfig {
            drag_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
