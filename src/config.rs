//! Tunable parameters. Every field has a default, so a config file only
//! needs the values it overrides. Durations and easing curves are look and
//! feel, not correctness: the engine only requires them to be positive.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::camera::Easing;
use crate::error::{GlobeError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub camera: CameraConfig,
    pub scene: SceneConfig,
    pub interaction: InteractionConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Centre longitude of the home orientation
    pub home_lon: f64,
    /// Centre latitude of the home orientation
    pub home_lat: f64,
    /// Exploration framing: scale = min(width, height) / divisor
    pub base_scale_divisor: f64,
    /// Focused framing divisor (smaller = bigger globe)
    pub focus_scale_divisor: f64,
    pub narrow_base_scale_divisor: f64,
    pub narrow_focus_scale_divisor: f64,
    /// Viewports narrower than this (braille pixels) use the narrow divisors
    pub narrow_width: f64,
    pub zoom_duration_ms: u64,
    pub zoom_easing: Easing,
    pub reset_duration_ms: u64,
    pub reset_easing: Easing,
    pub path_duration_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            home_lon: 110.0,
            home_lat: 20.0,
            base_scale_divisor: 2.8,
            focus_scale_divisor: 0.8,
            narrow_base_scale_divisor: 2.5,
            narrow_focus_scale_divisor: 0.7,
            narrow_width: 160.0,
            zoom_duration_ms: 1200,
            zoom_easing: Easing::CubicInOut,
            reset_duration_ms: 800,
            reset_easing: Easing::CubicOut,
            path_duration_ms: 2000,
        }
    }
}

impl CameraConfig {
    pub fn zoom_duration(&self) -> Duration {
        Duration::from_millis(self.zoom_duration_ms)
    }

    pub fn reset_duration(&self) -> Duration {
        Duration::from_millis(self.reset_duration_ms)
    }

    pub fn path_duration(&self) -> Duration {
        Duration::from_millis(self.path_duration_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub star_count: usize,
    /// Twinkle angular rate in radians per second
    pub twinkle_rate: f64,
    /// Atmosphere gradient inner radius, as a fraction of the globe radius
    pub atmosphere_inner: f64,
    /// Atmosphere gradient outer radius, as a fraction of the globe radius
    pub atmosphere_outer: f64,
    /// Markers farther than this (radians) from the view centre are hidden
    pub hemisphere_limit: f64,
    pub dash_on: u32,
    pub dash_off: u32,
    /// Land mask resolution in cells per degree
    pub land_mask_resolution: usize,
    /// Callout card size in terminal cells
    pub callout_cols: u16,
    pub callout_rows: u16,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            star_count: 400,
            twinkle_rate: 5.0,
            atmosphere_inner: 0.9,
            atmosphere_outer: 1.05,
            hemisphere_limit: 1.57,
            dash_on: 4,
            dash_off: 4,
            land_mask_resolution: 2,
            callout_cols: 36,
            callout_rows: 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Rotation per dragged pixel is `drag_sensitivity / scale` degrees
    pub drag_sensitivity: f64,
    /// Marker clicks stay disabled this long after a drag ends
    pub click_debounce_ms: u64,
    /// Pick radius around a marker, braille pixels
    pub marker_hit_radius: f64,
    /// Pixel delta applied per arrow key press
    pub key_rotate_step: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            drag_sensitivity: 75.0,
            click_debounce_ms: 50,
            marker_hit_radius: 6.0,
            key_rotate_step: 8.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub intro_pause_ms: u64,
    pub dwell_ms: u64,
    /// Granularity at which a running playback notices `stop()`
    pub poll_interval_ms: u64,
    pub outro_pause_ms: u64,
    /// Fly along the path between consecutive records before zooming
    pub animate_paths: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            intro_pause_ms: 600,
            dwell_ms: 4000,
            poll_interval_ms: 100,
            outro_pause_ms: 500,
            animate_paths: true,
        }
    }
}

impl GlobeConfig {
    /// Load a JSON config file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let mut bytes = std::fs::read(path).map_err(|e| GlobeError::io(path, e))?;
        Self::from_json(&mut bytes)
    }

    /// Parse from JSON bytes (simd-json parses in place, hence `&mut`).
    pub fn from_json(bytes: &mut [u8]) -> Result<Self> {
        let config: GlobeConfig = simd_json::serde::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let cam = &self.camera;
        for (name, v) in [
            ("camera.base_scale_divisor", cam.base_scale_divisor),
            ("camera.focus_scale_divisor", cam.focus_scale_divisor),
            ("camera.narrow_base_scale_divisor", cam.narrow_base_scale_divisor),
            ("camera.narrow_focus_scale_divisor", cam.narrow_focus_scale_divisor),
            ("interaction.drag_sensitivity", self.interaction.drag_sensitivity),
            ("interaction.marker_hit_radius", self.interaction.marker_hit_radius),
            ("scene.atmosphere_outer", self.scene.atmosphere_outer),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(GlobeError::config(format!("{name} must be positive, got {v}")));
            }
        }
        for (name, ms) in [
            ("camera.zoom_duration_ms", cam.zoom_duration_ms),
            ("camera.reset_duration_ms", cam.reset_duration_ms),
            ("camera.path_duration_ms", cam.path_duration_ms),
            ("playback.poll_interval_ms", self.playback.poll_interval_ms),
        ] {
            if ms == 0 {
                return Err(GlobeError::config(format!("{name} must be non-zero")));
            }
        }
        if !(-90.0..=90.0).contains(&cam.home_lat) || !(-180.0..=180.0).contains(&cam.home_lon) {
            return Err(GlobeError::config("home orientation out of range"));
        }
        if self.scene.atmosphere_inner >= self.scene.atmosphere_outer {
            return Err(GlobeError::config("scene.atmosphere_inner must be below atmosphere_outer"));
        }
        if self.scene.land_mask_resolution == 0 {
            return Err(GlobeError::config("scene.land_mask_resolution must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        GlobeConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_override() {
        let mut json = br#"{"camera": {"zoom_duration_ms": 1800, "zoom_easing": "exp-in-out"}}"#.to_vec();
        let config = GlobeConfig::from_json(&mut json).unwrap();
        assert_eq!(config.camera.zoom_duration_ms, 1800);
        assert_eq!(config.camera.zoom_easing, Easing::ExpInOut);
        assert_eq!(config.camera.reset_duration_ms, 800);
        assert_eq!(config.playback.dwell_ms, 4000);
    }

    #[test]
    fn test_rejects_zero_divisor() {
        let mut json = br#"{"camera": {"focus_scale_divisor": 0.0}}"#.to_vec();
        let err = GlobeConfig::from_json(&mut json).unwrap_err();
        assert!(matches!(err, GlobeError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_duration() {
        let mut config = GlobeConfig::default();
        config.camera.path_duration_ms = 0;
        assert!(config.validate().is_err());
    }
}
