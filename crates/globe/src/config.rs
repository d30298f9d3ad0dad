//! Engine tuning, loaded from JSON. Every field has a default, so an empty
//! object is a valid config.

use std::path::{Path, PathBuf};

use foundation::math::Vec3;
use runtime::{Frame, FrameCadence};
use scene::PinStyle;
use scene::prefabs::GlobeSettings;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound on how long a pointer move may wait for its hover probe.
const MAX_HOVER_DELAY_S: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub globe: GlobeConfig,
    pub camera: CameraConfig,
    pub fly_to: FlyToConfig,
    pub zoom: ZoomConfig,
    pub pins: PinConfig,
    pub picking: PickingConfig,
    pub starfield: StarfieldConfig,
    pub textures: TextureSources,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub sphere_radius: f64,
    pub atmosphere_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_deg: f64,
    pub near: f64,
    pub far: f64,
    pub initial_position: [f64; 3],
    pub min_distance: f64,
    pub max_distance: f64,
    /// Fraction of the remaining orbit velocity applied per frame.
    pub damping_factor: f64,
    /// 2.0 is one full turn every 30 seconds at 60 frames per second.
    pub auto_rotate_speed: f64,
    pub rotate_speed: f64,
    /// Per wheel notch; zooming in multiplies the distance by this.
    pub wheel_zoom_scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyToConfig {
    pub lerp_factor: f64,
    pub arrival_epsilon: f64,
    /// Viewing distance range a fly-to settles into.
    pub distance_band: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub zoom_in_factor: f64,
    pub zoom_out_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    pub dot_radius: f64,
    pub ring_radius: f64,
    pub ring_tube: f64,
    pub hit_radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickingConfig {
    /// Hover ray tests run on every n-th frame.
    pub hover_probe_interval: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarfieldConfig {
    pub count: usize,
    pub extent: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSources {
    pub albedo: Option<PathBuf>,
    pub roughness: Option<PathBuf>,
    pub normal: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            globe: GlobeConfig::default(),
            camera: CameraConfig::default(),
            fly_to: FlyToConfig::default(),
            zoom: ZoomConfig::default(),
            pins: PinConfig::default(),
            picking: PickingConfig::default(),
            starfield: StarfieldConfig::default(),
            textures: TextureSources::default(),
        }
    }
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            sphere_radius: 5.0,
            atmosphere_offset: 0.05,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: 45.0,
            near: 0.1,
            far: 1000.0,
            initial_position: [0.0, 10.0, 22.0],
            min_distance: 6.5,
            max_distance: 50.0,
            damping_factor: 0.05,
            auto_rotate_speed: 0.8,
            rotate_speed: 1.0,
            wheel_zoom_scale: 0.95,
        }
    }
}

impl Default for FlyToConfig {
    fn default() -> Self {
        Self {
            lerp_factor: 0.05,
            arrival_epsilon: 0.1,
            distance_band: [10.0, 20.0],
        }
    }
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            zoom_in_factor: 0.85,
            zoom_out_factor: 1.15,
        }
    }
}

impl Default for PinConfig {
    fn default() -> Self {
        let style = PinStyle::default();
        Self {
            dot_radius: style.dot_radius,
            ring_radius: style.ring_radius,
            ring_tube: style.ring_tube,
            hit_radius: style.hit_radius,
        }
    }
}

impl Default for PickingConfig {
    fn default() -> Self {
        Self {
            hover_probe_interval: 3,
        }
    }
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        let settings = GlobeSettings::default();
        Self {
            count: settings.starfield_count,
            extent: settings.starfield_extent,
            seed: settings.starfield_seed,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let radius = self.globe.sphere_radius;
        let cam = &self.camera;
        let fly = &self.fly_to;

        if !(radius.is_finite() && radius > 0.0) {
            return invalid(format!("sphere_radius must be positive, got {radius}"));
        }
        if self.globe.atmosphere_offset < 0.0 {
            return invalid("atmosphere_offset must not be negative".into());
        }
        if cam.min_distance <= radius {
            return invalid(format!(
                "min_distance {} must exceed sphere_radius {radius}",
                cam.min_distance
            ));
        }
        if cam.min_distance >= cam.max_distance {
            return invalid(format!(
                "min_distance {} must be below max_distance {}",
                cam.min_distance, cam.max_distance
            ));
        }
        if !(cam.fov_y_deg > 0.0 && cam.fov_y_deg < 180.0) {
            return invalid(format!("fov_y_deg {} out of (0, 180)", cam.fov_y_deg));
        }
        if !(cam.near > 0.0 && cam.near < cam.far) {
            return invalid(format!("near {} / far {} are not ordered", cam.near, cam.far));
        }
        if !(cam.damping_factor > 0.0 && cam.damping_factor <= 1.0) {
            return invalid(format!("damping_factor {} out of (0, 1]", cam.damping_factor));
        }
        if !(cam.wheel_zoom_scale > 0.0 && cam.wheel_zoom_scale < 1.0) {
            return invalid(format!("wheel_zoom_scale {} out of (0, 1)", cam.wheel_zoom_scale));
        }
        let [band_lo, band_hi] = fly.distance_band;
        if !(band_lo > 0.0 && band_lo <= band_hi) {
            return invalid(format!("fly-to distance_band [{band_lo}, {band_hi}] is inverted"));
        }
        if !(fly.lerp_factor > 0.0 && fly.lerp_factor <= 1.0) {
            return invalid(format!("lerp_factor {} out of (0, 1]", fly.lerp_factor));
        }
        if fly.arrival_epsilon <= 0.0 {
            return invalid("arrival_epsilon must be positive".into());
        }
        if !(self.zoom.zoom_in_factor > 0.0 && self.zoom.zoom_in_factor < 1.0) {
            return invalid(format!("zoom_in_factor {} out of (0, 1)", self.zoom.zoom_in_factor));
        }
        if self.zoom.zoom_out_factor <= 1.0 {
            return invalid(format!("zoom_out_factor {} must exceed 1", self.zoom.zoom_out_factor));
        }
        if self.picking.hover_probe_interval == 0 {
            return invalid("hover_probe_interval must be at least 1".into());
        }
        let hover_delay_s =
            FrameCadence::every(self.picking.hover_probe_interval).worst_case_delay_s(Frame::DEFAULT_DT_S);
        if hover_delay_s > MAX_HOVER_DELAY_S {
            return invalid(format!(
                "hover_probe_interval {} delays hover by {:.0} ms at 60 fps",
                self.picking.hover_probe_interval,
                hover_delay_s * 1000.0
            ));
        }
        let pins = &self.pins;
        if !(pins.dot_radius > 0.0 && pins.ring_tube > 0.0 && pins.ring_tube < pins.ring_radius) {
            return invalid("pin dimensions must be positive with ring_tube < ring_radius".into());
        }
        if pins.hit_radius < pins.ring_radius + pins.ring_tube {
            return invalid("hit_radius must enclose the ring".into());
        }
        Ok(())
    }

    pub fn globe_settings(&self) -> GlobeSettings {
        GlobeSettings {
            sphere_radius: self.globe.sphere_radius,
            atmosphere_offset: self.globe.atmosphere_offset,
            starfield_count: self.starfield.count,
            starfield_extent: self.starfield.extent,
            starfield_seed: self.starfield.seed,
        }
    }

    pub fn pin_style(&self) -> PinStyle {
        PinStyle {
            dot_radius: self.pins.dot_radius,
            ring_radius: self.pins.ring_radius,
            ring_tube: self.pins.ring_tube,
            hit_radius: self.pins.hit_radius,
            ..PinStyle::default()
        }
    }

    pub fn initial_camera_position(&self) -> Vec3 {
        Vec3::from_array(self.camera.initial_position)
    }
}

fn invalid(message: String) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(message))
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;
    use crate::error::ConfigError;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_gives_defaults() {
        let config = EngineConfig::from_json_str("{}").expect("valid");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.camera.min_distance, 6.5);
        assert_eq!(config.fly_to.distance_band, [10.0, 20.0]);
        assert_eq!(config.picking.hover_probe_interval, 3);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "camera": { "max_distance": 80 }, "textures": { "albedo": "earth.jpg" } }"#,
        )
        .expect("valid");
        assert_eq!(config.camera.max_distance, 80.0);
        assert_eq!(config.camera.min_distance, 6.5);
        assert_eq!(config.textures.albedo.as_deref(), Some(std::path::Path::new("earth.jpg")));
        assert!(config.textures.normal.is_none());
    }

    fn rejects(json: &str) {
        match EngineConfig::from_json_str(json) {
            Err(ConfigError::Invalid(_)) => {}
            other => panic!("expected invalid config for {json}, got {other:?}"),
        }
    }

    #[test]
    fn validation_rejects_inconsistent_values() {
        rejects(r#"{ "globe": { "sphere_radius": 0 } }"#);
        rejects(r#"{ "camera": { "min_distance": 4 } }"#);
        rejects(r#"{ "camera": { "min_distance": 60 } }"#);
        rejects(r#"{ "fly_to": { "distance_band": [20, 10] } }"#);
        rejects(r#"{ "fly_to": { "lerp_factor": 0 } }"#);
        rejects(r#"{ "fly_to": { "lerp_factor": 1.5 } }"#);
        rejects(r#"{ "picking": { "hover_probe_interval": 0 } }"#);
        rejects(r#"{ "picking": { "hover_probe_interval": 10 } }"#);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            EngineConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = EngineConfig::load(std::path::Path::new("/nonexistent/globe.json"))
            .expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
