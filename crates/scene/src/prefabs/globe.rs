//! The fixed part of the scene: the globe itself and everything around it.

use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Linear RGB in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn as_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlobeSettings {
    pub sphere_radius: f64,
    pub atmosphere_offset: f64,
    pub starfield_count: usize,
    /// Side length of the cube the stars are scattered in.
    pub starfield_extent: f64,
    pub starfield_seed: u64,
}

impl Default for GlobeSettings {
    fn default() -> Self {
        Self {
            sphere_radius: 5.0,
            atmosphere_offset: 0.05,
            starfield_count: 2000,
            starfield_extent: 800.0,
            starfield_seed: 0x5eed,
        }
    }
}

/// Physically based surface parameters. Texture maps override the scalar
/// values once they are loaded.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceMaterial {
    pub base_color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub clearcoat: f32,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self {
            base_color: Color::from_hex(0x111111),
            roughness: 0.6,
            metalness: 0.2,
            clearcoat: 0.1,
        }
    }
}

/// Glow shell drawn additively with back faces only. Never hit-tested.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AtmosphereShell {
    pub radius: f64,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Fog {
    pub color: Color,
    pub density: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f32,
    },
    Directional {
        color: Color,
        intensity: f32,
        position: Vec3,
    },
    Spot {
        color: Color,
        intensity: f32,
        position: Vec3,
        target: Vec3,
    },
}

pub fn default_light_rig() -> Vec<Light> {
    vec![
        Light::Ambient {
            color: Color::from_hex(0x4040ff),
            intensity: 0.5,
        },
        Light::Directional {
            color: Color::from_hex(0xffffff),
            intensity: 2.0,
            position: Vec3::new(20.0, 10.0, 10.0),
        },
        // Rim light from behind and above.
        Light::Spot {
            color: Color::from_hex(0x00ffff),
            intensity: 3.0,
            position: Vec3::new(-10.0, 15.0, -5.0),
            target: Vec3::ZERO,
        },
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct Starfield {
    pub points: Vec<Vec3>,
    pub color: Color,
    pub opacity: f32,
    /// Point size in world units.
    pub size: f32,
}

impl Starfield {
    /// Scatters `count` points uniformly in a cube of side `extent` around the origin.
    pub fn generate(count: usize, extent: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut coord = || (rng.random::<f64>() - 0.5) * extent;
        let points = (0..count)
            .map(|_| Vec3::new(coord(), coord(), coord()))
            .collect();
        Self {
            points,
            color: Color::from_hex(0x88ccff),
            opacity: 0.6,
            size: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobePrefab {
    pub radius: f64,
    pub surface: SurfaceMaterial,
    pub atmosphere: AtmosphereShell,
    pub starfield: Starfield,
    pub lights: Vec<Light>,
    pub fog: Fog,
}

impl GlobePrefab {
    pub fn build(settings: &GlobeSettings) -> Self {
        Self {
            radius: settings.sphere_radius,
            surface: SurfaceMaterial::default(),
            atmosphere: AtmosphereShell {
                radius: settings.sphere_radius + settings.atmosphere_offset,
                color: Color {
                    r: 0.3,
                    g: 0.6,
                    b: 1.0,
                },
            },
            starfield: Starfield::generate(
                settings.starfield_count,
                settings.starfield_extent,
                settings.starfield_seed,
            ),
            lights: default_light_rig(),
            fog: Fog {
                color: Color::from_hex(0x020617),
                density: 0.02,
            },
        }
    }

    pub fn bounds(&self) -> Aabb3 {
        Aabb3::around_sphere(Vec3::ZERO, self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::{Color, GlobePrefab, GlobeSettings, Light, Starfield};

    #[test]
    fn hex_colors_unpack() {
        let c = Color::from_hex(0x00ffff);
        assert_eq!(c.as_array(), [0.0, 1.0, 1.0]);
    }

    #[test]
    fn atmosphere_sits_just_outside_the_surface() {
        let globe = GlobePrefab::build(&GlobeSettings::default());
        assert_eq!(globe.radius, 5.0);
        assert!((globe.atmosphere.radius - 5.05).abs() < 1e-12);
    }

    #[test]
    fn starfield_is_seeded_and_bounded() {
        let a = Starfield::generate(500, 800.0, 7);
        let b = Starfield::generate(500, 800.0, 7);
        let c = Starfield::generate(500, 800.0, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.points.len(), 500);
        for p in &a.points {
            assert!(p.x.abs() <= 400.0 && p.y.abs() <= 400.0 && p.z.abs() <= 400.0);
        }
    }

    #[test]
    fn light_rig_has_ambient_sun_and_rim() {
        let globe = GlobePrefab::build(&GlobeSettings::default());
        assert_eq!(globe.lights.len(), 3);
        assert!(matches!(globe.lights[0], Light::Ambient { .. }));
        assert!(matches!(globe.lights[1], Light::Directional { .. }));
        assert!(matches!(globe.lights[2], Light::Spot { .. }));
        assert_eq!(globe.fog.density, 0.02);
    }
}
