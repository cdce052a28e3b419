//! CPU shading for the offscreen renderer
//!
//! Blinn-Phong key light with a rim term and a fixed fill light from below-behind,
//! evaluated per pixel by the rasterizer.

use glam::Vec3;

/// Direction the default key light travels when the scene has no light
pub const DEFAULT_KEY_LIGHT_DIR: Vec3 = Vec3::new(-0.45, -0.75, -0.5);

const AMBIENT: f32 = 0.15;
const DIFFUSE: f32 = 0.65;
const SPECULAR: f32 = 0.25;
const SHININESS: f32 = 32.0;
const RIM: f32 = 0.08;
const FILL: f32 = 0.10;
const FILL_DIR: Vec3 = Vec3::new(-0.3, -0.5, -0.4);

/// Lit shader parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LitShader {
    /// Direction the light travels (from the light toward the scene)
    pub light_dir: Vec3,
    pub light_color: Vec3,
    pub light_intensity: f32,
}

impl Default for LitShader {
    fn default() -> Self {
        Self {
            light_dir: DEFAULT_KEY_LIGHT_DIR.normalize(),
            light_color: Vec3::ONE,
            light_intensity: 1.0,
        }
    }
}

impl LitShader {
    pub fn new(light_dir: Vec3, light_color: Vec3, light_intensity: f32) -> Self {
        Self {
            light_dir: light_dir.normalize_or(DEFAULT_KEY_LIGHT_DIR.normalize()),
            light_color,
            light_intensity,
        }
    }

    /// Shade a surface point. `normal` and `view_dir` (surface toward camera) are
    /// world-space; `albedo` is straight RGBA. Returns straight RGBA in 0..1.
    pub fn shade(&self, albedo: [f32; 4], normal: Vec3, view_dir: Vec3) -> [f32; 4] {
        let mut n = normal.normalize_or_zero();
        let v = view_dir.normalize_or_zero();
        // Two-sided lighting: flip normals of faces seen from behind
        if n.dot(v) < 0.0 {
            n = -n;
        }

        let l = -self.light_dir;
        let diffuse = n.dot(l).max(0.0) * DIFFUSE;
        let half_dir = (l + v).normalize_or_zero();
        let specular = n.dot(half_dir).max(0.0).powf(SHININESS) * SPECULAR;
        let rim = (1.0 - n.dot(v).max(0.0)).powf(2.5) * RIM;
        let fill = n.dot(-FILL_DIR.normalize()).max(0.0) * FILL;

        let shade = (AMBIENT + diffuse + specular + rim + fill).clamp(0.0, 1.5);
        let light = self.light_color * self.light_intensity * shade;

        [
            (albedo[0] * light.x).clamp(0.0, 1.0),
            (albedo[1] * light.y).clamp(0.0, 1.0),
            (albedo[2] * light.z).clamp(0.0, 1.0),
            albedo[3].clamp(0.0, 1.0),
        ]
    }
}

/// Quantize a straight RGBA color to 8 bits per channel
pub fn to_rgba8(color: [f32; 4]) -> [u8; 4] {
    color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_facing_light_is_brighter_than_surface_facing_away() {
        let shader = LitShader::new(Vec3::NEG_Y, Vec3::ONE, 1.0);
        let white = [1.0, 1.0, 1.0, 1.0];
        let lit = shader.shade(white, Vec3::Y, Vec3::new(0.0, 1.0, 1.0));
        let unlit = shader.shade(white, Vec3::NEG_Y, Vec3::new(0.0, -1.0, 1.0));
        assert!(lit[0] > unlit[0]);
    }

    #[test]
    fn alpha_passes_through() {
        let shader = LitShader::default();
        let out = shader.shade([0.5, 0.5, 0.5, 0.25], Vec3::Z, Vec3::Z);
        assert_eq!(out[3], 0.25);
    }

    #[test]
    fn to_rgba8_rounds_and_clamps() {
        assert_eq!(to_rgba8([0.0, 0.5, 1.0, 2.0]), [0, 128, 255, 255]);
    }
}
