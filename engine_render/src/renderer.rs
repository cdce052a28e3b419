//! Renderer - rasterizes the ECS world into an offscreen render texture
//!
//! Everything runs on the calling thread: render, then `read_pixels` for a
//! synchronous readback into an `RgbaImage`.

use engine_core::components::{Camera, ClearFlags, Transform};
use engine_core::ecs::{EngineWorld, EntityHandle};
use engine_core::systems::{CameraSystem, RenderSystem};
use glam::{Mat3, Mat4, Vec3, Vec4};
use image::RgbaImage;
use tracing::trace;

use crate::asset_manager::{AssetManager, MaterialData};
use crate::error::RenderError;
use crate::mesh::MeshData;
use crate::shader::{LitShader, to_rgba8};

/// Largest edge a render texture may have, in pixels
pub const MAX_TEXTURE_SIZE: u32 = 8192;

const SKY_TOP: [f32; 4] = [0.32, 0.45, 0.63, 1.0];
const SKY_HORIZON: [f32; 4] = [0.72, 0.78, 0.85, 1.0];
const W_EPSILON: f32 = 1e-5;

/// Offscreen color + depth target
pub struct RenderTexture {
    width: u32,
    height: u32,
    color: Vec<u8>,
    depth: Vec<f32>,
}

impl RenderTexture {
    /// Allocate a cleared (transparent black, far depth) target
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 || width > MAX_TEXTURE_SIZE || height > MAX_TEXTURE_SIZE {
            return Err(RenderError::InvalidSurface { width, height });
        }
        let pixels = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            color: vec![0; pixels * 4],
            depth: vec![1.0; pixels],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    fn fill_color(&mut self, color: [f32; 4]) {
        let rgba = to_rgba8(color);
        for px in self.color.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    fn fill_sky(&mut self) {
        let row_bytes = self.width as usize * 4;
        let rows = self.height.max(2) as f32 - 1.0;
        for (y, row) in self.color.chunks_exact_mut(row_bytes).enumerate() {
            let t = y as f32 / rows;
            let mut mixed = [0.0; 4];
            for (c, out) in mixed.iter_mut().enumerate() {
                *out = SKY_TOP[c] + (SKY_HORIZON[c] - SKY_TOP[c]) * t;
            }
            let rgba = to_rgba8(mixed);
            for px in row.chunks_exact_mut(4) {
                px.copy_from_slice(&rgba);
            }
        }
    }

    fn clear_depth(&mut self) {
        self.depth.fill(1.0);
    }

    fn put(&mut self, x: u32, y: u32, depth: f32, rgba: [u8; 4]) {
        let idx = y as usize * self.width as usize + x as usize;
        if depth >= self.depth[idx] {
            return;
        }
        self.depth[idx] = depth;
        self.color[idx * 4..idx * 4 + 4].copy_from_slice(&rgba);
    }

    /// Color of one pixel, row 0 at the top
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let mut out = [0; 4];
        out.copy_from_slice(&self.color[idx..idx + 4]);
        Some(out)
    }

    /// Copy the color buffer into a CPU image
    pub fn read_pixels(&self) -> Result<RgbaImage, RenderError> {
        RgbaImage::from_raw(self.width, self.height, self.color.clone()).ok_or_else(|| {
            RenderError::Readback(format!(
                "color buffer does not match {}x{}",
                self.width, self.height
            ))
        })
    }
}

/// Clip-space vertex with the attributes the fragment stage needs
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    clip: Vec4,
    world: Vec3,
    normal: Vec3,
}

impl ClipVertex {
    fn lerp(a: &ClipVertex, b: &ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            clip: a.clip.lerp(b.clip, t),
            world: a.world.lerp(b.world, t),
            normal: a.normal.lerp(b.normal, t),
        }
    }

    /// Signed distance to the near plane (z >= -w in GL clip space)
    fn near_distance(&self) -> f32 {
        self.clip.z + self.clip.w
    }
}

/// Screen-space vertex after perspective divide
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    depth: f32,
    inv_w: f32,
    world: Vec3,
    normal: Vec3,
}

/// Per-draw state shared by every triangle of a mesh
struct DrawState<'a> {
    camera_position: Vec3,
    shader: &'a LitShader,
    albedo: [f32; 4],
}

/// Software renderer - draws the world as seen by a camera entity
#[derive(Debug, Default, Clone)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Render everything the camera's culling mask includes into `target`
    pub fn render(
        &self,
        world: &EngineWorld,
        assets: &AssetManager,
        camera: EntityHandle,
        target: &mut RenderTexture,
    ) -> Result<(), RenderError> {
        let lens = *world.get::<Camera>(camera).ok_or(RenderError::MissingCamera)?;
        let (_, rotation, position) = world.world_matrix(camera).to_scale_rotation_translation();
        let transform = Transform::new(position, rotation, Vec3::ONE);

        if lens.clear_flags.clears_depth() {
            target.clear_depth();
        }
        match lens.clear_flags {
            ClearFlags::SolidColor => target.fill_color(lens.background),
            ClearFlags::Skybox => target.fill_sky(),
            ClearFlags::DepthOnly | ClearFlags::Nothing => {}
        }

        let view = CameraSystem::from_components(&transform, &lens, target.aspect_ratio());
        let view_projection = view.view_projection();
        let shader = match RenderSystem::key_light(world) {
            Some((direction, light)) => LitShader::new(direction, light.color, light.intensity),
            None => LitShader::default(),
        };

        let renderables = RenderSystem::collect(world, lens.culling_mask);
        let fallback_material = MaterialData::default();
        let mut triangles = 0usize;

        for renderable in &renderables {
            let Some(mesh) = assets.get_mesh(renderable.mesh) else {
                continue;
            };
            let material = assets
                .get_material(renderable.material)
                .unwrap_or(&fallback_material);
            let state = DrawState {
                camera_position: view.position,
                shader: &shader,
                albedo: material.albedo,
            };
            triangles += draw_mesh(target, mesh, &renderable.model, &view_projection, &state);
        }

        trace!(
            renderables = renderables.len(),
            triangles,
            width = target.width(),
            height = target.height(),
            "rendered offscreen frame"
        );
        Ok(())
    }
}

/// Rasterize one mesh. Returns how many triangles survived near clipping.
fn draw_mesh(
    target: &mut RenderTexture,
    mesh: &MeshData,
    model: &Mat4,
    view_projection: &Mat4,
    state: &DrawState<'_>,
) -> usize {
    let mvp = *view_projection * *model;
    let model3 = Mat3::from_mat4(*model);
    let normal_matrix = if model3.determinant().abs() > f32::EPSILON {
        model3.inverse().transpose()
    } else {
        model3
    };

    let transformed: Vec<ClipVertex> = mesh
        .vertices
        .iter()
        .map(|v| ClipVertex {
            clip: mvp * v.position.extend(1.0),
            world: model.transform_point3(v.position),
            normal: normal_matrix * v.normal,
        })
        .collect();

    let mut drawn = 0;
    for tri in mesh.indices.chunks_exact(3) {
        let (Some(a), Some(b), Some(c)) = (
            transformed.get(tri[0] as usize),
            transformed.get(tri[1] as usize),
            transformed.get(tri[2] as usize),
        ) else {
            continue;
        };

        let polygon = clip_near(&[*a, *b, *c]);
        if polygon.len() < 3 {
            continue;
        }
        let screen: Vec<ScreenVertex> = polygon
            .iter()
            .map(|v| to_screen(v, target.width(), target.height()))
            .collect();
        for i in 1..screen.len() - 1 {
            rasterize_triangle(target, [&screen[0], &screen[i], &screen[i + 1]], state);
        }
        drawn += 1;
    }
    drawn
}

/// Sutherland-Hodgman clip of a triangle against the near plane
fn clip_near(input: &[ClipVertex; 3]) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(4);
    for i in 0..input.len() {
        let current = &input[i];
        let next = &input[(i + 1) % input.len()];
        let dc = current.near_distance();
        let dn = next.near_distance();

        if dc >= 0.0 {
            out.push(*current);
        }
        if (dc >= 0.0) != (dn >= 0.0) {
            let t = dc / (dc - dn);
            out.push(ClipVertex::lerp(current, next, t));
        }
    }
    out
}

fn to_screen(v: &ClipVertex, width: u32, height: u32) -> ScreenVertex {
    let w = v.clip.w.max(W_EPSILON);
    let ndc = v.clip.truncate() / w;
    ScreenVertex {
        x: (ndc.x * 0.5 + 0.5) * width as f32,
        y: (1.0 - (ndc.y * 0.5 + 0.5)) * height as f32,
        depth: ndc.z * 0.5 + 0.5,
        inv_w: 1.0 / w,
        world: v.world,
        normal: v.normal,
    }
}

fn edge(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

fn rasterize_triangle(target: &mut RenderTexture, tri: [&ScreenVertex; 3], state: &DrawState<'_>) {
    let [v0, v1, v2] = tri;
    let p0 = (v0.x, v0.y);
    let p1 = (v1.x, v1.y);
    let p2 = (v2.x, v2.y);

    let area = edge(p0, p1, p2);
    if area.abs() < 1e-8 {
        return;
    }

    let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0) as i64;
    let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0) as i64;
    let max_x = (v0.x.max(v1.x).max(v2.x).ceil() as i64).min(target.width() as i64 - 1);
    let max_y = (v0.y.max(v1.y).max(v2.y).ceil() as i64).min(target.height() as i64 - 1);
    if min_x > max_x || min_y > max_y {
        return;
    }

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = (x as f32 + 0.5, y as f32 + 0.5);
            // Normalized barycentrics; dividing by the signed area accepts either winding
            let b0 = edge(p1, p2, p) / area;
            let b1 = edge(p2, p0, p) / area;
            let b2 = edge(p0, p1, p) / area;
            if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                continue;
            }

            let depth = b0 * v0.depth + b1 * v1.depth + b2 * v2.depth;
            if !(0.0..=1.0).contains(&depth) {
                continue;
            }

            // Perspective-correct attribute interpolation
            let w0 = b0 * v0.inv_w;
            let w1 = b1 * v1.inv_w;
            let w2 = b2 * v2.inv_w;
            let sum = w0 + w1 + w2;
            if sum <= 0.0 {
                continue;
            }
            let normal = (v0.normal * w0 + v1.normal * w1 + v2.normal * w2) / sum;
            let world = (v0.world * w0 + v1.world * w1 + v2.world * w2) / sum;

            let color = state
                .shader
                .shade(state.albedo, normal, state.camera_position - world);
            target.put(x as u32, y as u32, depth, to_rgba8(color));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::bounds::Aabb;
    use engine_core::components::{HideFlags, Layer, LayerMask, Light, MeshRenderer, Name};
    use engine_core::systems::frame_bounds;
    use glam::Quat;

    fn scene_with_cube(layer: Layer) -> (EngineWorld, AssetManager) {
        let mut world = EngineWorld::new();
        let mut assets = AssetManager::new();
        let mesh = assets.add_mesh(MeshData::cube());
        let material = assets.add_material(MaterialData::new("Red").with_albedo([1.0, 0.1, 0.1, 1.0]));
        world.spawn((
            Name::new("Cube"),
            Transform::default(),
            MeshRenderer::with_material(mesh, material),
            layer,
        ));
        (world, assets)
    }

    fn spawn_camera(world: &mut EngineWorld, camera: Camera) -> EntityHandle {
        let framing = frame_bounds(&Aabb::unit(Vec3::ZERO), Vec3::new(-20.0, 30.0, 0.0), 3.0);
        world.spawn((
            framing.transform(),
            Camera {
                near: framing.near,
                far: framing.far,
                ..camera
            },
            HideFlags::HIDE_AND_DONT_SAVE,
        ))
    }

    #[test]
    fn render_texture_rejects_degenerate_sizes() {
        assert!(matches!(
            RenderTexture::new(0, 16),
            Err(RenderError::InvalidSurface { width: 0, height: 16 })
        ));
        assert!(RenderTexture::new(MAX_TEXTURE_SIZE + 1, 1).is_err());
    }

    #[test]
    fn cube_covers_center_and_leaves_corners_clear() {
        let (mut world, assets) = scene_with_cube(Layer::DEFAULT);
        let camera = spawn_camera(&mut world, Camera::default());
        let mut target = RenderTexture::new(64, 64).unwrap();

        Renderer::new().render(&world, &assets, camera, &mut target).unwrap();

        let center = target.pixel(32, 32).unwrap();
        assert_eq!(center[3], 255);
        assert!(center[0] > center[1]);
        assert_eq!(target.pixel(0, 0).unwrap(), [0, 0, 0, 0]);
        assert_eq!(target.pixel(63, 63).unwrap(), [0, 0, 0, 0]);
    }

    #[test]
    fn culling_mask_excludes_other_layers() {
        let (mut world, assets) = scene_with_cube(Layer(3));
        let camera = spawn_camera(
            &mut world,
            Camera {
                culling_mask: LayerMask::only(Layer(4)),
                background: [0.0, 0.0, 1.0, 1.0],
                ..Camera::default()
            },
        );
        let mut target = RenderTexture::new(32, 32).unwrap();
        Renderer::new().render(&world, &assets, camera, &mut target).unwrap();

        let image = target.read_pixels().unwrap();
        assert!(image.pixels().all(|p| p.0 == [0, 0, 255, 255]));
    }

    #[test]
    fn skybox_clear_fills_gradient() {
        let (mut world, assets) = scene_with_cube(Layer(1));
        let camera = spawn_camera(
            &mut world,
            Camera {
                clear_flags: ClearFlags::Skybox,
                culling_mask: LayerMask::only(Layer(0)),
                ..Camera::default()
            },
        );
        let mut target = RenderTexture::new(8, 8).unwrap();
        Renderer::new().render(&world, &assets, camera, &mut target).unwrap();
        assert_eq!(target.pixel(0, 0).unwrap(), to_rgba8(SKY_TOP));
        assert_eq!(target.pixel(0, 7).unwrap(), to_rgba8(SKY_HORIZON));
    }

    /// Center pixel of the red cube lit by a scene light turned `yaw` away from the camera
    fn center_with_light(yaw_degrees: f32, light: Light) -> [u8; 4] {
        let (mut world, assets) = scene_with_cube(Layer::DEFAULT);
        let camera = spawn_camera(&mut world, Camera::default());
        let camera_rotation = world.get::<Transform>(camera).unwrap().rotation;
        let rotation = camera_rotation * Quat::from_rotation_y(yaw_degrees.to_radians());
        world.spawn((Transform::new(Vec3::ZERO, rotation, Vec3::ONE), light));

        let mut target = RenderTexture::new(32, 32).unwrap();
        Renderer::new().render(&world, &assets, camera, &mut target).unwrap();
        target.pixel(16, 16).unwrap()
    }

    #[test]
    fn scene_light_direction_drives_shading() {
        let from_camera = center_with_light(0.0, Light::new(Vec3::ONE, 1.0));
        let from_behind = center_with_light(180.0, Light::new(Vec3::ONE, 1.0));
        assert_eq!(from_behind[3], 255);
        assert!(from_camera[0] > from_behind[0]);
    }

    #[test]
    fn scene_light_color_tints_surface() {
        let green = center_with_light(0.0, Light::new(Vec3::Y, 1.0));
        assert_eq!(green[0], 0);
        assert!(green[1] > 0);
    }

    #[test]
    fn render_requires_camera_component() {
        let (mut world, assets) = scene_with_cube(Layer::DEFAULT);
        let not_a_camera = world.spawn((Transform::default(),));
        let mut target = RenderTexture::new(4, 4).unwrap();
        let err = Renderer::new()
            .render(&world, &assets, not_a_camera, &mut target)
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingCamera));
    }

    #[test]
    fn read_pixels_matches_surface_size() {
        let target = RenderTexture::new(7, 3).unwrap();
        let image = target.read_pixels().unwrap();
        assert_eq!(image.dimensions(), (7, 3));
    }
}
