//! Core systems: renderable collection and camera framing

use glam::{Mat4, Vec3};
use hecs::Entity;

use crate::bounds::Aabb;
use crate::components::*;
use crate::ecs::*;

/// Narrowest field of view the framing math accepts, in degrees
pub const MIN_FOV_DEGREES: f32 = 1.0;
/// Widest field of view the framing math accepts, in degrees
pub const MAX_FOV_DEGREES: f32 = 179.0;
/// View direction before the rotation offset is applied
pub const PREVIEW_FORWARD: Vec3 = Vec3::NEG_Z;

const MIN_FRAMING_RADIUS: f32 = 1e-4;
const MIN_NEAR_PLANE: f32 = 0.01;

/// Render system - collects renderable entities
pub struct RenderSystem;

impl RenderSystem {
    /// Renderables whose layer is included in `mask`, with world matrices resolved
    pub fn collect(world: &EngineWorld, mask: LayerMask) -> Vec<Renderable> {
        let mut renderables = Vec::new();
        for (entity, mesh_renderer) in world.world().query::<(Entity, &MeshRenderer)>().iter() {
            if !mesh_renderer.is_valid() {
                continue;
            }
            let handle = EntityHandle(entity);
            let layer = world.layer(handle);
            if !mask.contains(layer) {
                continue;
            }
            renderables.push(Renderable {
                model: world.world_matrix(handle),
                mesh: mesh_renderer.mesh,
                material: mesh_renderer.material,
                layer,
            });
        }
        renderables
    }

    /// First directional light in the world: (direction the light travels, light)
    pub fn key_light(world: &EngineWorld) -> Option<(Vec3, Light)> {
        world
            .world()
            .query::<(Entity, &Light)>()
            .iter()
            .next()
            .map(|(entity, light)| {
                let matrix = world.world_matrix(EntityHandle(entity));
                let direction = matrix.transform_vector3(PREVIEW_FORWARD).normalize_or(PREVIEW_FORWARD);
                (direction, *light)
            })
    }
}

/// Renderable data for the renderer
#[derive(Debug, Clone, Copy)]
pub struct Renderable {
    pub model: Mat4,
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
    pub layer: Layer,
}

/// Camera system - view and projection of one camera
#[derive(Debug, Clone, Copy)]
pub struct CameraSystem {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSystem {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 45.0,
            aspect_ratio: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl CameraSystem {
    /// Build from a camera entity's transform and lens settings
    pub fn from_components(transform: &Transform, camera: &Camera, aspect_ratio: f32) -> Self {
        Self {
            position: transform.position,
            target: transform.position + transform.forward(),
            up: transform.up(),
            fov: clamp_fov(camera.fov_degrees),
            aspect_ratio,
            near: camera.near,
            far: camera.far,
        }
    }

    /// Get view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get projection matrix (perspective)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.fov.to_radians(),
            self.aspect_ratio,
            self.near,
            self.far,
        )
    }

    /// Get view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// True when the whole sphere lies inside the side planes of the frustum.
    /// `tolerance` is relative to the radius.
    pub fn contains_sphere(&self, center: Vec3, radius: f32, tolerance: f32) -> bool {
        let m = self.view_projection();
        let (r0, r1, r3) = (m.row(0), m.row(1), m.row(3));
        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1];
        planes.iter().all(|plane| {
            let normal = plane.truncate();
            let len = normal.length();
            if len <= f32::EPSILON {
                return false;
            }
            let distance = (normal.dot(center) + plane.w) / len;
            distance >= radius * (1.0 - tolerance)
        })
    }
}

/// Clamp a field of view into the range the framing formula is defined on
pub fn clamp_fov(fov_degrees: f32) -> f32 {
    if fov_degrees.is_nan() {
        return Camera::default().fov_degrees;
    }
    fov_degrees.clamp(MIN_FOV_DEGREES, MAX_FOV_DEGREES)
}

/// Field of view that limits framing for a given aspect ratio: the vertical
/// FOV, or the horizontal one when the image is taller than wide.
pub fn limiting_fov(vertical_fov_degrees: f32, aspect_ratio: f32) -> f32 {
    let vertical = clamp_fov(vertical_fov_degrees);
    if !(aspect_ratio > 0.0) || aspect_ratio >= 1.0 {
        return vertical;
    }
    let half = (vertical.to_radians() * 0.5).tan() * aspect_ratio;
    let horizontal = (2.0 * half.atan()).to_degrees();
    clamp_fov(horizontal.min(vertical))
}

/// Camera distance at which a sphere of `radius` exactly fills `fov_degrees`:
/// `radius / sin(fov / 2)`
pub fn auto_distance(radius: f32, fov_degrees: f32) -> f32 {
    let half = clamp_fov(fov_degrees).to_radians() * 0.5;
    radius.max(MIN_FRAMING_RADIUS) / half.sin()
}

/// Camera placement produced by [`frame_bounds`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFraming {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub distance: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraFraming {
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).normalize_or(PREVIEW_FORWARD)
    }

    pub fn transform(&self) -> Transform {
        Transform::looking_at(self.position, self.target, self.up)
    }
}

/// Place a camera `distance` away from the bounds center, looking at it along
/// the forward axis rotated by `rotation_offset` (Euler degrees).
pub fn frame_bounds(bounds: &Aabb, rotation_offset: Vec3, distance: f32) -> CameraFraming {
    let rotation = Transform::euler_degrees(rotation_offset);
    let direction = rotation * PREVIEW_FORWARD;
    let radius = bounds.bounding_sphere_radius();

    let near = ((distance - radius) * 0.5).max(MIN_NEAR_PLANE);
    let far = (distance + radius * 2.0 + 1.0).max(near * 2.0);

    CameraFraming {
        position: bounds.center - direction * distance,
        target: bounds.center,
        up: rotation * Vec3::Y,
        distance,
        near,
        far,
    }
}
