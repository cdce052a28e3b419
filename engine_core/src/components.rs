//! Core components for the ECS-based scene world

use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Transform component - position, rotation, and scale of an entity relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        Self::from_position(Vec3::new(x, y, z))
    }

    /// Rotation built from Euler angles in degrees, applied Z first, then X, then Y
    pub fn euler_degrees(euler: Vec3) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            euler.y.to_radians(),
            euler.x.to_radians(),
            euler.z.to_radians(),
        )
    }

    /// Inverse of [`Transform::euler_degrees`]
    pub fn to_euler_degrees(rotation: Quat) -> Vec3 {
        let (y, x, z) = rotation.to_euler(EulerRot::YXZ);
        Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
    }

    /// Place a transform at `position` with its forward axis aimed at `target`
    pub fn looking_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let forward = (target - position).normalize_or_zero();
        if forward == Vec3::ZERO {
            return Self::from_position(position);
        }

        let mut right = forward.cross(up);
        if right.length_squared() < 1e-8 {
            // `up` is parallel to the view direction; pick any perpendicular axis.
            right = forward.any_orthonormal_vector();
        }
        let right = right.normalize();
        let up = right.cross(forward);

        let rotation = Quat::from_mat3(&Mat3::from_cols(right, up, -forward)).normalize();
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Get the model matrix (local transform)
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Get forward direction (negative Z in local space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Get up direction (positive Y in local space)
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

/// Handle to a mesh asset - used instead of direct mesh storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle {
    pub id: u64,
}

impl MeshHandle {
    pub fn invalid() -> Self {
        Self { id: 0 }
    }

    pub fn is_valid(&self) -> bool {
        self.id != 0
    }
}

impl Default for MeshHandle {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Handle to a material asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle {
    pub id: u64,
}

impl MaterialHandle {
    pub fn invalid() -> Self {
        Self { id: 0 }
    }

    pub fn is_valid(&self) -> bool {
        self.id != 0
    }
}

impl Default for MaterialHandle {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Mesh renderer component - references mesh and material assets
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshRenderer {
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
}

impl MeshRenderer {
    pub fn with_material(mesh: MeshHandle, material: MaterialHandle) -> Self {
        Self { mesh, material }
    }

    pub fn is_valid(&self) -> bool {
        self.mesh.is_valid()
    }
}

/// Display name of an entity
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Number of rendering layers a culling mask can address
pub const MAX_LAYERS: u8 = 32;

/// Rendering layer of an entity, `0..MAX_LAYERS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Layer(pub u8);

impl Layer {
    pub const DEFAULT: Layer = Layer(0);

    /// Clamps out-of-range indices to the last layer
    pub fn new(index: u8) -> Self {
        Self(index.min(MAX_LAYERS - 1))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn mask(self) -> LayerMask {
        LayerMask::only(self)
    }
}

/// Bitmask of rendering layers a camera includes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const EVERYTHING: LayerMask = LayerMask(u32::MAX);
    pub const NOTHING: LayerMask = LayerMask(0);

    pub fn only(layer: Layer) -> Self {
        Self(1u32 << layer.index().min(MAX_LAYERS - 1))
    }

    pub fn contains(self, layer: Layer) -> bool {
        layer.index() < MAX_LAYERS && self.0 & (1u32 << layer.index()) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::EVERYTHING
    }
}

/// Editor visibility/persistence flags for transient objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HideFlags {
    pub hide_in_hierarchy: bool,
    pub dont_save: bool,
}

impl HideFlags {
    pub const NONE: HideFlags = HideFlags {
        hide_in_hierarchy: false,
        dont_save: false,
    };

    pub const HIDE_AND_DONT_SAVE: HideFlags = HideFlags {
        hide_in_hierarchy: true,
        dont_save: true,
    };
}

/// How a camera initializes its target before drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClearFlags {
    Skybox,
    #[default]
    SolidColor,
    DepthOnly,
    Nothing,
}

impl ClearFlags {
    pub const ALL: [ClearFlags; 4] = [
        ClearFlags::Skybox,
        ClearFlags::SolidColor,
        ClearFlags::DepthOnly,
        ClearFlags::Nothing,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Skybox => "Skybox",
            Self::SolidColor => "Solid Color",
            Self::DepthOnly => "Depth Only",
            Self::Nothing => "Don't Clear",
        }
    }

    pub fn clears_color(self) -> bool {
        matches!(self, Self::Skybox | Self::SolidColor)
    }

    pub fn clears_depth(self) -> bool {
        !matches!(self, Self::Nothing)
    }
}

/// Perspective camera component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub clear_flags: ClearFlags,
    /// Straight (non-premultiplied) RGBA in 0..1
    pub background: [f32; 4],
    pub culling_mask: LayerMask,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
            clear_flags: ClearFlags::SolidColor,
            background: [0.0, 0.0, 0.0, 0.0],
            culling_mask: LayerMask::EVERYTHING,
        }
    }
}

/// Directional light; shines along the forward axis of its transform
#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

impl Light {
    pub fn new(color: Vec3, intensity: f32) -> Self {
        Self { color, intensity }
    }
}
