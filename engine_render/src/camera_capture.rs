//! Camera capture - instantiate, frame, render and read back a prefab
//!
//! Everything a capture creates is owned by a [`TransientScope`] and released
//! when the scope drops, whether the capture succeeded or not.

use std::path::Path;

use engine_core::bounds::Aabb;
use engine_core::components::{
    Camera, ClearFlags, HideFlags, Layer, LayerMask, MaterialHandle, MeshHandle, MeshRenderer, Name,
};
use engine_core::ecs::{DynamicBundle, EngineWorld, EntityHandle};
use engine_core::systems::{CameraFraming, auto_distance, clamp_fov, frame_bounds, limiting_fov};
use glam::Vec3;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::asset_manager::AssetManager;
use crate::error::{PreviewError, PreviewResult};
use crate::prefab::{Prefab, PrefabInstance};
use crate::renderer::{MAX_TEXTURE_SIZE, RenderTexture, Renderer};

/// Name given to the temporary capture camera
pub const TEMP_CAMERA_NAME: &str = "TempPreviewCamera";

/// Render configuration for one capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Camera distance when `auto_distance` is off
    pub distance: f32,
    pub auto_distance: bool,
    /// Euler degrees applied to the forward axis, Y then X then Z
    pub rotation_offset: [f32; 3],
    pub width: u32,
    pub height: u32,
    /// Straight RGBA in 0..1
    pub background: [f32; 4],
    pub clear_flags: ClearFlags,
    pub use_layer_filtering: bool,
    /// Only layer the camera renders when filtering
    pub render_layer: u8,
    /// Layer assigned to the whole instance when filtering
    pub model_layer: u8,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            distance: 5.0,
            auto_distance: true,
            rotation_offset: [0.0; 3],
            width: 512,
            height: 512,
            background: [0.0, 0.0, 0.0, 0.0],
            clear_flags: ClearFlags::SolidColor,
            use_layer_filtering: false,
            render_layer: 0,
            model_layer: 0,
        }
    }
}

impl CaptureSettings {
    pub fn validate(&self) -> PreviewResult<()> {
        let size_ok = |v: u32| (1..=MAX_TEXTURE_SIZE).contains(&v);
        if !size_ok(self.width) || !size_ok(self.height) {
            return Err(PreviewError::InvalidConfig(format!(
                "resolution {}x{} must be within 1..={MAX_TEXTURE_SIZE}",
                self.width, self.height
            )));
        }
        if !self.fov_degrees.is_finite() {
            return Err(PreviewError::InvalidConfig("field of view is not a number".into()));
        }
        if !self.auto_distance && !(self.distance.is_finite() && self.distance > 0.0) {
            return Err(PreviewError::InvalidConfig(format!(
                "camera distance {} must be positive",
                self.distance
            )));
        }
        if self.rotation_offset.iter().any(|v| !v.is_finite()) {
            return Err(PreviewError::InvalidConfig("rotation offset is not finite".into()));
        }
        Ok(())
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    pub fn culling_mask(&self) -> LayerMask {
        if self.use_layer_filtering {
            LayerMask::only(Layer::new(self.render_layer))
        } else {
            LayerMask::EVERYTHING
        }
    }
}

/// Result of a successful capture
#[derive(Debug, Clone)]
pub struct Capture {
    pub image: RgbaImage,
    pub camera_distance: f32,
    pub bounds: Aabb,
    /// Bounds were substituted because the instance had no geometry
    pub fallback_bounds: bool,
    pub framing: CameraFraming,
}

/// Owns transient entities and assets, releasing them on drop
pub struct TransientScope<'a> {
    world: &'a mut EngineWorld,
    assets: &'a mut AssetManager,
    entities: Vec<EntityHandle>,
    meshes: Vec<MeshHandle>,
    materials: Vec<MaterialHandle>,
}

impl<'a> TransientScope<'a> {
    pub fn new(world: &'a mut EngineWorld, assets: &'a mut AssetManager) -> Self {
        Self {
            world,
            assets,
            entities: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
        }
    }

    pub fn world(&self) -> &EngineWorld {
        &*self.world
    }

    pub fn world_mut(&mut self) -> &mut EngineWorld {
        &mut *self.world
    }

    pub fn assets(&self) -> &AssetManager {
        &*self.assets
    }

    /// Spawn a hidden entity that is despawned with the scope
    pub fn spawn(&mut self, components: impl DynamicBundle) -> EntityHandle {
        let entity = self.world.spawn(components);
        self.world.insert(entity, HideFlags::HIDE_AND_DONT_SAVE);
        self.entities.push(entity);
        entity
    }

    /// Instantiate a hidden copy of `prefab` owned by the scope
    pub fn instantiate(&mut self, prefab: &Prefab, base_dir: &Path) -> PreviewResult<PrefabInstance> {
        let instance = prefab.instantiate(self.world, self.assets, base_dir, HideFlags::HIDE_AND_DONT_SAVE)?;
        self.entities.push(instance.root);
        self.meshes.extend_from_slice(&instance.meshes);
        self.materials.extend_from_slice(&instance.materials);
        Ok(instance)
    }
}

impl Drop for TransientScope<'_> {
    fn drop(&mut self) {
        let mut despawned = 0;
        for entity in self.entities.drain(..).rev() {
            despawned += self.world.despawn(entity);
        }
        for mesh in self.meshes.drain(..) {
            self.assets.unload_mesh(mesh);
        }
        for material in self.materials.drain(..) {
            self.assets.unload_material(material);
        }
        debug!(despawned, "released transient capture objects");
    }
}

/// Union of the world-space bounds of every renderable below `root`
pub fn instance_bounds(world: &EngineWorld, assets: &AssetManager, root: EntityHandle) -> Option<Aabb> {
    let mut bounds: Option<Aabb> = None;
    for entity in world.descendants(root) {
        let Some(renderer) = world.get::<MeshRenderer>(entity).map(|r| *r) else {
            continue;
        };
        let Some(local) = assets.get_mesh(renderer.mesh).and_then(|m| m.bounds()) else {
            continue;
        };
        let part = local.transformed(&world.world_matrix(entity));
        bounds = Some(match bounds {
            Some(mut merged) => {
                merged.encapsulate(&part);
                merged
            }
            None => part,
        });
    }
    bounds
}

/// Render `prefab` framed by a temporary camera and read back the pixels
pub fn capture(
    world: &mut EngineWorld,
    assets: &mut AssetManager,
    renderer: &Renderer,
    prefab: &Prefab,
    base_dir: &Path,
    settings: &CaptureSettings,
) -> PreviewResult<Capture> {
    settings.validate()?;

    let mut scope = TransientScope::new(world, assets);
    let instance = scope.instantiate(prefab, base_dir)?;

    if settings.use_layer_filtering {
        scope
            .world_mut()
            .set_layer_recursively(instance.root, Layer::new(settings.model_layer));
    }

    let (bounds, fallback_bounds) = match instance_bounds(scope.world(), scope.assets(), instance.root) {
        Some(bounds) => (bounds, false),
        None => {
            let origin = scope.world().world_matrix(instance.root).transform_point3(Vec3::ZERO);
            (Aabb::unit(origin), true)
        }
    };

    let fov = clamp_fov(settings.fov_degrees);
    let distance = if settings.auto_distance {
        auto_distance(
            bounds.bounding_sphere_radius(),
            limiting_fov(fov, settings.aspect_ratio()),
        )
    } else {
        settings.distance
    };
    let framing = frame_bounds(&bounds, Vec3::from_array(settings.rotation_offset), distance);

    let camera = scope.spawn((
        Name::new(TEMP_CAMERA_NAME),
        framing.transform(),
        Camera {
            fov_degrees: fov,
            near: framing.near,
            far: framing.far,
            clear_flags: settings.clear_flags,
            background: settings.background,
            culling_mask: settings.culling_mask(),
        },
    ));

    let mut target = RenderTexture::new(settings.width, settings.height)?;
    renderer.render(scope.world(), scope.assets(), camera, &mut target)?;
    let image = target.read_pixels()?;

    info!(
        prefab = %prefab.name,
        width = settings.width,
        height = settings.height,
        distance,
        fallback_bounds,
        "captured camera preview"
    );
    Ok(Capture {
        image,
        camera_distance: distance,
        bounds,
        fallback_bounds,
        framing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefab::{PrefabMesh, PrefabNode, PrefabTransform};
    use approx::assert_relative_eq;
    use engine_core::components::Transform;
    use engine_core::systems::CameraSystem;

    fn crate_prefab() -> Prefab {
        let lid = PrefabNode {
            transform: PrefabTransform {
                position: [0.0, 1.0, 0.0],
                ..Default::default()
            },
            ..PrefabNode::new("Lid").with_mesh(PrefabMesh::Cube)
        };
        Prefab::new("Crate", PrefabNode::new("Crate").with_mesh(PrefabMesh::Cube).with_child(lid))
    }

    fn small_settings() -> CaptureSettings {
        CaptureSettings {
            width: 48,
            height: 32,
            ..Default::default()
        }
    }

    #[test]
    fn capture_matches_requested_resolution_and_cleans_up() {
        let mut world = EngineWorld::new();
        let mut assets = AssetManager::new();
        let bystander = world.spawn((Name::new("Scene Light"), Transform::default()));

        let capture = capture(
            &mut world,
            &mut assets,
            &Renderer::new(),
            &crate_prefab(),
            Path::new("."),
            &small_settings(),
        )
        .unwrap();

        assert_eq!(capture.image.dimensions(), (48, 32));
        assert!(!capture.fallback_bounds);
        assert_eq!(world.entity_count(), 1);
        assert!(world.contains(bystander));
        assert_eq!(assets.mesh_count(), 0);
        assert_eq!(assets.material_count(), 0);
    }

    #[test]
    fn bounds_are_union_of_parts() {
        let mut world = EngineWorld::new();
        let mut assets = AssetManager::new();
        let capture = capture(
            &mut world,
            &mut assets,
            &Renderer::new(),
            &crate_prefab(),
            Path::new("."),
            &small_settings(),
        )
        .unwrap();
        assert_relative_eq!(capture.bounds.min().y, -0.5, epsilon = 1e-5);
        assert_relative_eq!(capture.bounds.max().y, 1.5, epsilon = 1e-5);
    }

    #[test]
    fn auto_distance_keeps_sphere_in_frustum() {
        let mut world = EngineWorld::new();
        let mut assets = AssetManager::new();
        let settings = CaptureSettings {
            rotation_offset: [-30.0, 45.0, 0.0],
            ..small_settings()
        };
        let capture = capture(
            &mut world,
            &mut assets,
            &Renderer::new(),
            &crate_prefab(),
            Path::new("."),
            &settings,
        )
        .unwrap();

        assert!(capture.camera_distance > 0.0);
        let camera = Camera {
            fov_degrees: settings.fov_degrees,
            near: capture.framing.near,
            far: capture.framing.far,
            ..Camera::default()
        };
        let view = CameraSystem::from_components(&capture.framing.transform(), &camera, settings.aspect_ratio());
        assert!(view.contains_sphere(
            capture.bounds.center,
            capture.bounds.bounding_sphere_radius(),
            1e-3
        ));
    }

    #[test]
    fn manual_distance_is_used_verbatim() {
        let mut world = EngineWorld::new();
        let mut assets = AssetManager::new();
        let settings = CaptureSettings {
            auto_distance: false,
            distance: 12.5,
            ..small_settings()
        };
        let capture = capture(
            &mut world,
            &mut assets,
            &Renderer::new(),
            &crate_prefab(),
            Path::new("."),
            &settings,
        )
        .unwrap();
        assert_eq!(capture.camera_distance, 12.5);
    }

    #[test]
    fn empty_prefab_falls_back_to_unit_bounds_at_origin() {
        let mut world = EngineWorld::new();
        let mut assets = AssetManager::new();
        let prefab = Prefab::new(
            "Marker",
            PrefabNode {
                transform: PrefabTransform {
                    position: [2.0, 0.0, -1.0],
                    ..Default::default()
                },
                ..PrefabNode::new("Marker")
            },
        );
        let capture = capture(
            &mut world,
            &mut assets,
            &Renderer::new(),
            &prefab,
            Path::new("."),
            &small_settings(),
        )
        .unwrap();

        assert!(capture.fallback_bounds);
        assert_eq!(capture.bounds, Aabb::unit(Vec3::new(2.0, 0.0, -1.0)));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn model_outside_render_layer_leaves_only_background() {
        let mut world = EngineWorld::new();
        let mut assets = AssetManager::new();
        let settings = CaptureSettings {
            use_layer_filtering: true,
            render_layer: 8,
            model_layer: 9,
            background: [0.0, 1.0, 0.0, 1.0],
            ..small_settings()
        };
        let capture = capture(
            &mut world,
            &mut assets,
            &Renderer::new(),
            &crate_prefab(),
            Path::new("."),
            &settings,
        )
        .unwrap();
        assert!(capture.image.pixels().all(|p| p.0 == [0, 255, 0, 255]));
    }

    #[test]
    fn matching_layers_render_the_model() {
        let mut world = EngineWorld::new();
        let mut assets = AssetManager::new();
        let settings = CaptureSettings {
            use_layer_filtering: true,
            render_layer: 8,
            model_layer: 8,
            ..small_settings()
        };
        let capture = capture(
            &mut world,
            &mut assets,
            &Renderer::new(),
            &crate_prefab(),
            Path::new("."),
            &settings,
        )
        .unwrap();
        assert!(capture.image.pixels().any(|p| p.0[3] == 255));
    }

    #[test]
    fn invalid_settings_fail_before_spawning() {
        let mut world = EngineWorld::new();
        let mut assets = AssetManager::new();
        let settings = CaptureSettings {
            width: 0,
            ..Default::default()
        };
        let err = capture(
            &mut world,
            &mut assets,
            &Renderer::new(),
            &crate_prefab(),
            Path::new("."),
            &settings,
        )
        .unwrap_err();
        assert!(matches!(err, PreviewError::InvalidConfig(_)));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn scope_releases_on_early_return() {
        let mut world = EngineWorld::new();
        let mut assets = AssetManager::new();
        {
            let mut scope = TransientScope::new(&mut world, &mut assets);
            scope.instantiate(&crate_prefab(), Path::new(".")).unwrap();
            scope.spawn((Name::new(TEMP_CAMERA_NAME),));
            assert_eq!(scope.world().entity_count(), 3);
            assert!(scope.world().root_entities(false).is_empty());
        }
        assert_eq!(world.entity_count(), 0);
        assert_eq!(assets.mesh_count(), 0);
    }
}
