//! Prefab - serializable node tree that can be instantiated into the world
//!
//! `.prefab` files are RON. Model files (.obj, .gltf, .glb) load as prefabs too:
//! an OBJ becomes a single node, a glTF keeps its node hierarchy.

use std::path::Path;

use engine_core::components::{
    HideFlags, Layer, MaterialHandle, MeshHandle, MeshRenderer, Name, Transform,
};
use engine_core::ecs::{EngineWorld, EntityHandle};
use glam::{Quat, Vec3};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::asset_manager::{AssetManager, MaterialData};
use crate::error::AssetError;
use crate::mesh::MeshData;

/// File extension of prefab assets
pub const PREFAB_EXTENSION: &str = "prefab";

/// Local transform as stored on disk: rotation is Euler degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefabTransform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for PrefabTransform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl PrefabTransform {
    pub fn to_transform(&self) -> Transform {
        Transform::new(
            Vec3::from_array(self.position),
            Transform::euler_degrees(Vec3::from_array(self.rotation)),
            Vec3::from_array(self.scale),
        )
    }

    pub fn from_transform(transform: &Transform) -> Self {
        Self {
            position: transform.position.to_array(),
            rotation: Transform::to_euler_degrees(transform.rotation).to_array(),
            scale: transform.scale.to_array(),
        }
    }
}

/// Where a node's geometry comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrefabMesh {
    Cube,
    Sphere { segments: u32 },
    Plane,
    /// Model file, relative to the prefab's directory
    File(String),
    /// Geometry carried by the prefab itself (loaded model files)
    #[serde(skip)]
    Embedded(usize),
}

/// One node of a prefab tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefabNode {
    pub name: String,
    pub transform: PrefabTransform,
    pub mesh: Option<PrefabMesh>,
    /// Straight RGBA base color; the default material color when absent
    pub color: Option<[f32; 4]>,
    pub layer: u8,
    pub children: Vec<PrefabNode>,
}

impl Default for PrefabNode {
    fn default() -> Self {
        Self {
            name: "Node".to_string(),
            transform: PrefabTransform::default(),
            mesh: None,
            color: None,
            layer: Layer::DEFAULT.index(),
            children: Vec::new(),
        }
    }
}

impl PrefabNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_mesh(mut self, mesh: PrefabMesh) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_child(mut self, child: PrefabNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(PrefabNode::node_count).sum::<usize>()
    }
}

/// Prefab asset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prefab {
    pub name: String,
    pub root: PrefabNode,
    #[serde(skip)]
    pub meshes: Vec<MeshData>,
}

/// Entities and assets created by [`Prefab::instantiate`]
#[derive(Debug, Clone)]
pub struct PrefabInstance {
    pub root: EntityHandle,
    /// Every spawned entity, root first
    pub entities: Vec<EntityHandle>,
    pub meshes: Vec<MeshHandle>,
    pub materials: Vec<MaterialHandle>,
}

impl Prefab {
    pub fn new(name: impl Into<String>, root: PrefabNode) -> Self {
        Self {
            name: name.into(),
            root,
            meshes: Vec::new(),
        }
    }

    /// Load a prefab or model file, picking the loader from the extension
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            PREFAB_EXTENSION => {
                let text = std::fs::read_to_string(path)?;
                Self::from_ron(&text, path)
            }
            "obj" => Self::from_obj(path),
            "gltf" | "glb" => Self::from_gltf(path),
            _ => Err(AssetError::NotInstantiable(path.display().to_string())),
        }
    }

    /// Parse RON prefab text. `path` is only used for error reporting.
    pub fn from_ron(text: &str, path: &Path) -> Result<Self, AssetError> {
        ron::from_str(text).map_err(|source| AssetError::Prefab {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, PrettyConfig::new())
    }

    fn stem(path: &Path) -> String {
        path.file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    fn from_obj(path: &Path) -> Result<Self, AssetError> {
        let mesh = MeshData::load_from_file(path)?;
        let name = Self::stem(path);
        Ok(Self {
            root: PrefabNode::new(name.clone()).with_mesh(PrefabMesh::Embedded(0)),
            name,
            meshes: vec![mesh],
        })
    }

    fn from_gltf(path: &Path) -> Result<Self, AssetError> {
        let (document, buffers, _) = gltf::import(path).map_err(|e| AssetError::load(path, e))?;
        let name = Self::stem(path);
        let mut meshes = Vec::new();

        let scene = document.default_scene().or_else(|| document.scenes().next());
        let mut roots: Vec<PrefabNode> = scene
            .map(|s| {
                s.nodes()
                    .map(|node| gltf_node(&node, &buffers, &mut meshes))
                    .collect()
            })
            .unwrap_or_default();

        let root = if roots.len() == 1 {
            roots.remove(0)
        } else {
            PrefabNode {
                name: name.clone(),
                children: roots,
                ..Default::default()
            }
        };

        debug!(path = %path.display(), meshes = meshes.len(), "loaded glTF prefab");
        Ok(Self { name, root, meshes })
    }

    /// Spawn the node tree into `world`, registering meshes and materials in `assets`.
    /// Every mesh is loaded before anything is spawned, so a failure leaves the
    /// world and asset manager untouched.
    pub fn instantiate(
        &self,
        world: &mut EngineWorld,
        assets: &mut AssetManager,
        base_dir: &Path,
        flags: HideFlags,
    ) -> Result<PrefabInstance, AssetError> {
        let mut loaded = Vec::with_capacity(self.root.node_count());
        self.resolve_meshes(&self.root, base_dir, &mut loaded)?;

        let mut ctx = SpawnContext {
            world,
            assets,
            flags,
            loaded: loaded.into_iter(),
            entities: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
        };
        let root = ctx.spawn(&self.root, None);
        let instance = PrefabInstance {
            root,
            entities: ctx.entities,
            meshes: ctx.meshes,
            materials: ctx.materials,
        };

        debug!(
            prefab = %self.name,
            entities = instance.entities.len(),
            meshes = instance.meshes.len(),
            "instantiated prefab"
        );
        Ok(instance)
    }

    /// Geometry for every node in preorder
    fn resolve_meshes(
        &self,
        node: &PrefabNode,
        base_dir: &Path,
        out: &mut Vec<Option<MeshData>>,
    ) -> Result<(), AssetError> {
        let mesh = match &node.mesh {
            None => None,
            Some(PrefabMesh::Cube) => Some(MeshData::cube()),
            Some(PrefabMesh::Sphere { segments }) => Some(MeshData::sphere(*segments)),
            Some(PrefabMesh::Plane) => Some(MeshData::plane()),
            Some(PrefabMesh::File(file)) => Some(MeshData::load_from_file(&base_dir.join(file))?),
            Some(PrefabMesh::Embedded(index)) => Some(
                self.meshes
                    .get(*index)
                    .cloned()
                    .ok_or_else(|| AssetError::NotFound(format!("{} mesh #{index}", self.name)))?,
            ),
        };
        out.push(mesh);
        for child in &node.children {
            self.resolve_meshes(child, base_dir, out)?;
        }
        Ok(())
    }
}

/// Walks a node tree in the same preorder as `resolve_meshes`
struct SpawnContext<'a> {
    world: &'a mut EngineWorld,
    assets: &'a mut AssetManager,
    flags: HideFlags,
    loaded: std::vec::IntoIter<Option<MeshData>>,
    entities: Vec<EntityHandle>,
    meshes: Vec<MeshHandle>,
    materials: Vec<MaterialHandle>,
}

impl SpawnContext<'_> {
    fn spawn(&mut self, node: &PrefabNode, parent: Option<EntityHandle>) -> EntityHandle {
        let components = (
            Name::new(node.name.clone()),
            node.transform.to_transform(),
            Layer::new(node.layer),
            self.flags,
        );
        let entity = match parent {
            Some(parent) => self.world.spawn_child(parent, components),
            None => self.world.spawn(components),
        };
        self.entities.push(entity);

        if let Some(mesh) = self.loaded.next().flatten() {
            let mesh_handle = self.assets.add_mesh(mesh);
            let mut material = MaterialData::new(&node.name);
            if let Some(color) = node.color {
                material = material.with_albedo(color);
            }
            let material_handle = self.assets.add_material(material);
            self.world
                .insert(entity, MeshRenderer::with_material(mesh_handle, material_handle));
            self.meshes.push(mesh_handle);
            self.materials.push(material_handle);
        }

        for child in &node.children {
            self.spawn(child, Some(entity));
        }
        entity
    }
}

fn gltf_node(
    node: &gltf::Node<'_>,
    buffers: &[gltf::buffer::Data],
    meshes: &mut Vec<MeshData>,
) -> PrefabNode {
    let (translation, rotation, scale) = node.transform().decomposed();
    let mut out = PrefabNode {
        name: node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Node {}", node.index())),
        transform: PrefabTransform::from_transform(&Transform::new(
            Vec3::from_array(translation),
            Quat::from_array(rotation),
            Vec3::from_array(scale),
        )),
        ..Default::default()
    };

    if let Some(gltf_mesh) = node.mesh() {
        let mut mesh = MeshData {
            name: gltf_mesh
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| out.name.clone()),
            ..Default::default()
        };
        mesh.append_gltf_mesh(&gltf_mesh, buffers);
        if mesh.is_valid() {
            mesh.ensure_normals();
            out.color = gltf_mesh
                .primitives()
                .next()
                .map(|p| p.material().pbr_metallic_roughness().base_color_factor());
            out.mesh = Some(PrefabMesh::Embedded(meshes.len()));
            meshes.push(mesh);
        }
    }

    out.children = node
        .children()
        .map(|child| gltf_node(&child, buffers, meshes))
        .collect();
    out
}
