//! Asset Manager with handle-based resource storage
//!
//! All assets are accessed through handles, never directly stored in components.

use std::collections::HashMap;

use engine_core::components::{MaterialHandle, MeshHandle};

use crate::mesh::MeshData;

/// Material data
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    pub name: String,
    /// Straight RGBA base color in 0..1
    pub albedo: [f32; 4],
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            albedo: [0.8, 0.8, 0.8, 1.0],
        }
    }
}

impl MaterialData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_albedo(mut self, albedo: [f32; 4]) -> Self {
        self.albedo = albedo;
        self
    }
}

/// Asset Manager - owns mesh and material data behind handles
///
/// Handles are never reused after unload, so a stale handle simply resolves to nothing.
pub struct AssetManager {
    meshes: HashMap<u64, MeshData>,
    materials: HashMap<u64, MaterialData>,
    next_mesh_id: u64,
    next_material_id: u64,
}

impl Default for AssetManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetManager {
    pub fn new() -> Self {
        Self {
            meshes: HashMap::new(),
            materials: HashMap::new(),
            next_mesh_id: 1,
            next_material_id: 1,
        }
    }

    /// Register mesh data and return its handle
    pub fn add_mesh(&mut self, mesh: MeshData) -> MeshHandle {
        let id = self.next_mesh_id;
        self.next_mesh_id += 1;
        self.meshes.insert(id, mesh);
        MeshHandle { id }
    }

    /// Register material data and return its handle
    pub fn add_material(&mut self, material: MaterialData) -> MaterialHandle {
        let id = self.next_material_id;
        self.next_material_id += 1;
        self.materials.insert(id, material);
        MaterialHandle { id }
    }

    /// Get mesh data by handle
    pub fn get_mesh(&self, handle: MeshHandle) -> Option<&MeshData> {
        self.meshes.get(&handle.id)
    }

    /// Get material data by handle
    pub fn get_material(&self, handle: MaterialHandle) -> Option<&MaterialData> {
        self.materials.get(&handle.id)
    }

    /// Unload mesh by handle
    pub fn unload_mesh(&mut self, handle: MeshHandle) -> bool {
        self.meshes.remove(&handle.id).is_some()
    }

    /// Unload material by handle
    pub fn unload_material(&mut self, handle: MaterialHandle) -> bool {
        self.materials.remove(&handle.id).is_some()
    }

    /// Get mesh count
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Get material count
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}
