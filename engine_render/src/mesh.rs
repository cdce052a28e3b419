//! Mesh data and model file loading
//!
//! MeshData holds CPU-side triangle geometry: positions, normals and indices.

use std::path::Path;

use engine_core::bounds::Aabb;
use glam::Vec3;

use crate::error::AssetError;

/// Vertex data for rendering
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self { position, normal }
    }
}

/// Upper bound on sphere rings and sectors; keeps indices in u32 and memory bounded
pub const MAX_SPHERE_SEGMENTS: u32 = 256;

/// Triangle mesh in local space
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Load a mesh from file (.obj, .gltf, .glb), merging every primitive
    pub fn load_from_file(path: &Path) -> Result<Self, AssetError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| AssetError::UnsupportedFormat(path.display().to_string()))?;

        match ext.as_str() {
            "obj" => Self::load_obj(path),
            "gltf" | "glb" => Self::load_gltf(path),
            _ => Err(AssetError::UnsupportedFormat(ext)),
        }
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    fn load_obj(path: &Path) -> Result<Self, AssetError> {
        let load_options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ignore_points: true,
            ignore_lines: true,
        };
        let (models, _) =
            tobj::load_obj(path, &load_options).map_err(|e| AssetError::load(path, e))?;

        let mut mesh = Self {
            name: Self::file_name(path),
            ..Default::default()
        };

        for model in models {
            let source = &model.mesh;
            let base = mesh.vertices.len() as u32;

            for (i, p) in source.positions.chunks_exact(3).enumerate() {
                let normal = source
                    .normals
                    .get(i * 3..i * 3 + 3)
                    .map(|n| Vec3::new(n[0], n[1], n[2]))
                    .unwrap_or(Vec3::ZERO);
                mesh.vertices
                    .push(Vertex::new(Vec3::new(p[0], p[1], p[2]), normal));
            }
            mesh.indices.extend(source.indices.iter().map(|&i| base + i));
        }

        // OBJ files frequently omit normals
        mesh.ensure_normals();
        Ok(mesh)
    }

    fn load_gltf(path: &Path) -> Result<Self, AssetError> {
        let (document, buffers, _) = gltf::import(path).map_err(|e| AssetError::load(path, e))?;

        let mut mesh = Self {
            name: Self::file_name(path),
            ..Default::default()
        };
        for gltf_mesh in document.meshes() {
            mesh.append_gltf_mesh(&gltf_mesh, &buffers);
        }

        mesh.ensure_normals();
        Ok(mesh)
    }

    /// Append every primitive of a glTF mesh
    pub(crate) fn append_gltf_mesh(&mut self, gltf_mesh: &gltf::Mesh<'_>, buffers: &[gltf::buffer::Data]) {
        for primitive in gltf_mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

            let base_vertex = self.vertices.len();
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            self.vertices
                .extend(positions.map(|p| Vertex::new(Vec3::from_array(p), Vec3::ZERO)));

            if let Some(normals) = reader.read_normals() {
                for (vertex, normal) in self.vertices[base_vertex..].iter_mut().zip(normals) {
                    vertex.normal = Vec3::from_array(normal);
                }
            }

            let count = (self.vertices.len() - base_vertex) as u32;
            let base = base_vertex as u32;
            match reader.read_indices() {
                Some(indices) => self.indices.extend(indices.into_u32().map(|i| base + i)),
                None => self.indices.extend(base..base + count),
            }
        }
    }

    /// Make sure every vertex has a usable normal.
    /// If any normal is zero, recompute all of them as area-weighted face normals.
    pub fn ensure_normals(&mut self) {
        let has_zero_normals = self
            .vertices
            .iter()
            .any(|v| v.normal.length_squared() < 1e-6);

        if !has_zero_normals {
            return;
        }

        for v in &mut self.vertices {
            v.normal = Vec3::ZERO;
        }

        let vertex_count = self.vertices.len();
        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }
            let p0 = self.vertices[i0].position;
            let face_normal =
                (self.vertices[i1].position - p0).cross(self.vertices[i2].position - p0);
            // Not normalized: magnitude weights by triangle area
            self.vertices[i0].normal += face_normal;
            self.vertices[i1].normal += face_normal;
            self.vertices[i2].normal += face_normal;
        }

        for v in &mut self.vertices {
            v.normal = v.normal.try_normalize().unwrap_or(Vec3::Y);
        }
    }

    /// Local-space bounds of the referenced vertices, `None` for an empty mesh
    pub fn bounds(&self) -> Option<Aabb> {
        if self.indices.is_empty() {
            return None;
        }
        Aabb::from_points(
            self.indices
                .iter()
                .filter_map(|&i| self.vertices.get(i as usize))
                .map(|v| v.position),
        )
    }

    /// Unit cube centered at the origin
    pub fn cube() -> Self {
        const FACES: [(Vec3, Vec3, Vec3); 6] = [
            // normal, u axis, v axis
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        ];
        const CORNERS: [(f32, f32); 4] = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];

        let mut mesh = Self {
            name: "Cube".to_string(),
            ..Default::default()
        };
        for (normal, u_axis, v_axis) in FACES {
            let base = mesh.vertices.len() as u32;
            for (u, v) in CORNERS {
                mesh.vertices
                    .push(Vertex::new(normal * 0.5 + u_axis * u + v_axis * v, normal));
            }
            mesh.indices
                .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// UV sphere of diameter 1 centered at the origin.
    /// `segments` is clamped to `3..=MAX_SPHERE_SEGMENTS`.
    pub fn sphere(segments: u32) -> Self {
        let rings = segments.clamp(3, MAX_SPHERE_SEGMENTS);
        let sectors = rings;

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        let r_step = std::f32::consts::PI / rings as f32;
        let t_step = std::f32::consts::TAU / sectors as f32;

        for i in 0..=rings {
            let (sin_phi, cos_phi) = (i as f32 * r_step).sin_cos();
            for j in 0..=sectors {
                let (sin_theta, cos_theta) = (j as f32 * t_step).sin_cos();
                let unit = Vec3::new(cos_theta * sin_phi, cos_phi, sin_theta * sin_phi);
                vertices.push(Vertex::new(unit * 0.5, unit.normalize_or(Vec3::Y)));
            }
        }

        for i in 0..rings {
            for j in 0..sectors {
                let first = i * (sectors + 1) + j;
                let second = first + sectors + 1;
                indices.extend([first, second, first + 1, second, second + 1, first + 1]);
            }
        }

        Self {
            name: "Sphere".to_string(),
            vertices,
            indices,
        }
    }

    /// Unit plane on XZ facing +Y
    pub fn plane() -> Self {
        let corners = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];
        let vertices = corners
            .iter()
            .map(|&(x, z)| Vertex::new(Vec3::new(x, 0.0, z), Vec3::Y))
            .collect();

        Self {
            name: "Plane".to_string(),
            vertices,
            indices: vec![0, 2, 1, 0, 3, 2],
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check whether the mesh has any geometry to draw
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }
}
