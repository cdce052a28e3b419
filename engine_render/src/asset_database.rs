//! Asset database over a project's `Assets/` directory
//!
//! Asset paths are project-relative strings with `/` separators, such as
//! `Assets/Props/Crate.prefab`. Files outside `Assets/` keep their absolute path.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::AssetError;
use crate::prefab::{PREFAB_EXTENSION, Prefab};

/// Name of the asset root below the project directory
pub const ASSETS_DIR: &str = "Assets";

/// Coarse asset classification by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Prefab,
    Model,
    Image,
    Other,
}

impl AssetKind {
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            PREFAB_EXTENSION => AssetKind::Prefab,
            "obj" | "gltf" | "glb" => AssetKind::Model,
            "png" | "jpg" | "jpeg" | "webp" => AssetKind::Image,
            _ => AssetKind::Other,
        }
    }

    /// Can be instantiated into the world
    pub fn is_instantiable(self) -> bool {
        matches!(self, AssetKind::Prefab | AssetKind::Model)
    }

    /// Tile color and short label for icons and thumbnails
    pub fn icon_style(self) -> ([u8; 3], &'static str) {
        match self {
            AssetKind::Prefab => ([56, 95, 166], "PF"),
            AssetKind::Model => ([86, 132, 176], "MESH"),
            AssetKind::Image => ([64, 146, 112], "IMG"),
            AssetKind::Other => ([88, 88, 88], "AS"),
        }
    }
}

/// Index of every file below `Assets/`
#[derive(Debug, Clone)]
pub struct AssetDatabase {
    project_root: PathBuf,
    assets: BTreeMap<String, AssetKind>,
}

impl AssetDatabase {
    /// Open a project, creating its `Assets/` directory if needed
    pub fn open(project_root: impl AsRef<Path>) -> Result<Self, AssetError> {
        let project_root = std::path::absolute(project_root.as_ref())?;
        fs::create_dir_all(project_root.join(ASSETS_DIR))?;

        let mut database = Self {
            project_root,
            assets: BTreeMap::new(),
        };
        database.refresh()?;
        Ok(database)
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.project_root.join(ASSETS_DIR)
    }

    /// Rescan `Assets/`. Returns the number of indexed assets.
    pub fn refresh(&mut self) -> Result<usize, AssetError> {
        let assets_dir = self.assets_dir();
        let mut found = Vec::new();
        collect_asset_files(&assets_dir, &assets_dir, &mut found)?;

        self.assets = found
            .into_iter()
            .map(|path| {
                let kind = AssetKind::from_path(&path);
                (path, kind)
            })
            .collect();

        info!(count = self.assets.len(), root = %self.project_root.display(), "asset database refreshed");
        Ok(self.assets.len())
    }

    /// Indexed assets in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, AssetKind)> {
        self.assets.iter().map(|(path, kind)| (path.as_str(), *kind))
    }

    /// Prefabs and models, in path order
    pub fn instantiable(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, kind)| kind.is_instantiable())
            .map(|(path, _)| path)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Whether the last refresh indexed `asset_path`
    pub fn contains(&self, asset_path: &str) -> bool {
        self.assets.contains_key(asset_path)
    }

    /// Whether `asset_path` currently exists on disk
    pub fn exists(&self, asset_path: &str) -> bool {
        self.absolute_path(asset_path).is_file()
    }

    pub fn kind(&self, asset_path: &str) -> AssetKind {
        self.assets
            .get(asset_path)
            .copied()
            .unwrap_or_else(|| AssetKind::from_path(asset_path))
    }

    /// Filesystem path of an asset path. Absolute paths pass through.
    pub fn absolute_path(&self, asset_path: &str) -> PathBuf {
        let path = Path::new(asset_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Asset path of a filesystem path: `Assets/...` inside the asset root,
    /// the absolute path otherwise
    pub fn to_asset_path(&self, path: &Path) -> String {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        };
        match absolute.strip_prefix(self.assets_dir()) {
            Ok(relative) => {
                let relative = relative.to_string_lossy().replace('\\', "/");
                if relative.is_empty() {
                    ASSETS_DIR.to_string()
                } else {
                    format!("{ASSETS_DIR}/{relative}")
                }
            }
            Err(_) => absolute.to_string_lossy().to_string(),
        }
    }

    /// Load an asset as a prefab. Returns the prefab and the directory its
    /// relative mesh paths resolve against.
    pub fn load_prefab(&self, asset_path: &str) -> Result<(Prefab, PathBuf), AssetError> {
        let path = self.absolute_path(asset_path);
        if !path.is_file() {
            return Err(AssetError::NotFound(asset_path.to_string()));
        }
        if !self.kind(asset_path).is_instantiable() {
            return Err(AssetError::NotInstantiable(asset_path.to_string()));
        }

        let prefab = Prefab::load(&path)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.project_root.clone());
        debug!(asset = asset_path, "loaded prefab");
        Ok((prefab, base_dir))
    }
}

fn collect_asset_files(root: &Path, current: &Path, out: &mut Vec<String>) -> Result<(), AssetError> {
    if !current.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(current)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_asset_files(root, &path, out)?;
        } else if path.is_file() {
            let rel = path
                .strip_prefix(root)
                .ok()
                .and_then(|p| p.to_str())
                .unwrap_or(name)
                .replace('\\', "/");
            out.push(format!("{ASSETS_DIR}/{rel}"));
        }
    }
    Ok(())
}
