//! Editor session - the engine services the tool windows operate on

use std::path::Path;

use engine_core::ecs::EngineWorld;
use engine_render::{AssetDatabase, AssetError, AssetManager, AssetPreviews, Renderer};
use tracing::warn;

/// Scene world, assets and project database shared by the tool windows
pub struct EditorSession {
    pub world: EngineWorld,
    pub assets: AssetManager,
    pub database: AssetDatabase,
    pub renderer: Renderer,
    pub previews: AssetPreviews,
}

impl EditorSession {
    /// Open the project at `project_root`, creating `Assets/` if needed
    pub fn open(project_root: impl AsRef<Path>, preview_size: u32) -> Result<Self, AssetError> {
        Ok(Self {
            world: EngineWorld::new(),
            assets: AssetManager::new(),
            database: AssetDatabase::open(project_root)?,
            renderer: Renderer::new(),
            previews: AssetPreviews::new(preview_size),
        })
    }

    /// Rescan the project so new files show up in the pickers
    pub fn refresh_assets(&mut self) {
        if let Err(err) = self.database.refresh() {
            warn!(error = %err, "asset database refresh failed");
        }
    }

    /// Root entities visible in the hierarchy
    pub fn visible_root_count(&self) -> usize {
        self.world.root_entities(false).len()
    }
}
