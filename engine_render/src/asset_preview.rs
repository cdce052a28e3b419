//! Asset previews and mini thumbnails
//!
//! Previews are produced on demand and never cached: prefabs and models are
//! rendered in a scratch world, images are scaled down to fit.

use engine_core::components::ClearFlags;
use engine_core::ecs::EngineWorld;
use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::asset_database::{AssetDatabase, AssetKind};
use crate::asset_manager::AssetManager;
use crate::camera_capture::{CaptureSettings, capture};
use crate::error::{PreviewError, PreviewResult};
use crate::renderer::{MAX_TEXTURE_SIZE, Renderer};

/// Default edge of a high-quality preview
pub const PREVIEW_SIZE: u32 = 128;
/// Edge of the fallback thumbnail
pub const MINI_THUMBNAIL_SIZE: u32 = 16;
/// Elevated three-quarter view used for model previews, Euler degrees
pub const PREVIEW_ROTATION: [f32; 3] = [-25.0, 35.0, 0.0];
const PREVIEW_BACKGROUND: [f32; 4] = [0.13, 0.15, 0.18, 1.0];

/// Which provider produced a fetched bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewSource {
    Preview,
    Thumbnail,
}

/// Bitmap fetched for an asset
#[derive(Debug, Clone)]
pub struct PreviewImage {
    pub image: RgbaImage,
    pub source: PreviewSource,
}

/// Preview provider for assets in an [`AssetDatabase`]
#[derive(Debug, Clone)]
pub struct AssetPreviews {
    preview_size: u32,
    renderer: Renderer,
}

impl Default for AssetPreviews {
    fn default() -> Self {
        Self::new(PREVIEW_SIZE)
    }
}

impl AssetPreviews {
    pub fn new(preview_size: u32) -> Self {
        Self {
            preview_size: preview_size.clamp(1, MAX_TEXTURE_SIZE),
            renderer: Renderer::new(),
        }
    }

    pub fn preview_size(&self) -> u32 {
        self.preview_size
    }

    /// High-quality preview, `None` when the asset has none
    pub fn asset_preview(&self, database: &AssetDatabase, asset_path: &str) -> Option<RgbaImage> {
        if !database.exists(asset_path) {
            return None;
        }
        match database.kind(asset_path) {
            AssetKind::Prefab | AssetKind::Model => self.render_preview(database, asset_path),
            AssetKind::Image => {
                let path = database.absolute_path(asset_path);
                match image::open(&path) {
                    Ok(decoded) => Some(decoded.thumbnail(self.preview_size, self.preview_size).to_rgba8()),
                    Err(err) => {
                        debug!(asset = asset_path, error = %err, "image preview unavailable");
                        None
                    }
                }
            }
            AssetKind::Other => None,
        }
    }

    /// Low-resolution type-colored tile, `None` when the asset does not exist
    pub fn mini_thumbnail(&self, database: &AssetDatabase, asset_path: &str) -> Option<RgbaImage> {
        if !database.exists(asset_path) {
            return None;
        }
        let ([r, g, b], _) = database.kind(asset_path).icon_style();
        let fill = Rgba([r, g, b, 255]);
        let border = Rgba([r / 2, g / 2, b / 2, 255]);
        let last = MINI_THUMBNAIL_SIZE - 1;
        Some(RgbaImage::from_fn(MINI_THUMBNAIL_SIZE, MINI_THUMBNAIL_SIZE, |x, y| {
            if x == 0 || y == 0 || x == last || y == last {
                border
            } else {
                fill
            }
        }))
    }

    /// Preview, falling back to the mini thumbnail
    pub fn fetch(&self, database: &AssetDatabase, asset_path: &str) -> PreviewResult<PreviewImage> {
        if let Some(image) = self.asset_preview(database, asset_path) {
            return Ok(PreviewImage {
                image,
                source: PreviewSource::Preview,
            });
        }
        if let Some(image) = self.mini_thumbnail(database, asset_path) {
            return Ok(PreviewImage {
                image,
                source: PreviewSource::Thumbnail,
            });
        }
        Err(PreviewError::PreviewUnavailable(asset_path.to_string()))
    }

    fn render_preview(&self, database: &AssetDatabase, asset_path: &str) -> Option<RgbaImage> {
        let settings = CaptureSettings {
            width: self.preview_size,
            height: self.preview_size,
            rotation_offset: PREVIEW_ROTATION,
            background: PREVIEW_BACKGROUND,
            clear_flags: ClearFlags::SolidColor,
            ..Default::default()
        };
        let mut world = EngineWorld::new();
        let mut assets = AssetManager::new();

        let result = database
            .load_prefab(asset_path)
            .map_err(PreviewError::from)
            .and_then(|(prefab, base_dir)| {
                capture(&mut world, &mut assets, &self.renderer, &prefab, &base_dir, &settings)
            });
        match result {
            Ok(capture) => Some(capture.image),
            Err(err) => {
                debug!(asset = asset_path, error = %err, "rendered preview unavailable");
                None
            }
        }
    }
}
