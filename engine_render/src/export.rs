//! PNG export
//!
//! Encoding and writing are separate steps so their failures are reported
//! separately. Writes land in a sibling temp file that is renamed into place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use tracing::{debug, info};

use crate::error::ExportError;

/// Encode an RGBA image as PNG bytes
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ExportError::Empty);
    }
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    debug!(width = image.width(), height = image.height(), bytes = bytes.len(), "encoded PNG");
    Ok(bytes)
}

/// Write `bytes` to `path`, creating parent directories. Either the whole file
/// appears or nothing does.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let wrap = |source: io::Error| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap)?;
    }

    let temp = temp_path(path);
    if let Err(err) = fs::write(&temp, bytes).and_then(|_| fs::rename(&temp, path)) {
        let _ = fs::remove_file(&temp);
        return Err(wrap(err));
    }
    Ok(())
}

/// Encode and write in one step
pub fn write_png(image: &RgbaImage, path: &Path) -> Result<(), ExportError> {
    let bytes = encode_png(image)?;
    write_atomic(path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote PNG");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
