//! Tool settings persisted as RON

use std::fs;
use std::path::{Path, PathBuf};

use engine_editor::{
    CameraPreviewWindow, DEFAULT_CAMERA_OUTPUT, DEFAULT_CONSOLE_CAPACITY, DEFAULT_ICON_OUTPUT,
    IconGeneratorWindow,
};
use engine_render::{CaptureSettings, PREVIEW_SIZE};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings file read at startup, relative to the working directory
pub const SETTINGS_PATH: &str = "config/preview_tools.ron";
/// Filter used when neither the settings nor `RUST_LOG` provide one
pub const DEFAULT_LOG_FILTER: &str = "info,wgpu=warn";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewToolsSettings {
    /// Project whose `Assets/` directory the tools browse and write into
    pub project_root: PathBuf,
    pub log_filter: String,
    pub console_capacity: usize,
    /// Initial Camera Preview Generator configuration
    pub camera: CaptureSettings,
    pub camera_output_path: String,
    pub icon_save_path: String,
    pub icon_preview_size: u32,
}

impl Default for PreviewToolsSettings {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("demo_project"),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            console_capacity: DEFAULT_CONSOLE_CAPACITY,
            camera: CaptureSettings::default(),
            camera_output_path: DEFAULT_CAMERA_OUTPUT.to_string(),
            icon_save_path: DEFAULT_ICON_OUTPUT.to_string(),
            icon_preview_size: PREVIEW_SIZE,
        }
    }
}

impl PreviewToolsSettings {
    /// Read settings. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Copy the tool windows' current configuration into the settings.
    /// The icon path is only kept while it is typed by hand, not derived from an object.
    pub fn store_window_state(&mut self, camera: &CameraPreviewWindow, icon: &IconGeneratorWindow) {
        self.camera = camera.settings.clone();
        self.camera_output_path = camera.output_path.clone();
        if !icon.use_object_path() {
            self.icon_save_path = icon.save_path().to_string();
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let write_error = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let content = ron::ser::to_string_pretty(self, PrettyConfig::new())?;
        fs::write(path, content).map_err(write_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("settings-test-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = PreviewToolsSettings::load(&scratch_file("absent.ron")).unwrap();
        assert_eq!(settings, PreviewToolsSettings::default());
        assert_eq!(settings.camera.fov_degrees, 60.0);
        assert_eq!(settings.camera_output_path, "Assets/CameraPreview.png");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = scratch_file("partial.ron");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "(icon_preview_size: 256, camera: (width: 1024))").unwrap();

        let settings = PreviewToolsSettings::load(&path).unwrap();
        assert_eq!(settings.icon_preview_size, 256);
        assert_eq!(settings.camera.width, 1024);
        assert_eq!(settings.camera.height, 512);
        assert_eq!(settings.log_filter, DEFAULT_LOG_FILTER);
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let path = scratch_file("broken.ron");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "(camera: ").unwrap();

        assert!(matches!(
            PreviewToolsSettings::load(&path),
            Err(SettingsError::Parse { .. })
        ));
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn saved_settings_load_back() {
        let path = scratch_file("config/preview_tools.ron");
        let mut settings = PreviewToolsSettings::default();
        settings.camera.use_layer_filtering = true;
        settings.camera.render_layer = 7;
        settings.icon_save_path = "Assets/Icons/Out.png".into();

        settings.save(&path).unwrap();
        assert_eq!(PreviewToolsSettings::load(&path).unwrap(), settings);
        fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).unwrap();
    }

    #[test]
    fn window_state_is_stored_including_manual_icon_path() {
        let mut camera = CameraPreviewWindow::default();
        camera.set_size(300);
        camera.output_path = "Assets/Shots/Hero.png".into();
        let mut icon = IconGeneratorWindow::default();
        icon.set_save_path("Assets/Icons/Manual.png".into());

        let mut settings = PreviewToolsSettings::default();
        settings.store_window_state(&camera, &icon);

        assert_eq!((settings.camera.width, settings.camera.height), (300, 300));
        assert_eq!(settings.camera_output_path, "Assets/Shots/Hero.png");
        assert_eq!(settings.icon_save_path, "Assets/Icons/Manual.png");
    }

    #[test]
    fn derived_icon_path_is_not_stored() {
        let mut icon = IconGeneratorWindow::default();
        icon.set_use_object_path(true);
        icon.select_object(Some("Assets/Props/Crate.prefab".into()));

        let mut settings = PreviewToolsSettings::default();
        settings.store_window_state(&CameraPreviewWindow::default(), &icon);

        assert_eq!(settings.icon_save_path, DEFAULT_ICON_OUTPUT);
    }
}
