//! Camera Preview Generator window
//!
//! Frames a prefab with a temporary camera, renders it offscreen and writes
//! the result as a PNG.

use std::path::PathBuf;

use egui::{Color32, DragValue, RichText, Slider, Ui};
use tracing::{error, info, warn};

use engine_core::components::{ClearFlags, MAX_LAYERS};
use engine_render::{
    AssetKind, CaptureSettings, MAX_TEXTURE_SIZE, PreviewError, PreviewResult, capture, write_png,
};

use crate::session::EditorSession;
use crate::widgets;

/// Window title, also the menu entry
pub const CAMERA_PREVIEW_TITLE: &str = "Generate Preview From Camera";
/// Output path used until the user picks one
pub const DEFAULT_CAMERA_OUTPUT: &str = "Assets/CameraPreview.png";

/// Outcome of the last generate action, shown under the button
#[derive(Debug, Clone, PartialEq)]
enum Status {
    None,
    Written(PathBuf),
    Failed(String),
}

pub struct CameraPreviewWindow {
    pub open: bool,
    pub object: Option<String>,
    pub settings: CaptureSettings,
    pub output_path: String,
    proportional_size: bool,
    status: Status,
}

impl Default for CameraPreviewWindow {
    fn default() -> Self {
        Self::new(CaptureSettings::default(), DEFAULT_CAMERA_OUTPUT.to_string())
    }
}

impl CameraPreviewWindow {
    pub fn new(settings: CaptureSettings, output_path: String) -> Self {
        let mut window = Self {
            open: false,
            object: None,
            settings,
            output_path,
            proportional_size: true,
            status: Status::None,
        };
        window.set_proportional_size(true);
        window
    }

    pub fn proportional_size(&self) -> bool {
        self.proportional_size
    }

    /// Turning proportional mode on copies the width into the height
    pub fn set_proportional_size(&mut self, proportional: bool) {
        self.proportional_size = proportional;
        if proportional {
            self.settings.height = self.settings.width;
        }
    }

    fn clamp_size(size: u32) -> u32 {
        size.clamp(1, MAX_TEXTURE_SIZE)
    }

    /// Single size field used in proportional mode
    pub fn set_size(&mut self, size: u32) {
        let size = Self::clamp_size(size);
        self.settings.width = size;
        self.settings.height = size;
    }

    pub fn set_width(&mut self, width: u32) {
        if self.proportional_size {
            self.set_size(width);
        } else {
            self.settings.width = Self::clamp_size(width);
        }
    }

    pub fn set_height(&mut self, height: u32) {
        if self.proportional_size {
            self.set_size(height);
        } else {
            self.settings.height = Self::clamp_size(height);
        }
    }

    /// Render the selected object and write the PNG. Nothing is written on failure.
    pub fn generate(&mut self, session: &mut EditorSession) -> PreviewResult<PathBuf> {
        let object = self.object.as_deref().ok_or(PreviewError::NoObjectSelected)?;
        if self.output_path.trim().is_empty() {
            return Err(PreviewError::InvalidConfig("output path is empty".into()));
        }

        let (prefab, base_dir) = session.database.load_prefab(object)?;
        let captured = capture(
            &mut session.world,
            &mut session.assets,
            &session.renderer,
            &prefab,
            &base_dir,
            &self.settings,
        )?;

        let path = session.database.absolute_path(self.output_path.trim());
        write_png(&captured.image, &path)?;
        session.refresh_assets();
        Ok(path)
    }

    /// [`Self::generate`] with the outcome logged to the console
    pub fn generate_and_report(&mut self, session: &mut EditorSession) {
        match self.generate(session) {
            Ok(path) => {
                info!(path = %path.display(), "camera preview saved");
                self.status = Status::Written(path);
            }
            Err(err) => {
                if err.is_severe() {
                    error!(error = %err, "camera preview generation failed");
                } else {
                    warn!(error = %err, "camera preview generation failed");
                }
                self.status = Status::Failed(err.to_string());
            }
        }
    }

    /// Draw the window if it is open
    pub fn show(&mut self, ctx: &egui::Context, session: &mut EditorSession) {
        let mut open = self.open;
        egui::Window::new(CAMERA_PREVIEW_TITLE)
            .open(&mut open)
            .resizable(false)
            .default_width(340.0)
            .show(ctx, |ui| self.ui(ui, session));
        self.open = open;
    }

    fn ui(&mut self, ui: &mut Ui, session: &mut EditorSession) {
        egui::Grid::new("camera_preview_grid")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                ui.label("Object");
                widgets::object_field(
                    ui,
                    "camera_preview_object",
                    &session.database,
                    &mut self.object,
                    AssetKind::is_instantiable,
                );
                ui.end_row();

                ui.label("Field of View");
                ui.add(Slider::new(&mut self.settings.fov_degrees, 1.0..=179.0).suffix("°"));
                ui.end_row();

                ui.label("Auto Distance");
                ui.checkbox(&mut self.settings.auto_distance, "");
                ui.end_row();

                ui.label("Distance");
                ui.add_enabled(
                    !self.settings.auto_distance,
                    DragValue::new(&mut self.settings.distance)
                        .speed(0.05)
                        .range(0.01..=10_000.0),
                );
                ui.end_row();

                ui.label("Rotation Offset");
                ui.horizontal(|ui| {
                    let [x, y, z] = &mut self.settings.rotation_offset;
                    ui.add(DragValue::new(x).prefix("X ").speed(0.5));
                    ui.add(DragValue::new(y).prefix("Y ").speed(0.5));
                    ui.add(DragValue::new(z).prefix("Z ").speed(0.5));
                });
                ui.end_row();

                ui.label("Proportional Size");
                let mut proportional = self.proportional_size;
                if ui.checkbox(&mut proportional, "").changed() {
                    self.set_proportional_size(proportional);
                }
                ui.end_row();

                if self.proportional_size {
                    ui.label("Size");
                    let mut size = self.settings.width;
                    if ui.add(DragValue::new(&mut size).range(1..=MAX_TEXTURE_SIZE)).changed() {
                        self.set_size(size);
                    }
                    ui.end_row();
                } else {
                    ui.label("Width");
                    let mut width = self.settings.width;
                    if ui.add(DragValue::new(&mut width).range(1..=MAX_TEXTURE_SIZE)).changed() {
                        self.set_width(width);
                    }
                    ui.end_row();

                    ui.label("Height");
                    let mut height = self.settings.height;
                    if ui.add(DragValue::new(&mut height).range(1..=MAX_TEXTURE_SIZE)).changed() {
                        self.set_height(height);
                    }
                    ui.end_row();
                }

                ui.label("Background");
                ui.color_edit_button_rgba_unmultiplied(&mut self.settings.background);
                ui.end_row();

                ui.label("Clear Flags");
                egui::ComboBox::from_id_salt("camera_preview_clear_flags")
                    .selected_text(self.settings.clear_flags.label())
                    .show_ui(ui, |ui| {
                        for flags in ClearFlags::ALL {
                            ui.selectable_value(&mut self.settings.clear_flags, flags, flags.label());
                        }
                    });
                ui.end_row();

                ui.label("Layer Filtering");
                ui.checkbox(&mut self.settings.use_layer_filtering, "");
                ui.end_row();

                if self.settings.use_layer_filtering {
                    ui.label("Render Layer");
                    ui.add(DragValue::new(&mut self.settings.render_layer).range(0..=MAX_LAYERS - 1));
                    ui.end_row();

                    ui.label("Model Layer");
                    ui.add(DragValue::new(&mut self.settings.model_layer).range(0..=MAX_LAYERS - 1));
                    ui.end_row();
                }

                ui.label("Output Path");
                ui.horizontal(|ui| {
                    ui.text_edit_singleline(&mut self.output_path);
                    if ui.button("…").clicked() {
                        if let Some(path) = widgets::save_png_dialog(&session.database, &self.output_path) {
                            self.output_path = path;
                        }
                    }
                });
                ui.end_row();
            });

        ui.add_space(8.0);
        if ui.button("Generate Image").clicked() {
            self.generate_and_report(session);
        }

        match &self.status {
            Status::None => {}
            Status::Written(path) => {
                let saved = RichText::new(format!("Saved {}", path.display()));
                ui.label(saved.color(Color32::from_rgb(120, 200, 120)));
            }
            Status::Failed(message) => {
                ui.label(RichText::new(message).color(Color32::from_rgb(232, 96, 88)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;

    fn session() -> (std::path::PathBuf, EditorSession) {
        let root = std::env::temp_dir().join(format!("camera-window-test-{}", uuid::Uuid::new_v4()));
        let session = EditorSession::open(&root, 32).unwrap();
        (root, session)
    }

    #[test]
    fn generate_without_object_writes_nothing() {
        let (root, mut session) = session();
        let mut window = CameraPreviewWindow::default();

        let err = window.generate(&mut session).unwrap_err();

        assert!(matches!(err, PreviewError::NoObjectSelected));
        assert!(!root.join(DEFAULT_CAMERA_OUTPUT).exists());
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn generate_writes_png_and_refreshes_database() {
        let (root, mut session) = session();
        fs::write(
            root.join("Assets/Box.prefab"),
            r#"(name: "Box", root: (name: "Box", mesh: Some(Cube)))"#,
        )
        .unwrap();
        session.refresh_assets();

        let mut window = CameraPreviewWindow::default();
        window.object = Some("Assets/Box.prefab".into());
        window.set_size(24);

        let path = window.generate(&mut session).unwrap();
        assert_eq!(path, root.join(DEFAULT_CAMERA_OUTPUT));
        assert!(session.database.contains(DEFAULT_CAMERA_OUTPUT));
        assert_eq!(session.world.entity_count(), 0);
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn turning_proportional_on_copies_width() {
        let mut window = CameraPreviewWindow::default();
        window.set_proportional_size(false);
        window.set_width(640);
        window.set_height(360);
        assert_eq!((window.settings.width, window.settings.height), (640, 360));

        window.set_proportional_size(true);
        assert_eq!((window.settings.width, window.settings.height), (640, 640));
    }

    #[test]
    fn failure_status_is_kept_for_display() {
        let (root, mut session) = session();
        let mut window = CameraPreviewWindow::default();
        window.object = Some("Assets/Missing.prefab".into());
        window.generate_and_report(&mut session);
        assert!(matches!(window.status, Status::Failed(_)));
        fs::remove_dir_all(&root).unwrap();
    }

    proptest! {
        #[test]
        fn proportional_edits_keep_square(edits in proptest::collection::vec((0u8..3, 0u32..20_000), 1..16)) {
            let mut window = CameraPreviewWindow::default();
            for (field, value) in edits {
                match field {
                    0 => window.set_size(value),
                    1 => window.set_width(value),
                    _ => window.set_height(value),
                }
                prop_assert_eq!(window.settings.width, window.settings.height);
                prop_assert!((1..=MAX_TEXTURE_SIZE).contains(&window.settings.width));
            }
        }
    }
}
