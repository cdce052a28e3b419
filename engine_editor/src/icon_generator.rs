//! Icon Generator window
//!
//! Fetches the preview (or fallback thumbnail) of an asset and saves it as PNG.

use std::path::{Path, PathBuf};

use egui::{Color32, RichText, TextureHandle, Ui};
use tracing::{error, info, warn};

use engine_render::{PreviewError, PreviewImage, PreviewResult, PreviewSource, write_png};

use crate::session::EditorSession;
use crate::widgets;

/// Window title, also the menu entry
pub const ICON_GENERATOR_TITLE: &str = "Generate Preview From Icon";
/// Save path used until the user picks one
pub const DEFAULT_ICON_OUTPUT: &str = "Assets/PreviewIcon.png";
const ICON_SUFFIX: &str = "_Icon.png";

/// Where the window is in its select, generate, save cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconState {
    Idle,
    PathComputed,
    PreviewReady,
    Saved,
    Failed,
}

/// `<dir>/<stem>_Icon.png` next to the asset; `None` when the path has no file stem
pub fn derive_icon_path(asset_path: &str) -> Option<String> {
    let path = Path::new(asset_path);
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    let dir = path
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    if dir.is_empty() {
        Some(format!("{stem}{ICON_SUFFIX}"))
    } else {
        Some(format!("{dir}/{stem}{ICON_SUFFIX}"))
    }
}

pub struct IconGeneratorWindow {
    open: bool,
    object: Option<String>,
    use_object_path: bool,
    save_path: String,
    default_save_path: String,
    preview: Option<PreviewImage>,
    texture: Option<TextureHandle>,
    state: IconState,
    last_error: Option<String>,
}

impl Default for IconGeneratorWindow {
    fn default() -> Self {
        Self::new(DEFAULT_ICON_OUTPUT.to_string())
    }
}

impl IconGeneratorWindow {
    pub fn new(default_save_path: String) -> Self {
        Self {
            open: false,
            object: None,
            use_object_path: false,
            save_path: default_save_path.clone(),
            default_save_path,
            preview: None,
            texture: None,
            state: IconState::Idle,
            last_error: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Open the window. Reopening always starts from a fresh `Idle` state.
    pub fn open(&mut self) {
        if !self.open {
            *self = Self::new(std::mem::take(&mut self.default_save_path));
            self.open = true;
        }
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn state(&self) -> IconState {
        self.state
    }

    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }

    pub fn save_path(&self) -> &str {
        &self.save_path
    }

    pub fn use_object_path(&self) -> bool {
        self.use_object_path
    }

    pub fn preview(&self) -> Option<&PreviewImage> {
        self.preview.as_ref()
    }

    /// Change the referenced object. A different object discards the fetched preview.
    pub fn select_object(&mut self, object: Option<String>) {
        if object == self.object {
            return;
        }
        self.object = object;
        self.preview = None;
        self.texture = None;
        self.last_error = None;
        self.state = if self.recompute_path() {
            IconState::PathComputed
        } else {
            IconState::Idle
        };
    }

    pub fn set_use_object_path(&mut self, use_object_path: bool) {
        self.use_object_path = use_object_path;
        if self.recompute_path() && self.preview.is_none() {
            self.state = IconState::PathComputed;
        }
    }

    /// Manual path edit; ignored while the path follows the object
    pub fn set_save_path(&mut self, path: String) {
        if !self.use_object_path {
            self.save_path = path;
        }
    }

    fn recompute_path(&mut self) -> bool {
        if !self.use_object_path {
            return false;
        }
        match self.object.as_deref().and_then(derive_icon_path) {
            Some(path) => {
                self.save_path = path;
                true
            }
            None => false,
        }
    }

    /// Fetch the preview, falling back to the thumbnail
    pub fn generate_preview(&mut self, session: &EditorSession) -> PreviewResult<PreviewSource> {
        self.texture = None;
        let result = self
            .object
            .as_deref()
            .ok_or(PreviewError::NoObjectSelected)
            .and_then(|object| session.previews.fetch(&session.database, object));

        match result {
            Ok(preview) => {
                let source = preview.source;
                self.preview = Some(preview);
                self.state = IconState::PreviewReady;
                Ok(source)
            }
            Err(err) => {
                self.preview = None;
                self.state = IconState::Failed;
                Err(err)
            }
        }
    }

    /// Encode the fetched bitmap and write it to the save path
    pub fn save_png(&mut self, session: &mut EditorSession) -> PreviewResult<PathBuf> {
        let result = self.write_preview(session);
        self.state = if result.is_ok() {
            IconState::Saved
        } else {
            IconState::Failed
        };
        result
    }

    fn write_preview(&self, session: &mut EditorSession) -> PreviewResult<PathBuf> {
        let preview = self.preview.as_ref().ok_or(PreviewError::NoPreview)?;
        if self.save_path.trim().is_empty() {
            return Err(PreviewError::InvalidConfig("save path is empty".into()));
        }
        let path = session.database.absolute_path(self.save_path.trim());
        write_png(&preview.image, &path)?;
        session.refresh_assets();
        Ok(path)
    }

    fn report(&mut self, action: &str, err: &PreviewError) {
        if err.is_severe() {
            error!(action, error = %err, "icon generator failed");
        } else {
            warn!(action, error = %err, "icon generator failed");
        }
        self.last_error = Some(err.to_string());
    }

    /// Draw the window if it is open
    pub fn show(&mut self, ctx: &egui::Context, session: &mut EditorSession) {
        let mut open = self.open;
        egui::Window::new(ICON_GENERATOR_TITLE)
            .open(&mut open)
            .resizable(false)
            .default_width(320.0)
            .show(ctx, |ui| self.ui(ui, session));
        if !open {
            self.close();
        }
    }

    fn ui(&mut self, ui: &mut Ui, session: &mut EditorSession) {
        ui.horizontal(|ui| {
            ui.label("Object");
            let mut object = self.object.clone();
            if widgets::object_field(ui, "icon_generator_object", &session.database, &mut object, |_| true) {
                self.select_object(object);
            }
        });

        let mut use_object_path = self.use_object_path;
        if ui.checkbox(&mut use_object_path, "Use object path").changed() {
            self.set_use_object_path(use_object_path);
        }

        ui.horizontal(|ui| {
            ui.label("Save Path");
            let mut path = self.save_path.clone();
            let edit = ui.add_enabled(!self.use_object_path, egui::TextEdit::singleline(&mut path));
            if edit.changed() {
                self.set_save_path(path);
            }
            if ui.add_enabled(!self.use_object_path, egui::Button::new("…")).clicked() {
                if let Some(picked) = widgets::save_png_dialog(&session.database, &self.save_path) {
                    self.set_save_path(picked);
                }
            }
        });

        ui.add_space(6.0);
        if ui.button("Generate Preview").clicked() {
            match self.generate_preview(session) {
                Ok(source) => {
                    self.last_error = None;
                    let object = self.object.as_deref().unwrap_or_default();
                    info!(object, ?source, "icon preview fetched");
                }
                Err(err) => self.report("generate", &err),
            }
        }

        if let Some(preview) = &self.preview {
            let texture = self
                .texture
                .get_or_insert_with(|| {
                    widgets::texture_from_image(ui.ctx(), "icon_generator_preview", &preview.image)
                })
                .clone();
            ui.add_space(6.0);
            widgets::preview_frame(ui, &texture, 128.0);
            ui.label(
                RichText::new(format!(
                    "{}x{} {}",
                    preview.image.width(),
                    preview.image.height(),
                    match preview.source {
                        PreviewSource::Preview => "preview",
                        PreviewSource::Thumbnail => "thumbnail",
                    }
                ))
                .small()
                .color(Color32::from_gray(150)),
            );

            if ui.button("Save PNG").clicked() {
                match self.save_png(session) {
                    Ok(path) => {
                        self.last_error = None;
                        info!(path = %path.display(), "icon saved");
                    }
                    Err(err) => self.report("save", &err),
                }
            }
        }

        match (&self.state, &self.last_error) {
            (IconState::Failed, Some(message)) => {
                ui.label(RichText::new(message).color(Color32::from_rgb(232, 96, 88)));
            }
            (IconState::Saved, _) => {
                let saved = RichText::new(format!("Saved {}", self.save_path));
                ui.label(saved.color(Color32::from_rgb(120, 200, 120)));
            }
            _ => {}
        }
    }
}
