//! Shared widgets for the tool windows

use egui::{Color32, ComboBox, Pos2, Rect, Stroke, TextureHandle, TextureOptions, Ui, Vec2};
use epaint::ColorImage;
use image::RgbaImage;

use engine_render::{AssetDatabase, AssetKind};

/// Asset picker. Lists database assets accepted by `filter`. Returns true when
/// the selection changed.
pub fn object_field(
    ui: &mut Ui,
    id_salt: &str,
    database: &AssetDatabase,
    selected: &mut Option<String>,
    filter: impl Fn(AssetKind) -> bool,
) -> bool {
    let before = selected.clone();
    let text = selected.as_deref().unwrap_or("None");

    ComboBox::from_id_salt(id_salt)
        .selected_text(text)
        .width(ui.available_width().min(320.0))
        .show_ui(ui, |ui| {
            ui.selectable_value(selected, None, "None");
            for (path, kind) in database.iter() {
                if filter(kind) {
                    ui.selectable_value(selected, Some(path.to_string()), path);
                }
            }
        });

    *selected != before
}

/// Native save dialog for a PNG. Returns the chosen path as an asset path.
pub fn save_png_dialog(database: &AssetDatabase, current: &str) -> Option<String> {
    let current_path = database.absolute_path(current);
    let file_name = current_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "Preview.png".to_string());
    let directory = current_path
        .parent()
        .filter(|p| p.is_dir())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| database.assets_dir());

    let mut picked = rfd::FileDialog::new()
        .add_filter("PNG Image", &["png"])
        .set_directory(directory)
        .set_file_name(file_name)
        .save_file()?;

    let has_png_ext = picked
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("png"))
        == Some(true);
    if !has_png_ext {
        picked.set_extension("png");
    }
    Some(database.to_asset_path(&picked))
}

/// Upload an RGBA image as an egui texture
pub fn texture_from_image(ctx: &egui::Context, name: &str, image: &RgbaImage) -> TextureHandle {
    let size = [image.width() as usize, image.height() as usize];
    let color_image = ColorImage::from_rgba_unmultiplied(size, image.as_raw());
    ctx.load_texture(name.to_owned(), color_image, TextureOptions::NEAREST)
}

/// Framed image over a checkerboard so transparency stays visible
pub fn preview_frame(ui: &mut Ui, texture: &TextureHandle, max_edge: f32) {
    let [w, h] = texture.size();
    let scale = max_edge / (w.max(h).max(1) as f32);
    let size = Vec2::new(w as f32 * scale, h as f32 * scale);
    let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());

    ui.painter().rect_filled(rect, 0.0, Color32::from_rgb(22, 22, 24));
    draw_checker(ui, &rect);
    ui.painter().image(
        texture.id(),
        rect,
        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
        Color32::WHITE,
    );
    ui.painter().rect_stroke(
        rect,
        0.0,
        Stroke::new(1.0, Color32::from_rgb(58, 58, 62)),
        egui::StrokeKind::Middle,
    );
}

fn draw_checker(ui: &Ui, rect: &Rect) {
    let step = 8.0;
    let light = Color32::from_rgb(44, 44, 48);
    let mut y = rect.top();
    let mut row = 0;
    while y < rect.bottom() {
        let mut x = rect.left() + if row % 2 == 0 { 0.0 } else { step };
        while x < rect.right() {
            let cell = Rect::from_min_max(
                Pos2::new(x, y),
                Pos2::new((x + step).min(rect.right()), (y + step).min(rect.bottom())),
            );
            ui.painter().rect_filled(cell, 0.0, light);
            x += step * 2.0;
        }
        y += step;
        row += 1;
    }
}
