// src/main.rs
use std::path::PathBuf;

use anyhow::Context as _;
use eframe::{App, Frame, NativeOptions, egui};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use engine_editor::{
    CAMERA_PREVIEW_TITLE, CameraPreviewWindow, ConsoleLog, EditorSession, ICON_GENERATOR_TITLE,
    IconGeneratorWindow,
};
use previewtools::settings::{DEFAULT_LOG_FILTER, PreviewToolsSettings, SETTINGS_PATH};

struct PreviewToolsApp {
    session: EditorSession,
    camera_preview: CameraPreviewWindow,
    icon_generator: IconGeneratorWindow,
    console: ConsoleLog,
    show_console: bool,
    settings: PreviewToolsSettings,
    settings_path: PathBuf,
}

impl PreviewToolsApp {
    fn new(
        session: EditorSession,
        console: ConsoleLog,
        settings: PreviewToolsSettings,
        settings_path: PathBuf,
    ) -> Self {
        Self {
            camera_preview: CameraPreviewWindow::new(
                settings.camera.clone(),
                settings.camera_output_path.clone(),
            ),
            icon_generator: IconGeneratorWindow::new(settings.icon_save_path.clone()),
            session,
            console,
            show_console: true,
            settings,
            settings_path,
        }
    }

    /// Persist the current window configuration and output paths
    fn save_settings(&mut self) {
        self.settings
            .store_window_state(&self.camera_preview, &self.icon_generator);
        match self.settings.save(&self.settings_path) {
            Ok(()) => info!(path = %self.settings_path.display(), "settings saved"),
            Err(err) => warn!(error = %err, "failed to save settings"),
        }
    }

    fn draw_menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Refresh Assets").clicked() {
                        self.session.refresh_assets();
                        ui.close();
                    }
                    if ui.button("Save Settings").clicked() {
                        self.save_settings();
                        ui.close();
                    }
                    if ui.button("Exit").clicked() {
                        ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                        ui.close();
                    }
                });

                ui.menu_button("Tools", |ui| {
                    ui.menu_button("PreviewTools", |ui| {
                        if ui.button(CAMERA_PREVIEW_TITLE).clicked() {
                            self.camera_preview.open = true;
                            ui.close();
                        }
                        if ui.button(ICON_GENERATOR_TITLE).clicked() {
                            self.icon_generator.open();
                            ui.close();
                        }
                    });
                });

                ui.menu_button("Window", |ui| {
                    ui.checkbox(&mut self.show_console, "Console");
                });
            });
        });
    }

    fn draw_assets(&self, ui: &mut egui::Ui) {
        ui.label(
            egui::RichText::new(self.session.database.project_root().display().to_string())
                .strong()
                .color(egui::Color32::from_gray(220)),
        );
        ui.label(
            egui::RichText::new(format!(
                "{} assets, {} scene objects",
                self.session.database.len(),
                self.session.visible_root_count()
            ))
            .size(11.0)
            .color(egui::Color32::from_gray(150)),
        );
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (path, kind) in self.session.database.iter() {
                    let ([r, g, b], label) = kind.icon_style();
                    ui.horizontal(|ui| {
                        let (rect, _) = ui.allocate_exact_size(egui::vec2(34.0, 16.0), egui::Sense::hover());
                        ui.painter()
                            .rect_filled(rect, 3.0, egui::Color32::from_rgb(r, g, b));
                        ui.painter().text(
                            rect.center(),
                            egui::Align2::CENTER_CENTER,
                            label,
                            egui::FontId::proportional(9.0),
                            egui::Color32::WHITE,
                        );
                        ui.label(path);
                    });
                }
            });
    }
}

impl App for PreviewToolsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        self.draw_menu_bar(ctx);

        egui::TopBottomPanel::bottom("console_panel")
            .resizable(true)
            .default_height(160.0)
            .show_animated(ctx, self.show_console, |ui| self.console.show(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_assets(ui));

        self.camera_preview.show(ctx, &mut self.session);
        self.icon_generator.show(ctx, &mut self.session);
    }
}

fn main() -> anyhow::Result<()> {
    let settings_path = PathBuf::from(SETTINGS_PATH);
    let loaded = PreviewToolsSettings::load(&settings_path);
    let settings = loaded.as_ref().cloned().unwrap_or_default();

    let console = ConsoleLog::new(settings.console_capacity);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(console.layer())
        .init();

    if let Err(err) = &loaded {
        warn!(error = %err, "falling back to default settings");
    }

    let session = EditorSession::open(&settings.project_root, settings.icon_preview_size)
        .with_context(|| format!("failed to open project {}", settings.project_root.display()))?;
    info!(
        project = %settings.project_root.display(),
        assets = session.database.len(),
        "project opened"
    );

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("PreviewTools")
            .with_inner_size([1100.0, 720.0]),
        ..Default::default()
    };

    eframe::run_native(
        "PreviewTools",
        options,
        Box::new(|_cc| Ok(Box::new(PreviewToolsApp::new(session, console, settings, settings_path)))),
    )
    .map_err(|err| {
        error!(error = %err, "editor exited with an error");
        anyhow::anyhow!("{err}")
    })
}
