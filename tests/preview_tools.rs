//! End-to-end checks for both tool windows against a scratch project

use std::fs;
use std::path::{Path, PathBuf};

use engine_core::ecs::EngineWorld;
use engine_editor::{CameraPreviewWindow, ConsoleLog, EditorSession, IconGeneratorWindow, IconState};
use engine_render::{AssetDatabase, AssetManager, CaptureSettings, PreviewError, Renderer, capture};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

const BOX_PREFAB: &str = r#"(name: "Box", root: (name: "Box", mesh: Some(Cube), color: Some((0.9, 0.2, 0.2, 1.0))))"#;

struct Project {
    root: PathBuf,
    session: EditorSession,
}

impl Project {
    fn new() -> Self {
        let root = std::env::temp_dir().join(format!("previewtools-e2e-{}", uuid::Uuid::new_v4()));
        let session = EditorSession::open(&root, 32).unwrap();
        Self { root, session }
    }

    fn write(&mut self, asset_path: &str, contents: &str) {
        let path = self.root.join(asset_path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        self.session.refresh_assets();
    }

    fn png_files(&self) -> Vec<String> {
        self.session
            .database
            .iter()
            .filter(|(path, _)| path.ends_with(".png"))
            .map(|(path, _)| path.to_string())
            .collect()
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn camera_window(object: &str, width: u32, height: u32) -> CameraPreviewWindow {
    let mut window = CameraPreviewWindow::default();
    window.object = Some(object.to_string());
    window.set_proportional_size(false);
    window.set_width(width);
    window.set_height(height);
    window
}

#[test]
fn generate_without_object_logs_warning_and_writes_nothing() {
    let mut project = Project::new();
    let console = ConsoleLog::new(16);
    let subscriber = tracing_subscriber::registry().with(console.layer());
    let mut window = CameraPreviewWindow::default();

    tracing::subscriber::with_default(subscriber, || window.generate_and_report(&mut project.session));

    assert!(project.png_files().is_empty());
    let entries = console.entries();
    assert!(entries.iter().any(|e| e.level == Level::WARN && e.message.contains("no object selected")));

    // The tool stays usable for a retry
    project.write("Assets/Box.prefab", BOX_PREFAB);
    window.object = Some("Assets/Box.prefab".into());
    window.set_size(16);
    assert!(window.generate(&mut project.session).is_ok());
}

#[test]
fn generated_png_has_configured_dimensions() {
    let mut project = Project::new();
    project.write("Assets/Box.prefab", BOX_PREFAB);
    let mut window = camera_window("Assets/Box.prefab", 40, 24);
    window.output_path = "Assets/Previews/Box.png".into();

    let path = window.generate(&mut project.session).unwrap();

    let decoded = image::open(&path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (40, 24));
    assert_eq!(project.png_files(), vec!["Assets/Previews/Box.png".to_string()]);
}

#[test]
fn no_transient_objects_survive_success_or_failure() {
    let mut project = Project::new();
    project.write("Assets/Box.prefab", BOX_PREFAB);
    project.write("Assets/Broken.prefab", r#"(name: "Broken", root: (mesh: Some(File("gone.obj"))))"#);

    let mut ok = camera_window("Assets/Box.prefab", 16, 16);
    ok.generate(&mut project.session).unwrap();
    let mut broken = camera_window("Assets/Broken.prefab", 16, 16);
    let err = broken.generate(&mut project.session).unwrap_err();
    assert!(err.is_severe());

    assert_eq!(project.session.world.entity_count(), 0);
    assert_eq!(project.session.visible_root_count(), 0);
    assert_eq!(project.session.assets.mesh_count(), 0);
    assert_eq!(project.session.assets.material_count(), 0);
}

#[test]
fn object_without_geometry_still_writes_file() {
    let mut project = Project::new();
    project.write("Assets/Empty.prefab", r#"(name: "Empty", root: (name: "Empty"))"#);
    let mut window = camera_window("Assets/Empty.prefab", 8, 8);

    let path = window.generate(&mut project.session).unwrap();
    assert!(path.is_file());
}

#[test]
fn filtered_layer_renders_background_only() {
    let mut project = Project::new();
    project.write("Assets/Box.prefab", BOX_PREFAB);
    let mut window = camera_window("Assets/Box.prefab", 16, 16);
    window.settings.use_layer_filtering = true;
    window.settings.render_layer = 3;
    window.settings.model_layer = 4;
    window.settings.background = [0.0, 0.0, 1.0, 1.0];

    let path = window.generate(&mut project.session).unwrap();

    let decoded = image::open(&path).unwrap().to_rgba8();
    assert!(decoded.pixels().all(|p| p.0 == [0, 0, 255, 255]));
}

#[test]
fn non_instantiable_object_is_reported() {
    let mut project = Project::new();
    project.write("Assets/readme.txt", "hello");
    let mut window = camera_window("Assets/readme.txt", 8, 8);

    let err = window.generate(&mut project.session).unwrap_err();
    assert!(matches!(
        err,
        PreviewError::Asset(engine_render::AssetError::NotInstantiable(_))
    ));
    assert!(project.png_files().is_empty());
}

#[test]
fn icon_path_follows_selected_object() {
    let mut project = Project::new();
    project.write("Assets/Props/A.prefab", BOX_PREFAB);
    project.write("Assets/Other/B.prefab", BOX_PREFAB);
    let mut window = IconGeneratorWindow::default();
    window.set_use_object_path(true);

    window.select_object(Some("Assets/Props/A.prefab".into()));
    assert_eq!(window.save_path(), "Assets/Props/A_Icon.png");
    window.select_object(Some("Assets/Other/B.prefab".into()));
    assert_eq!(window.save_path(), "Assets/Other/B_Icon.png");

    window.generate_preview(&project.session).unwrap();
    let path = window.save_png(&mut project.session).unwrap();

    assert_eq!(window.state(), IconState::Saved);
    assert_eq!(path, project.root.join("Assets/Other/B_Icon.png"));
    let decoded = image::open(&path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (32, 32));
}

#[rstest]
#[case("Assets/Props/Crate.prefab")]
#[case("Assets/Props/Lamp.prefab")]
#[case("Assets/Props/Wedge.prefab")]
fn demo_project_prefab_captures(#[case] asset: &str) {
    let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("demo_project");
    let database = AssetDatabase::open(&demo).unwrap();
    let settings = CaptureSettings {
        width: 24,
        height: 24,
        ..Default::default()
    };
    let mut world = EngineWorld::new();
    let mut assets = AssetManager::new();

    let (prefab, base_dir) = database.load_prefab(asset).unwrap();
    let captured = capture(&mut world, &mut assets, &Renderer::new(), &prefab, &base_dir, &settings).unwrap();

    assert!(!captured.fallback_bounds);
    assert!(captured.image.pixels().any(|p| p.0[3] == 255));
    assert_eq!(world.entity_count(), 0);
}
