//! PreviewTools - camera preview and icon generation for the engine editor
//!
//! The workspace is split the same way as the engine:
//! - `engine_core`: ECS world, scene hierarchy and framing math
//! - `engine_render`: assets, software offscreen renderer and PNG export
//! - `engine_editor`: egui tool windows
//!
//! This crate adds the settings file and the desktop application.

pub mod settings;

pub use engine_core;
pub use engine_editor;
pub use engine_render;
