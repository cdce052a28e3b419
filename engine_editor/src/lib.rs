//! Engine Editor - egui tool windows for preview generation
//!
//! Windows only hold UI state; all scene, asset and render work goes through
//! the [`EditorSession`] they are handed each frame.

pub mod camera_preview;
pub mod console;
pub mod icon_generator;
pub mod session;
pub mod widgets;

pub use camera_preview::*;
pub use console::*;
pub use icon_generator::*;
pub use session::*;
