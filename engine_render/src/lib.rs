//! Engine Render - assets, offscreen rendering and preview export
//!
//! Meshes, materials and prefabs live here together with the software renderer
//! that turns a scene into pixels, and the PNG export used by the tools.

pub mod asset_database;
pub mod asset_manager;
pub mod asset_preview;
pub mod camera_capture;
pub mod error;
pub mod export;
pub mod mesh;
pub mod prefab;
pub mod renderer;
pub mod shader;

pub use asset_database::*;
pub use asset_manager::*;
pub use asset_preview::*;
pub use camera_capture::*;
pub use error::*;
pub use export::*;
pub use mesh::*;
pub use prefab::*;
pub use renderer::*;
pub use shader::*;
