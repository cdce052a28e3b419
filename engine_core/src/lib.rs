//! Engine Core - ECS scene world for the preview tools
//!
//! This module provides the scene hierarchy, components, bounds and camera math
//! without any GUI or rendering dependencies.

pub mod bounds;
pub mod components;
pub mod ecs;
pub mod systems;

pub use bounds::*;
pub use components::*;
pub use ecs::*;
pub use systems::*;
