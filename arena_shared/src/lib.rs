//! `arena_shared`
//!
//! Shared libraries used by both client and server.
//!
//! Design goals:
//! - Deterministic and modular where practical.
//! - Clear separation of concerns (ecs, components, systems, math, render, net).
//! - Traits at the external boundaries (render backend, asset loading).
//! - No `unsafe`.

pub mod components;
pub mod config;
pub mod ecs;
pub mod math;
pub mod movement;
pub mod net;
pub mod render;
pub mod resources;
pub mod system;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::components::*;
    pub use crate::config::*;
    pub use crate::ecs::*;
    pub use crate::math::*;
    pub use crate::movement::*;
    pub use crate::system::*;
}
