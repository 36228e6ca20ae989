//! Component types attached to arena entities.

use serde::{Deserialize, Serialize};

use crate::{
    ecs::{Capability, Component},
    math::{Mat4, Orientation, Vec3},
    render::MeshHandle,
};

/// Position, scale and orientation of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
    pub orientation: Orientation,
}

impl Transform {
    pub fn new(position: Vec3, scale: Vec3, orientation: Orientation) -> Self {
        Self {
            position,
            scale,
            orientation,
        }
    }

    /// Unscaled, unrotated transform at `position`.
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Vec3::ONE, Orientation::IDENTITY)
    }

    /// Model matrix for rendering. See [`crate::math::model_matrix`].
    pub fn model_matrix(&self) -> Mat4 {
        crate::math::model_matrix(self.position, self.scale, self.orientation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_position(Vec3::ZERO)
    }
}

impl Component for Transform {
    const CAPABILITY: Capability = Capability::TRANSFORM;
    const NAME: &'static str = "Transform";
}

/// GPU mesh reference plus flat color. Fixed once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshRenderer {
    mesh: MeshHandle,
    triangle_count: u32,
    color: Vec3,
}

impl MeshRenderer {
    pub fn new(mesh: MeshHandle, triangle_count: u32, color: Vec3) -> Self {
        Self {
            mesh,
            triangle_count,
            color,
        }
    }

    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    pub fn triangle_count(&self) -> u32 {
        self.triangle_count
    }

    /// Number of indices drawn for this mesh (three per triangle).
    pub fn index_count(&self) -> u32 {
        self.triangle_count * 3
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }
}

impl Component for MeshRenderer {
    const CAPABILITY: Capability = Capability::MESH_RENDERER;
    const NAME: &'static str = "MeshRenderer";
}

/// Movement and action intents, refreshed from input every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerController {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub has_shot: bool,
}

impl Component for PlayerController {
    const CAPABILITY: Capability = Capability::PLAYER_CONTROLLER;
    const NAME: &'static str = "PlayerController";
}

/// Marks an entity as network-synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Net {
    /// True when this client is authoritative for the entity and sends it;
    /// false when the entity is driven by remote state.
    pub owned: bool,
}

impl Net {
    pub fn owned() -> Self {
        Self { owned: true }
    }

    pub fn remote() -> Self {
        Self { owned: false }
    }
}

impl Component for Net {
    const CAPABILITY: Capability = Capability::NET;
    const NAME: &'static str = "Net";
}
