//! Player movement.
//!
//! Turns controller intents into transform changes:
//! - forward/backward move along the world x axis at `speed * dt`;
//! - left/right nudge the yaw accumulator by a fixed step per frame;
//! - yaw is clamped to `[-yaw_limit, yaw_limit]` every frame.
//!
//! The yaw step does not scale with `dt`. There is no sideways translation.

use crate::{
    components::{PlayerController, Transform},
    config::MovementConfig,
    ecs::{FrameSnapshot, World},
    math::Vec3,
    system::System,
};

#[derive(Debug, Clone, Default)]
pub struct PlayerMovementSystem {
    config: MovementConfig,
}

impl PlayerMovementSystem {
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    fn apply(&self, controller: &PlayerController, transform: &mut Transform, dt: f32) {
        let mut direction = Vec3::ZERO;
        direction.x += if controller.move_forward { 1.0 } else { 0.0 };
        direction.x += if controller.move_backward { -1.0 } else { 0.0 };
        transform.position += direction * self.config.speed * dt;

        let mut turn = 0.0;
        turn += if controller.move_left { -self.config.yaw_step } else { 0.0 };
        turn += if controller.move_right { self.config.yaw_step } else { 0.0 };
        transform
            .orientation
            .accumulate_yaw(turn, self.config.yaw_limit);
    }
}

impl System for PlayerMovementSystem {
    fn name(&self) -> &'static str {
        "player_movement"
    }

    fn execute(&mut self, world: &mut World, entities: &FrameSnapshot, dt: f32) {
        for entity in entities.iter() {
            let Some(controller) = world.get::<PlayerController>(entity).copied() else {
                continue;
            };
            let Some(transform) = world.get_mut::<Transform>(entity) else {
                continue;
            };
            self.apply(&controller, transform, dt);
        }
    }
}
