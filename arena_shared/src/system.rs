//! System abstraction.
//!
//! A system is one unit of per-frame simulation work. Systems share no base
//! state; the [`Schedule`] holds them in an explicit order and runs each one
//! exactly once per frame.

use tracing::trace;

use crate::ecs::{FrameSnapshot, World};

/// Per-frame simulation step.
pub trait System: Send {
    /// Stable name used in logs and schedule inspection.
    fn name(&self) -> &'static str;

    /// Processes `entities` for one frame. `dt` is in seconds and never negative.
    fn execute(&mut self, world: &mut World, entities: &FrameSnapshot, dt: f32);
}

/// Ordered list of systems. Execution order is registration order.
#[derive(Default)]
pub struct Schedule {
    systems: Vec<Box<dyn System>>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a system to the end of the schedule.
    pub fn add(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    /// System names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Runs every system once, in order, over the same snapshot.
    pub fn run(&mut self, world: &mut World, entities: &FrameSnapshot, dt: f32) {
        for system in &mut self.systems {
            trace!(system = system.name(), dt, "execute");
            system.execute(world, entities, dt);
        }
    }
}
