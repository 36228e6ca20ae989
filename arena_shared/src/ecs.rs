//! Entity/component registry.
//!
//! Small, deterministic ECS used by the client frame loop. It is not
//! archetype-based; components live in typed storages keyed by entity slot.
//!
//! Entities are `(index, generation)` pairs. Despawning an entity bumps the
//! generation of its slot, so any id still held elsewhere becomes stale and
//! every lookup through it reports absence instead of reaching the component
//! of whatever entity reused the slot.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

bitflags::bitflags! {
    /// Set of component kinds attached to an entity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capability: u32 {
        const TRANSFORM = 1 << 0;
        const MESH_RENDERER = 1 << 1;
        const PLAYER_CONTROLLER = 1 << 2;
        const NET = 1 << 3;
    }
}

impl Default for Capability {
    fn default() -> Self {
        Self::empty()
    }
}

/// Marker for types that can be attached to entities.
pub trait Component: 'static + Send + Sync {
    /// Capability bit contributed by this component.
    const CAPABILITY: Capability;
    /// Human-readable name used in errors and logs.
    const NAME: &'static str;
}

/// Generational entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    /// Slot index. Reused after the entity is despawned.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot at the time this id was handed out.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    #[error("entity {entity} already has a {component} component")]
    AlreadyAttached {
        entity: EntityId,
        component: &'static str,
    },
    #[error("entity {0} is not alive")]
    StaleEntity(EntityId),
}

/// Role flags carried by an entity. They do not affect storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityRole {
    pub is_bullet: bool,
    pub in_motion: bool,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    alive: bool,
    capabilities: Capability,
    parent: Option<EntityId>,
    role: EntityRole,
}

trait Storage: Send + Sync {
    fn remove_slot(&mut self, index: u32);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> Storage for HashMap<u32, T> {
    fn remove_slot(&mut self, index: u32) {
        self.remove(&index);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Ordered list of the entities visible to one frame.
///
/// The snapshot is a plain copy of ids: spawning or despawning later in the
/// same frame does not invalidate it. Ids that died in the meantime simply
/// resolve to absent components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSnapshot {
    entities: Vec<EntityId>,
}

impl FrameSnapshot {
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn as_slice(&self) -> &[EntityId] {
        &self.entities
    }
}

/// Owns every entity and component.
#[derive(Default)]
pub struct World {
    slots: Vec<Slot>,
    free: Vec<u32>,
    storages: HashMap<TypeId, Box<dyn Storage>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new entity with no components.
    pub fn spawn(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.alive = true;
            return EntityId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            alive: true,
            ..Slot::default()
        });
        EntityId {
            index,
            generation: 0,
        }
    }

    /// Destroys an entity, dropping all of its components.
    pub fn despawn(&mut self, entity: EntityId) -> Result<(), EcsError> {
        self.check_alive(entity)?;

        for storage in self.storages.values_mut() {
            storage.remove_slot(entity.index);
        }

        let slot = &mut self.slots[entity.index as usize];
        *slot = Slot {
            generation: slot.generation.wrapping_add(1),
            ..Slot::default()
        };
        self.free.push(entity.index);
        Ok(())
    }

    /// Returns true when `entity` refers to a live entity.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.slot(entity).is_some()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.alive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attaches a component. Fails if the entity already has one of type `T`.
    pub fn insert<T: Component>(&mut self, entity: EntityId, component: T) -> Result<(), EcsError> {
        self.check_alive(entity)?;

        let storage = self
            .storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(HashMap::<u32, T>::new()));
        let storage = storage
            .as_any_mut()
            .downcast_mut::<HashMap<u32, T>>()
            .expect("storage type mismatch");

        if storage.contains_key(&entity.index) {
            return Err(EcsError::AlreadyAttached {
                entity,
                component: T::NAME,
            });
        }
        storage.insert(entity.index, component);
        self.slots[entity.index as usize].capabilities |= T::CAPABILITY;
        Ok(())
    }

    /// Detaches and returns a component.
    pub fn remove<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        self.slot(entity)?;
        let removed = self.storage_mut::<T>()?.remove(&entity.index)?;
        self.slots[entity.index as usize]
            .capabilities
            .remove(T::CAPABILITY);
        Some(removed)
    }

    /// Gets a component reference.
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.slot(entity)?;
        self.storage::<T>()?.get(&entity.index)
    }

    /// Gets a mutable component reference.
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.slot(entity)?;
        self.storage_mut::<T>()?.get_mut(&entity.index)
    }

    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        self.capabilities(entity).contains(T::CAPABILITY)
    }

    /// Component kinds attached to `entity`; empty for stale ids.
    pub fn capabilities(&self, entity: EntityId) -> Capability {
        self.slot(entity)
            .map(|s| s.capabilities)
            .unwrap_or_default()
    }

    /// Records `owner` as the owner of `child`. This is a back-reference only.
    pub fn set_parent(&mut self, child: EntityId, owner: EntityId) -> Result<(), EcsError> {
        self.check_alive(owner)?;
        self.check_alive(child)?;
        self.slots[child.index as usize].parent = Some(owner);
        Ok(())
    }

    /// Resolves the owner of `child`, if both are still alive.
    pub fn parent_of(&self, child: EntityId) -> Option<EntityId> {
        self.slot(child)?
            .parent
            .filter(|owner| self.contains(*owner))
    }

    pub fn role(&self, entity: EntityId) -> Option<EntityRole> {
        self.slot(entity).map(|s| s.role)
    }

    pub fn set_role(&mut self, entity: EntityId, role: EntityRole) -> Result<(), EcsError> {
        self.check_alive(entity)?;
        self.slots[entity.index as usize].role = role;
        Ok(())
    }

    /// Live entities in ascending slot order.
    pub fn snapshot(&self) -> FrameSnapshot {
        let entities = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.alive)
            .map(|(index, s)| EntityId {
                index: index as u32,
                generation: s.generation,
            })
            .collect();
        FrameSnapshot { entities }
    }

    fn slot(&self, entity: EntityId) -> Option<&Slot> {
        self.slots
            .get(entity.index as usize)
            .filter(|s| s.alive && s.generation == entity.generation)
    }

    fn check_alive(&self, entity: EntityId) -> Result<(), EcsError> {
        match self.slot(entity) {
            Some(_) => Ok(()),
            None => Err(EcsError::StaleEntity(entity)),
        }
    }

    fn storage<T: Component>(&self) -> Option<&HashMap<u32, T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.as_any().downcast_ref::<HashMap<u32, T>>())
    }

    fn storage_mut<T: Component>(&mut self) -> Option<&mut HashMap<u32, T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.as_any_mut().downcast_mut::<HashMap<u32, T>>())
    }
}
