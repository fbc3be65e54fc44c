use std::any::{type_name, Any};

use crate::entity::Entity;
use crate::error::{EcsError, Result};

/// Marker trait for types that can be stored as ECS components.
pub trait Component: 'static + Send + Sync {}

/// Blanket implementation: any `'static + Send + Sync` type is a valid component.
impl<T: 'static + Send + Sync> Component for T {}

/// Type-erased component storage interface, used by the registry to reach
/// every store without knowing its component type.
pub(crate) trait ComponentStorage: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Drop the entity's value if present. Returns `true` if something was removed.
    fn remove_entity(&mut self, entity: Entity) -> bool;
    fn contains(&self, entity: Entity) -> bool;
    fn len(&self) -> usize;
    fn component_name(&self) -> &'static str;
    fn check_invariants(&self) -> bool;
}

/// Sparse-set storage for a single component type.
///
/// `dense` holds the values with no holes: occupied slots are exactly
/// `0..len()`. `sparse[entity index]` gives the dense slot of that entity and
/// `entities[slot]` gives it back, so insert, remove and lookup are all O(1).
/// A handle only resolves if its generation matches the one stored with the
/// slot, so stale handles never reach a recycled entity's value.
pub struct ComponentStore<T> {
    /// Maps entity index to dense slot. `None` means the entity has no component.
    sparse: Vec<Option<u32>>,
    /// Packed component values.
    dense: Vec<T>,
    /// Entity owning each dense slot.
    entities: Vec<Entity>,
}

impl<T: Component> ComponentStore<T> {
    /// Create a store addressing entity indices in `[0, capacity)`.
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            sparse: vec![None; capacity as usize],
            dense: Vec::new(),
            entities: Vec::new(),
        }
    }

    /// Append a component for an entity that does not have one yet.
    pub fn insert(&mut self, entity: Entity, value: T) -> Result<()> {
        let idx = entity.index() as usize;
        let Some(entry) = self.sparse.get_mut(idx) else {
            return Err(EcsError::CapacityExceeded {
                max: self.sparse.len() as u32,
            });
        };
        if entry.is_some() {
            return Err(EcsError::DuplicateInsert {
                entity,
                component: type_name::<T>(),
            });
        }
        *entry = Some(self.dense.len() as u32);
        self.dense.push(value);
        self.entities.push(entity);
        debug_assert!(self.check_invariants(), "store corrupted after insert");
        Ok(())
    }

    /// Swap-remove the entity's component, returning it.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let slot = self.slot(entity)?;
        self.sparse[entity.index() as usize] = None;

        let last = self.dense.len() - 1;
        if slot != last {
            // Move the last element into the vacated slot.
            let moved_entity = self.entities[last];
            self.entities[slot] = moved_entity;
            self.sparse[moved_entity.index() as usize] = Some(slot as u32);
        }
        self.entities.pop();
        let value = self.dense.swap_remove(slot);
        debug_assert!(self.check_invariants(), "store corrupted after remove");
        Some(value)
    }

    /// Get an immutable reference to the component for an entity.
    pub fn get(&self, entity: Entity) -> Option<&T> {
        let slot = self.slot(entity)?;
        self.dense.get(slot)
    }

    /// Get a mutable reference to the component for an entity.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let slot = self.slot(entity)?;
        self.dense.get_mut(slot)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    /// Iterate over all (entity, &component) pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.dense.iter())
    }

    /// Iterate over all (entity, &mut component) pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.dense.iter_mut())
    }

    /// The packed component values.
    pub fn as_slice(&self) -> &[T] {
        &self.dense
    }

    /// Entity owning each dense slot.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of components stored.
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Highest entity index this store can address, plus one.
    pub fn capacity(&self) -> u32 {
        self.sparse.len() as u32
    }

    /// Verify that the dense array is packed and both index maps agree.
    pub fn check_invariants(&self) -> bool {
        if self.entities.len() != self.dense.len() {
            return false;
        }
        let occupied = self.sparse.iter().filter(|s| s.is_some()).count();
        if occupied != self.dense.len() {
            return false;
        }
        self.entities.iter().enumerate().all(|(slot, &entity)| {
            self.sparse.get(entity.index() as usize).copied().flatten() == Some(slot as u32)
        })
    }

    fn slot(&self, entity: Entity) -> Option<usize> {
        let slot = self.sparse.get(entity.index() as usize).copied().flatten()? as usize;
        (self.entities.get(slot) == Some(&entity)).then_some(slot)
    }
}

impl<T: Component> ComponentStorage for ComponentStore<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn contains(&self, entity: Entity) -> bool {
        ComponentStore::contains(self, entity)
    }

    fn len(&self) -> usize {
        ComponentStore::len(self)
    }

    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn check_invariants(&self) -> bool {
        ComponentStore::check_invariants(self)
    }
}
