use std::any::{type_name, TypeId};
use std::collections::HashMap;

use tracing::debug;

use crate::component::{Component, ComponentStorage, ComponentStore};
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::signature::{ComponentId, Signature};

/// Maps component types to their registration-order [`ComponentId`] and owns
/// one [`ComponentStore`] per type.
pub struct ComponentRegistry {
    ids: HashMap<TypeId, ComponentId>,
    stores: Vec<Box<dyn ComponentStorage>>,
    max_component_types: u32,
    max_entities: u32,
}

impl ComponentRegistry {
    pub fn new(max_component_types: u32, max_entities: u32) -> Self {
        Self {
            ids: HashMap::new(),
            stores: Vec::new(),
            max_component_types,
            max_entities,
        }
    }

    /// Register a component type, assigning it the next free signature bit.
    pub fn register<T: Component>(&mut self) -> Result<ComponentId> {
        let type_id = TypeId::of::<T>();
        if self.ids.contains_key(&type_id) {
            return Err(EcsError::DuplicateRegistration(type_name::<T>()));
        }
        let next = self.stores.len() as u32;
        if next >= self.max_component_types {
            return Err(EcsError::TooManyComponentTypes {
                max: self.max_component_types,
            });
        }
        let id = ComponentId(next);
        self.ids.insert(type_id, id);
        self.stores
            .push(Box::new(ComponentStore::<T>::with_capacity(self.max_entities)));
        debug!(component = type_name::<T>(), bit = next, "registered component type");
        Ok(id)
    }

    /// The id assigned to `T`, if registered.
    pub fn id<T: Component>(&self) -> Option<ComponentId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    pub fn is_registered<T: Component>(&self) -> bool {
        self.ids.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered component types.
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Build the signature requiring every component type in `S`.
    pub fn signature_of<S: ComponentSet>(&self) -> Result<Signature> {
        let mut signature = Signature::new();
        for (type_id, name) in S::types() {
            let id = self
                .ids
                .get(&type_id)
                .ok_or(EcsError::UnregisteredComponent(name))?;
            signature.set(*id);
        }
        Ok(signature)
    }

    /// Typed access to the whole store of `T`.
    pub fn store<T: Component>(&self) -> Option<&ComponentStore<T>> {
        let id = self.id::<T>()?;
        self.stores[id.0 as usize]
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
    }

    /// Mutable typed access to the whole store of `T`.
    pub fn store_mut<T: Component>(&mut self) -> Option<&mut ComponentStore<T>> {
        let id = self.id::<T>()?;
        self.stores[id.0 as usize]
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
    }

    /// Get an immutable reference to a component on an entity.
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.store::<T>()?.get(entity)
    }

    /// Get a mutable reference to a component on an entity.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.store_mut::<T>()?.get_mut(entity)
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.store::<T>().is_some_and(|s| s.contains(entity))
    }

    /// Store a component value. Returns the id whose signature bit the caller must set.
    pub(crate) fn insert<T: Component>(&mut self, entity: Entity, value: T) -> Result<ComponentId> {
        let id = self
            .id::<T>()
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))?;
        self.store_mut::<T>()
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))?
            .insert(entity, value)?;
        Ok(id)
    }

    /// Remove a component value. `Ok(None)` means the entity did not have one.
    pub(crate) fn remove<T: Component>(
        &mut self,
        entity: Entity,
    ) -> Result<Option<(ComponentId, T)>> {
        let id = self
            .id::<T>()
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))?;
        let store = self
            .store_mut::<T>()
            .ok_or(EcsError::UnregisteredComponent(type_name::<T>()))?;
        Ok(store.remove(entity).map(|value| (id, value)))
    }

    /// Drop the entity's values from every store.
    pub(crate) fn entity_destroyed(&mut self, entity: Entity) {
        for store in &mut self.stores {
            store.remove_entity(entity);
        }
    }

    /// Whether any store still holds a value for the entity.
    pub fn holds_any(&self, entity: Entity) -> bool {
        self.stores.iter().any(|s| s.contains(entity))
    }

    /// Run every store's invariant check.
    pub fn check_invariants(&self) -> bool {
        self.stores.iter().all(|s| s.check_invariants())
    }

    /// `(type name, stored count)` for every registered type, in id order.
    pub fn occupancy(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.stores.iter().map(|s| (s.component_name(), s.len()))
    }
}

/// A set of component types, used to build signatures from tuples.
pub trait ComponentSet {
    /// The `TypeId` and name of each member type.
    fn types() -> Vec<(TypeId, &'static str)>;
}

macro_rules! impl_component_set_tuple {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn types() -> Vec<(TypeId, &'static str)> {
                vec![$((TypeId::of::<$name>(), type_name::<$name>())),+]
            }
        }
    };
}

impl_component_set_tuple!(A);
impl_component_set_tuple!(A, B);
impl_component_set_tuple!(A, B, C);
impl_component_set_tuple!(A, B, C, D);
impl_component_set_tuple!(A, B, C, D, E);
impl_component_set_tuple!(A, B, C, D, E, F);
impl_component_set_tuple!(A, B, C, D, E, F, G);
impl_component_set_tuple!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    struct Tag;

    fn e(index: u32) -> Entity {
        Entity::from_raw(index, 0)
    }

    #[test]
    fn ids_follow_registration_order() {
        let mut registry = ComponentRegistry::new(8, 16);
        assert_eq!(registry.register::<Position>().unwrap().index(), 0);
        assert_eq!(registry.register::<Velocity>().unwrap().index(), 1);
        assert_eq!(registry.id::<Velocity>().map(ComponentId::index), Some(1));
        assert_eq!(registry.id::<Tag>(), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = ComponentRegistry::new(8, 16);
        registry.register::<Position>().unwrap();
        assert!(matches!(
            registry.register::<Position>(),
            Err(EcsError::DuplicateRegistration(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn component_type_limit() {
        let mut registry = ComponentRegistry::new(2, 16);
        registry.register::<Position>().unwrap();
        registry.register::<Velocity>().unwrap();
        assert_eq!(
            registry.register::<Tag>(),
            Err(EcsError::TooManyComponentTypes { max: 2 })
        );
        assert!(!registry.is_registered::<Tag>());
    }

    #[test]
    fn insert_get_remove() {
        let mut registry = ComponentRegistry::new(8, 16);
        let id = registry.register::<Position>().unwrap();
        assert_eq!(
            registry.insert(e(3), Position { x: 1.0, y: 2.0 }).unwrap(),
            id
        );
        assert_eq!(registry.get::<Position>(e(3)), Some(&Position { x: 1.0, y: 2.0 }));
        registry.get_mut::<Position>(e(3)).unwrap().x = 4.0;
        assert_eq!(registry.get::<Position>(e(3)).unwrap().x, 4.0);

        let (removed_id, value) = registry.remove::<Position>(e(3)).unwrap().unwrap();
        assert_eq!(removed_id, id);
        assert_eq!(value, Position { x: 4.0, y: 2.0 });
        assert!(registry.remove::<Position>(e(3)).unwrap().is_none());
        assert!(!registry.has::<Position>(e(3)));
    }

    #[test]
    fn unregistered_type_errors() {
        let mut registry = ComponentRegistry::new(8, 16);
        assert!(matches!(
            registry.insert(e(0), Velocity { dx: 0.0, dy: 0.0 }),
            Err(EcsError::UnregisteredComponent(_))
        ));
        assert!(matches!(
            registry.remove::<Velocity>(e(0)),
            Err(EcsError::UnregisteredComponent(_))
        ));
        assert_eq!(registry.get::<Velocity>(e(0)), None);
    }

    #[test]
    fn entity_destroyed_clears_every_store() {
        let mut registry = ComponentRegistry::new(8, 16);
        registry.register::<Position>().unwrap();
        registry.register::<Velocity>().unwrap();
        registry.insert(e(1), Position { x: 0.0, y: 0.0 }).unwrap();
        registry.insert(e(1), Velocity { dx: 1.0, dy: 1.0 }).unwrap();
        registry.insert(e(2), Position { x: 9.0, y: 9.0 }).unwrap();

        registry.entity_destroyed(e(1));
        assert!(!registry.holds_any(e(1)));
        assert_eq!(registry.get::<Position>(e(2)).unwrap().x, 9.0);
        assert!(registry.check_invariants());
        let occupancy: Vec<usize> = registry.occupancy().map(|(_, n)| n).collect();
        assert_eq!(occupancy, vec![1, 0]);
    }

    #[test]
    fn signature_from_tuple() {
        let mut registry = ComponentRegistry::new(8, 16);
        let pos = registry.register::<Position>().unwrap();
        let vel = registry.register::<Velocity>().unwrap();
        let sig = registry.signature_of::<(Position, Velocity)>().unwrap();
        assert_eq!(sig, Signature::from_ids([pos, vel]));
        assert!(matches!(
            registry.signature_of::<(Position, Tag)>(),
            Err(EcsError::UnregisteredComponent(_))
        ));
    }
}
