use tracing::{debug, trace};

use crate::commands::CommandBuffer;
use crate::component::Component;
use crate::config::EcsConfig;
use crate::entity::{Entity, EntityManager};
use crate::error::{EcsError, Result};
use crate::registry::{ComponentRegistry, ComponentSet};
use crate::signature::Signature;
use crate::system::{System, SystemRegistry};

/// The central ECS container. Owns all entities, components, and systems.
///
/// Every structural change runs as one step: the component store is written,
/// the entity's signature is updated, and every system's membership is
/// re-evaluated before the call returns.
pub struct World {
    config: EcsConfig,
    entities: EntityManager,
    components: ComponentRegistry,
    systems: SystemRegistry,
    commands: CommandBuffer,
    frame: u64,
}

impl World {
    /// A world with the default capacity bounds.
    pub fn new() -> Self {
        Self::build(EcsConfig::default())
    }

    /// A world with explicit capacity bounds.
    pub fn with_config(config: EcsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EcsConfig) -> Self {
        debug!(
            max_entities = config.max_entities,
            max_component_types = config.max_component_types,
            "creating world"
        );
        Self {
            entities: EntityManager::new(config.max_entities),
            components: ComponentRegistry::new(config.max_component_types, config.max_entities),
            systems: SystemRegistry::new(),
            commands: CommandBuffer::new(),
            frame: 0,
            config,
        }
    }

    pub fn config(&self) -> &EcsConfig {
        &self.config
    }

    // ---- Entity management ----

    /// Create a new entity with no components.
    pub fn create_entity(&mut self) -> Result<Entity> {
        let entity = self.entities.create()?;
        // Systems with an empty requirement match every entity from birth.
        self.systems
            .on_signature_changed(entity, self.entities.signature(entity));
        Ok(entity)
    }

    /// Create an entity carrying every component in `bundle`.
    ///
    /// If any component cannot be added the entity is destroyed again and the
    /// error returned.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Result<Entity> {
        let entity = self.create_entity()?;
        if let Err(e) = bundle.add_to(self, entity) {
            self.destroy_entity(entity)?;
            return Err(e);
        }
        Ok(entity)
    }

    /// Destroy an entity, removing all its components and system memberships.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<()> {
        if !self.entities.is_alive(entity) {
            return Err(EcsError::StaleEntity(entity));
        }
        self.components.entity_destroyed(entity);
        self.systems.on_entity_destroyed(entity);
        self.entities.destroy(entity);
        Ok(())
    }

    /// Check whether an entity is alive.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of alive entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// The current signature of an entity. Empty for dead handles.
    pub fn signature(&self, entity: Entity) -> &Signature {
        self.entities.signature(entity)
    }

    // ---- Component management ----

    /// Register a component type so it can be attached to entities.
    pub fn register_component<T: Component>(&mut self) -> Result<()> {
        self.components.register::<T>().map(|_| ())
    }

    /// Build the signature requiring every component type in `S`, e.g.
    /// `world.signature_of::<(Position, Velocity)>()`.
    pub fn signature_of<S: ComponentSet>(&self) -> Result<Signature> {
        self.components.signature_of::<S>()
    }

    /// Attach a component to an entity.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<()> {
        if !self.entities.is_alive(entity) {
            return Err(EcsError::StaleEntity(entity));
        }
        let id = self.components.insert(entity, component)?;
        let signature = self
            .entities
            .signature_mut(entity)
            .ok_or(EcsError::StaleEntity(entity))?;
        signature.set(id);
        self.systems.on_signature_changed(entity, signature);
        trace!(%entity, component = std::any::type_name::<T>(), "component added");
        Ok(())
    }

    /// Detach a component from an entity, returning it. `Ok(None)` if the entity
    /// did not have one.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<Option<T>> {
        if !self.entities.is_alive(entity) {
            return Err(EcsError::StaleEntity(entity));
        }
        let Some((id, value)) = self.components.remove::<T>(entity)? else {
            return Ok(None);
        };
        let signature = self
            .entities
            .signature_mut(entity)
            .ok_or(EcsError::StaleEntity(entity))?;
        signature.clear(id);
        self.systems.on_signature_changed(entity, signature);
        trace!(%entity, component = std::any::type_name::<T>(), "component removed");
        Ok(Some(value))
    }

    /// Get an immutable reference to a component on an entity.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.components.get::<T>(entity)
    }

    /// Get a mutable reference to a component on an entity.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.components.get_mut::<T>(entity)
    }

    /// Check whether an entity has a component of the given type.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity) && self.components.has::<T>(entity)
    }

    /// Read-only access to every component store.
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    // ---- Systems ----

    /// Register a system that runs over entities whose signature is a superset
    /// of `signature`. Entities that already match are picked up immediately.
    pub fn register_system<S: System>(&mut self, signature: Signature, system: S) -> Result<()> {
        self.systems
            .register(signature, system, self.entities.living())
    }

    pub fn get_system<S: System>(&self) -> Option<&S> {
        self.systems.get::<S>()
    }

    pub fn get_system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems.get_mut::<S>()
    }

    /// Entities currently matched by system `S`.
    pub fn system_entities<S: System>(&self) -> Option<&[Entity]> {
        self.systems.entities_of::<S>()
    }

    pub fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    /// Run every system once, in registration order.
    ///
    /// Commands a system records are applied as soon as that system returns,
    /// so later systems in the same frame see the result. The frame always
    /// runs to completion; if a deferred command failed for any reason other
    /// than its entity having died, the first such error is returned.
    pub fn update(&mut self, dt: f32) -> Result<()> {
        let mut result = Ok(());
        for index in 0..self.systems.len() {
            self.systems
                .run(index, dt, &mut self.components, &mut self.commands);
            let flushed = self.flush_commands();
            if result.is_ok() {
                result = flushed;
            }
        }
        self.frame += 1;
        result
    }

    /// Number of completed `update` calls.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn flush_commands(&mut self) -> Result<()> {
        if self.commands.is_empty() {
            return Ok(());
        }
        let mut commands = std::mem::take(&mut self.commands);
        let result = commands.apply(self);
        // Keep the drained buffer's allocation for the next system.
        if self.commands.is_empty() {
            self.commands = commands;
        }
        result
    }

    /// Check every cached system membership against the authoritative
    /// signatures, and every store's packing invariant.
    pub fn check_consistency(&self) -> bool {
        if !self.components.check_invariants() {
            return false;
        }
        self.systems.iter().all(|(_, required, matched)| {
            let expected = self
                .entities
                .living()
                .filter(|(_, signature)| signature.is_superset_of(required))
                .count();
            expected == matched.len()
                && matched.iter().all(|&e| {
                    self.entities.is_alive(e) && self.entities.signature(e).is_superset_of(required)
                })
        })
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// A group of components added to one entity together.
pub trait Bundle: 'static {
    fn add_to(self, world: &mut World, entity: Entity) -> Result<()>;
}

macro_rules! impl_bundle_tuple {
    ($($name:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            fn add_to(self, world: &mut World, entity: Entity) -> Result<()> {
                let ($($name,)+) = self;
                $(world.add_component(entity, $name)?;)+
                Ok(())
            }
        }
    };
}

impl_bundle_tuple!(A);
impl_bundle_tuple!(A, B);
impl_bundle_tuple!(A, B, C);
impl_bundle_tuple!(A, B, C, D);
impl_bundle_tuple!(A, B, C, D, E);
impl_bundle_tuple!(A, B, C, D, E, F);
impl_bundle_tuple!(A, B, C, D, E, F, G);
impl_bundle_tuple!(A, B, C, D, E, F, G, H);
