use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use tracing::{debug, trace};

use crate::commands::CommandBuffer;
use crate::component::Component;
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::registry::ComponentRegistry;
use crate::signature::Signature;

/// A unit of per-frame logic that runs over the entities matching its signature.
pub trait System: 'static {
    fn update(&mut self, ctx: &mut SystemContext<'_>, dt: f32);

    /// Name used in logs.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Blanket implementation so closures can be used as systems.
impl<F: FnMut(&mut SystemContext<'_>, f32) + 'static> System for F {
    fn update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) {
        (self)(ctx, dt);
    }
}

/// What a system sees while it runs: its matched entities, component data,
/// and a command buffer for structural changes.
///
/// Creating or destroying entities and adding or removing components must go
/// through [`commands`](Self::commands); they are applied once the system
/// returns, so the entity list never changes under the running system.
pub struct SystemContext<'a> {
    entities: &'a [Entity],
    components: &'a mut ComponentRegistry,
    commands: &'a mut CommandBuffer,
}

impl<'a> SystemContext<'a> {
    pub(crate) fn new(
        entities: &'a [Entity],
        components: &'a mut ComponentRegistry,
        commands: &'a mut CommandBuffer,
    ) -> Self {
        Self {
            entities,
            components,
            commands,
        }
    }

    /// Entities whose signature satisfies this system's requirement.
    pub fn entities(&self) -> &'a [Entity] {
        self.entities
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.components.get::<T>(entity)
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.components.get_mut::<T>(entity)
    }

    /// Read-only view of every component store.
    pub fn components(&self) -> &ComponentRegistry {
        &*self.components
    }

    /// Queue structural changes to apply after this system returns.
    pub fn commands(&mut self) -> &mut CommandBuffer {
        &mut *self.commands
    }
}

/// Object-safe access to a system as `Any`, for typed lookup.
trait AnySystem: System {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: System> AnySystem for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Entities currently matching one system. O(1) insert, remove and membership.
#[derive(Default)]
struct MatchedSet {
    entities: Vec<Entity>,
    positions: HashMap<Entity, usize>,
}

impl MatchedSet {
    fn insert(&mut self, entity: Entity) -> bool {
        if self.positions.contains_key(&entity) {
            return false;
        }
        self.positions.insert(entity, self.entities.len());
        self.entities.push(entity);
        true
    }

    fn remove(&mut self, entity: Entity) -> bool {
        let Some(pos) = self.positions.remove(&entity) else {
            return false;
        };
        self.entities.swap_remove(pos);
        if let Some(&moved) = self.entities.get(pos) {
            self.positions.insert(moved, pos);
        }
        true
    }

    fn contains(&self, entity: Entity) -> bool {
        self.positions.contains_key(&entity)
    }
}

struct SystemRecord {
    type_id: TypeId,
    name: &'static str,
    signature: Signature,
    matched: MatchedSet,
    system: Box<dyn AnySystem>,
}

/// Registered systems in registration order, each with its required signature
/// and the incrementally maintained set of entities that satisfy it.
#[derive(Default)]
pub struct SystemRegistry {
    records: Vec<SystemRecord>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system requiring `signature`.
    ///
    /// `living` is every entity that already exists; the ones matching the
    /// signature are added immediately so late registration misses nothing.
    pub fn register<'s, S: System>(
        &mut self,
        signature: Signature,
        system: S,
        living: impl IntoIterator<Item = (Entity, &'s Signature)>,
    ) -> Result<()> {
        let type_id = TypeId::of::<S>();
        if self.records.iter().any(|r| r.type_id == type_id) {
            return Err(EcsError::DuplicateSystem(type_name::<S>()));
        }

        let mut matched = MatchedSet::default();
        for (entity, entity_signature) in living {
            if entity_signature.is_superset_of(&signature) {
                matched.insert(entity);
            }
        }

        let name = system.name();
        debug!(
            system = name,
            required = ?signature,
            matched = matched.entities.len(),
            "registered system"
        );
        self.records.push(SystemRecord {
            type_id,
            name,
            signature,
            matched,
            system: Box::new(system),
        });
        Ok(())
    }

    /// Re-evaluate the entity against every system after its signature changed.
    pub fn on_signature_changed(&mut self, entity: Entity, signature: &Signature) {
        for record in &mut self.records {
            if signature.is_superset_of(&record.signature) {
                if record.matched.insert(entity) {
                    trace!(%entity, system = record.name, "entity joined system");
                }
            } else if record.matched.remove(entity) {
                trace!(%entity, system = record.name, "entity left system");
            }
        }
    }

    /// Remove the entity from every system.
    pub fn on_entity_destroyed(&mut self, entity: Entity) {
        for record in &mut self.records {
            record.matched.remove(entity);
        }
    }

    /// Run every system once, in registration order.
    ///
    /// Commands recorded by the systems stay queued in `commands`; the caller
    /// decides when to apply them. [`World::update`](crate::World::update)
    /// applies them after each system.
    pub fn update(
        &mut self,
        dt: f32,
        components: &mut ComponentRegistry,
        commands: &mut CommandBuffer,
    ) {
        for index in 0..self.records.len() {
            self.run(index, dt, components, commands);
        }
    }

    /// Run the system at `index` in registration order.
    pub(crate) fn run(
        &mut self,
        index: usize,
        dt: f32,
        components: &mut ComponentRegistry,
        commands: &mut CommandBuffer,
    ) {
        let Some(record) = self.records.get_mut(index) else {
            return;
        };
        let SystemRecord {
            matched, system, ..
        } = record;
        let mut ctx = SystemContext::new(&matched.entities, components, commands);
        system.update(&mut ctx, dt);
    }

    pub fn get<S: System>(&self) -> Option<&S> {
        self.record::<S>()?.system.as_any().downcast_ref::<S>()
    }

    pub fn get_mut<S: System>(&mut self) -> Option<&mut S> {
        let type_id = TypeId::of::<S>();
        self.records
            .iter_mut()
            .find(|r| r.type_id == type_id)?
            .system
            .as_any_mut()
            .downcast_mut::<S>()
    }

    /// Entities currently matching system `S`.
    pub fn entities_of<S: System>(&self) -> Option<&[Entity]> {
        Some(&self.record::<S>()?.matched.entities)
    }

    /// The signature system `S` was registered with.
    pub fn signature_of<S: System>(&self) -> Option<&Signature> {
        Some(&self.record::<S>()?.signature)
    }

    /// Whether `entity` is in the matched set of system `S`.
    pub fn matches<S: System>(&self, entity: Entity) -> bool {
        self.record::<S>()
            .is_some_and(|r| r.matched.contains(entity))
    }

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `(name, required signature, matched entities)` for every system, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Signature, &[Entity])> + '_ {
        self.records
            .iter()
            .map(|r| (r.name, &r.signature, r.matched.entities.as_slice()))
    }

    fn record<S: System>(&self) -> Option<&SystemRecord> {
        let type_id = TypeId::of::<S>();
        self.records.iter().find(|r| r.type_id == type_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::ComponentId;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn e(index: u32) -> Entity {
        Entity::from_raw(index, 0)
    }

    fn sig(bits: &[u32]) -> Signature {
        bits.iter().map(|&b| ComponentId(b)).collect()
    }

    #[derive(Default)]
    struct Movement {
        runs: u32,
    }

    impl System for Movement {
        fn update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) {
            self.runs += 1;
        }
    }

    #[derive(Default)]
    struct Render;

    impl System for Render {
        fn update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) {}
    }

    #[test]
    fn membership_follows_superset_rule() {
        let mut systems = SystemRegistry::new();
        systems
            .register(sig(&[0, 1]), Movement::default(), std::iter::empty())
            .unwrap();

        systems.on_signature_changed(e(0), &sig(&[0]));
        assert!(!systems.matches::<Movement>(e(0)));

        systems.on_signature_changed(e(0), &sig(&[0, 1, 2]));
        assert!(systems.matches::<Movement>(e(0)));

        // Repeated notification does not duplicate.
        systems.on_signature_changed(e(0), &sig(&[0, 1]));
        assert_eq!(systems.entities_of::<Movement>().unwrap(), &[e(0)]);

        systems.on_signature_changed(e(0), &sig(&[1]));
        assert!(systems.entities_of::<Movement>().unwrap().is_empty());
    }

    #[test]
    fn disjoint_signature_never_matches() {
        let mut systems = SystemRegistry::new();
        systems
            .register(sig(&[3]), Render, std::iter::empty())
            .unwrap();
        systems.on_signature_changed(e(1), &sig(&[0, 1]));
        assert!(!systems.matches::<Render>(e(1)));
    }

    #[test]
    fn registration_seeds_from_living_entities() {
        let living = [(e(0), sig(&[0, 1])), (e(1), sig(&[1])), (e(2), sig(&[0]))];
        let mut systems = SystemRegistry::new();
        systems
            .register(
                sig(&[0]),
                Movement::default(),
                living.iter().map(|(entity, s)| (*entity, s)),
            )
            .unwrap();
        let mut matched = systems.entities_of::<Movement>().unwrap().to_vec();
        matched.sort_by_key(|e| e.index());
        assert_eq!(matched, vec![e(0), e(2)]);
    }

    #[test]
    fn duplicate_system_rejected() {
        let mut systems = SystemRegistry::new();
        systems
            .register(sig(&[0]), Movement::default(), std::iter::empty())
            .unwrap();
        assert!(matches!(
            systems.register(sig(&[1]), Movement::default(), std::iter::empty()),
            Err(EcsError::DuplicateSystem(_))
        ));
        assert_eq!(systems.len(), 1);
    }

    #[test]
    fn destroyed_entity_leaves_every_system() {
        let mut systems = SystemRegistry::new();
        systems
            .register(sig(&[0]), Movement::default(), std::iter::empty())
            .unwrap();
        systems
            .register(Signature::new(), Render, std::iter::empty())
            .unwrap();
        for i in 0..4 {
            systems.on_signature_changed(e(i), &sig(&[0]));
        }
        systems.on_entity_destroyed(e(1));
        for (_, _, entities) in systems.iter() {
            assert_eq!(entities.len(), 3);
            assert!(!entities.contains(&e(1)));
        }
        assert!(systems.matches::<Movement>(e(3)));
    }

    #[test]
    fn update_runs_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::<u32>::new()));
        let mut systems = SystemRegistry::new();
        let mut components = ComponentRegistry::new(4, 4);
        let mut commands = CommandBuffer::new();

        let log1 = log.clone();
        systems
            .register(
                Signature::new(),
                move |_: &mut SystemContext<'_>, _: f32| log1.borrow_mut().push(1),
                std::iter::empty(),
            )
            .unwrap();
        systems
            .register(Signature::new(), Movement::default(), std::iter::empty())
            .unwrap();
        let log3 = log.clone();
        systems
            .register(
                Signature::new(),
                move |_: &mut SystemContext<'_>, dt: f32| log3.borrow_mut().push(dt as u32),
                std::iter::empty(),
            )
            .unwrap();

        systems.update(3.0, &mut components, &mut commands);
        assert_eq!(*log.borrow(), vec![1, 3]);
        assert_eq!(systems.get::<Movement>().unwrap().runs, 1);
    }

    #[test]
    fn typed_lookup() {
        let mut systems = SystemRegistry::new();
        assert!(systems.get::<Movement>().is_none());
        systems
            .register(sig(&[2]), Movement::default(), std::iter::empty())
            .unwrap();
        systems.get_mut::<Movement>().unwrap().runs = 7;
        assert_eq!(systems.get::<Movement>().unwrap().runs, 7);
        assert_eq!(systems.signature_of::<Movement>(), Some(&sig(&[2])));
        assert!(systems.get::<Render>().is_none());
    }
}
