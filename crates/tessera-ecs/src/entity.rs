use std::fmt;

use tracing::{trace, warn};

use crate::error::{EcsError, Result};
use crate::signature::Signature;

/// A generational entity handle. The index addresses component slots; the
/// generation rejects handles that outlived a destroy/recycle cycle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Entity {
    /// Create an entity from raw parts (mainly for testing).
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// The slot index of this entity, in `[0, max_entities)`.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The generation of this entity (incremented on reuse).
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Allocates and recycles entity handles and owns every entity's signature.
///
/// Freed indices are reused last-in first-out. Fresh indices are handed out
/// in ascending order until `max_entities` is reached.
pub struct EntityManager {
    generations: Vec<u32>,
    alive: Vec<bool>,
    signatures: Vec<Signature>,
    free_list: Vec<u32>,
    max_entities: u32,
    len: usize,
}

impl EntityManager {
    pub fn new(max_entities: u32) -> Self {
        Self {
            generations: Vec::new(),
            alive: Vec::new(),
            signatures: Vec::new(),
            free_list: Vec::new(),
            max_entities,
            len: 0,
        }
    }

    /// Allocate an entity, reusing the most recently freed slot if there is one.
    pub fn create(&mut self) -> Result<Entity> {
        let entity = if let Some(index) = self.free_list.pop() {
            self.alive[index as usize] = true;
            Entity {
                index,
                generation: self.generations[index as usize],
            }
        } else {
            let index = self.generations.len() as u32;
            if index >= self.max_entities {
                warn!(max = self.max_entities, "entity capacity exhausted");
                return Err(EcsError::CapacityExceeded {
                    max: self.max_entities,
                });
            }
            self.generations.push(0);
            self.alive.push(true);
            self.signatures.push(Signature::new());
            Entity {
                index,
                generation: 0,
            }
        };
        self.len += 1;
        trace!(%entity, "entity created");
        Ok(entity)
    }

    /// Destroy an entity: clear its signature and recycle its slot.
    /// Returns `false` for stale or unknown handles.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let idx = entity.index as usize;
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.signatures[idx].reset();
        self.free_list.push(entity.index);
        self.len -= 1;
        trace!(%entity, "entity destroyed");
        true
    }

    /// Check if an entity is currently alive.
    pub fn is_alive(&self, entity: Entity) -> bool {
        let idx = entity.index as usize;
        idx < self.alive.len() && self.alive[idx] && self.generations[idx] == entity.generation
    }

    /// Replace the signature of a living entity.
    pub fn set_signature(&mut self, entity: Entity, signature: Signature) -> Result<()> {
        if !self.is_alive(entity) {
            return Err(EcsError::StaleEntity(entity));
        }
        self.signatures[entity.index as usize] = signature;
        Ok(())
    }

    /// The current signature of an entity. Dead or stale handles have an empty signature.
    pub fn signature(&self, entity: Entity) -> &Signature {
        static EMPTY: Signature = Signature::EMPTY;
        if self.is_alive(entity) {
            &self.signatures[entity.index as usize]
        } else {
            &EMPTY
        }
    }

    pub(crate) fn signature_mut(&mut self, entity: Entity) -> Option<&mut Signature> {
        if self.is_alive(entity) {
            Some(&mut self.signatures[entity.index as usize])
        } else {
            None
        }
    }

    /// Iterate over every living entity together with its signature.
    pub fn living(&self) -> impl Iterator<Item = (Entity, &Signature)> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(move |(idx, _)| {
                let entity = Entity {
                    index: idx as u32,
                    generation: self.generations[idx],
                };
                (entity, &self.signatures[idx])
            })
    }

    /// Number of currently alive entities.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no alive entities.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The configured entity limit.
    pub fn capacity(&self) -> u32 {
        self.max_entities
    }
}
