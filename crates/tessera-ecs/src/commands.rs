use std::fmt;

use tracing::{debug, warn};

use crate::component::Component;
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::world::{Bundle, World};

type Command = Box<dyn FnOnce(&mut World) -> Result<()>>;

/// Structural changes recorded while a system runs, applied once it returns.
#[derive(Default)]
pub struct CommandBuffer {
    queue: Vec<(&'static str, Command)>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity carrying every component in `bundle`.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) {
        self.push("spawn", move |world| world.spawn(bundle).map(|_| ()));
    }

    /// Destroy an entity.
    pub fn despawn(&mut self, entity: Entity) {
        self.push("despawn", move |world| world.destroy_entity(entity));
    }

    /// Attach a component to an entity.
    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) {
        self.push("insert", move |world| {
            world.add_component(entity, component)
        });
    }

    /// Detach a component from an entity. Absent components are not an error.
    pub fn remove<T: Component>(&mut self, entity: Entity) {
        self.push("remove", move |world| {
            world.remove_component::<T>(entity).map(|_| ())
        });
    }

    /// Queue an arbitrary mutation of the world.
    pub fn push(
        &mut self,
        label: &'static str,
        command: impl FnOnce(&mut World) -> Result<()> + 'static,
    ) {
        self.queue.push((label, Box::new(command)));
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Apply every queued command in order.
    ///
    /// A command aimed at an entity that died before the flush is logged and
    /// skipped. Any other failure is logged too, and the first one is returned
    /// once the rest of the queue has been applied.
    pub(crate) fn apply(&mut self, world: &mut World) -> Result<()> {
        let mut first_error = None;
        for (label, command) in self.queue.drain(..) {
            match command(world) {
                Ok(()) => {}
                Err(e @ EcsError::StaleEntity(_)) => {
                    debug!(command = label, error = %e, "deferred command skipped");
                }
                Err(e) => {
                    warn!(command = label, error = %e, "deferred command failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.queue.iter().map(|(label, _)| label))
            .finish()
    }
}
