//! Tessera ECS - Entity Component System
//!
//! A sparse-set ECS with incrementally maintained system membership.
//! Entities are generational handles, each component type lives in its own
//! packed store, and every system keeps the exact set of entities whose
//! signature covers the components it requires.
//!
//! ```ignore
//! let mut world = World::new();
//! world.register_component::<Position>()?;
//! let required = world.signature_of::<(Position,)>()?;
//! world.register_system(required, Physics)?;
//!
//! let e = world.spawn((Position { x: 0.0, y: 0.0 },))?;
//! world.update(1.0 / 60.0)?;
//! ```

mod commands;
mod component;
mod config;
mod entity;
mod error;
mod registry;
mod signature;
mod system;
mod world;

pub use commands::CommandBuffer;
pub use component::{Component, ComponentStore};
pub use config::EcsConfig;
pub use entity::{Entity, EntityManager};
pub use error::{EcsError, Result};
pub use registry::{ComponentRegistry, ComponentSet};
pub use signature::{ComponentId, Signature};
pub use system::{System, SystemContext, SystemRegistry};
pub use world::{Bundle, World};
