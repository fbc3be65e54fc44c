use crate::entity::Entity;

/// Errors produced by entity, component, and system operations.
///
/// Missing components are not errors: lookups return `Option` instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    #[error("entity capacity exceeded (max {max})")]
    CapacityExceeded { max: u32 },

    #[error("too many component types registered (max {max})")]
    TooManyComponentTypes { max: u32 },

    #[error("component type '{0}' is already registered")]
    DuplicateRegistration(&'static str),

    #[error("component type '{0}' is not registered")]
    UnregisteredComponent(&'static str),

    #[error("entity {entity} already has a '{component}' component")]
    DuplicateInsert {
        entity: Entity,
        component: &'static str,
    },

    #[error("system type '{0}' is already registered")]
    DuplicateSystem(&'static str),

    #[error("entity {0} is not alive")]
    StaleEntity(Entity),

    #[error("invalid ECS configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EcsError>;
