//! A small particle simulation driven through the ECS
//!
//! Particles move with a constant velocity and expire when their lifetime
//! runs out. A spawner keeps the population topped up each frame.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tessera_ecs::{Result, System, SystemContext, World};

use crate::settings::SimulationSettings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

/// Seconds left before the entity is despawned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime(pub f32);

/// Integrates position from velocity.
pub struct Movement;

impl System for Movement {
    fn update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) {
        for &entity in ctx.entities() {
            let Some(velocity) = ctx.get::<Velocity>(entity).copied() else {
                continue;
            };
            if let Some(position) = ctx.get_mut::<Position>(entity) {
                position.x += velocity.dx * dt;
                position.y += velocity.dy * dt;
            }
        }
    }
}

/// Counts lifetimes down and despawns expired entities.
#[derive(Default)]
pub struct Aging {
    pub expired: u64,
}

impl System for Aging {
    fn update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) {
        for &entity in ctx.entities() {
            let Some(lifetime) = ctx.get_mut::<Lifetime>(entity) else {
                continue;
            };
            lifetime.0 -= dt;
            if lifetime.0 <= 0.0 {
                ctx.commands().despawn(entity);
                self.expired += 1;
            }
        }
    }
}

/// Spawns new particles every frame.
pub struct Spawner {
    rng: StdRng,
    per_frame: u32,
    min_lifetime: f32,
    max_lifetime: f32,
    pub spawned: u64,
}

impl Spawner {
    pub fn new(settings: &SimulationSettings) -> Self {
        Self {
            rng: StdRng::seed_from_u64(settings.seed),
            per_frame: settings.spawn_per_frame,
            min_lifetime: settings.min_lifetime,
            max_lifetime: settings.max_lifetime.max(settings.min_lifetime),
            spawned: 0,
        }
    }

    /// A randomized particle.
    pub fn particle(&mut self) -> (Position, Velocity, Lifetime) {
        let lifetime = if self.max_lifetime > self.min_lifetime {
            self.rng.gen_range(self.min_lifetime..self.max_lifetime)
        } else {
            self.min_lifetime
        };
        (
            Position { x: 0.0, y: 0.0 },
            Velocity {
                dx: self.rng.gen_range(-1.0..1.0),
                dy: self.rng.gen_range(-1.0..1.0),
            },
            Lifetime(lifetime),
        )
    }
}

impl System for Spawner {
    fn update(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) {
        for _ in 0..self.per_frame {
            let particle = self.particle();
            ctx.commands().spawn(particle);
            self.spawned += 1;
        }
    }
}

/// Register the particle components and systems and seed the initial population.
pub fn setup(world: &mut World, settings: &SimulationSettings) -> Result<()> {
    world.register_component::<Position>()?;
    world.register_component::<Velocity>()?;
    world.register_component::<Lifetime>()?;

    let mut spawner = Spawner::new(settings);
    for _ in 0..settings.initial_entities {
        world.spawn(spawner.particle())?;
    }

    let moving = world.signature_of::<(Position, Velocity)>()?;
    world.register_system(moving, Movement)?;
    let aging = world.signature_of::<(Lifetime,)>()?;
    world.register_system(aging, Aging::default())?;
    world.register_system(tessera_ecs::Signature::new(), spawner)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SimulationSettings {
        SimulationSettings {
            initial_entities: 10,
            spawn_per_frame: 0,
            min_lifetime: 0.45,
            max_lifetime: 0.45,
            ..Default::default()
        }
    }

    #[test]
    fn setup_registers_everything() {
        let mut world = World::new();
        setup(&mut world, &settings()).unwrap();
        assert_eq!(world.entity_count(), 10);
        assert_eq!(world.system_entities::<Movement>().unwrap().len(), 10);
        assert_eq!(world.system_entities::<Aging>().unwrap().len(), 10);
        assert_eq!(world.systems().len(), 3);
    }

    #[test]
    fn particles_expire() {
        let mut world = World::new();
        setup(&mut world, &settings()).unwrap();
        for _ in 0..4 {
            world.update(0.1).unwrap();
        }
        assert_eq!(world.entity_count(), 10);
        world.update(0.1).unwrap();
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.get_system::<Aging>().unwrap().expired, 10);
        assert!(world.system_entities::<Movement>().unwrap().is_empty());
    }

    #[test]
    fn spawner_tops_up_population() {
        let mut world = World::new();
        let settings = SimulationSettings {
            initial_entities: 0,
            spawn_per_frame: 3,
            min_lifetime: 100.0,
            max_lifetime: 200.0,
            ..Default::default()
        };
        setup(&mut world, &settings).unwrap();
        world.update(0.016).unwrap();
        world.update(0.016).unwrap();
        assert_eq!(world.entity_count(), 6);
        assert_eq!(world.get_system::<Spawner>().unwrap().spawned, 6);
        assert!(world.check_consistency());
    }
}
