//! Homing projectiles and their hit resolution.

use bastion_core::{EnemyId, ProjectileSnapshot};
use glam::Vec2;
use slotmap::SlotMap;

use crate::enemies::Enemy;

/// Projectile homing in on an enemy.
#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    position: Vec2,
    target: EnemyId,
    target_position: Vec2,
    speed: f32,
    power: f32,
    rotation: f32,
    sprite: String,
    pub(crate) hit: bool,
}

/// Outcome of a projectile reaching the point it was homing in on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Impact {
    /// Enemy that took the damage; `None` when the target was already gone.
    pub(crate) enemy: Option<EnemyId>,
    pub(crate) damage: f32,
}

impl Projectile {
    /// Launches a projectile from `origin` toward the target's current position.
    pub(crate) fn launch(
        origin: Vec2,
        target: EnemyId,
        target_position: Vec2,
        power: f32,
        speed: f32,
        sprite: String,
    ) -> Self {
        Self {
            position: origin,
            target,
            target_position,
            speed,
            power,
            rotation: 0.0,
            sprite,
            hit: false,
        }
    }

    /// Moves the projectile and resolves a hit once it is close enough.
    ///
    /// A projectile whose target no longer resolves keeps flying to the last
    /// known position and hits nothing there.
    pub(crate) fn update(
        &mut self,
        dt: f32,
        hit_distance: f32,
        enemies: &mut SlotMap<EnemyId, Enemy>,
    ) -> Option<Impact> {
        if self.hit {
            return None;
        }

        let target = enemies.get_mut(self.target);
        if let Some(enemy) = &target {
            self.target_position = enemy.position;
        }

        let offset = self.target_position - self.position;
        let distance = offset.length();
        if distance < hit_distance {
            self.hit = true;
            let enemy = target.map(|enemy| {
                enemy.damage(self.power);
                self.target
            });
            return Some(Impact {
                enemy,
                damage: if enemy.is_some() { self.power } else { 0.0 },
            });
        }

        let direction = offset / distance;
        let mut angle = Vec2::NEG_X.dot(direction).clamp(-1.0, 1.0).acos();
        if direction.y < 0.0 {
            angle = -angle;
        }

        self.position += direction * (self.speed * dt).min(distance);
        self.rotation = angle.to_degrees();
        None
    }

    pub(crate) fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            position: self.position,
            rotation: self.rotation,
            sprite: self.sprite.clone(),
            hit: self.hit,
        }
    }
}
