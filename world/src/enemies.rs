//! Enemy state owned by the world.

use bastion_core::{EnemyId, EnemySettings, EnemySnapshot, EnemyTypeId};
use glam::Vec2;

use crate::map::Map;

/// Enemy walking from a spawn point toward the target area.
#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    pub(crate) serial: u64,
    pub(crate) kind: EnemyTypeId,
    pub(crate) position: Vec2,
    waypoint: Vec2,
    pub(crate) life: f32,
    speed: f32,
    pub(crate) money_factor: u32,
    sprite: String,
    pub(crate) struck: bool,
}

impl Enemy {
    /// Creates an enemy at `position` with stats copied from its settings.
    pub(crate) fn spawn(
        serial: u64,
        kind: EnemyTypeId,
        settings: &EnemySettings,
        position: Vec2,
        map: &Map,
    ) -> Self {
        Self {
            serial,
            kind,
            position,
            waypoint: map.next_waypoint(position),
            life: settings.life,
            speed: settings.speed,
            money_factor: settings.money_factor,
            sprite: settings.sprite.clone(),
            struck: false,
        }
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.life <= 0.0
    }

    /// Dead or already struck: the enemy only waits to be pruned.
    pub(crate) fn is_irrelevant(&self) -> bool {
        self.is_dead() || self.struck
    }

    pub(crate) fn damage(&mut self, amount: f32) {
        self.life -= amount;
    }

    /// Walks along the path for `dt` seconds.
    ///
    /// Returns `true` the first time the enemy stands inside the target area.
    pub(crate) fn advance(&mut self, dt: f32, map: &Map) -> bool {
        if self.is_irrelevant() {
            return false;
        }

        let mut budget = self.speed * dt;
        while budget > 0.0 {
            let to_waypoint = self.waypoint - self.position;
            let distance = to_waypoint.length();
            if distance > budget {
                self.position += to_waypoint / distance * budget;
                break;
            }

            self.position = self.waypoint;
            budget -= distance;
            let next = map.next_waypoint(self.position);
            if next == self.waypoint {
                break;
            }
            self.waypoint = next;
        }

        if map.is_in_target_area(self.position) {
            self.struck = true;
            return true;
        }
        false
    }

    pub(crate) fn snapshot(&self, id: EnemyId) -> EnemySnapshot {
        EnemySnapshot {
            id,
            serial: self.serial,
            kind: self.kind,
            position: self.position,
            life: self.life,
            irrelevant: self.is_irrelevant(),
            sprite: self.sprite.clone(),
        }
    }
}
