use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use glam::DVec3;
use rally_core::transform::{planar, Transform};
use rally_core::vehicles::Stat;
use rally_core::world::{CollectibleKind, HazardKind};
use rally_core::{ItemID, ParticipantID, Settings};

use crate::driving::LocalActor;
use crate::interpolation::RemoteActor;
use crate::world_state::WorldState;

#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug)]
pub struct CollisionTuning {
    pub vehicle_bounce: f64,
    pub hazard_bounce: f64,
    // how far apart two things can be vertically and still touch
    pub elevation_gate: f64,
    pub recovery: Duration,
    pub max_shield: f64,
}

impl From<&Settings> for CollisionTuning {
    fn from(settings: &Settings) -> Self {
        Self {
            vehicle_bounce: settings.vehicle_bounce_strength,
            hazard_bounce: settings.hazard_bounce_strength,
            elevation_gate: settings.elevation_gate,
            recovery: settings.collision_recovery(),
            max_shield: settings.max_shield,
        }
    }
}

// What happened to the local vehicle this tick. The session turns these into
// sounds, scene changes and outgoing packets.
#[derive(Clone, Debug, PartialEq)]
pub enum CollisionEffect {
    HazardBounce {
        kind: HazardKind,
        push: DVec3,
    },
    HazardReset {
        kind: HazardKind,
    },
    VehicleBounce {
        target_id: ParticipantID,
        push: DVec3,
        // where we were when we hit them
        position: DVec3,
    },
    Collected {
        item_id: ItemID,
        kind: CollectibleKind,
        position: DVec3,
        value: u32,
    },
}

pub fn overlaps(a: DVec3, a_radius: f64, b: DVec3, b_radius: f64, elevation_gate: f64) -> bool {
    planar(a).distance(planar(b)) < a_radius + b_radius && (a.y - b.y).abs() <= elevation_gate
}

/// Displacement that moves `target` directly away from `from` in the ground
/// plane. Exactly coincident centres get pushed along +X.
pub fn push_away(from: DVec3, target: DVec3, strength: f64) -> DVec3 {
    let separation = planar(target) - planar(from);
    let direction = if separation.length_squared() > 0.0 {
        separation.normalize()
    } else {
        glam::DVec2::X
    };
    DVec3::new(direction.x, 0.0, direction.y) * strength
}

pub struct CollisionSystem {
    tuning: CollisionTuning,
}

impl CollisionSystem {
    pub fn new(tuning: CollisionTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &CollisionTuning {
        &self.tuning
    }

    // One pass per tick, after the local vehicle has moved: hazards, then
    // other vehicles, then pickups. Each category stops at its first hit.
    pub fn step(
        &self,
        local: &mut LocalActor,
        remotes: &mut BTreeMap<ParticipantID, RemoteActor>,
        world: &mut WorldState,
        start: Transform,
        now: Instant,
    ) -> Vec<CollisionEffect> {
        let mut effects = Vec::new();

        if let Some(effect) = self.hazard_pass(local, world, start, now) {
            effects.push(effect);
        }
        if let Some(effect) = self.vehicle_pass(local, remotes, now) {
            effects.push(effect);
        }
        if let Some(effect) = self.collectible_pass(local, world, now) {
            effects.push(effect);
        }

        effects
    }

    fn hazard_pass(
        &self,
        local: &mut LocalActor,
        world: &WorldState,
        start: Transform,
        now: Instant,
    ) -> Option<CollisionEffect> {
        let position = local.transform.position;
        let radius = local.collision_radius();
        let hazard = world.hazards().iter().find(|hazard| {
            overlaps(
                position,
                radius,
                hazard.position,
                hazard.radius,
                self.tuning.elevation_gate,
            )
        })?;

        local.lock_input(now, self.tuning.recovery);
        if hazard.kind.resets_vehicle() {
            local.reset_to(start);
            Some(CollisionEffect::HazardReset { kind: hazard.kind })
        } else {
            let push = push_away(hazard.position, position, self.tuning.hazard_bounce);
            local.push(push);
            Some(CollisionEffect::HazardBounce {
                kind: hazard.kind,
                push,
            })
        }
    }

    // Both vehicles move apart. The other one's owner makes the same push on
    // its side when our notice arrives, so its interpolation target moves too.
    fn vehicle_pass(
        &self,
        local: &mut LocalActor,
        remotes: &mut BTreeMap<ParticipantID, RemoteActor>,
        now: Instant,
    ) -> Option<CollisionEffect> {
        // still recovering from the last hit
        if local.input_locked(now) {
            return None;
        }

        let position = local.transform.position;
        let radius = local.collision_radius();
        let other = remotes.values_mut().find(|remote| {
            overlaps(
                position,
                radius,
                remote.position,
                remote.collision_radius(),
                self.tuning.elevation_gate,
            )
        })?;

        let push = push_away(other.position, position, self.tuning.vehicle_bounce);
        local.push(push);
        local.lock_input(now, self.tuning.recovery);
        other.position -= push;
        other.target_position -= push;

        Some(CollisionEffect::VehicleBounce {
            target_id: other.id,
            push,
            position,
        })
    }

    fn collectible_pass(
        &self,
        local: &mut LocalActor,
        world: &mut WorldState,
        now: Instant,
    ) -> Option<CollisionEffect> {
        let position = local.transform.position;
        let radius = local.collision_radius();
        let (item_id, kind, value, item_position) = world
            .collectibles()
            .find(|item| {
                !item.collected
                    && overlaps(
                        position,
                        radius,
                        item.position,
                        item.radius,
                        self.tuning.elevation_gate,
                    )
            })
            .map(|item| (item.id.clone(), item.kind, item.value, item.position))?;

        if !world.mark_collected(&item_id, None, now) {
            return None;
        }

        match kind {
            CollectibleKind::Gold => local.score += value,
            CollectibleKind::Shield => {
                let amount = value as f64 * local.vehicle_kind.stat(Stat::Shield);
                local.shield = (local.shield + amount).min(self.tuning.max_shield)
            }
        }

        Some(CollisionEffect::Collected {
            item_id,
            kind,
            position: item_position,
            value,
        })
    }

    // The other side of someone else's VehicleBounce: they hit us at
    // `position`, so we move away from it. Ignored while we're recovering.
    pub fn receive_hit(
        &self,
        local: &mut LocalActor,
        position: DVec3,
        now: Instant,
    ) -> Option<DVec3> {
        if local.input_locked(now) {
            return None;
        }
        let push = push_away(position, local.transform.position, self.tuning.vehicle_bounce);
        local.push(push);
        local.lock_input(now, self.tuning.recovery);
        Some(push)
    }
}
