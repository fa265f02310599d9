use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use glam::DVec3;
use rally_core::schedule::{Scheduler, TaskHandle};
use rally_core::world::{CollectibleKind, HazardKind, WorldDefinition};
use rally_core::{ItemID, ParticipantID};

use crate::collaborators::SceneHandle;

#[derive(Clone, Debug)]
pub struct Hazard {
    pub kind: HazardKind,
    pub position: DVec3,
    pub radius: f64,
    pub visual: Option<SceneHandle>,
}

// Our mirror of one ledger entry plus the thing on screen. The relay is the
// authority on who scored; this copy only decides what we draw and collide.
#[derive(Clone, Debug)]
pub struct Collectible {
    pub id: ItemID,
    pub kind: CollectibleKind,
    pub value: u32,
    pub position: DVec3,
    pub radius: f64,
    pub respawn_delay: Duration,

    pub collected: bool,
    // None when we took it ourselves or only learned about it from a snapshot
    pub collector: Option<ParticipantID>,
    pub visual: Option<SceneHandle>,
    respawn: Option<TaskHandle>,
}

pub struct WorldState {
    hazards: Vec<Hazard>,
    collectibles: BTreeMap<ItemID, Collectible>,
    respawns: Scheduler<ItemID>,
}

impl WorldState {
    pub fn new(world: &WorldDefinition) -> Self {
        let hazards = world
            .hazards
            .iter()
            .map(|def| Hazard {
                kind: def.kind,
                position: def.position,
                radius: def.radius,
                visual: None,
            })
            .collect();

        let collectibles = world
            .collectibles
            .iter()
            .map(|def| {
                (
                    def.id.clone(),
                    Collectible {
                        id: def.id.clone(),
                        kind: def.kind,
                        value: def.value,
                        position: def.position,
                        radius: def.radius,
                        respawn_delay: def.respawn_delay(),
                        collected: false,
                        collector: None,
                        visual: None,
                        respawn: None,
                    },
                )
            })
            .collect();

        Self {
            hazards,
            collectibles,
            respawns: Scheduler::new(),
        }
    }

    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    pub fn hazards_mut(&mut self) -> &mut [Hazard] {
        &mut self.hazards
    }

    pub fn collectibles(&self) -> impl Iterator<Item = &Collectible> {
        self.collectibles.values()
    }

    pub fn collectibles_mut(&mut self) -> impl Iterator<Item = &mut Collectible> {
        self.collectibles.values_mut()
    }

    pub fn collectible(&self, item_id: &str) -> Option<&Collectible> {
        self.collectibles.get(item_id)
    }

    pub fn collectible_mut(&mut self, item_id: &str) -> Option<&mut Collectible> {
        self.collectibles.get_mut(item_id)
    }

    pub fn pending_respawns(&self) -> usize {
        self.respawns.len()
    }

    /// Marks an item collected and queues its respawn. Returns false, and
    /// changes nothing, if the item is unknown or already taken this round.
    pub fn mark_collected(
        &mut self,
        item_id: &str,
        collector: Option<ParticipantID>,
        now: Instant,
    ) -> bool {
        let collectible = match self.collectibles.get_mut(item_id) {
            Some(collectible) if !collectible.collected => collectible,
            _ => return false,
        };

        collectible.collected = true;
        collectible.collector = collector;
        collectible.respawn = Some(
            self.respawns
                .schedule(now + collectible.respawn_delay, collectible.id.clone()),
        );
        true
    }

    /// Brings back every item whose respawn is due and returns their ids.
    pub fn drain_respawns(&mut self, now: Instant) -> Vec<ItemID> {
        let mut respawned = Vec::new();
        for (handle, item_id) in self.respawns.drain_due(now) {
            // the item may have been removed since this was scheduled
            if let Some(collectible) = self.collectibles.get_mut(&item_id) {
                if collectible.respawn == Some(handle) {
                    collectible.collected = false;
                    collectible.collector = None;
                    collectible.respawn = None;
                    respawned.push(item_id);
                }
            }
        }
        respawned
    }

    // Takes the item out of the world for good, along with its pending respawn
    pub fn remove_collectible(&mut self, item_id: &str) -> Option<Collectible> {
        let collectible = self.collectibles.remove(item_id)?;
        if let Some(handle) = collectible.respawn {
            self.respawns.cancel(handle);
        }
        Some(collectible)
    }
}
