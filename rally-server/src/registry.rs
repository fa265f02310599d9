use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use rally_core::participant::ParticipantInfo;
use rally_core::transform::Transform;
use rally_core::vehicles::VehicleKind;
use rally_core::world::{CollectibleDefinition, CollectibleKind};
use rally_core::{ItemID, ParticipantID};

// One per configured spawn point. Entries live for the whole session; a
// respawn just starts a new round on the same entry.
#[derive(Clone, Debug)]
pub struct LedgerEntry {
    pub kind: CollectibleKind,
    pub value: u32,
    pub respawn_delay: Duration,

    pub round: u32,
    pub collected: bool,
    pub collector: Option<ParticipantID>,
    pub collected_at: Option<Instant>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectOutcome {
    // first arrival this round; the collector has been scored
    Collected { round: u32, respawn_delay: Duration },
    AlreadyCollected,
    UnknownItem,
}

pub struct SessionRegistry {
    // ordered so fan-out and snapshots come out in join order
    participants: BTreeMap<ParticipantID, ParticipantInfo>,
    ledger: HashMap<ItemID, LedgerEntry>,
    next_id: ParticipantID,
    started_at: Instant,
}

impl SessionRegistry {
    pub fn new(collectibles: &[CollectibleDefinition], started_at: Instant) -> Self {
        let ledger = collectibles
            .iter()
            .map(|def| {
                (
                    def.id.clone(),
                    LedgerEntry {
                        kind: def.kind,
                        value: def.value,
                        respawn_delay: def.respawn_delay(),
                        round: 0,
                        collected: false,
                        collector: None,
                        collected_at: None,
                    },
                )
            })
            .collect();

        Self {
            participants: BTreeMap::new(),
            ledger,
            next_id: 1,
            started_at,
        }
    }

    // Ids are handed out per connection and never reused within a run
    pub fn allocate_id(&mut self) -> ParticipantID {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Registers (or re-registers) a participant and returns everyone else.
    pub fn join(
        &mut self,
        id: ParticipantID,
        name: String,
        vehicle_kind: VehicleKind,
        transform: Transform,
        now: Instant,
    ) -> (ParticipantInfo, Vec<ParticipantInfo>) {
        let info = ParticipantInfo {
            id,
            name,
            vehicle_kind,
            transform,
            headlights_on: false,
            score: 0,
            joined_at: now.saturating_duration_since(self.started_at),
        };
        self.participants.insert(id, info.clone());

        let others = self
            .participants
            .values()
            .filter(|other| other.id != id)
            .cloned()
            .collect();
        (info, others)
    }

    pub fn leave(&mut self, id: ParticipantID) -> Option<ParticipantInfo> {
        self.participants.remove(&id)
    }

    pub fn contains(&self, id: ParticipantID) -> bool {
        self.participants.contains_key(&id)
    }

    pub fn get(&self, id: ParticipantID) -> Option<&ParticipantInfo> {
        self.participants.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ParticipantID> + '_ {
        self.participants.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    // The setters report whether the participant exists; nothing else is checked

    pub fn set_transform(&mut self, id: ParticipantID, transform: Transform) -> bool {
        self.update(id, |info| info.transform = transform)
    }

    pub fn set_vehicle_kind(&mut self, id: ParticipantID, vehicle_kind: VehicleKind) -> bool {
        self.update(id, |info| info.vehicle_kind = vehicle_kind)
    }

    pub fn set_headlights(&mut self, id: ParticipantID, on: bool) -> bool {
        self.update(id, |info| info.headlights_on = on)
    }

    fn update<F: FnOnce(&mut ParticipantInfo)>(&mut self, id: ParticipantID, f: F) -> bool {
        match self.participants.get_mut(&id) {
            Some(info) => {
                f(info);
                true
            }
            None => false,
        }
    }

    pub fn ledger_entry(&self, item_id: &str) -> Option<&LedgerEntry> {
        self.ledger.get(item_id)
    }

    // First arrival wins: whoever's message reaches us first this round gets
    // the item, every later claim is a no-op
    pub fn try_collect(
        &mut self,
        item_id: &str,
        collector: ParticipantID,
        now: Instant,
    ) -> CollectOutcome {
        let entry = match self.ledger.get_mut(item_id) {
            Some(entry) => entry,
            None => return CollectOutcome::UnknownItem,
        };
        if entry.collected {
            return CollectOutcome::AlreadyCollected;
        }

        entry.collected = true;
        entry.collector = Some(collector);
        entry.collected_at = Some(now);

        if let Some(info) = self.participants.get_mut(&collector) {
            info.score += entry.value;
        }

        CollectOutcome::Collected {
            round: entry.round,
            respawn_delay: entry.respawn_delay,
        }
    }

    // Only resets the round that was scheduled; a stale reset is ignored
    pub fn reset_item(&mut self, item_id: &str, round: u32) -> bool {
        match self.ledger.get_mut(item_id) {
            Some(entry) if entry.collected && entry.round == round => {
                entry.round += 1;
                entry.collected = false;
                entry.collector = None;
                entry.collected_at = None;
                true
            }
            _ => false,
        }
    }

    pub fn collected_items(&self) -> Vec<ItemID> {
        let mut items: Vec<ItemID> = self
            .ledger
            .iter()
            .filter(|(_, entry)| entry.collected)
            .map(|(id, _)| id.clone())
            .collect();
        items.sort();
        items
    }
}
