use std::time::Instant;

use rand::Rng;
use rally_core::networking::{ClientBoundPacket, ServerBoundPacket};
use rally_core::schedule::Scheduler;
use rally_core::transform::Transform;
use rally_core::vehicles::VehicleKind;
use rally_core::world::WorldDefinition;
use rally_core::{ItemID, ParticipantID};
use tracing::{debug, info};

use crate::registry::{CollectOutcome, SessionRegistry};

pub type Delivery = (ParticipantID, ClientBoundPacket);

// Queued when an item is collected; fires after the item's respawn delay
#[derive(Debug)]
struct LedgerReset {
    item_id: ItemID,
    round: u32,
}

// Pure store-and-forward hub: it never validates, smooths or simulates
// anything, it just updates the registry and says who should hear about it
pub struct Relay {
    registry: SessionRegistry,
    ledger_resets: Scheduler<LedgerReset>,
}

impl Relay {
    pub fn new(world: &WorldDefinition, now: Instant) -> Self {
        Self {
            registry: SessionRegistry::new(&world.collectibles, now),
            ledger_resets: Scheduler::new(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn pending_respawns(&self) -> usize {
        self.ledger_resets.len()
    }

    // A transport connected; it only becomes a participant once it joins
    pub fn connect(&mut self) -> ParticipantID {
        self.registry.allocate_id()
    }

    pub fn handle_packet(
        &mut self,
        sender: ParticipantID,
        packet: ServerBoundPacket,
        now: Instant,
    ) -> Vec<Delivery> {
        let packet = match packet {
            ServerBoundPacket::Join {
                name,
                vehicle_kind,
                transform,
            } => return self.join(sender, name, vehicle_kind, transform, now),
            other => other,
        };

        if !self.registry.contains(sender) {
            debug!(sender, "dropping packet from a connection that never joined");
            return Vec::new();
        }

        match packet {
            ServerBoundPacket::Join { .. } => Vec::new(),

            ServerBoundPacket::Movement(transform) => {
                self.registry.set_transform(sender, transform);
                self.to_others(sender, ClientBoundPacket::Movement { id: sender, transform })
            }

            ServerBoundPacket::VehicleChanged(vehicle_kind) => {
                self.registry.set_vehicle_kind(sender, vehicle_kind);
                self.to_others(
                    sender,
                    ClientBoundPacket::VehicleChanged {
                        id: sender,
                        vehicle_kind,
                    },
                )
            }

            ServerBoundPacket::HeadlightsToggled(on) => {
                self.registry.set_headlights(sender, on);
                self.to_others(sender, ClientBoundPacket::HeadlightsToggled { id: sender, on })
            }

            ServerBoundPacket::HornSound => {
                self.to_others(sender, ClientBoundPacket::HornSound { id: sender })
            }

            ServerBoundPacket::Collision {
                target_id,
                position,
            } => self.to_others(
                sender,
                ClientBoundPacket::Collision {
                    from: sender,
                    target_id,
                    position,
                },
            ),

            ServerBoundPacket::CollectibleCollected {
                item_id,
                kind,
                position,
            } => match self.registry.try_collect(&item_id, sender, now) {
                CollectOutcome::Collected {
                    round,
                    respawn_delay,
                } => {
                    info!(sender, %item_id, round, "collectible collected");
                    self.ledger_resets.schedule(
                        now + respawn_delay,
                        LedgerReset {
                            item_id: item_id.clone(),
                            round,
                        },
                    );
                    self.to_others(
                        sender,
                        ClientBoundPacket::CollectibleCollected {
                            id: sender,
                            item_id,
                            kind,
                            position,
                        },
                    )
                }
                CollectOutcome::AlreadyCollected => {
                    debug!(sender, %item_id, "collectible already taken this round");
                    Vec::new()
                }
                CollectOutcome::UnknownItem => {
                    debug!(sender, %item_id, "no such collectible");
                    Vec::new()
                }
            },
        }
    }

    fn join(
        &mut self,
        sender: ParticipantID,
        name: String,
        vehicle_kind: VehicleKind,
        transform: Transform,
        now: Instant,
    ) -> Vec<Delivery> {
        // a repeated handshake just gets the current snapshot again
        if self.registry.contains(sender) {
            debug!(sender, "participant joined twice");
            return vec![(sender, self.snapshot_for(sender))];
        }

        let name = if name.trim().is_empty() {
            format!("Racer-{:04}", rand::thread_rng().gen_range(0..10_000))
        } else {
            name
        };

        let (info, others) = self
            .registry
            .join(sender, name, vehicle_kind, transform, now);
        info!(id = sender, name = %info.name, ?vehicle_kind, "participant joined");

        let snapshot = ClientBoundPacket::Snapshot {
            your_id: sender,
            participants: others,
            collected: self.registry.collected_items(),
        };
        let mut deliveries = vec![(sender, snapshot)];
        deliveries.extend(self.to_others(sender, ClientBoundPacket::ParticipantJoined(info)));
        deliveries
    }

    fn snapshot_for(&self, id: ParticipantID) -> ClientBoundPacket {
        let participants = self
            .registry
            .ids()
            .filter(|other| *other != id)
            .filter_map(|other| self.registry.get(other).cloned())
            .collect();
        ClientBoundPacket::Snapshot {
            your_id: id,
            participants,
            collected: self.registry.collected_items(),
        }
    }

    // Transport closed: forget them and tell everyone who's left
    pub fn disconnect(&mut self, id: ParticipantID) -> Vec<Delivery> {
        match self.registry.leave(id) {
            Some(info) => {
                info!(id, name = %info.name, "participant left");
                self.to_others(id, ClientBoundPacket::ParticipantLeft(id))
            }
            None => Vec::new(),
        }
    }

    // Fire any ledger resets that are due. Scheduled resets outlive whoever
    // collected the item, so they only touch the ledger itself.
    pub fn tick(&mut self, now: Instant) {
        if self.ledger_resets.is_empty() {
            return;
        }
        for (_, reset) in self.ledger_resets.drain_due(now) {
            if self.registry.reset_item(&reset.item_id, reset.round) {
                debug!(item_id = %reset.item_id, round = reset.round, "collectible respawned");
            }
        }
    }

    fn to_others(&self, sender: ParticipantID, packet: ClientBoundPacket) -> Vec<Delivery> {
        self.registry
            .ids()
            .filter(|id| *id != sender)
            .map(|id| (id, packet.clone()))
            .collect()
    }
}
