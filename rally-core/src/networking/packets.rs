use std::io::{Read, Write};

use bincode::{DefaultOptions, Options, Result};
use glam::DVec3;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::participant::ParticipantInfo;
use crate::transform::Transform;
use crate::vehicles::VehicleKind;
use crate::world::CollectibleKind;
use crate::{ItemID, ParticipantID};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ServerBoundPacket {
    // Handshake
    Join {
        name: String,
        vehicle_kind: VehicleKind,
        transform: Transform,
    },

    // Overwrite-then-forward
    Movement(Transform),
    VehicleChanged(VehicleKind),
    HeadlightsToggled(bool),
    HornSound,
    Collision {
        target_id: ParticipantID,
        position: DVec3,
    },

    // Forwarded only if the ledger entry flips to collected
    CollectibleCollected {
        item_id: ItemID,
        kind: CollectibleKind,
        position: DVec3,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ClientBoundPacket {
    // Reply to Join: who you are, who else is here, what's already been picked up
    Snapshot {
        your_id: ParticipantID,
        participants: Vec<ParticipantInfo>,
        collected: Vec<ItemID>,
    },
    ParticipantJoined(ParticipantInfo),
    ParticipantLeft(ParticipantID),

    Movement {
        id: ParticipantID,
        transform: Transform,
    },
    VehicleChanged {
        id: ParticipantID,
        vehicle_kind: VehicleKind,
    },
    HeadlightsToggled {
        id: ParticipantID,
        on: bool,
    },
    HornSound {
        id: ParticipantID,
    },
    Collision {
        from: ParticipantID,
        target_id: ParticipantID,
        position: DVec3,
    },
    CollectibleCollected {
        id: ParticipantID,
        item_id: ItemID,
        kind: CollectibleKind,
        position: DVec3,
    },
}

pub trait Packet: Serialize + DeserializeOwned {
    fn parse_packet<R: Read>(reader: &mut R) -> Result<Self> {
        DefaultOptions::new().deserialize_from(reader)
    }
    fn parse_packet_bytes(bytes: &[u8]) -> Result<Self> {
        DefaultOptions::new().deserialize(bytes)
    }
    fn packet_size(&self) -> Result<u64> {
        DefaultOptions::new().serialized_size(self)
    }
    fn write_packet<W: Write>(&self, write: &mut W) -> Result<()> {
        DefaultOptions::new().serialize_into(write, self)
    }
}

impl Packet for ClientBoundPacket {}
impl Packet for ServerBoundPacket {}
