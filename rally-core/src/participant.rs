use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transform::Transform;
use crate::vehicles::VehicleKind;
use crate::ParticipantID;

// Everything another client needs to spawn and render someone's vehicle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: ParticipantID,
    pub name: String,
    pub vehicle_kind: VehicleKind,
    pub transform: Transform,
    pub headlights_on: bool,
    pub score: u32,
    // measured from relay start-up, since Instants don't travel
    #[serde(with = "serde_millis")]
    pub joined_at: Duration,
}
