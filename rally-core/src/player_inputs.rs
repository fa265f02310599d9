use serde::{Deserialize, Serialize};

type Modifier = f64;

#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum EngineStatus {
    Accelerating(Modifier),
    Neutral,
    Braking,
}

#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum RotationStatus {
    InSpinClockwise(Modifier),
    InSpinCounterclockwise(Modifier),
    NotInSpin,
}

// PlayerInputs is the current key-state snapshot handed to the local
// simulation each tick
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlayerInputs {
    pub engine_status: EngineStatus,
    pub rotation_status: RotationStatus,
    pub horn: bool,
    pub toggle_headlights: bool,
}

impl PlayerInputs {
    pub fn idle() -> Self {
        Self {
            engine_status: EngineStatus::Neutral,
            rotation_status: RotationStatus::NotInSpin,
            horn: false,
            toggle_headlights: false,
        }
    }
}

impl Default for PlayerInputs {
    fn default() -> Self {
        Self::idle()
    }
}
