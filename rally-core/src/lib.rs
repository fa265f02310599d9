pub mod networking;
pub mod participant;
pub mod player_inputs;
pub mod schedule;
mod settings;
pub mod sound_effect;
pub mod transform;
pub mod vehicles;
pub mod world;

pub use settings::{Settings, GLOBAL_CONFIG};

// connection-scoped; the relay never hands out the same id twice in one run
pub type ParticipantID = u64;
pub type ItemID = String;
