use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum SoundEffect {
    Horn,

    PlayerCollision,
    TerrainCollision,
    MineExplosion,

    CoinPickup,
    ShieldPickup,

    TrackReset,
}
