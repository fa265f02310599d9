use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    Roadster,
    Muscle,
    Buggy,
    Truck,
}

pub enum Stat {
    Speed,
    Handling,
    Acceleration,
    Shield,
}

// Multipliers are relative to the baseline car; collision radius is in world units
#[derive(Clone, Copy, Debug)]
pub struct VehicleStats {
    pub speed: f64,
    pub handling: f64,
    pub acceleration: f64,
    pub shield: f64,
    pub collision_radius: f64,
}

impl VehicleKind {
    pub const ALL: [VehicleKind; 4] = [
        VehicleKind::Roadster,
        VehicleKind::Muscle,
        VehicleKind::Buggy,
        VehicleKind::Truck,
    ];

    // We could load these from a file, but they never change at runtime and
    // every client has to agree on them anyway
    pub fn stats(&self) -> VehicleStats {
        match self {
            VehicleKind::Roadster => VehicleStats {
                speed: 1.0,
                handling: 1.0,
                acceleration: 1.0,
                shield: 1.0,
                collision_radius: 1.2,
            },
            VehicleKind::Muscle => VehicleStats {
                speed: 1.2,
                handling: 0.8,
                acceleration: 1.1,
                shield: 0.9,
                collision_radius: 1.4,
            },
            VehicleKind::Buggy => VehicleStats {
                speed: 0.9,
                handling: 1.3,
                acceleration: 1.2,
                shield: 0.8,
                collision_radius: 1.0,
            },
            VehicleKind::Truck => VehicleStats {
                speed: 0.8,
                handling: 0.7,
                acceleration: 0.8,
                shield: 1.5,
                collision_radius: 1.8,
            },
        }
    }

    pub fn stat(&self, stat: Stat) -> f64 {
        let stats = self.stats();
        match stat {
            Stat::Speed => stats.speed,
            Stat::Handling => stats.handling,
            Stat::Acceleration => stats.acceleration,
            Stat::Shield => stats.shield,
        }
    }

    pub fn model_path(&self) -> &'static str {
        match self {
            VehicleKind::Roadster => "models/roadster.glb",
            VehicleKind::Muscle => "models/muscle.glb",
            VehicleKind::Buggy => "models/buggy.glb",
            VehicleKind::Truck => "models/truck.glb",
        }
    }
}
