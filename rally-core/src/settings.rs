use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use lazy_static::lazy_static;
use serde::Deserialize;

use crate::vehicles::VehicleKind;

// Every field has a default, so a missing config.yaml is fine; anything set in
// the file or in a RALLY_* environment variable overrides it
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Settings {
    pub port: String,
    pub ws_port: String,
    pub server_address: String,
    pub server_tick_ms: u64,
    pub client_tick_ms: u64,
    pub movement_send_interval_ms: u64,

    pub player_name: String,
    pub vehicle_kind: VehicleKind,
    pub world_path: String,

    pub interpolation_factor: f64,

    // base values, scaled per vehicle kind
    pub max_car_speed: f64,
    pub car_accelerator: f64,
    pub car_brake: f64,
    pub rolling_resistance: f64,
    pub car_spin: f64,

    pub track_sample_count: usize,
    pub ground_elevation: f64,
    pub elevation_transition_distance: f64,
    pub elevation_smoothing: f64,
    pub track_margin: f64,
    pub seam_margin: f64,
    pub seam_sample_window: usize,

    pub off_track_grace_ms: u64,
    pub off_track_cooldown_ms: u64,

    pub vehicle_bounce_strength: f64,
    pub hazard_bounce_strength: f64,
    pub collision_recovery_ms: u64,
    pub elevation_gate: f64,
    pub max_shield: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: "24247".to_string(),
            ws_port: "24248".to_string(),
            server_address: "127.0.0.1".to_string(),
            server_tick_ms: 10,
            client_tick_ms: 16,
            movement_send_interval_ms: 100,

            player_name: String::new(),
            vehicle_kind: VehicleKind::Roadster,
            world_path: "world.yaml".to_string(),

            interpolation_factor: 0.1,

            max_car_speed: 30.0,
            car_accelerator: 12.0,
            car_brake: 25.0,
            rolling_resistance: 4.0,
            car_spin: 2.0,

            track_sample_count: 100,
            ground_elevation: 0.0,
            elevation_transition_distance: 15.0,
            elevation_smoothing: 0.1,
            track_margin: 2.0,
            seam_margin: 12.0,
            seam_sample_window: 5,

            off_track_grace_ms: 1000,
            off_track_cooldown_ms: 4000,

            vehicle_bounce_strength: 2.0,
            hazard_bounce_strength: 4.0,
            collision_recovery_ms: 500,
            elevation_gate: 3.0,
            max_shield: 100.0,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Settings, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config.yaml").required(false))
            .add_source(Environment::with_prefix("RALLY"))
            .build()?;

        config.try_deserialize()
    }

    pub fn server_tick(&self) -> Duration {
        Duration::from_millis(self.server_tick_ms)
    }

    pub fn client_tick(&self) -> Duration {
        Duration::from_millis(self.client_tick_ms)
    }

    pub fn movement_send_interval(&self) -> Duration {
        Duration::from_millis(self.movement_send_interval_ms)
    }

    pub fn off_track_grace(&self) -> Duration {
        Duration::from_millis(self.off_track_grace_ms)
    }

    pub fn off_track_cooldown(&self) -> Duration {
        Duration::from_millis(self.off_track_cooldown_ms)
    }

    pub fn collision_recovery(&self) -> Duration {
        Duration::from_millis(self.collision_recovery_ms)
    }
}

lazy_static! {
    pub static ref GLOBAL_CONFIG: Settings = Settings::load().expect("failed to read config file");
}
