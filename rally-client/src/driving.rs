use std::time::{Duration, Instant};

use glam::DVec3;
use rally_core::player_inputs::{EngineStatus, PlayerInputs, RotationStatus};
use rally_core::transform::{normalize_angle, Transform};
use rally_core::vehicles::{Stat, VehicleKind};
use rally_core::Settings;

#[derive(Clone, Copy, Debug)]
pub struct DrivingTuning {
    pub max_speed: f64,
    pub accelerator: f64,
    pub brake: f64,
    pub rolling_resistance: f64,
    pub spin: f64,
}

impl From<&Settings> for DrivingTuning {
    fn from(settings: &Settings) -> Self {
        Self {
            max_speed: settings.max_car_speed,
            accelerator: settings.car_accelerator,
            brake: settings.car_brake,
            rolling_resistance: settings.rolling_resistance,
            spin: settings.car_spin,
        }
    }
}

/// The vehicle this participant drives. Position is integrated here; the
/// y component is owned by the ride-height smoothing, not by the engine.
#[derive(Clone, Debug)]
pub struct LocalActor {
    pub transform: Transform,
    // signed, along the forward vector
    pub speed: f64,
    pub vehicle_kind: VehicleKind,
    pub headlights_on: bool,
    pub score: u32,
    pub shield: f64,
    input_locked_until: Option<Instant>,
}

impl LocalActor {
    pub fn new(vehicle_kind: VehicleKind, transform: Transform) -> Self {
        Self {
            transform,
            speed: 0.0,
            vehicle_kind,
            headlights_on: false,
            score: 0,
            shield: 0.0,
            input_locked_until: None,
        }
    }

    pub fn collision_radius(&self) -> f64 {
        self.vehicle_kind.stats().collision_radius
    }

    pub fn input_locked(&self, now: Instant) -> bool {
        matches!(self.input_locked_until, Some(until) if now < until)
    }

    pub fn lock_input(&mut self, now: Instant, window: Duration) {
        self.input_locked_until = Some(now + window);
    }

    pub fn integrate(
        &mut self,
        inputs: &PlayerInputs,
        dt: f64,
        now: Instant,
        tuning: &DrivingTuning,
    ) {
        // a locked vehicle just coasts
        let inputs = if self.input_locked(now) {
            PlayerInputs::idle()
        } else {
            *inputs
        };

        let top_speed = tuning.max_speed * self.vehicle_kind.stat(Stat::Speed);
        let reverse_speed = top_speed * 0.25;

        self.speed = match inputs.engine_status {
            EngineStatus::Accelerating(modifier) => {
                let acceleration = tuning.accelerator * self.vehicle_kind.stat(Stat::Acceleration);
                self.speed + acceleration * modifier * dt
            }
            EngineStatus::Braking => self.speed - tuning.brake * dt,
            EngineStatus::Neutral => approach_zero(self.speed, tuning.rolling_resistance * dt),
        }
        .clamp(-reverse_speed, top_speed);

        let spin = tuning.spin * self.vehicle_kind.stat(Stat::Handling) * dt;
        let heading = match inputs.rotation_status {
            RotationStatus::InSpinClockwise(modifier) => self.transform.heading + spin * modifier,
            RotationStatus::InSpinCounterclockwise(modifier) => {
                self.transform.heading - spin * modifier
            }
            RotationStatus::NotInSpin => self.transform.heading,
        };
        self.transform.heading = normalize_angle(heading);

        self.transform.position += self.transform.forward() * self.speed * dt;
    }

    // Collision displacement; stays in the ground plane and kills our speed
    // so we don't drive straight back in
    pub fn push(&mut self, offset: DVec3) {
        self.transform.position += DVec3::new(offset.x, 0.0, offset.z);
        self.speed = 0.0;
    }

    pub fn reset_to(&mut self, start: Transform) {
        self.transform = start;
        self.speed = 0.0;
    }

    pub fn set_elevation(&mut self, elevation: f64) {
        self.transform.position.y = elevation;
    }
}

fn approach_zero(value: f64, step: f64) -> f64 {
    if value > 0.0 {
        (value - step).max(0.0)
    } else {
        (value + step).min(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> DrivingTuning {
        DrivingTuning::from(&Settings::default())
    }

    fn accelerating() -> PlayerInputs {
        PlayerInputs {
            engine_status: EngineStatus::Accelerating(1.0),
            ..PlayerInputs::idle()
        }
    }

    #[test]
    fn accelerating_moves_along_heading() {
        let now = Instant::now();
        let mut actor = LocalActor::new(VehicleKind::Roadster, Transform::default());
        for _ in 0..10 {
            actor.integrate(&accelerating(), 0.1, now, &tuning());
        }
        assert!(actor.speed > 0.0);
        assert!(actor.transform.position.z > 0.0);
        assert_eq!(actor.transform.position.x, 0.0);
    }

    #[test]
    fn speed_is_capped_by_vehicle_kind() {
        let now = Instant::now();
        let tuning = tuning();
        let mut truck = LocalActor::new(VehicleKind::Truck, Transform::default());
        for _ in 0..1000 {
            truck.integrate(&accelerating(), 0.1, now, &tuning);
        }
        assert!((truck.speed - tuning.max_speed * 0.8).abs() < 1e-9);
    }

    #[test]
    fn coasting_rolls_to_a_stop() {
        let now = Instant::now();
        let mut actor = LocalActor::new(VehicleKind::Buggy, Transform::default());
        actor.speed = 3.0;
        for _ in 0..100 {
            actor.integrate(&PlayerInputs::idle(), 0.1, now, &tuning());
        }
        assert_eq!(actor.speed, 0.0);
    }

    #[test]
    fn locked_input_is_ignored() {
        let now = Instant::now();
        let mut actor = LocalActor::new(VehicleKind::Roadster, Transform::default());
        actor.lock_input(now, Duration::from_millis(500));

        let steering = PlayerInputs {
            rotation_status: RotationStatus::InSpinClockwise(1.0),
            ..accelerating()
        };
        actor.integrate(&steering, 0.1, now, &tuning());
        assert_eq!(actor.speed, 0.0);
        assert_eq!(actor.transform.heading, 0.0);

        let later = now + Duration::from_millis(500);
        assert!(!actor.input_locked(later));
        actor.integrate(&steering, 0.1, later, &tuning());
        assert!(actor.speed > 0.0);
        assert!(actor.transform.heading > 0.0);
    }

    #[test]
    fn push_stays_on_the_ground_plane() {
        let mut actor = LocalActor::new(VehicleKind::Roadster, Transform::default());
        actor.set_elevation(2.0);
        actor.speed = 10.0;
        actor.push(DVec3::new(1.0, 5.0, -1.0));
        assert_eq!(actor.transform.position, DVec3::new(1.0, 2.0, -1.0));
        assert_eq!(actor.speed, 0.0);
    }
}
