use glam::DVec3;
use rally_core::participant::ParticipantInfo;
use rally_core::transform::{wrap_angle_delta, Transform};
use rally_core::vehicles::VehicleKind;
use rally_core::ParticipantID;

// Someone else's vehicle as we draw it. Movement packets only move the
// target; the rendered transform chases it a fixed fraction per tick.
#[derive(Clone, Debug)]
pub struct RemoteActor {
    pub id: ParticipantID,
    pub name: String,
    pub vehicle_kind: VehicleKind,
    pub headlights_on: bool,

    pub position: DVec3,
    pub heading: f64,
    pub target_position: DVec3,
    pub target_heading: f64,
}

impl RemoteActor {
    pub fn new(info: &ParticipantInfo) -> Self {
        // spawn where we were told rather than sliding in from the origin
        Self {
            id: info.id,
            name: info.name.clone(),
            vehicle_kind: info.vehicle_kind,
            headlights_on: info.headlights_on,
            position: info.transform.position,
            heading: info.transform.heading,
            target_position: info.transform.position,
            target_heading: info.transform.heading,
        }
    }

    pub fn set_target(&mut self, transform: Transform) {
        self.target_position = transform.position;
        self.target_heading = transform.heading;
    }

    pub fn interpolate(&mut self, alpha: f64) {
        self.position = self.position.lerp(self.target_position, alpha);

        let delta = wrap_angle_delta(self.target_heading - self.heading);
        self.heading += delta * alpha;
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.heading)
    }

    pub fn collision_radius(&self) -> f64 {
        self.vehicle_kind.stats().collision_radius
    }
}
