use std::f64::consts::{PI, TAU};

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

// Transform gets sent between clients (through the relay) to tell everyone
// else where to render a participant's vehicle
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: DVec3,
    pub heading: f64, // radians about +Y, 0 faces +Z
}

impl Transform {
    pub fn new(position: DVec3, heading: f64) -> Self {
        Self { position, heading }
    }

    // unit vector in the XZ-plane the vehicle is pointing along
    pub fn forward(&self) -> DVec3 {
        DVec3::new(self.heading.sin(), 0.0, self.heading.cos())
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            heading: 0.0,
        }
    }
}

// Drops elevation: (x, y, z) -> (x, z)
pub fn planar(v: DVec3) -> DVec2 {
    DVec2::new(v.x, v.z)
}

// Shortest signed angular difference. Only a single 2pi correction is applied,
// which is enough as long as both inputs are within one turn of each other.
pub fn wrap_angle_delta(delta: f64) -> f64 {
    if delta > PI {
        delta - TAU
    } else if delta < -PI {
        delta + TAU
    } else {
        delta
    }
}

// Into [-pi, pi), so any two headings we send are within one turn of each other
pub fn normalize_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}
