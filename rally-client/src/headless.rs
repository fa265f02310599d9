//! Windowless stand-ins for the renderer, audio and keyboard, used by the
//! client binary. The scene and audio just log; models are still read from
//! disk so a broken asset shows up the same way it would with a renderer.

use std::collections::BTreeMap;

use glam::DVec3;
use rally_core::player_inputs::{EngineStatus, PlayerInputs, RotationStatus};
use rally_core::sound_effect::SoundEffect;
use rally_core::transform::{wrap_angle_delta, Transform};
use rand::Rng;
use tracing::{debug, info, trace};

use crate::collaborators::{
    AssetError, AssetLoader, Audio, InputSource, Model, SceneGraph, SceneHandle, SceneObject,
};
use crate::track::TrackCurve;

pub struct GltfAssetLoader;

impl AssetLoader for GltfAssetLoader {
    fn load(&mut self, path: &str) -> Result<Model, AssetError> {
        let (document, _buffers, _images) =
            gltf::import(path).map_err(|source| AssetError::Import {
                path: path.to_string(),
                source,
            })?;

        // union of every primitive's accessor bounds
        let mut bounds: Option<(DVec3, DVec3)> = None;
        for mesh in document.meshes() {
            for primitive in mesh.primitives() {
                let bb = primitive.bounding_box();
                let min = DVec3::new(bb.min[0] as f64, bb.min[1] as f64, bb.min[2] as f64);
                let max = DVec3::new(bb.max[0] as f64, bb.max[1] as f64, bb.max[2] as f64);
                bounds = Some(match bounds {
                    Some((lo, hi)) => (lo.min(min), hi.max(max)),
                    None => (min, max),
                });
            }
        }

        let (bounds_min, bounds_max) =
            bounds.ok_or_else(|| AssetError::NoGeometry(path.to_string()))?;
        debug!(path, ?bounds_min, ?bounds_max, "loaded model");
        Ok(Model {
            name: path.to_string(),
            bounds_min,
            bounds_max,
        })
    }
}

#[derive(Default)]
pub struct HeadlessScene {
    next_handle: u64,
    objects: BTreeMap<SceneHandle, SceneObject>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: SceneHandle) -> Option<&SceneObject> {
        self.objects.get(&handle)
    }
}

impl SceneGraph for HeadlessScene {
    fn add(&mut self, object: SceneObject) -> SceneHandle {
        let handle = SceneHandle(self.next_handle);
        self.next_handle += 1;
        debug!(?handle, ?object, "scene add");
        self.objects.insert(handle, object);
        handle
    }

    fn remove(&mut self, handle: SceneHandle) {
        if self.objects.remove(&handle).is_some() {
            debug!(?handle, "scene remove");
        }
    }

    fn set_transform(&mut self, handle: SceneHandle, transform: Transform) {
        match self.objects.get_mut(&handle) {
            Some(SceneObject::Vehicle { transform: t, .. }) => *t = transform,
            Some(SceneObject::Hazard { position, .. })
            | Some(SceneObject::Collectible { position, .. }) => *position = transform.position,
            None => trace!(?handle, "transform for missing scene object"),
        }
    }

    fn contains(&self, handle: SceneHandle) -> bool {
        self.objects.contains_key(&handle)
    }

    fn len(&self) -> usize {
        self.objects.len()
    }
}

pub struct HeadlessAudio;

impl Audio for HeadlessAudio {
    fn play(&mut self, effect: SoundEffect) {
        info!(?effect, "sound");
    }
}

/// Drives around the track by aiming at a sample a little way ahead of the
/// nearest one.
pub struct Autopilot {
    waypoints: Vec<DVec3>,
    lookahead: usize,
    horn_chance: f64,
}

impl Autopilot {
    pub fn new(track: &TrackCurve, lookahead: usize) -> Self {
        Self::from_waypoints(
            track.samples().iter().map(|sample| sample.position).collect(),
            lookahead,
        )
    }

    pub fn from_waypoints(waypoints: Vec<DVec3>, lookahead: usize) -> Self {
        Self {
            waypoints,
            lookahead,
            horn_chance: 0.002,
        }
    }

    pub fn without_horn(mut self) -> Self {
        self.horn_chance = 0.0;
        self
    }

    fn target(&self, position: DVec3) -> Option<DVec3> {
        let nearest = self
            .waypoints
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = a.distance_squared(position);
                let db = b.distance_squared(position);
                da.total_cmp(&db)
            })
            .map(|(index, _)| index)?;
        self.waypoints
            .get((nearest + self.lookahead) % self.waypoints.len())
            .copied()
    }
}

impl InputSource for Autopilot {
    fn snapshot(&mut self, local: &Transform) -> PlayerInputs {
        let target = match self.target(local.position) {
            Some(target) => target,
            None => return PlayerInputs::idle(),
        };

        let to_target = target - local.position;
        let desired = to_target.x.atan2(to_target.z);
        let delta = wrap_angle_delta(desired - local.heading);

        let rotation_status = if delta > 0.05 {
            RotationStatus::InSpinClockwise(1.0)
        } else if delta < -0.05 {
            RotationStatus::InSpinCounterclockwise(1.0)
        } else {
            RotationStatus::NotInSpin
        };
        // ease off in tight turns
        let throttle = if delta.abs() > 0.5 { 0.5 } else { 1.0 };

        PlayerInputs {
            engine_status: EngineStatus::Accelerating(throttle),
            rotation_status,
            horn: self.horn_chance > 0.0 && rand::thread_rng().gen_bool(self.horn_chance),
            toggle_headlights: false,
        }
    }
}
