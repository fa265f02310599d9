//! The narrow seams between the simulation and everything it doesn't own:
//! model loading, the scene graph, audio and input capture. The session only
//! ever talks to these traits; `headless` has the implementations the client
//! binary ships with.

use glam::DVec3;
use rally_core::player_inputs::PlayerInputs;
use rally_core::sound_effect::SoundEffect;
use rally_core::transform::Transform;
use rally_core::vehicles::VehicleKind;
use rally_core::world::{CollectibleKind, HazardKind};
use rally_core::{ItemID, ParticipantID};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("could not import {path}: {source}")]
    Import {
        path: String,
        #[source]
        source: gltf::Error,
    },

    #[error("{0} contains no mesh geometry")]
    NoGeometry(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    pub name: String,
    pub bounds_min: DVec3,
    pub bounds_max: DVec3,
}

impl Model {
    // unit cube centred on the origin
    pub fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bounds_min: DVec3::splat(-0.5),
            bounds_max: DVec3::splat(0.5),
        }
    }

    pub fn extent(&self) -> DVec3 {
        self.bounds_max - self.bounds_min
    }
}

pub trait AssetLoader {
    fn load(&mut self, path: &str) -> Result<Model, AssetError>;
}

/// A missing or broken model is never fatal; we draw a box instead.
pub fn load_or_placeholder(loader: &mut dyn AssetLoader, path: &str) -> Model {
    match loader.load(path) {
        Ok(model) => model,
        Err(err) => {
            warn!(path, %err, "falling back to placeholder model");
            Model::placeholder(path)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneHandle(pub u64);

#[derive(Clone, Debug)]
pub enum SceneObject {
    Vehicle {
        // None for our own vehicle
        participant: Option<ParticipantID>,
        kind: VehicleKind,
        model: Model,
        transform: Transform,
    },
    Hazard {
        kind: HazardKind,
        position: DVec3,
    },
    Collectible {
        item_id: ItemID,
        kind: CollectibleKind,
        position: DVec3,
    },
}

pub trait SceneGraph {
    fn add(&mut self, object: SceneObject) -> SceneHandle;
    fn remove(&mut self, handle: SceneHandle);
    fn set_transform(&mut self, handle: SceneHandle, transform: Transform);
    fn contains(&self, handle: SceneHandle) -> bool;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait Audio {
    fn play(&mut self, effect: SoundEffect);
}

pub trait InputSource {
    // current key state, given where our vehicle is right now
    fn snapshot(&mut self, local: &Transform) -> PlayerInputs;
}

pub struct Collaborators {
    pub assets: Box<dyn AssetLoader>,
    pub scene: Box<dyn SceneGraph>,
    pub audio: Box<dyn Audio>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MissingFiles;

    impl AssetLoader for MissingFiles {
        fn load(&mut self, path: &str) -> Result<Model, AssetError> {
            Err(AssetError::NoGeometry(path.to_string()))
        }
    }

    #[test]
    fn failed_loads_fall_back_to_a_unit_box() {
        let model = load_or_placeholder(&mut MissingFiles, "models/truck.glb");
        assert_eq!(model.name, "models/truck.glb");
        assert_eq!(model.extent(), DVec3::ONE);
    }
}
