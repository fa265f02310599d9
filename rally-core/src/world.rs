use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::transform::Transform;
use crate::ItemID;

// longest a collectible may stay gone
pub const MAX_RESPAWN_SECS: f64 = 3600.0;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("could not read world file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse world file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid world: {0}")]
    Invalid(String),
}

// The static part of a session: loaded identically by the relay and by every
// client, so hazards never need to be synchronized over the network
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldDefinition {
    pub track: TrackDefinition,
    pub start: StartPose,
    #[serde(default)]
    pub hazards: Vec<HazardDefinition>,
    #[serde(default)]
    pub collectibles: Vec<CollectibleDefinition>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackDefinition {
    pub half_width: f64,
    pub control_points: Vec<DVec3>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StartPose {
    pub position: DVec3,
    #[serde(default)]
    pub heading: f64,
}

impl StartPose {
    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.heading)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardKind {
    // solid obstacle, bounces vehicles away
    Tree,
    Rock,
    // sends the vehicle back to the start
    Mine,
}

impl HazardKind {
    pub fn resets_vehicle(&self) -> bool {
        matches!(self, HazardKind::Mine)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HazardDefinition {
    pub kind: HazardKind,
    pub position: DVec3,
    pub radius: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectibleKind {
    Gold,
    Shield,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectibleDefinition {
    pub id: ItemID,
    pub kind: CollectibleKind,
    pub value: u32,
    pub position: DVec3,
    pub radius: f64,
    pub respawn_secs: f64,
}

impl CollectibleDefinition {
    // Clamped into [0, MAX_RESPAWN_SECS] even for definitions that were
    // never validated
    pub fn respawn_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.respawn_secs.min(MAX_RESPAWN_SECS))
            .unwrap_or(Duration::ZERO)
    }
}

impl WorldDefinition {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<WorldDefinition, WorldError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let world = WorldDefinition::from_yaml(&contents)?;
        info!(
            path = %path.display(),
            control_points = world.track.control_points.len(),
            hazards = world.hazards.len(),
            collectibles = world.collectibles.len(),
            "loaded world"
        );
        Ok(world)
    }

    pub fn from_yaml(contents: &str) -> Result<WorldDefinition, WorldError> {
        let world: WorldDefinition = serde_yaml::from_str(contents)?;
        world.validate()?;
        Ok(world)
    }

    fn validate(&self) -> Result<(), WorldError> {
        if self.track.control_points.len() < 3 {
            return Err(WorldError::Invalid(format!(
                "a closed track needs at least 3 control points, got {}",
                self.track.control_points.len()
            )));
        }
        let half_width = self.track.half_width;
        if !half_width.is_finite() || half_width <= 0.0 {
            return Err(WorldError::Invalid(format!(
                "track half width must be positive and finite, got {}",
                half_width
            )));
        }
        if let Some(point) = self.track.control_points.iter().find(|p| !p.is_finite()) {
            return Err(WorldError::Invalid(format!(
                "track control point {} is not finite",
                point
            )));
        }
        if !self.start.position.is_finite() || !self.start.heading.is_finite() {
            return Err(WorldError::Invalid("start pose is not finite".into()));
        }

        if let Some(hazard) = self
            .hazards
            .iter()
            .find(|h| !valid_radius(h.radius) || !h.position.is_finite())
        {
            return Err(WorldError::Invalid(format!(
                "hazard at {} needs a finite position and a non-negative radius",
                hazard.position
            )));
        }

        let mut seen = HashSet::new();
        for collectible in &self.collectibles {
            if !valid_radius(collectible.radius) || !collectible.position.is_finite() {
                return Err(WorldError::Invalid(format!(
                    "collectible {} needs a finite position and a non-negative radius",
                    collectible.id
                )));
            }
            let respawn = collectible.respawn_secs;
            if !respawn.is_finite() || !(0.0..=MAX_RESPAWN_SECS).contains(&respawn) {
                return Err(WorldError::Invalid(format!(
                    "collectible {} respawn_secs must be between 0 and {}, got {}",
                    collectible.id, MAX_RESPAWN_SECS, respawn
                )));
            }
            if !seen.insert(collectible.id.as_str()) {
                return Err(WorldError::Invalid(format!(
                    "collectible id {} is used more than once",
                    collectible.id
                )));
            }
        }

        Ok(())
    }

    pub fn collectible(&self, id: &str) -> Option<&CollectibleDefinition> {
        self.collectibles.iter().find(|c| c.id == id)
    }
}

fn valid_radius(radius: f64) -> bool {
    radius.is_finite() && radius >= 0.0
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SMALL_WORLD: &str = r#"
track:
  half_width: 6.0
  control_points:
    - [0.0, 0.0, 0.0]
    - [50.0, 2.0, 0.0]
    - [50.0, 0.0, 50.0]
    - [0.0, 0.0, 50.0]
start:
  position: [0.0, 0.0, 0.0]
  heading: 1.57
hazards:
  - kind: tree
    position: [20.0, 0.0, 20.0]
    radius: 1.0
  - kind: mine
    position: [30.0, 0.0, 5.0]
    radius: 0.5
collectibles:
  - id: gold-1
    kind: gold
    value: 50
    position: [10.0, 0.0, 0.0]
    radius: 1.0
    respawn_secs: 10
"#;

    #[test]
    fn parses_a_small_world() {
        let world = WorldDefinition::from_yaml(SMALL_WORLD).unwrap();
        assert_eq!(world.track.control_points.len(), 4);
        assert_eq!(world.track.control_points[1], DVec3::new(50.0, 2.0, 0.0));
        assert_eq!(world.hazards[1].kind, HazardKind::Mine);
        assert!(world.hazards[1].kind.resets_vehicle());
        assert_eq!(
            world.collectible("gold-1").unwrap().respawn_delay(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SMALL_WORLD.as_bytes()).unwrap();

        let world = WorldDefinition::load(file.path()).unwrap();
        assert_eq!(world.collectibles.len(), 1);
    }

    #[test]
    fn rejects_duplicate_collectible_ids() {
        let doubled = format!(
            "{}{}",
            SMALL_WORLD,
            r#"  - id: gold-1
    kind: shield
    value: 25
    position: [12.0, 0.0, 0.0]
    radius: 1.0
    respawn_secs: 5
"#
        );
        assert!(matches!(
            WorldDefinition::from_yaml(&doubled),
            Err(WorldError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_degenerate_tracks() {
        let world = r#"
track:
  half_width: 6.0
  control_points:
    - [0.0, 0.0, 0.0]
    - [1.0, 0.0, 0.0]
start:
  position: [0.0, 0.0, 0.0]
"#;
        assert!(matches!(
            WorldDefinition::from_yaml(world),
            Err(WorldError::Invalid(_))
        ));
    }

    fn with_respawn(respawn_secs: &str) -> String {
        SMALL_WORLD.replace("respawn_secs: 10", &format!("respawn_secs: {}", respawn_secs))
    }

    #[test]
    fn rejects_unusable_respawn_delays() {
        for bad in [".inf", ".nan", "-1.0", "100000.0"] {
            assert!(
                matches!(
                    WorldDefinition::from_yaml(&with_respawn(bad)),
                    Err(WorldError::Invalid(_))
                ),
                "respawn_secs {} was accepted",
                bad
            );
        }
        let world = WorldDefinition::from_yaml(&with_respawn("3600")).unwrap();
        assert_eq!(
            world.collectibles[0].respawn_delay(),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn respawn_delay_never_panics_on_unvalidated_values() {
        let mut world = WorldDefinition::from_yaml(SMALL_WORLD).unwrap();
        let gold = &mut world.collectibles[0];

        gold.respawn_secs = f64::INFINITY;
        assert_eq!(gold.respawn_delay(), Duration::from_secs(3600));
        gold.respawn_secs = f64::NAN;
        assert_eq!(gold.respawn_delay(), Duration::from_secs(3600));
        gold.respawn_secs = -5.0;
        assert_eq!(gold.respawn_delay(), Duration::ZERO);
    }

    #[test]
    fn rejects_non_finite_track_widths() {
        for bad in [".nan", ".inf", "0.0"] {
            let world = SMALL_WORLD.replace("half_width: 6.0", &format!("half_width: {}", bad));
            assert!(
                matches!(
                    WorldDefinition::from_yaml(&world),
                    Err(WorldError::Invalid(_))
                ),
                "half_width {} was accepted",
                bad
            );
        }
    }
}
