use std::time::Duration;

use rally_core::participant::ParticipantInfo;
use rally_core::vehicles::VehicleKind;
use rally_core::world::WorldDefinition;

use super::*;

const WORLD: &str = r#"
track:
  half_width: 6.0
  control_points:
    - [0.0, 0.0, 0.0]
    - [100.0, 0.0, 0.0]
    - [100.0, 0.0, 100.0]
start:
  position: [-50.0, 0.0, -50.0]
hazards:
  - kind: tree
    position: [0.0, 0.0, 0.0]
    radius: 1.0
  - kind: mine
    position: [40.0, 0.0, 0.0]
    radius: 1.0
collectibles:
  - id: gold-1
    kind: gold
    value: 50
    position: [80.0, 0.0, 0.0]
    radius: 1.0
    respawn_secs: 10.0
  - id: shield-1
    kind: shield
    value: 60
    position: [80.0, 0.0, 40.0]
    radius: 1.0
    respawn_secs: 10.0
"#;

fn tuning() -> CollisionTuning {
    CollisionTuning {
        vehicle_bounce: 2.0,
        hazard_bounce: 4.0,
        elevation_gate: 3.0,
        recovery: Duration::from_millis(500),
        max_shield: 100.0,
    }
}

fn world() -> (WorldState, Transform) {
    let definition = WorldDefinition::from_yaml(WORLD).unwrap();
    (WorldState::new(&definition), definition.start.transform())
}

// Roadsters have a 1.2 collision radius
fn roadster_at(x: f64, z: f64) -> LocalActor {
    LocalActor::new(
        VehicleKind::Roadster,
        Transform::new(DVec3::new(x, 0.0, z), 0.0),
    )
}

fn remote(id: ParticipantID, kind: VehicleKind, position: DVec3) -> RemoteActor {
    RemoteActor::new(&ParticipantInfo {
        id,
        name: format!("racer-{}", id),
        vehicle_kind: kind,
        transform: Transform::new(position, 0.0),
        headlights_on: false,
        score: 0,
        joined_at: Duration::ZERO,
    })
}

#[test]
fn overlap_needs_strictly_less_than_the_radius_sum() {
    let a = DVec3::ZERO;
    assert!(overlaps(a, 1.2, DVec3::new(2.0, 0.0, 0.0), 1.0, 3.0));
    assert!(!overlaps(a, 1.0, DVec3::new(2.0, 0.0, 0.0), 1.0, 3.0));
    assert!(!overlaps(a, 1.2, DVec3::new(2.5, 0.0, 0.0), 1.0, 3.0));
}

#[test]
fn overlap_ignores_things_far_above_or_below() {
    let a = DVec3::ZERO;
    assert!(overlaps(a, 1.2, DVec3::new(1.0, 2.5, 0.0), 1.0, 3.0));
    assert!(!overlaps(a, 1.2, DVec3::new(1.0, 4.0, 0.0), 1.0, 3.0));
}

#[test]
fn tree_bounces_vehicle_away_from_its_centre() {
    let now = Instant::now();
    let (mut world, start) = world();
    let system = CollisionSystem::new(tuning());

    // 2.0 from a radius 1.0 tree: inside the 2.2 sum
    let mut local = roadster_at(2.0, 0.0);
    let effects = system.step(&mut local, &mut BTreeMap::new(), &mut world, start, now);

    let expected_push = DVec3::new(4.0, 0.0, 0.0);
    assert_eq!(
        effects,
        vec![CollisionEffect::HazardBounce {
            kind: HazardKind::Tree,
            push: expected_push,
        }]
    );
    assert!(local
        .transform
        .position
        .abs_diff_eq(DVec3::new(6.0, 0.0, 0.0), 1e-12));
    assert!(local.input_locked(now));
}

#[test]
fn push_direction_follows_the_separation() {
    let push = push_away(DVec3::ZERO, DVec3::new(3.0, 7.0, 4.0), 2.0);
    assert!(push.abs_diff_eq(DVec3::new(1.2, 0.0, 1.6), 1e-12));

    let coincident = push_away(DVec3::ONE, DVec3::ONE, 2.0);
    assert_eq!(coincident, DVec3::new(2.0, 0.0, 0.0));
}

#[test]
fn mine_sends_vehicle_back_to_start() {
    let now = Instant::now();
    let (mut world, start) = world();
    let system = CollisionSystem::new(tuning());

    let mut local = roadster_at(40.5, 0.0);
    local.speed = 20.0;
    let effects = system.step(&mut local, &mut BTreeMap::new(), &mut world, start, now);

    assert_eq!(
        effects,
        vec![CollisionEffect::HazardReset {
            kind: HazardKind::Mine
        }]
    );
    assert_eq!(local.transform, start);
    assert_eq!(local.speed, 0.0);
    assert!(local.input_locked(now + Duration::from_millis(499)));
    assert!(!local.input_locked(now + Duration::from_millis(500)));
}

#[test]
fn vehicles_push_apart_and_report_the_target() {
    let now = Instant::now();
    let (mut world, start) = world();
    let system = CollisionSystem::new(tuning());

    let mut remotes = BTreeMap::new();
    remotes.insert(7, remote(7, VehicleKind::Buggy, DVec3::new(20.0, 0.0, 20.0)));

    let mut local = roadster_at(20.0, 21.0);
    let effects = system.step(&mut local, &mut remotes, &mut world, start, now);

    assert_eq!(
        effects,
        vec![CollisionEffect::VehicleBounce {
            target_id: 7,
            push: DVec3::new(0.0, 0.0, 2.0),
            position: DVec3::new(20.0, 0.0, 21.0),
        }]
    );
    assert!(local
        .transform
        .position
        .abs_diff_eq(DVec3::new(20.0, 0.0, 23.0), 1e-12));

    // the buggy goes the other way, and stays there while it interpolates
    let buggy = &remotes[&7];
    assert!(buggy.position.abs_diff_eq(DVec3::new(20.0, 0.0, 18.0), 1e-12));
    assert!(buggy
        .target_position
        .abs_diff_eq(DVec3::new(20.0, 0.0, 18.0), 1e-12));
}

#[test]
fn vehicle_hits_during_recovery_are_ignored() {
    let now = Instant::now();
    let (mut world, start) = world();
    let system = CollisionSystem::new(tuning());

    let mut remotes = BTreeMap::new();
    remotes.insert(7, remote(7, VehicleKind::Truck, DVec3::new(20.0, 0.0, 20.0)));

    let mut local = roadster_at(20.0, 21.0);
    assert_eq!(
        system
            .step(&mut local, &mut remotes, &mut world, start, now)
            .len(),
        1
    );

    // shove it back into the truck (now at z = 18) before the window has passed
    local.transform.position = DVec3::new(20.0, 0.0, 19.0);
    let later = now + Duration::from_millis(100);
    assert!(system
        .step(&mut local, &mut remotes, &mut world, start, later)
        .is_empty());

    let after_recovery = now + Duration::from_millis(600);
    assert_eq!(
        system
            .step(&mut local, &mut remotes, &mut world, start, after_recovery)
            .len(),
        1
    );
}

#[test]
fn only_the_first_vehicle_in_range_is_handled() {
    let now = Instant::now();
    let (mut world, start) = world();
    let system = CollisionSystem::new(tuning());

    let mut remotes = BTreeMap::new();
    remotes.insert(3, remote(3, VehicleKind::Buggy, DVec3::new(20.0, 0.0, 20.0)));
    remotes.insert(4, remote(4, VehicleKind::Buggy, DVec3::new(20.0, 0.0, 22.0)));

    let mut local = roadster_at(20.0, 21.0);
    let effects = system.step(&mut local, &mut remotes, &mut world, start, now);
    assert_eq!(effects.len(), 1);
    assert!(matches!(
        effects[0],
        CollisionEffect::VehicleBounce { target_id: 3, .. }
    ));
}

#[test]
fn gold_scores_once_and_schedules_one_respawn() {
    let now = Instant::now();
    let (mut world, start) = world();
    let system = CollisionSystem::new(tuning());

    let mut local = roadster_at(80.0, 0.5);
    let effects = system.step(&mut local, &mut BTreeMap::new(), &mut world, start, now);
    assert_eq!(
        effects,
        vec![CollisionEffect::Collected {
            item_id: "gold-1".to_string(),
            kind: CollectibleKind::Gold,
            position: DVec3::new(80.0, 0.0, 0.0),
            value: 50,
        }]
    );
    assert_eq!(local.score, 50);

    // still sitting on it next tick
    let effects = system.step(&mut local, &mut BTreeMap::new(), &mut world, start, now);
    assert!(effects.is_empty());
    assert_eq!(local.score, 50);
    assert_eq!(world.pending_respawns(), 1);
}

#[test]
fn shield_pickups_are_capped() {
    let now = Instant::now();
    let (mut world, start) = world();
    let system = CollisionSystem::new(tuning());

    let mut local = roadster_at(80.0, 40.0);
    local.shield = 70.0;
    system.step(&mut local, &mut BTreeMap::new(), &mut world, start, now);
    assert_eq!(local.shield, 100.0);
    assert_eq!(local.score, 0);
}

#[test]
fn shield_pickups_scale_with_the_vehicle() {
    let now = Instant::now();
    let (mut world, start) = world();
    let system = CollisionSystem::new(tuning());

    // trucks carry a 1.5 shield multiplier
    let mut local = LocalActor::new(
        VehicleKind::Truck,
        Transform::new(DVec3::new(80.0, 0.0, 40.0), 0.0),
    );
    let effects = system.step(&mut local, &mut BTreeMap::new(), &mut world, start, now);
    assert_eq!(effects.len(), 1);
    assert_eq!(local.shield, 90.0);
}

#[test]
fn collectibles_taken_elsewhere_are_not_collided() {
    let now = Instant::now();
    let (mut world, start) = world();
    let system = CollisionSystem::new(tuning());
    world.mark_collected("gold-1", Some(9), now);

    let mut local = roadster_at(80.0, 0.0);
    assert!(system
        .step(&mut local, &mut BTreeMap::new(), &mut world, start, now)
        .is_empty());
    assert_eq!(local.score, 0);
}

#[test]
fn categories_resolve_in_order() {
    let now = Instant::now();
    let definition = WorldDefinition::from_yaml(
        r#"
track:
  half_width: 6.0
  control_points:
    - [0.0, 0.0, 0.0]
    - [100.0, 0.0, 0.0]
    - [100.0, 0.0, 100.0]
start:
  position: [0.0, 0.0, 0.0]
hazards:
  - kind: rock
    position: [-1.5, 0.0, 0.0]
    radius: 1.0
collectibles:
  - id: gold-1
    kind: gold
    value: 5
    position: [4.5, 0.0, 0.0]
    radius: 1.0
    respawn_secs: 10.0
"#,
    )
    .unwrap();
    let mut world = WorldState::new(&definition);
    let system = CollisionSystem::new(tuning());

    // the rock throws us onto the coin, which is picked up the same tick
    let mut local = roadster_at(0.0, 0.0);
    let effects = system.step(
        &mut local,
        &mut BTreeMap::new(),
        &mut world,
        definition.start.transform(),
        now,
    );
    assert_eq!(effects.len(), 2);
    assert!(matches!(effects[0], CollisionEffect::HazardBounce { .. }));
    assert!(matches!(effects[1], CollisionEffect::Collected { .. }));
}

#[test]
fn being_hit_pushes_us_away_from_the_hitter() {
    let now = Instant::now();
    let system = CollisionSystem::new(tuning());
    let mut local = roadster_at(0.0, 0.0);

    let push = system.receive_hit(&mut local, DVec3::new(-1.0, 0.0, 0.0), now);
    assert_eq!(push, Some(DVec3::new(2.0, 0.0, 0.0)));
    assert!(local.input_locked(now));

    // a second report inside the recovery window does nothing
    assert_eq!(
        system.receive_hit(&mut local, DVec3::new(-1.0, 0.0, 0.0), now),
        None
    );
    assert_eq!(local.transform.position, DVec3::new(2.0, 0.0, 0.0));
}
