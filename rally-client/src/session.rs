use std::collections::{BTreeMap, HashMap};
use std::mem;
use std::time::Instant;

use rally_core::networking::{ClientBoundPacket, ServerBoundPacket};
use rally_core::participant::ParticipantInfo;
use rally_core::player_inputs::PlayerInputs;
use rally_core::sound_effect::SoundEffect;
use rally_core::transform::Transform;
use rally_core::vehicles::VehicleKind;
use rally_core::world::{CollectibleKind, WorldDefinition};
use rally_core::{ItemID, ParticipantID, Settings};
use tracing::{debug, info, trace};

use crate::collaborators::{
    load_or_placeholder, Collaborators, Model, SceneGraph, SceneHandle, SceneObject,
};
use crate::collisions::{CollisionEffect, CollisionSystem, CollisionTuning};
use crate::driving::{DrivingTuning, LocalActor};
use crate::hook::{HookManager, SessionEvent};
use crate::interpolation::RemoteActor;
use crate::offtrack::OffTrackMonitor;
use crate::track::TrackCurve;
use crate::world_state::WorldState;

/// Everything one participant simulates. Built once per connection from the
/// world, the settings and the collaborators, and driven by the client loop:
/// packets in through [`ClientSession::apply_packet`], time through
/// [`ClientSession::tick`], packets out through
/// [`ClientSession::take_outgoing`].
pub struct ClientSession {
    settings: Settings,
    start: Transform,
    track: TrackCurve,
    world: WorldState,

    my_id: Option<ParticipantID>,
    local: LocalActor,
    local_visual: Option<SceneHandle>,
    remotes: BTreeMap<ParticipantID, RemoteActor>,
    remote_visuals: BTreeMap<ParticipantID, SceneHandle>,

    driving: DrivingTuning,
    collisions: CollisionSystem,
    off_track: OffTrackMonitor,

    collaborators: Collaborators,
    models: HashMap<VehicleKind, Model>,
    hooks: HookManager<SessionEvent>,

    outgoing: Vec<ServerBoundPacket>,
    last_movement_sent: Option<Instant>,
}

impl ClientSession {
    pub fn new(
        world: &WorldDefinition,
        settings: &Settings,
        collaborators: Collaborators,
    ) -> ClientSession {
        let start = world.start.transform();
        let mut session = ClientSession {
            settings: settings.clone(),
            start,
            track: TrackCurve::build(&world.track, settings),
            world: WorldState::new(world),

            my_id: None,
            local: LocalActor::new(settings.vehicle_kind, start),
            local_visual: None,
            remotes: BTreeMap::new(),
            remote_visuals: BTreeMap::new(),

            driving: DrivingTuning::from(settings),
            collisions: CollisionSystem::new(CollisionTuning::from(settings)),
            off_track: OffTrackMonitor::from_settings(settings),

            collaborators,
            models: HashMap::new(),
            hooks: HookManager::new(),

            outgoing: Vec::new(),
            last_movement_sent: None,
        };

        session.populate_scene();
        session
    }

    fn populate_scene(&mut self) {
        let scene = &mut self.collaborators.scene;
        for hazard in self.world.hazards_mut() {
            hazard.visual = Some(scene.add(SceneObject::Hazard {
                kind: hazard.kind,
                position: hazard.position,
            }));
        }
        for collectible in self.world.collectibles_mut() {
            collectible.visual = Some(scene.add(SceneObject::Collectible {
                item_id: collectible.id.clone(),
                kind: collectible.kind,
                position: collectible.position,
            }));
        }

        let model = self.model_for(self.local.vehicle_kind);
        self.local_visual = Some(self.collaborators.scene.add(SceneObject::Vehicle {
            participant: None,
            kind: self.local.vehicle_kind,
            model,
            transform: self.local.transform,
        }));
    }

    pub fn my_id(&self) -> Option<ParticipantID> {
        self.my_id
    }

    pub fn local(&self) -> &LocalActor {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut LocalActor {
        &mut self.local
    }

    pub fn remotes(&self) -> &BTreeMap<ParticipantID, RemoteActor> {
        &self.remotes
    }

    pub fn remote(&self, id: ParticipantID) -> Option<&RemoteActor> {
        self.remotes.get(&id)
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn track(&self) -> &TrackCurve {
        &self.track
    }

    pub fn scene(&self) -> &dyn SceneGraph {
        self.collaborators.scene.as_ref()
    }

    pub fn hooks_mut(&mut self) -> &mut HookManager<SessionEvent> {
        &mut self.hooks
    }

    /// How far round the lap the local vehicle is, from 0 at the first
    /// control point up to (but not including) 1.
    pub fn lap_progress(&self) -> f64 {
        let query = self.track.nearest_sample(self.local.transform.position);
        self.track.progress(&query)
    }

    // Takes everything we put in the scene back out and cancels pending
    // respawns. The session is left empty.
    pub fn shutdown(&mut self) {
        let ids: Vec<ParticipantID> = self.remotes.keys().copied().collect();
        for id in ids {
            self.despawn_remote(id);
        }

        let item_ids: Vec<ItemID> = self.world.collectibles().map(|c| c.id.clone()).collect();
        for item_id in item_ids {
            if let Some(handle) = self
                .world
                .remove_collectible(&item_id)
                .and_then(|item| item.visual)
            {
                self.collaborators.scene.remove(handle);
            }
        }

        let scene = &mut self.collaborators.scene;
        for hazard in self.world.hazards_mut() {
            if let Some(handle) = hazard.visual.take() {
                scene.remove(handle);
            }
        }
        if let Some(handle) = self.local_visual.take() {
            scene.remove(handle);
        }
        info!("session shut down");
    }

    pub fn take_outgoing(&mut self) -> Vec<ServerBoundPacket> {
        mem::take(&mut self.outgoing)
    }

    pub fn join(&mut self, name: &str) {
        self.outgoing.push(ServerBoundPacket::Join {
            name: name.to_string(),
            vehicle_kind: self.local.vehicle_kind,
            transform: self.local.transform,
        });
    }

    pub fn set_vehicle_kind(&mut self, vehicle_kind: VehicleKind) {
        if self.local.vehicle_kind == vehicle_kind {
            return;
        }
        self.local.vehicle_kind = vehicle_kind;

        if let Some(handle) = self.local_visual.take() {
            self.collaborators.scene.remove(handle);
        }
        let model = self.model_for(vehicle_kind);
        self.local_visual = Some(self.collaborators.scene.add(SceneObject::Vehicle {
            participant: None,
            kind: vehicle_kind,
            model,
            transform: self.local.transform,
        }));
        self.outgoing
            .push(ServerBoundPacket::VehicleChanged(vehicle_kind));
    }

    pub fn apply_packet(&mut self, packet: ClientBoundPacket, now: Instant) {
        trace!(?packet, "applying packet");
        match packet {
            ClientBoundPacket::Snapshot {
                your_id,
                participants,
                collected,
            } => {
                info!(your_id, others = participants.len(), "joined session");
                self.my_id = Some(your_id);

                let stale: Vec<ParticipantID> = self.remotes.keys().copied().collect();
                for id in stale {
                    self.despawn_remote(id);
                }
                for info in participants {
                    self.spawn_remote(info);
                }
                for item_id in collected {
                    if self.world.mark_collected(&item_id, None, now) {
                        self.hide_collectible(&item_id);
                    }
                }
                self.emit(SessionEvent::Joined { your_id });
            }

            ClientBoundPacket::ParticipantJoined(info) => {
                let id = info.id;
                self.spawn_remote(info);
                self.emit(SessionEvent::ParticipantJoined(id));
            }

            ClientBoundPacket::ParticipantLeft(id) => {
                if self.despawn_remote(id) {
                    self.emit(SessionEvent::ParticipantLeft(id));
                }
            }

            ClientBoundPacket::Movement { id, transform } => match self.remotes.get_mut(&id) {
                Some(remote) => remote.set_target(transform),
                None => trace!(id, "movement for unknown participant"),
            },

            ClientBoundPacket::VehicleChanged { id, vehicle_kind } => {
                if let Some(remote) = self.remotes.get_mut(&id) {
                    remote.vehicle_kind = vehicle_kind;
                    let transform = remote.transform();
                    self.replace_remote_visual(id, vehicle_kind, transform);
                }
            }

            ClientBoundPacket::HeadlightsToggled { id, on } => {
                if let Some(remote) = self.remotes.get_mut(&id) {
                    remote.headlights_on = on;
                }
            }

            ClientBoundPacket::HornSound { id } => {
                if self.remotes.contains_key(&id) {
                    self.play(SoundEffect::Horn);
                }
            }

            ClientBoundPacket::Collision {
                from,
                target_id,
                position,
            } => {
                if Some(target_id) != self.my_id {
                    return;
                }
                if self
                    .collisions
                    .receive_hit(&mut self.local, position, now)
                    .is_some()
                {
                    debug!(from, "hit by another vehicle");
                    self.play(SoundEffect::PlayerCollision);
                    self.emit(SessionEvent::VehicleHit { other: from });
                }
            }

            ClientBoundPacket::CollectibleCollected {
                id, item_id, kind, ..
            } => {
                if self.world.mark_collected(&item_id, Some(id), now) {
                    self.hide_collectible(&item_id);
                    self.emit(SessionEvent::ItemCollected {
                        item_id,
                        kind,
                        by: Some(id),
                    });
                }
            }
        }
    }

    // One simulation step: drive, settle onto the track, check the track
    // bounds, collide, then move everyone else and report our own movement.
    pub fn tick(&mut self, now: Instant, dt: f64, inputs: &PlayerInputs) {
        if !self.local.input_locked(now) {
            self.handle_toggles(inputs);
        }

        self.local.integrate(inputs, dt, now, &self.driving);

        let query = self.track.nearest_sample(self.local.transform.position);
        let target = self.track.target_elevation(&query);
        let elevation = self
            .track
            .smooth_elevation(self.local.transform.position.y, target);
        self.local.set_elevation(elevation);

        if self.off_track.update(self.track.is_on_track(&query), now) {
            info!("off track for too long, back to the start");
            self.local.reset_to(self.start);
            self.local.lock_input(now, self.settings.collision_recovery());
            self.play(SoundEffect::TrackReset);
            self.emit(SessionEvent::TrackReset);
        }

        let effects = self.collisions.step(
            &mut self.local,
            &mut self.remotes,
            &mut self.world,
            self.start,
            now,
        );
        for effect in effects {
            self.handle_collision(effect);
        }

        let alpha = self.settings.interpolation_factor;
        for (id, remote) in self.remotes.iter_mut() {
            remote.interpolate(alpha);
            if let Some(handle) = self.remote_visuals.get(id) {
                self.collaborators
                    .scene
                    .set_transform(*handle, remote.transform());
            }
        }

        for item_id in self.world.drain_respawns(now) {
            self.show_collectible(&item_id);
            self.emit(SessionEvent::ItemRespawned(item_id));
        }

        if let Some(handle) = self.local_visual {
            self.collaborators
                .scene
                .set_transform(handle, self.local.transform);
        }
        self.queue_movement(now);
    }

    fn handle_toggles(&mut self, inputs: &PlayerInputs) {
        if inputs.toggle_headlights {
            self.local.headlights_on = !self.local.headlights_on;
            self.outgoing
                .push(ServerBoundPacket::HeadlightsToggled(self.local.headlights_on));
        }
        if inputs.horn {
            self.play(SoundEffect::Horn);
            self.outgoing.push(ServerBoundPacket::HornSound);
        }
    }

    fn handle_collision(&mut self, effect: CollisionEffect) {
        match effect {
            CollisionEffect::HazardBounce { kind, .. } => {
                self.play(SoundEffect::TerrainCollision);
                self.emit(SessionEvent::HazardHit(kind));
            }
            CollisionEffect::HazardReset { kind } => {
                self.play(SoundEffect::MineExplosion);
                self.emit(SessionEvent::HazardHit(kind));
                self.emit(SessionEvent::TrackReset);
            }
            CollisionEffect::VehicleBounce {
                target_id,
                position,
                ..
            } => {
                self.play(SoundEffect::PlayerCollision);
                self.outgoing.push(ServerBoundPacket::Collision {
                    target_id,
                    position,
                });
                self.emit(SessionEvent::VehicleHit { other: target_id });
            }
            CollisionEffect::Collected {
                item_id,
                kind,
                position,
                ..
            } => {
                self.hide_collectible(&item_id);
                self.outgoing.push(ServerBoundPacket::CollectibleCollected {
                    item_id: item_id.clone(),
                    kind,
                    position,
                });
                self.emit(SessionEvent::ItemCollected {
                    item_id,
                    kind,
                    by: None,
                });
                match kind {
                    CollectibleKind::Gold => {
                        self.play(SoundEffect::CoinPickup);
                        self.emit(SessionEvent::ScoreChanged(self.local.score));
                    }
                    CollectibleKind::Shield => {
                        self.play(SoundEffect::ShieldPickup);
                        self.emit(SessionEvent::ShieldChanged(self.local.shield));
                    }
                }
            }
        }
    }

    // Nothing goes out before the relay has given us an id, and never more
    // often than the send interval
    fn queue_movement(&mut self, now: Instant) {
        if self.my_id.is_none() {
            return;
        }
        if let Some(last) = self.last_movement_sent {
            if now.saturating_duration_since(last) < self.settings.movement_send_interval() {
                return;
            }
        }
        self.outgoing
            .push(ServerBoundPacket::Movement(self.local.transform));
        self.last_movement_sent = Some(now);
    }

    fn spawn_remote(&mut self, info: ParticipantInfo) {
        if Some(info.id) == self.my_id {
            return;
        }
        // a repeated announcement replaces what we had
        self.despawn_remote(info.id);

        debug!(id = info.id, name = %info.name, "spawning remote vehicle");
        let remote = RemoteActor::new(&info);
        self.replace_remote_visual(remote.id, remote.vehicle_kind, remote.transform());
        self.remotes.insert(remote.id, remote);
    }

    fn despawn_remote(&mut self, id: ParticipantID) -> bool {
        if let Some(handle) = self.remote_visuals.remove(&id) {
            self.collaborators.scene.remove(handle);
        }
        self.remotes.remove(&id).is_some()
    }

    fn replace_remote_visual(
        &mut self,
        id: ParticipantID,
        kind: VehicleKind,
        transform: Transform,
    ) {
        if let Some(handle) = self.remote_visuals.remove(&id) {
            self.collaborators.scene.remove(handle);
        }
        let model = self.model_for(kind);
        let handle = self.collaborators.scene.add(SceneObject::Vehicle {
            participant: Some(id),
            kind,
            model,
            transform,
        });
        self.remote_visuals.insert(id, handle);
    }

    fn hide_collectible(&mut self, item_id: &str) {
        if let Some(handle) = self
            .world
            .collectible_mut(item_id)
            .and_then(|item| item.visual.take())
        {
            self.collaborators.scene.remove(handle);
        }
    }

    fn show_collectible(&mut self, item_id: &str) {
        let scene = &mut self.collaborators.scene;
        if let Some(item) = self.world.collectible_mut(item_id) {
            if item.visual.is_none() {
                item.visual = Some(scene.add(SceneObject::Collectible {
                    item_id: ItemID::from(item_id),
                    kind: item.kind,
                    position: item.position,
                }));
            }
        }
    }

    fn model_for(&mut self, kind: VehicleKind) -> Model {
        if let Some(model) = self.models.get(&kind) {
            return model.clone();
        }
        let model = load_or_placeholder(self.collaborators.assets.as_mut(), kind.model_path());
        self.models.insert(kind, model.clone());
        model
    }

    fn play(&mut self, effect: SoundEffect) {
        self.collaborators.audio.play(effect);
        self.emit(SessionEvent::SoundPlayed(effect));
    }

    fn emit(&mut self, event: SessionEvent) {
        self.hooks.call(&event);
    }
}
