use std::collections::HashMap;
use std::hash::Hash;

use rally_core::sound_effect::SoundEffect;
use rally_core::world::{CollectibleKind, HazardKind};
use rally_core::{ItemID, ParticipantID};

/// Anything that can be published through a [`HookManager`]. Subscribers
/// register against the kind, not a particular value.
pub trait Hook {
    type Kind: Copy + Eq + Hash;

    fn kind(&self) -> Self::Kind;
}

type Watcher<H> = Box<dyn FnMut(&H)>;

pub struct HookManager<H: Hook> {
    stored_funcs: HashMap<H::Kind, Vec<Watcher<H>>>,
}

impl<H: Hook> HookManager<H> {
    pub fn new() -> Self {
        Self {
            stored_funcs: HashMap::new(),
        }
    }

    pub fn add<F: FnMut(&H) + 'static>(&mut self, kind: H::Kind, f: F) {
        self.stored_funcs
            .entry(kind)
            .or_insert_with(Vec::new)
            .push(Box::new(f));
    }

    pub fn call(&mut self, h: &H) {
        if let Some(watchers) = self.stored_funcs.get_mut(&h.kind()) {
            for f in watchers.iter_mut() {
                f(h);
            }
        }
    }

    pub fn watcher_count(&self, kind: H::Kind) -> usize {
        self.stored_funcs.get(&kind).map_or(0, Vec::len)
    }
}

impl<H: Hook> Default for HookManager<H> {
    fn default() -> Self {
        Self::new()
    }
}

// Things the session tells the rest of the client about
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Joined {
        your_id: ParticipantID,
    },
    ParticipantJoined(ParticipantID),
    ParticipantLeft(ParticipantID),
    SoundPlayed(SoundEffect),
    HazardHit(HazardKind),
    VehicleHit {
        other: ParticipantID,
    },
    ItemCollected {
        item_id: ItemID,
        kind: CollectibleKind,
        // None when it was us
        by: Option<ParticipantID>,
    },
    ItemRespawned(ItemID),
    TrackReset,
    ScoreChanged(u32),
    ShieldChanged(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    Joined,
    ParticipantJoined,
    ParticipantLeft,
    SoundPlayed,
    HazardHit,
    VehicleHit,
    ItemCollected,
    ItemRespawned,
    TrackReset,
    ScoreChanged,
    ShieldChanged,
}

impl Hook for SessionEvent {
    type Kind = SessionEventKind;

    fn kind(&self) -> SessionEventKind {
        match self {
            SessionEvent::Joined { .. } => SessionEventKind::Joined,
            SessionEvent::ParticipantJoined(_) => SessionEventKind::ParticipantJoined,
            SessionEvent::ParticipantLeft(_) => SessionEventKind::ParticipantLeft,
            SessionEvent::SoundPlayed(_) => SessionEventKind::SoundPlayed,
            SessionEvent::HazardHit(_) => SessionEventKind::HazardHit,
            SessionEvent::VehicleHit { .. } => SessionEventKind::VehicleHit,
            SessionEvent::ItemCollected { .. } => SessionEventKind::ItemCollected,
            SessionEvent::ItemRespawned(_) => SessionEventKind::ItemRespawned,
            SessionEvent::TrackReset => SessionEventKind::TrackReset,
            SessionEvent::ScoreChanged(_) => SessionEventKind::ScoreChanged,
            SessionEvent::ShieldChanged(_) => SessionEventKind::ShieldChanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn only_matching_kinds_are_called() {
        let mut hooks = HookManager::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        hooks.add(SessionEventKind::ParticipantLeft, move |event: &SessionEvent| {
            sink.borrow_mut().push(event.clone())
        });

        hooks.call(&SessionEvent::ParticipantJoined(4));
        hooks.call(&SessionEvent::ParticipantLeft(4));
        hooks.call(&SessionEvent::TrackReset);

        assert_eq!(*seen.borrow(), vec![SessionEvent::ParticipantLeft(4)]);
    }

    #[test]
    fn every_watcher_of_a_kind_is_called() {
        let mut hooks: HookManager<SessionEvent> = HookManager::new();
        let count = Rc::new(RefCell::new(0));

        for _ in 0..3 {
            let count = count.clone();
            hooks.add(SessionEventKind::TrackReset, move |_| *count.borrow_mut() += 1);
        }
        assert_eq!(hooks.watcher_count(SessionEventKind::TrackReset), 3);

        hooks.call(&SessionEvent::TrackReset);
        assert_eq!(*count.borrow(), 3);
    }
}
