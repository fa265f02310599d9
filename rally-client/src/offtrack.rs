use std::time::{Duration, Instant};

use rally_core::Settings;

// Tracks one continuous off-track episode for the local vehicle. After a
// forced reset, checking is suspended for the cooldown so the vehicle gets a
// chance to drive back onto the track.
#[derive(Clone, Debug)]
pub struct OffTrackMonitor {
    grace: Duration,
    cooldown: Duration,
    off_since: Option<Instant>,
    suspended_until: Option<Instant>,
}

impl OffTrackMonitor {
    pub fn new(grace: Duration, cooldown: Duration) -> Self {
        Self {
            grace,
            cooldown,
            off_since: None,
            suspended_until: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.off_track_grace(), settings.off_track_cooldown())
    }

    pub fn is_suspended(&self, now: Instant) -> bool {
        matches!(self.suspended_until, Some(until) if now < until)
    }

    pub fn off_since(&self) -> Option<Instant> {
        self.off_since
    }

    /// Feeds this tick's classification; returns true exactly when the
    /// vehicle should be sent back to the start.
    pub fn update(&mut self, on_track: bool, now: Instant) -> bool {
        if self.is_suspended(now) || on_track {
            self.off_since = None;
            return false;
        }

        match self.off_since {
            None => {
                self.off_since = Some(now);
                false
            }
            Some(since) if now.saturating_duration_since(since) >= self.grace => {
                self.off_since = None;
                self.suspended_until = Some(now + self.cooldown);
                true
            }
            Some(_) => false,
        }
    }
}
