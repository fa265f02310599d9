//! Track geometry: a closed Catmull-Rom curve through the world's control
//! points, sampled once at load time and queried every tick for ride height
//! and on/off-track classification.

use glam::DVec3;
use rally_core::transform::planar;
use rally_core::world::TrackDefinition;
use rally_core::Settings;

#[derive(Clone, Copy, Debug)]
pub struct TrackSample {
    pub position: DVec3,
    // arc length from sample 0, measured along the sampled polyline
    pub distance: f64,
}

impl TrackSample {
    pub fn elevation(&self) -> f64 {
        self.position.y
    }
}

/// Result of one nearest-sample scan; shared by the ride-height and on-track
/// queries so each actor only pays for one scan per tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackQuery {
    pub index: usize,
    // horizontal distance, elevation ignored
    pub distance: f64,
    pub elevation: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct TrackTuning {
    pub half_width: f64,
    pub margin: f64,
    pub seam_margin: f64,
    pub seam_sample_window: usize,
    pub transition_distance: f64,
    pub ground_elevation: f64,
    pub elevation_smoothing: f64,
}

impl TrackTuning {
    pub fn new(track: &TrackDefinition, settings: &Settings) -> Self {
        Self {
            half_width: track.half_width,
            margin: settings.track_margin,
            seam_margin: settings.seam_margin,
            seam_sample_window: settings.seam_sample_window,
            transition_distance: settings.elevation_transition_distance,
            ground_elevation: settings.ground_elevation,
            elevation_smoothing: settings.elevation_smoothing,
        }
    }
}

pub struct TrackCurve {
    control_points: Vec<DVec3>,
    samples: Vec<TrackSample>,
    length: f64,
    tuning: TrackTuning,
}

impl TrackCurve {
    pub fn build(track: &TrackDefinition, settings: &Settings) -> TrackCurve {
        TrackCurve::from_points(
            track.control_points.clone(),
            settings.track_sample_count,
            TrackTuning::new(track, settings),
        )
    }

    pub fn from_points(
        control_points: Vec<DVec3>,
        sample_count: usize,
        tuning: TrackTuning,
    ) -> TrackCurve {
        let mut curve = TrackCurve {
            control_points,
            samples: Vec::new(),
            length: 0.0,
            tuning,
        };

        let sample_count = sample_count.max(1);
        let mut distance = 0.0;
        let mut previous: Option<DVec3> = None;
        for i in 0..sample_count {
            let position = curve.point_at(i as f64 / sample_count as f64);
            if let Some(previous) = previous {
                distance += previous.distance(position);
            }
            curve.samples.push(TrackSample { position, distance });
            previous = Some(position);
        }

        // the loop closes from the last sample back to the first
        let closing = match (curve.samples.first(), curve.samples.last()) {
            (Some(first), Some(last)) => last.position.distance(first.position),
            _ => 0.0,
        };
        curve.length = distance + closing;
        curve
    }

    /// Point on the closed curve at parameter `t`; any `t` is wrapped into
    /// [0, 1), so `point_at(1.0) == point_at(0.0)`.
    pub fn point_at(&self, t: f64) -> DVec3 {
        let n = self.control_points.len();
        match n {
            0 => return DVec3::ZERO,
            1 => return self.control_points[0],
            _ => {}
        }

        let scaled = t.rem_euclid(1.0) * n as f64;
        // rem_euclid can round up to exactly 1.0 for tiny negative t
        let segment = (scaled.floor() as usize).min(n - 1);
        let local_t = scaled - segment as f64;

        let p0 = self.control_points[(segment + n - 1) % n];
        let p1 = self.control_points[segment];
        let p2 = self.control_points[(segment + 1) % n];
        let p3 = self.control_points[(segment + 2) % n];
        catmull_rom(p0, p1, p2, p3, local_t)
    }

    pub fn samples(&self) -> &[TrackSample] {
        &self.samples
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn tuning(&self) -> &TrackTuning {
        &self.tuning
    }

    // Linear scan; fine for ~100 samples and a handful of actors
    pub fn nearest_sample(&self, position: DVec3) -> TrackQuery {
        let target = planar(position);
        let mut best = TrackQuery {
            index: 0,
            distance: f64::INFINITY,
            elevation: self.tuning.ground_elevation,
        };

        for (index, sample) in self.samples.iter().enumerate() {
            let distance = planar(sample.position).distance(target);
            if distance < best.distance {
                best = TrackQuery {
                    index,
                    distance,
                    elevation: sample.elevation(),
                };
            }
        }

        best
    }

    // Blend from the track's elevation down to the ground as we move away
    // from the centreline; b reaches 1 exactly at the transition distance, so
    // there's no step there
    pub fn target_elevation(&self, query: &TrackQuery) -> f64 {
        let TrackTuning {
            transition_distance,
            ground_elevation,
            ..
        } = self.tuning;

        if query.distance < transition_distance && transition_distance > 0.0 {
            let b = (query.distance / transition_distance).clamp(0.0, 1.0);
            query.elevation * (1.0 - b) + ground_elevation * b
        } else {
            ground_elevation
        }
    }

    // exponential moving average toward the target, so crossing the
    // transition boundary never pops
    pub fn smooth_elevation(&self, current: f64, target: f64) -> f64 {
        let alpha = self.tuning.elevation_smoothing;
        current * (1.0 - alpha) + target * alpha
    }

    pub fn is_near_seam(&self, index: usize) -> bool {
        let window = self.tuning.seam_sample_window;
        index < window || index + window >= self.samples.len()
    }

    pub fn is_on_track(&self, query: &TrackQuery) -> bool {
        // curve fitting is least accurate where the loop closes
        let margin = if self.is_near_seam(query.index) {
            self.tuning.margin.max(self.tuning.seam_margin)
        } else {
            self.tuning.margin
        };
        query.distance <= self.tuning.half_width + margin
    }

    /// Fraction of a lap covered at the nearest sample, in [0, 1).
    pub fn progress(&self, query: &TrackQuery) -> f64 {
        if self.length <= 0.0 {
            return 0.0;
        }
        self.samples
            .get(query.index)
            .map(|sample| sample.distance / self.length)
            .unwrap_or(0.0)
    }
}

fn catmull_rom(p0: DVec3, p1: DVec3, p2: DVec3, p3: DVec3, t: f64) -> DVec3 {
    let t2 = t * t;
    let t3 = t2 * t;

    let c0 = -0.5 * t3 + t2 - 0.5 * t;
    let c1 = 1.5 * t3 - 2.5 * t2 + 1.0;
    let c2 = -1.5 * t3 + 2.0 * t2 + 0.5 * t;
    let c3 = 0.5 * t3 - 0.5 * t2;

    p0 * c0 + p1 * c1 + p2 * c2 + p3 * c3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> TrackTuning {
        TrackTuning {
            half_width: 6.0,
            margin: 2.0,
            seam_margin: 12.0,
            seam_sample_window: 5,
            transition_distance: 15.0,
            ground_elevation: 0.0,
            elevation_smoothing: 0.1,
        }
    }

    // a hill on the far side of a 100x100 square loop
    fn square_loop() -> TrackCurve {
        TrackCurve::from_points(
            vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(100.0, 0.0, 0.0),
                DVec3::new(100.0, 8.0, 100.0),
                DVec3::new(0.0, 0.0, 100.0),
            ],
            100,
            tuning(),
        )
    }

    #[test]
    fn curve_passes_through_control_points() {
        let curve = square_loop();
        assert!(curve.point_at(0.0).abs_diff_eq(DVec3::ZERO, 1e-9));
        assert!(curve
            .point_at(0.25)
            .abs_diff_eq(DVec3::new(100.0, 0.0, 0.0), 1e-9));
        assert!(curve
            .point_at(0.5)
            .abs_diff_eq(DVec3::new(100.0, 8.0, 100.0), 1e-9));
    }

    #[test]
    fn curve_is_closed() {
        let curve = square_loop();
        assert!(curve.point_at(1.0).abs_diff_eq(curve.point_at(0.0), 1e-9));
        assert!(curve.point_at(-0.25).abs_diff_eq(curve.point_at(0.75), 1e-9));

        // the closing segment is no longer than the other sample spacings
        let samples = curve.samples();
        let closing = samples[samples.len() - 1].position.distance(samples[0].position);
        let spacing = samples[1].position.distance(samples[0].position);
        assert!(closing < spacing * 2.0);
        assert!(curve.length() > samples[samples.len() - 1].distance);
    }

    #[test]
    fn sample_points_are_always_on_track() {
        let curve = square_loop();
        for sample in curve.samples() {
            let query = curve.nearest_sample(sample.position);
            assert_eq!(query.distance, 0.0);
            assert!(curve.is_on_track(&query));
        }

        // for any positive width and margin
        let narrow = TrackCurve::from_points(
            vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(10.0, 0.0, 0.0),
                DVec3::new(10.0, 0.0, 10.0),
            ],
            30,
            TrackTuning {
                half_width: 0.001,
                margin: 0.0001,
                seam_margin: 0.0001,
                ..tuning()
            },
        );
        for sample in narrow.samples() {
            assert!(narrow.is_on_track(&narrow.nearest_sample(sample.position)));
        }
    }

    #[test]
    fn far_points_are_off_track() {
        let curve = square_loop();
        let query = curve.nearest_sample(DVec3::new(50.0, 0.0, 50.0));
        assert!(!curve.is_on_track(&query));
    }

    #[test]
    fn seam_gets_a_wider_margin() {
        let curve = square_loop();
        // 15 units beside sample 0 is past half_width + margin but inside the seam margin
        let beside_start = DVec3::new(0.0, 0.0, -15.0);
        let query = curve.nearest_sample(beside_start);
        assert!(curve.is_near_seam(query.index));
        assert!(curve.is_on_track(&query));

        let beside_middle = curve.point_at(0.375) + DVec3::new(15.0, 0.0, 0.0);
        let query = curve.nearest_sample(beside_middle);
        assert!(!curve.is_near_seam(query.index));
        assert!(!curve.is_on_track(&query));
    }

    #[test]
    fn nearest_sample_ignores_elevation() {
        let curve = square_loop();
        let hilltop = curve.point_at(0.5);
        let floating = hilltop + DVec3::new(0.0, 50.0, 0.0);
        let query = curve.nearest_sample(floating);
        assert_eq!(query.index, 50);
        assert_eq!(query.distance, 0.0);
        assert!((query.elevation - 8.0).abs() < 1e-9);
    }

    #[test]
    fn ride_height_is_continuous_at_the_transition() {
        let curve = square_loop();
        let elevation = 8.0;
        let just_inside = TrackQuery {
            index: 50,
            distance: 15.0 - 1e-9,
            elevation,
        };
        let at_boundary = TrackQuery {
            distance: 15.0,
            ..just_inside
        };
        let just_outside = TrackQuery {
            distance: 15.0 + 1e-9,
            ..just_inside
        };

        let inside = curve.target_elevation(&just_inside);
        assert!((inside - curve.target_elevation(&at_boundary)).abs() < 1e-6);
        assert!((inside - curve.target_elevation(&just_outside)).abs() < 1e-6);
    }

    #[test]
    fn ride_height_blends_toward_ground() {
        let curve = square_loop();
        let on_centreline = TrackQuery {
            index: 50,
            distance: 0.0,
            elevation: 8.0,
        };
        assert_eq!(curve.target_elevation(&on_centreline), 8.0);

        let halfway = TrackQuery {
            distance: 7.5,
            ..on_centreline
        };
        assert!((curve.target_elevation(&halfway) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn elevation_is_smoothed_not_snapped() {
        let curve = square_loop();
        let next = curve.smooth_elevation(0.0, 8.0);
        assert!((next - 0.8).abs() < 1e-12);
        let next = curve.smooth_elevation(next, 8.0);
        assert!((next - 1.52).abs() < 1e-12);
    }

    #[test]
    fn progress_runs_around_the_lap() {
        let curve = square_loop();
        let start = curve.nearest_sample(curve.point_at(0.0));
        let halfway = curve.nearest_sample(curve.point_at(0.5));
        assert_eq!(curve.progress(&start), 0.0);
        let half = curve.progress(&halfway);
        assert!(half > 0.4 && half < 0.6);
    }
}
