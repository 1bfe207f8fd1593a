use crate::interfaces::sample_source::CarSample;

/// Final position sentinel for a car whose leaderboard position was never
/// resolved (DNF).
pub const POSITION_DNF: u32 = 999;

/// SubUpdate is the outcome of a single tracker sub-update: the sample was
/// either applied, or the required data was not available and the sub-update
/// was skipped for this frame only. Skipping is normal operation, not an
/// error, tracking resumes on the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubUpdate {
    Applied,
    Skipped,
}

/// FrameOutcome reports which sub-updates a frame sample was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    pub overtakes: SubUpdate,
    pub lap_times: SubUpdate,
    pub distance: SubUpdate,
    pub crashes: SubUpdate,
}

/// CarStats accumulates the statistics of a single car over a session. One
/// instance is created per car when tracking starts and mutated once per
/// frame; the session aggregator owns all instances exclusively.
///
/// * `distance_covered` - (m) Accumulated forward distance, only increases
/// * `lap_times` - (ms) Completed lap durations, in completion order
/// * `current_lap_time` - (ms) Raw current lap time of the latest frame
/// * `crash_intensities` - (G) Spike magnitude of each detected crash
/// * `last_position` - Last observed leaderboard position, 0 = none yet
/// * `final_position` - Final race position, set once at finalize time
#[derive(Debug, Clone)]
pub struct CarStats {
    pub car_id: u32,
    pub driver_name: String,
    pub car_name: String,
    pub distance_covered: f64,
    pub lap_times: Vec<f64>,
    pub current_lap_time: f64,
    pub lap_count: u32,
    pub overtakes_made: u32,
    pub times_overtaken: u32,
    pub crash_intensities: Vec<f64>,
    pub last_position: u32,
    pub last_spline_pos: f64,
    pub final_position: u32,
    has_prior_spline: bool,
    prev_g_force: Option<[f64; 3]>,
}

impl CarStats {
    pub fn new(car_id: u32, driver_name: &str, car_name: &str) -> CarStats {
        CarStats {
            car_id,
            driver_name: driver_name.to_owned(),
            car_name: car_name.to_owned(),
            distance_covered: 0.0,
            lap_times: Vec::new(),
            current_lap_time: 0.0,
            lap_count: 0,
            overtakes_made: 0,
            times_overtaken: 0,
            crash_intensities: Vec::new(),
            last_position: 0,
            last_spline_pos: 0.0,
            final_position: POSITION_DNF,
            has_prior_spline: false,
            prev_g_force: None,
        }
    }

    /// update applies one frame sample to the running statistics. The four
    /// sub-updates are independent and order-insensitive within a frame; a
    /// sub-update without its input data is skipped for this frame only and
    /// reported as such. Never fails into the caller.
    pub fn update(
        &mut self,
        sample: &CarSample,
        track_length_m: f64,
        crash_g_threshold: f64,
    ) -> FrameOutcome {
        FrameOutcome {
            overtakes: self.update_overtakes(sample.position),
            lap_times: self.update_lap_times(sample.lap_count, sample.lap_time_ms),
            distance: self.update_distance(sample.spline_pos, track_length_m),
            crashes: self.update_crashes(sample.g_force.as_ref(), crash_g_threshold),
        }
    }

    /// update_overtakes credits the exact rank delta between the previous and
    /// the current leaderboard position, so passing several cars in one frame
    /// accumulates correctly. A reading of 0 on either side means the
    /// position is not yet available (e.g., before the race start).
    fn update_overtakes(&mut self, position: u32) -> SubUpdate {
        let prev_position = self.last_position;
        self.last_position = position;

        if prev_position == 0 || position == 0 {
            return SubUpdate::Skipped;
        }

        if position < prev_position {
            self.overtakes_made += prev_position - position;
            println!(
                "INFO: {} overtook! Position {} -> {}",
                self.driver_name, prev_position, position
            );
        } else if position > prev_position {
            self.times_overtaken += position - prev_position;
            println!(
                "INFO: {} was overtaken. Position {} -> {}",
                self.driver_name, prev_position, position
            );
        }

        SubUpdate::Applied
    }

    /// update_lap_times appends the just-finished lap when the host's lap
    /// counter increases. The duration of the finished lap is the current lap
    /// time cached from the previous frame, not the new frame's already reset
    /// value. The cache is overwritten afterwards, lap or no lap.
    fn update_lap_times(&mut self, lap_count: u32, lap_time_ms: f64) -> SubUpdate {
        if lap_count > self.lap_count && self.current_lap_time > 0.0 {
            self.lap_times.push(self.current_lap_time);
            println!(
                "INFO: {} completed lap {} in {:.3}s",
                self.driver_name,
                self.lap_times.len(),
                self.current_lap_time / 1000.0
            );
        }

        self.current_lap_time = lap_time_ms;
        self.lap_count = lap_count;
        SubUpdate::Applied
    }

    /// update_distance accumulates the forward distance covered this frame
    /// from the spline position delta. A delta beyond +-0.5 is a wraparound
    /// across the finish line and is folded back. Negative frame distances
    /// (reversing within a lap) are ignored, not subtracted.
    fn update_distance(&mut self, spline_pos: f64, track_length_m: f64) -> SubUpdate {
        // nothing to diff against on the very first observation
        if !self.has_prior_spline {
            self.has_prior_spline = true;
            self.last_spline_pos = spline_pos;
            return SubUpdate::Skipped;
        }

        let mut spline_diff = spline_pos - self.last_spline_pos;

        if spline_diff < -0.5 {
            spline_diff += 1.0;
        } else if spline_diff > 0.5 {
            spline_diff -= 1.0;
        }

        let distance_this_frame = spline_diff * track_length_m;

        if distance_this_frame > 0.0 {
            self.distance_covered += distance_this_frame;
        }

        self.last_spline_pos = spline_pos;
        SubUpdate::Applied
    }

    /// update_crashes compares the G-force magnitude against the previous
    /// frame and records a crash event when the spike exceeds the threshold.
    /// The previous vector is overwritten whether or not a crash fired; a
    /// missing acceleration sample skips detection for this frame only.
    fn update_crashes(&mut self, g_force: Option<&[f64; 3]>, crash_g_threshold: f64) -> SubUpdate {
        let g_cur = match g_force {
            Some(g) => *g,
            None => return SubUpdate::Skipped,
        };

        if let Some(g_prev) = self.prev_g_force {
            let g_change = (g_magnitude(&g_cur) - g_magnitude(&g_prev)).abs();

            if g_change > crash_g_threshold {
                self.crash_intensities.push(g_change);
                println!(
                    "INFO: {} CRASH detected! G-force spike: {:.2}g (total crashes: {})",
                    self.driver_name,
                    g_change,
                    self.crash_intensities.len()
                );
            }
        }

        self.prev_g_force = Some(g_cur);
        SubUpdate::Applied
    }
}

/// g_magnitude returns the Euclidean norm of a 3-axis acceleration sample.
fn g_magnitude(g: &[f64; 3]) -> f64 {
    (g[0] * g[0] + g[1] * g[1] + g[2] * g[2]).sqrt()
}
