use crate::core::car_stats::{CarStats, POSITION_DNF};
use crate::interfaces::sample_source::{FrameSample, SessionEnd};
use crate::post::score::ScoringConfig;
use helpers::general::{argsort, max, SortOrder};

/// SessionContext is the session-wide state after finalizing: read-only input
/// for the scoring engine and the report builder.
///
/// * `race_lap_count` - Maximum laps completed by any car (1 if none tracked)
/// * `session_total_time` - (s) Sum of all frame deltas
/// * `best_total_time` - (s) Fastest total time among cars with >= 1 lap, 0 if none
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub total_cars: usize,
    pub track_length_m: f64,
    pub race_lap_count: u32,
    pub session_total_time: f64,
    pub best_total_time: f64,
}

/// FinalizedSession is the end-of-session snapshot handed to the report
/// builder: the per-car statistics in final ranking order plus the session
/// context and labels.
#[derive(Debug, Clone)]
pub struct FinalizedSession {
    pub cars: Vec<CarStats>,
    pub context: SessionContext,
    pub track_name: String,
    pub track_config: String,
}

/// Session owns the per-car trackers and the session totals. It is created
/// when tracking starts, mutated only through its own methods on the frame
/// path, and consumed by `finalize` when the session ends. No other component
/// reaches into its state.
#[derive(Debug)]
pub struct Session {
    cars: Vec<CarStats>,
    initialized: bool,
    track_length_m: f64,
    session_total_time: f64,
    crash_g_threshold: f64,
}

impl Session {
    pub fn new(cfg: &ScoringConfig) -> Session {
        Session {
            cars: Vec::new(),
            initialized: false,
            track_length_m: 0.0,
            session_total_time: 0.0,
            crash_g_threshold: cfg.crash_g_force_threshold,
        }
    }

    /// update_frame applies one frame of telemetry. The car list is
    /// initialized exactly once, from the first frame observed; its order is
    /// the enumeration order of that frame. A sample for a car that was not
    /// enumerated is dropped with a warning so one bad sample can never stop
    /// the aggregation for the remaining cars.
    pub fn update_frame(&mut self, frame: &FrameSample) {
        if !self.initialized {
            self.initialized = true;

            for sample in frame.cars.iter() {
                self.cars.push(CarStats::new(
                    sample.car_id,
                    &sample.driver_name,
                    &sample.car_name,
                ));
            }

            println!("INFO: Tracking {} cars", self.cars.len());
        }

        self.track_length_m = frame.track_length_m;
        self.session_total_time += frame.delta_t;

        for sample in frame.cars.iter() {
            match self.cars.iter_mut().find(|c| c.car_id == sample.car_id) {
                Some(stats) => {
                    stats.update(sample, frame.track_length_m, self.crash_g_threshold);
                }
                None => eprintln!(
                    "WARNING: Dropped sample for untracked car id {}!",
                    sample.car_id
                ),
            }
        }
    }

    /// session_total_time returns the elapsed session time in seconds.
    pub fn session_total_time(&self) -> f64 {
        self.session_total_time
    }

    /// no_cars returns the number of tracked cars.
    pub fn no_cars(&self) -> usize {
        self.cars.len()
    }

    /// finalize consumes the session: captures the final position of every
    /// car (falling back to the DNF sentinel when no position was ever
    /// resolved), derives the session context and orders the cars ascending
    /// by final position. Ties keep the original enumeration order.
    pub fn finalize(mut self, end: &SessionEnd) -> FinalizedSession {
        for stats in self.cars.iter_mut() {
            stats.final_position = if stats.last_position > 0 {
                stats.last_position
            } else {
                POSITION_DNF
            };
        }

        let race_lap_count = if self.cars.is_empty() {
            1
        } else {
            let laps_per_car: Vec<u32> =
                self.cars.iter().map(|c| c.lap_times.len() as u32).collect();
            max(&laps_per_car)
        };

        let mut best_total_time = 0.0;
        for stats in self.cars.iter() {
            if !stats.lap_times.is_empty() {
                let total_time = stats.lap_times.iter().sum::<f64>() / 1000.0;
                if best_total_time == 0.0 || total_time < best_total_time {
                    best_total_time = total_time;
                }
            }
        }

        let final_positions: Vec<u32> = self.cars.iter().map(|c| c.final_position).collect();
        let cars: Vec<CarStats> = argsort(&final_positions, SortOrder::Ascending)
            .into_iter()
            .map(|idx| self.cars[idx].to_owned())
            .collect();

        FinalizedSession {
            context: SessionContext {
                total_cars: cars.len(),
                track_length_m: self.track_length_m,
                race_lap_count,
                session_total_time: self.session_total_time,
                best_total_time,
            },
            cars,
            track_name: end.track_name.to_owned(),
            track_config: end.track_config.to_owned(),
        }
    }
}
