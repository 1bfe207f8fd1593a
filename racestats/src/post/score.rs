use crate::core::car_stats::CarStats;
use helpers::general::{format_time, round_to};
use serde::{Deserialize, Serialize};

/// ScoringConfig holds the crash detection/penalty constants. The defaults
/// match the values the statistics were historically produced with; a JSON
/// config file may override individual fields.
///
/// * `crash_g_force_threshold` - (G) Frame-to-frame spike that counts as a crash
/// * `crash_penalty_percent_per_g` - (%) Score penalty per G of crash intensity
/// * `max_crash_penalty_per_crash_g` - (G) Cap per crash event for the penalty
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub crash_g_force_threshold: f64,
    pub crash_penalty_percent_per_g: f64,
    pub max_crash_penalty_per_crash_g: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            crash_g_force_threshold: 4.0,
            crash_penalty_percent_per_g: 0.01,
            max_crash_penalty_per_crash_g: 100.0,
        }
    }
}

/// ScoreContext is the session-wide input of the scoring formula.
///
/// * `race_lap_count` - Laps completed by the session winner
/// * `best_total_time` - (s) Fastest total time among cars with >= 1 lap, 0 if none
#[derive(Debug, Clone, Copy)]
pub struct ScoreContext {
    pub total_cars: u32,
    pub track_length_m: f64,
    pub race_lap_count: u32,
    pub best_total_time: f64,
}

/// ScoreBreakdown lists the four factors of the score product, rounded for
/// display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base_score: f64,
    pub position_factor: f64,
    pub speed_factor: f64,
    pub crash_factor: f64,
    pub crash_penalty_percent: f64,
}

/// CrashSummary aggregates the crash events of one driver for the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashSummary {
    pub total_crashes: usize,
    pub crash_intensities_g: Vec<f64>,
    pub worst_crash_g: f64,
    pub average_crash_g: f64,
    pub total_crash_intensity: f64,
}

/// DriverScore is the per-driver record of the session report: the final
/// score with its breakdown plus the derived display statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverScore {
    pub position: u32,
    pub car_name: String,
    pub total_score: i64,
    pub score_breakdown: ScoreBreakdown,
    pub laps_completed: usize,
    pub partial_lap_completion: f64,
    pub total_time_seconds: f64,
    pub total_time_formatted: String,
    pub distance_covered_km: f64,
    pub distance_covered_miles: f64,
    pub average_speed_kmh: f64,
    pub average_speed_mph: f64,
    pub lap_times: Vec<f64>,
    pub best_lap: f64,
    pub average_lap: f64,
    pub overtakes_made: u32,
    pub times_overtaken: u32,
    pub crashes: CrashSummary,
    pub net_positions_gained: i64,
}

/// score_car maps a finished per-car state and the session context to the
/// score breakdown record. Pure: the same inputs always produce the same
/// record.
pub fn score_car(
    stats: &CarStats,
    position: u32,
    ctx: &ScoreContext,
    cfg: &ScoringConfig,
) -> DriverScore {
    let total_time = stats.lap_times.iter().sum::<f64>() / 1000.0;
    let laps_completed = stats.lap_times.len();

    // credit for the lap in progress, unless the full race distance is done
    let partial_lap = if (laps_completed as u32) < ctx.race_lap_count {
        stats.last_spline_pos
    } else {
        0.0
    };

    let base_score = if ctx.race_lap_count > 0 {
        ctx.track_length_m * (laps_completed as f64 + partial_lap) / ctx.race_lap_count as f64
    } else {
        0.0
    };

    // 1st place keeps the full base score, last place 1/total_cars of it
    let position_factor = if ctx.total_cars > 0 && position > 0 {
        (ctx.total_cars as f64 - position as f64 + 1.0) / ctx.total_cars as f64
    } else {
        1.0
    };

    // the fastest finisher gets 1.0, slower drivers proportionally less
    let speed_factor = if total_time > 0.0 && ctx.best_total_time > 0.0 {
        ctx.best_total_time / total_time
    } else {
        1.0
    };

    let capped_intensity: f64 = stats
        .crash_intensities
        .iter()
        .map(|&g| g.min(cfg.max_crash_penalty_per_crash_g))
        .sum();
    let crash_factor = 1.0 - capped_intensity * cfg.crash_penalty_percent_per_g / 100.0;
    let crash_penalty_percent = capped_intensity * cfg.crash_penalty_percent_per_g;

    let total_score = (base_score * position_factor * speed_factor * crash_factor * 100.0).ceil();

    let avg_speed_ms = if total_time > 0.0 {
        stats.distance_covered / total_time
    } else {
        0.0
    };

    let best_lap = if stats.lap_times.is_empty() {
        0.0
    } else {
        stats.lap_times.iter().cloned().fold(f64::INFINITY, f64::min) / 1000.0
    };
    let average_lap = if stats.lap_times.is_empty() {
        0.0
    } else {
        total_time / stats.lap_times.len() as f64
    };

    let worst_crash_g = if stats.crash_intensities.is_empty() {
        0.0
    } else {
        stats
            .crash_intensities
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max)
    };
    let total_crash_intensity: f64 = stats.crash_intensities.iter().sum();
    let average_crash_g = if stats.crash_intensities.is_empty() {
        0.0
    } else {
        total_crash_intensity / stats.crash_intensities.len() as f64
    };

    DriverScore {
        position,
        car_name: stats.car_name.to_owned(),
        total_score: total_score as i64,
        score_breakdown: ScoreBreakdown {
            base_score: round_to(base_score, 2),
            position_factor: round_to(position_factor, 3),
            speed_factor: round_to(speed_factor, 3),
            crash_factor: round_to(crash_factor, 3),
            crash_penalty_percent: round_to(crash_penalty_percent, 2),
        },
        laps_completed,
        partial_lap_completion: round_to(partial_lap, 3),
        total_time_seconds: round_to(total_time, 3),
        total_time_formatted: format_time(total_time),
        distance_covered_km: round_to(stats.distance_covered / 1000.0, 2),
        distance_covered_miles: round_to(stats.distance_covered / 1609.34, 2),
        average_speed_kmh: round_to(avg_speed_ms * 3.6, 2),
        average_speed_mph: round_to(avg_speed_ms * 2.23694, 2),
        lap_times: stats.lap_times.iter().map(|&lt| round_to(lt / 1000.0, 3)).collect(),
        best_lap: round_to(best_lap, 3),
        average_lap: round_to(average_lap, 3),
        overtakes_made: stats.overtakes_made,
        times_overtaken: stats.times_overtaken,
        crashes: CrashSummary {
            total_crashes: stats.crash_intensities.len(),
            crash_intensities_g: stats
                .crash_intensities
                .iter()
                .map(|&g| round_to(g, 2))
                .collect(),
            worst_crash_g: round_to(worst_crash_g, 2),
            average_crash_g: round_to(average_crash_g, 2),
            total_crash_intensity: round_to(total_crash_intensity, 2),
        },
        net_positions_gained: stats.overtakes_made as i64 - stats.times_overtaken as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_ctx() -> ScoreContext {
        ScoreContext {
            total_cars: 4,
            track_length_m: 5000.0,
            race_lap_count: 4,
            best_total_time: 360.0,
        }
    }

    fn finished_stats(lap_times_ms: &[f64]) -> CarStats {
        let mut stats = CarStats::new(0, "Driver", "Car");
        stats.lap_times = lap_times_ms.to_vec();
        stats.distance_covered = 20_000.0;
        stats
    }

    #[test]
    fn test_partial_lap_base_score() {
        let mut stats = CarStats::new(0, "Driver", "Car");
        stats.last_spline_pos = 0.3;

        let score = score_car(&stats, 4, &test_ctx(), &ScoringConfig::default());

        assert_eq!(score.laps_completed, 0);
        assert_relative_eq!(score.partial_lap_completion, 0.3);
        // track_length * 0.3 / 4
        assert_relative_eq!(score.score_breakdown.base_score, 375.0);
    }

    #[test]
    fn test_no_partial_lap_after_full_distance() {
        let mut stats = finished_stats(&[90_000.0, 90_000.0, 90_000.0, 90_000.0]);
        stats.last_spline_pos = 0.8;

        let score = score_car(&stats, 1, &test_ctx(), &ScoringConfig::default());

        assert_relative_eq!(score.partial_lap_completion, 0.0);
        assert_relative_eq!(score.score_breakdown.base_score, 5000.0);
    }

    #[test]
    fn test_position_factor_bounds_and_monotonicity() {
        let stats = finished_stats(&[90_000.0]);
        let ctx = test_ctx();
        let cfg = ScoringConfig::default();

        let first = score_car(&stats, 1, &ctx, &cfg);
        let second = score_car(&stats, 2, &ctx, &cfg);
        let last = score_car(&stats, 4, &ctx, &cfg);

        assert_relative_eq!(first.score_breakdown.position_factor, 1.0);
        assert_relative_eq!(last.score_breakdown.position_factor, 0.25);
        assert!(second.score_breakdown.position_factor < first.score_breakdown.position_factor);
    }

    #[test]
    fn test_position_factor_defaults_without_position() {
        let stats = finished_stats(&[90_000.0]);
        let score = score_car(&stats, 0, &test_ctx(), &ScoringConfig::default());

        assert_relative_eq!(score.score_breakdown.position_factor, 1.0);
    }

    #[test]
    fn test_speed_factor_monotonicity() {
        let ctx = test_ctx();
        let cfg = ScoringConfig::default();

        let fast = score_car(&finished_stats(&[360_000.0]), 1, &ctx, &cfg);
        let slow = score_car(&finished_stats(&[400_000.0]), 1, &ctx, &cfg);

        assert_relative_eq!(fast.score_breakdown.speed_factor, 1.0);
        assert_relative_eq!(slow.score_breakdown.speed_factor, 0.9);
        assert!(slow.score_breakdown.speed_factor < fast.score_breakdown.speed_factor);
    }

    #[test]
    fn test_crash_cap() {
        let mut stats = finished_stats(&[360_000.0]);
        stats.crash_intensities = vec![150.0, 200.0, 50.0];

        let score = score_car(&stats, 1, &test_ctx(), &ScoringConfig::default());

        // capped contributions 100 + 100 + 50 = 250 G
        assert_relative_eq!(score.score_breakdown.crash_factor, 0.975);
        assert_relative_eq!(score.score_breakdown.crash_penalty_percent, 2.5);
        // uncapped sum still reported for display
        assert_relative_eq!(score.crashes.total_crash_intensity, 400.0);
        assert_relative_eq!(score.crashes.worst_crash_g, 200.0);
    }

    #[test]
    fn test_additional_crash_always_adds_penalty() {
        let ctx = test_ctx();
        let cfg = ScoringConfig::default();

        let mut one_capped = finished_stats(&[360_000.0]);
        one_capped.crash_intensities = vec![700.0];
        let mut two_crashes = finished_stats(&[360_000.0]);
        two_crashes.crash_intensities = vec![700.0, 5.0];

        let first = score_car(&one_capped, 1, &ctx, &cfg);
        let second = score_car(&two_crashes, 1, &ctx, &cfg);

        // a saturated event cannot get worse, a new event always can
        assert_relative_eq!(first.score_breakdown.crash_factor, 0.99);
        assert!(second.score_breakdown.crash_factor < first.score_breakdown.crash_factor);
    }

    #[test]
    fn test_total_score_is_scaled_and_rounded_up() {
        let mut stats = finished_stats(&[400_000.0]);
        stats.last_spline_pos = 0.5;

        let score = score_car(&stats, 2, &test_ctx(), &ScoringConfig::default());

        // base = 5000 * 1.5 / 4 = 1875, position = 0.75, speed = 0.9
        // 1875 * 0.75 * 0.9 * 1.0 * 100 = 126562.5 -> ceil
        assert_eq!(score.total_score, 126_563);
    }

    #[test]
    fn test_zero_laps_defaults_are_safe() {
        let stats = CarStats::new(0, "Driver", "Car");
        let score = score_car(&stats, 2, &test_ctx(), &ScoringConfig::default());

        assert_relative_eq!(score.score_breakdown.speed_factor, 1.0);
        assert_relative_eq!(score.average_speed_kmh, 0.0);
        assert_relative_eq!(score.best_lap, 0.0);
        assert_relative_eq!(score.average_lap, 0.0);
        assert_relative_eq!(score.crashes.worst_crash_g, 0.0);
        assert_relative_eq!(score.crashes.average_crash_g, 0.0);
        assert_relative_eq!(score.score_breakdown.crash_factor, 1.0);
    }

    #[test]
    fn test_zero_race_laps_zeroes_base_score() {
        let mut ctx = test_ctx();
        ctx.race_lap_count = 0;
        let mut stats = CarStats::new(0, "Driver", "Car");
        stats.last_spline_pos = 0.4;

        let score = score_car(&stats, 1, &ctx, &ScoringConfig::default());

        assert_relative_eq!(score.score_breakdown.base_score, 0.0);
        assert_eq!(score.total_score, 0);
    }

    #[test]
    fn test_display_statistics() {
        let mut stats = finished_stats(&[90_100.0, 89_900.0]);
        stats.distance_covered = 10_000.0;
        stats.overtakes_made = 5;
        stats.times_overtaken = 2;

        let ctx = ScoreContext {
            total_cars: 2,
            track_length_m: 5000.0,
            race_lap_count: 2,
            best_total_time: 180.0,
        };
        let score = score_car(&stats, 1, &ctx, &ScoringConfig::default());

        assert_relative_eq!(score.total_time_seconds, 180.0);
        assert_eq!(score.total_time_formatted, "03:00.000");
        assert_relative_eq!(score.distance_covered_km, 10.0);
        assert_relative_eq!(score.distance_covered_miles, 6.21);
        assert_relative_eq!(score.average_speed_kmh, 200.0);
        assert_relative_eq!(score.average_speed_mph, 124.27);
        assert_relative_eq!(score.best_lap, 89.9);
        assert_relative_eq!(score.average_lap, 90.0);
        assert_eq!(score.lap_times, vec![90.1, 89.9]);
        assert_eq!(score.net_positions_gained, 3);
    }
}
