use crate::core::session::FinalizedSession;
use crate::post::score::{score_car, DriverScore, ScoreContext, ScoringConfig};
use anyhow::Context;
use chrono::Local;
use helpers::general::{format_time, round_to};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};

/// CrashPenaltyConfig echoes the penalty constants the statistics were
/// computed with, so a consumer can interpret the crash factors.
#[derive(Debug, Clone, Serialize)]
pub struct CrashPenaltyConfig {
    pub penalty_percent_per_g: f64,
    pub max_penalty_per_crash_g: f64,
}

/// SessionInfo is the session-wide header of the report.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub date: String,
    pub track: String,
    pub track_config: String,
    pub track_length_meters: f64,
    pub track_length_km: f64,
    pub track_length_miles: f64,
    pub total_cars: usize,
    pub race_laps: u32,
    pub session_duration_seconds: f64,
    pub session_duration_formatted: String,
    pub scoring_formula: String,
    pub best_total_time_seconds: f64,
    pub crash_penalty_config: CrashPenaltyConfig,
}

/// DriverStatistics maps driver name to the per-driver score record,
/// iterated in final-position order. It serializes into a JSON object that
/// preserves that order.
#[derive(Debug, Clone)]
pub struct DriverStatistics(pub Vec<(String, DriverScore)>);

impl Serialize for DriverStatistics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (driver_name, driver_score) in self.0.iter() {
            map.serialize_entry(driver_name, driver_score)?;
        }
        map.end()
    }
}

/// SessionReport contains all statistics of a finished session and is
/// persisted as the session output artifact.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_info: SessionInfo,
    pub driver_statistics: DriverStatistics,
}

impl SessionReport {
    /// build assembles the report from a finalized session: one score record
    /// per driver, in final race position order.
    pub fn build(finalized: &FinalizedSession, cfg: &ScoringConfig) -> SessionReport {
        let ctx = ScoreContext {
            total_cars: finalized.context.total_cars as u32,
            track_length_m: finalized.context.track_length_m,
            race_lap_count: finalized.context.race_lap_count,
            best_total_time: finalized.context.best_total_time,
        };

        let driver_statistics = finalized
            .cars
            .iter()
            .map(|stats| {
                (
                    stats.driver_name.to_owned(),
                    score_car(stats, stats.final_position, &ctx, cfg),
                )
            })
            .collect();

        SessionReport {
            session_info: SessionInfo {
                date: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                track: finalized.track_name.to_owned(),
                track_config: finalized.track_config.to_owned(),
                track_length_meters: round_to(finalized.context.track_length_m, 2),
                track_length_km: round_to(finalized.context.track_length_m / 1000.0, 3),
                track_length_miles: round_to(finalized.context.track_length_m / 1609.34, 3),
                total_cars: finalized.context.total_cars,
                race_laps: finalized.context.race_lap_count,
                session_duration_seconds: round_to(finalized.context.session_total_time, 2),
                session_duration_formatted: format_time(finalized.context.session_total_time),
                scoring_formula:
                    "score = base_score × position_factor × speed_factor × crash_factor"
                        .to_owned(),
                best_total_time_seconds: round_to(finalized.context.best_total_time, 3),
                crash_penalty_config: CrashPenaltyConfig {
                    penalty_percent_per_g: cfg.crash_penalty_percent_per_g,
                    max_penalty_per_crash_g: cfg.max_crash_penalty_per_crash_g,
                },
            },
            driver_statistics: DriverStatistics(driver_statistics),
        }
    }

    /// file_name derives the output file name from the track labels and the
    /// current local time: stats_{track}[-{config}]_{YYYYMMDD_HHMMSS}.json.
    /// Path separators in the track name are sanitized away.
    pub fn file_name(&self) -> String {
        let track_name = self
            .session_info
            .track
            .replace('/', "_")
            .replace('\\', "_");

        let track_full = if self.session_info.track_config.is_empty() {
            track_name
        } else {
            format!("{}-{}", track_name, self.session_info.track_config)
        };

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        format!("stats_{}_{}.json", track_full, timestamp)
    }

    /// write_to_file writes the pretty-printed report into the session output
    /// directory, creating the directory if it does not exist. Returns the
    /// path of the written file.
    pub fn write_to_file(&self, out_dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(out_dir).context(format!(
            "Failed to create output directory {}!",
            out_dir.display()
        ))?;

        let out_path = out_dir.join(self.file_name());
        let fh = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&out_path)
            .context(format!(
                "Failed to open statistics file {}!",
                out_path.display()
            ))?;

        serde_json::to_writer_pretty(&fh, self).context(format!(
            "Failed to serialize session statistics to {}!",
            out_path.display()
        ))?;

        Ok(out_path)
    }

    /// print_summary prints the per-driver results to the console output.
    pub fn print_summary(&self) {
        let info = &self.session_info;

        println!("{}", "=".repeat(50));
        println!("RESULT: Race statistics summary");
        println!("{}", "=".repeat(50));
        println!("Track: {} ({} km)", info.track, info.track_length_km);
        println!("Session duration: {}", info.session_duration_formatted);
        println!(
            "Best total time: {}",
            format_time(info.best_total_time_seconds)
        );
        println!("{}", "=".repeat(50));

        for (driver_name, ds) in self.driver_statistics.0.iter() {
            println!();
            println!("P{} - {}:", ds.position, driver_name);
            println!("  SCORE: {} points", ds.total_score);
            println!(
                "    Base: {:.2} x Position: {:.3} x Speed: {:.3} x Crash: {:.3}",
                ds.score_breakdown.base_score,
                ds.score_breakdown.position_factor,
                ds.score_breakdown.speed_factor,
                ds.score_breakdown.crash_factor
            );
            println!(
                "    (Crash penalty: -{:.2}%)",
                ds.score_breakdown.crash_penalty_percent
            );
            println!("  Total time: {}", ds.total_time_formatted);
            println!(
                "  Laps completed: {} + {:.1}% partial",
                ds.laps_completed,
                ds.partial_lap_completion * 100.0
            );
            println!("  Distance: {} km", ds.distance_covered_km);
            println!("  Avg speed: {} km/h", ds.average_speed_kmh);
            println!("  Best lap: {}s", ds.best_lap);
            println!(
                "  Overtakes: {} / Overtaken: {}",
                ds.overtakes_made, ds.times_overtaken
            );
            println!(
                "  Crashes: {} (worst: {}g, total intensity: {}g)",
                ds.crashes.total_crashes, ds.crashes.worst_crash_g,
                ds.crashes.total_crash_intensity
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::car_stats::CarStats;
    use crate::core::session::SessionContext;

    fn finalized_two_cars() -> FinalizedSession {
        let mut winner = CarStats::new(0, "Alice", "Fast Car");
        winner.lap_times = vec![90_000.0, 91_000.0];
        winner.distance_covered = 10_000.0;
        winner.final_position = 1;
        winner.last_position = 1;

        let mut runner_up = CarStats::new(1, "Bob", "Slow Car");
        runner_up.lap_times = vec![95_000.0];
        runner_up.distance_covered = 7_500.0;
        runner_up.crash_intensities = vec![6.5];
        runner_up.final_position = 2;
        runner_up.last_position = 2;

        FinalizedSession {
            cars: vec![winner, runner_up],
            context: SessionContext {
                total_cars: 2,
                track_length_m: 5000.0,
                race_lap_count: 2,
                session_total_time: 200.0,
                best_total_time: 95.0,
            },
            track_name: "monza".to_owned(),
            track_config: "gp".to_owned(),
        }
    }

    #[test]
    fn test_report_structure_and_field_names() {
        let report = SessionReport::build(&finalized_two_cars(), &ScoringConfig::default());
        let value = serde_json::to_value(&report).unwrap();

        let info = &value["session_info"];
        assert_eq!(info["track"], "monza");
        assert_eq!(info["track_config"], "gp");
        assert_eq!(info["track_length_meters"], 5000.0);
        assert_eq!(info["track_length_km"], 5.0);
        assert_eq!(info["total_cars"], 2);
        assert_eq!(info["race_laps"], 2);
        assert_eq!(info["session_duration_seconds"], 200.0);
        assert_eq!(info["session_duration_formatted"], "03:20.000");
        assert_eq!(info["best_total_time_seconds"], 95.0);
        assert_eq!(info["crash_penalty_config"]["penalty_percent_per_g"], 0.01);
        assert_eq!(
            info["crash_penalty_config"]["max_penalty_per_crash_g"],
            100.0
        );

        let alice = &value["driver_statistics"]["Alice"];
        assert_eq!(alice["position"], 1);
        assert_eq!(alice["car_name"], "Fast Car");
        assert_eq!(alice["laps_completed"], 2);
        assert!(alice["score_breakdown"]["base_score"].is_number());
        assert!(alice["crashes"]["total_crashes"].is_number());

        let bob = &value["driver_statistics"]["Bob"];
        assert_eq!(bob["crashes"]["total_crashes"], 1);
        assert_eq!(bob["crashes"]["worst_crash_g"], 6.5);
    }

    #[test]
    fn test_driver_statistics_preserve_position_order() {
        let report = SessionReport::build(&finalized_two_cars(), &ScoringConfig::default());
        let json = serde_json::to_string(&report).unwrap();

        let alice_at = json.find("\"Alice\"").unwrap();
        let bob_at = json.find("\"Bob\"").unwrap();
        assert!(alice_at < bob_at);
    }

    #[test]
    fn test_file_name_convention() {
        let report = SessionReport::build(&finalized_two_cars(), &ScoringConfig::default());
        let file_name = report.file_name();

        assert!(file_name.starts_with("stats_monza-gp_"));
        assert!(file_name.ends_with(".json"));
        // stats_{track}-{config}_{YYYYMMDD_HHMMSS}.json
        let timestamp = &file_name["stats_monza-gp_".len()..file_name.len() - ".json".len()];
        assert_eq!(timestamp.len(), 15);
        assert_eq!(timestamp.as_bytes()[8], b'_');
    }

    #[test]
    fn test_file_name_without_config_and_sanitized_track() {
        let mut finalized = finalized_two_cars();
        finalized.track_name = "spa/francorchamps".to_owned();
        finalized.track_config = String::new();

        let report = SessionReport::build(&finalized, &ScoringConfig::default());

        assert!(report.file_name().starts_with("stats_spa_francorchamps_"));
    }

    #[test]
    fn test_write_to_file_creates_directory() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let out_dir = tmp_dir.path().join("race_statistics");

        let report = SessionReport::build(&finalized_two_cars(), &ScoringConfig::default());
        let out_path = report.write_to_file(&out_dir).unwrap();

        let written = std::fs::read_to_string(&out_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["session_info"]["total_cars"], 2);
    }
}
