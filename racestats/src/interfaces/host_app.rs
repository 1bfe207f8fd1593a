use crate::core::session::Session;
use crate::interfaces::sample_source::{FrameSample, SessionEnd};
use crate::post::score::ScoringConfig;
use crate::post::session_report::SessionReport;
use std::path::PathBuf;

/// Handle reported to the host on activation, also when the app runs
/// degraded without its status window.
pub const APP_NAME: &str = "RaceStats";

/// StatsApp is the facade a host simulation embeds: activate once, update
/// once per frame, shutdown once when the session ends. None of the
/// lifecycle methods fails into the host, a broken frame or a broken disk
/// must never abort the hosting session.
pub struct StatsApp {
    session: Session,
    cfg: ScoringConfig,
    out_dir: PathBuf,
}

impl StatsApp {
    pub fn new(cfg: ScoringConfig, out_dir: PathBuf) -> StatsApp {
        StatsApp {
            session: Session::new(&cfg),
            cfg,
            out_dir,
        }
    }

    /// on_activate logs the outcome of the host-side window setup and returns
    /// the app handle. A failed setup leaves the app degraded but named: it
    /// keeps tracking without a status display.
    pub fn on_activate(&self, window_setup: anyhow::Result<()>) -> &'static str {
        match window_setup {
            Ok(()) => println!("INFO: {} app started", APP_NAME),
            Err(e) => eprintln!(
                "WARNING: {} running without status window: {:#}",
                APP_NAME, e
            ),
        }

        APP_NAME
    }

    /// on_frame forwards one frame of telemetry to the session aggregator.
    pub fn on_frame(&mut self, frame: &FrameSample) {
        self.session.update_frame(frame);
    }

    /// on_shutdown finalizes the session and persists the statistics. A
    /// persistence failure is logged with its full cause chain and swallowed:
    /// the racing is over, there is nothing to retry, and the host session
    /// must not be affected. The in-memory report is returned either way.
    pub fn on_shutdown(self, end: &SessionEnd) -> SessionReport {
        println!("INFO: Session ending, saving statistics...");

        let finalized = self.session.finalize(end);
        let report = SessionReport::build(&finalized, &self.cfg);

        match report.write_to_file(&self.out_dir) {
            Ok(out_path) => println!("INFO: Statistics saved to {}", out_path.display()),
            Err(e) => eprintln!("WARNING: Failed to save session statistics: {:#}", e),
        }

        report.print_summary();
        report
    }
}
