use crate::core::session::Session;
use crate::interfaces::sample_source::SampleSource;
use crate::post::score::ScoringConfig;
use crate::post::session_report::SessionReport;

/// handle_session pumps all frames out of the sample source, aggregates them
/// into a session, finalizes it and returns the finished report for
/// post-processing.
pub fn handle_session(
    source: &mut dyn SampleSource,
    cfg: &ScoringConfig,
    print_debug: bool,
) -> anyhow::Result<SessionReport> {
    let mut session = Session::new(cfg);

    let mut t_update_print = 0.0;
    let mut no_frames: u64 = 0;

    while let Some(frame) = source.next_frame() {
        session.update_frame(&frame);
        no_frames += 1;

        if print_debug && session.session_total_time() > t_update_print + 0.9999 {
            println!(
                "INFO: Tracking... Current session time is {:.3}s ({} frames, {} cars)",
                session.session_total_time(),
                no_frames,
                session.no_cars()
            );
            t_update_print = session.session_total_time();
        }
    }

    let finalized = session.finalize(&source.session_end());
    Ok(SessionReport::build(&finalized, cfg))
}
