use anyhow::Context;
use clap::Parser;
use plotters::prelude::*;
use racestats::core::handle_session::handle_session;
use racestats::post::score::ScoringConfig;
use racestats::post::session_report::SessionReport;
use racestats::pre::read_capture::read_capture;
use racestats::pre::read_config::read_scoring_config;
use racestats::pre::stats_opts::StatsOpts;
use racestats::pre::synthetic::{self, SynthPars};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// export_laptimes_plot draws the lap-time series of every driver into a PNG
/// in the output directory. Returns the path to the written file.
fn export_laptimes_plot(report: &SessionReport, out_dir: &Path) -> anyhow::Result<String> {
    std::fs::create_dir_all(out_dir)?;
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs();
    let filename = format!("laptimes_{}_{}.png", report.session_info.track, ts);
    let out_path = out_dir.join(filename);

    let tot_laps = report
        .driver_statistics
        .0
        .iter()
        .map(|(_, ds)| ds.lap_times.len())
        .max()
        .unwrap_or(0);
    anyhow::ensure!(tot_laps > 0, "No completed laps to plot!");

    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for (_, ds) in report.driver_statistics.0.iter() {
        for &lt in ds.lap_times.iter() {
            if lt < y_min {
                y_min = lt;
            }
            if lt > y_max {
                y_max = lt;
            }
        }
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        y_min = 0.0;
        y_max = 1.0;
    }
    let margin = ((y_max - y_min) * 0.05).max(0.5);
    y_min -= margin;
    y_max += margin;

    let root = BitMapBackend::new(&out_path, (1280, 720)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Lap times", ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(1u32..tot_laps as u32 + 1, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Lap")
        .y_desc("s")
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    let palette = Palette99::pick;
    for (i, (driver_name, ds)) in report.driver_statistics.0.iter().enumerate() {
        let series: Vec<(u32, f64)> = ds
            .lap_times
            .iter()
            .enumerate()
            .map(|(lap_idx, &lt)| (lap_idx as u32 + 1, lt))
            .collect();

        chart
            .draw_series(LineSeries::new(series.into_iter(), palette(i)))?
            .label(format!("P{} {}", ds.position, driver_name))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], palette(i)));
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .label_font(("sans-serif", 16))
        .position(plotters::chart::SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(out_path.to_string_lossy().into_owned())
}

/// emit_report persists the report, prints the summary and optionally exports
/// the lap-time plot.
fn emit_report(report: &SessionReport, opts: &StatsOpts) -> anyhow::Result<()> {
    let out_path = report.write_to_file(&opts.out_dir)?;
    println!("INFO: Statistics saved to {}", out_path.display());

    report.print_summary();

    if opts.plot {
        match export_laptimes_plot(report, &opts.out_dir) {
            Ok(plot_path) => println!("INFO: Lap-time plot saved to {}", plot_path),
            Err(e) => eprintln!("WARNING: Failed to export lap-time plot: {:#}", e),
        }
    }

    Ok(())
}

/// process_capture replays one capture file and emits its session report.
fn process_capture(
    capture_path: &Path,
    cfg: &ScoringConfig,
    opts: &StatsOpts,
) -> anyhow::Result<()> {
    println!("INFO: Processing capture {:?}", capture_path);

    let mut source = read_capture(capture_path)?;
    let report = handle_session(&mut source, cfg, opts.debug)?;
    emit_report(&report, opts)
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get options from the command line arguments
    let opts: StatsOpts = StatsOpts::parse();

    // get the scoring configuration
    let cfg = if let Some(config_path) = &opts.config_path {
        println!("INFO: Reading scoring configuration from {:?}", config_path);
        read_scoring_config(config_path)?
    } else {
        ScoringConfig::default()
    };

    // EXECUTION -----------------------------------------------------------------------------------
    let t_start = Instant::now();

    if let Some(no_cars) = opts.synth_cars {
        // SYNTHETIC CASE - score a generated demo session
        println!(
            "INFO: Scoring a synthetic {}-car session over {} laps (seed {})",
            no_cars, opts.synth_laps, opts.synth_seed
        );

        let pars = SynthPars {
            no_cars,
            no_laps: opts.synth_laps,
            ..SynthPars::default()
        };
        let mut source = synthetic::generate(&pars, opts.synth_seed);
        let report = handle_session(&mut source, &cfg, opts.debug)?;
        emit_report(&report, &opts)?;
    } else if let Some(capture_dir) = &opts.capture_dir {
        // BATCH CASE - every capture in the directory, processed in parallel
        let mut capture_paths: Vec<PathBuf> = std::fs::read_dir(capture_dir)
            .context(format!(
                "Failed to read capture directory {:?}!",
                capture_dir
            ))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|ext| ext == "csv").unwrap_or(false))
            .collect();
        capture_paths.sort();

        anyhow::ensure!(
            !capture_paths.is_empty(),
            "No capture files found in {:?}!",
            capture_dir
        );
        println!(
            "INFO: Processing {} captures from {:?}",
            capture_paths.len(),
            capture_dir
        );

        let failures: Vec<String> = capture_paths
            .par_iter()
            .filter_map(|capture_path| {
                process_capture(capture_path, &cfg, &opts)
                    .err()
                    .map(|e| format!("{}: {:#}", capture_path.display(), e))
            })
            .collect();

        for failure in failures.iter() {
            eprintln!("WARNING: {}", failure);
        }
        anyhow::ensure!(
            failures.is_empty(),
            "{} of {} captures failed!",
            failures.len(),
            capture_paths.len()
        );
    } else if let Some(capture_path) = &opts.capture_path {
        // SINGLE CAPTURE CASE
        process_capture(capture_path, &cfg, &opts)?;
    } else {
        anyhow::bail!(
            "No capture provided! Use -c <capture.csv>, --capture-dir <dir> or --synth-cars <n>."
        );
    }

    println!("INFO: Execution time: {}ms", t_start.elapsed().as_millis());

    Ok(())
}
