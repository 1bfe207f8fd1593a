use crate::interfaces::sample_source::{CarSample, FrameSample, SampleSource, SessionEnd};
use anyhow::Context;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Read;
use std::path::Path;

/// CaptureRow is one CSV record of a telemetry capture: one car in one frame.
/// Rows of the same frame share the `frame` index. The acceleration columns
/// are left empty when the host provided no sample for that car in that
/// frame.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureRow {
    pub frame: u64,
    pub delta_t: f64,
    pub track_length_m: f64,
    pub car_id: u32,
    pub driver_name: String,
    pub car_name: String,
    pub position: u32,
    pub lap_count: u32,
    pub lap_time_ms: f64,
    pub spline_pos: f64,
    pub g_x: Option<f64>,
    pub g_y: Option<f64>,
    pub g_z: Option<f64>,
}

/// ReplaySource replays a recorded capture frame by frame through the
/// `SampleSource` boundary.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    frames: VecDeque<FrameSample>,
    end: SessionEnd,
}

impl ReplaySource {
    /// from_frames wraps an already assembled frame list into a source.
    pub fn from_frames(frames: Vec<FrameSample>, end: SessionEnd) -> ReplaySource {
        ReplaySource {
            frames: frames.into(),
            end,
        }
    }

    /// no_frames returns the number of frames left to replay.
    pub fn no_frames(&self) -> usize {
        self.frames.len()
    }
}

impl SampleSource for ReplaySource {
    fn next_frame(&mut self) -> Option<FrameSample> {
        self.frames.pop_front()
    }

    fn session_end(&self) -> SessionEnd {
        self.end.clone()
    }
}

/// read_capture reads a CSV capture file and groups its rows into frame
/// samples. The track labels for the report are derived from the file stem:
/// everything before the first `-` is the track name, anything after it the
/// track configuration (e.g. `monza-gp.csv`).
pub fn read_capture(filepath: &Path) -> anyhow::Result<ReplaySource> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open capture file {}!",
            filepath.display()
        ))?;

    let frames = read_capture_frames(fh).context(format!(
        "Failed to parse capture file {}!",
        filepath.display()
    ))?;

    let stem = filepath
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (track_name, track_config) = match stem.split_once('-') {
        Some((track_name, track_config)) => (track_name.to_owned(), track_config.to_owned()),
        None => (stem, String::new()),
    };

    Ok(ReplaySource::from_frames(
        frames,
        SessionEnd {
            track_name,
            track_config,
        },
    ))
}

/// read_capture_frames decodes capture rows from any reader and groups
/// consecutive rows with the same frame index into one frame sample.
pub fn read_capture_frames<R: Read>(reader: R) -> anyhow::Result<Vec<FrameSample>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut frames: Vec<FrameSample> = Vec::new();
    let mut cur_frame: Option<u64> = None;

    for result in csv_reader.deserialize() {
        let row: CaptureRow = result.context("Failed to decode capture row!")?;

        let g_force = match (row.g_x, row.g_y, row.g_z) {
            (Some(g_x), Some(g_y), Some(g_z)) => Some([g_x, g_y, g_z]),
            _ => None,
        };

        if cur_frame != Some(row.frame) {
            cur_frame = Some(row.frame);
            frames.push(FrameSample {
                delta_t: row.delta_t,
                track_length_m: row.track_length_m,
                cars: Vec::new(),
            });
        }

        if let Some(frame) = frames.last_mut() {
            frame.cars.push(CarSample {
                car_id: row.car_id,
                driver_name: row.driver_name,
                car_name: row.car_name,
                position: row.position,
                lap_count: row.lap_count,
                lap_time_ms: row.lap_time_ms,
                spline_pos: row.spline_pos,
                g_force,
            });
        }
    }

    Ok(frames)
}
