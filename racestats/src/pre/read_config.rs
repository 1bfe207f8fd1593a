use crate::post::score::ScoringConfig;
use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;

/// read_scoring_config reads the JSON file and decodes the JSON string into
/// the scoring configuration struct. Fields missing from the file keep their
/// default values.
pub fn read_scoring_config(filepath: &Path) -> anyhow::Result<ScoringConfig> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open scoring config file {}!",
            filepath.display()
        ))?;
    let cfg = serde_json::from_reader(&fh).context(format!(
        "Failed to parse scoring config file {}!",
        filepath.display()
    ))?;
    Ok(cfg)
}
