//! Polars conversion and parquet output for recorded traces.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use polars::prelude::{Column as Series, DataFrame, ParquetWriter, PolarsError, PolarsResult};

use crate::{Column, Recorder, Table, clear, drain, install_subscriber};

impl Table {
    /// Convert to a DataFrame with columns in sorted order.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let series = self
            .column_names()
            .into_iter()
            .map(|name| match &self.columns[name] {
                Column::U64(v) => Series::new(name.into(), v),
                Column::I64(v) => Series::new(name.into(), v),
                Column::F64(v) => Series::new(name.into(), v),
                Column::Bool(v) => Series::new(name.into(), v),
                Column::Str(v) => Series::new(name.into(), v),
            })
            .collect();
        DataFrame::new(series)
    }
}

impl Recorder {
    /// Convert every table; tables that fail to convert are skipped.
    pub fn to_dataframes(&self) -> HashMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}

pub fn drain_to_dataframes() -> HashMap<String, DataFrame> {
    drain().to_dataframes()
}

fn io_error(e: std::io::Error) -> PolarsError {
    PolarsError::IO {
        error: e.into(),
        msg: None,
    }
}

/// Write each frame to `{dir}/{name}.parquet`.
pub fn save_parquet(frames: &mut HashMap<String, DataFrame>, dir: &Path) -> PolarsResult<()> {
    std::fs::create_dir_all(dir).map_err(io_error)?;
    for (name, df) in frames.iter_mut() {
        let file = std::fs::File::create(dir.join(format!("{name}.parquet"))).map_err(io_error)?;
        ParquetWriter::new(file).finish(df)?;
    }
    Ok(())
}

fn run_dir_name(name: &str) -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let safe: String = name
        .chars()
        .take(60)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{secs}_{safe}")
}

/// Records solver traces for the lifetime of the guard and writes them as
/// parquet files to `{parent}/{unix_secs}_{name}/` on drop, followed by an
/// empty `_ready` marker file.
///
/// ```ignore
/// let mut rec = ScopedRecorder::new("target/traces", "village_line_search");
/// let solution = equilibrium::solve(&participants, &prices, &config);
/// let steps = &rec.get()["solver_step"];
/// ```
pub struct ScopedRecorder {
    run_dir: PathBuf,
    frames: Option<HashMap<String, DataFrame>>,
}

impl ScopedRecorder {
    /// Clears this thread's recorder and installs the global subscriber.
    pub fn new(parent: impl Into<PathBuf>, name: &str) -> Self {
        clear();
        install_subscriber();
        Self {
            run_dir: parent.into().join(run_dir_name(name)),
            frames: None,
        }
    }

    /// Frames recorded so far. The first call drains the recorder; later
    /// events are not picked up.
    pub fn get(&mut self) -> &HashMap<String, DataFrame> {
        self.frames.get_or_insert_with(drain_to_dataframes)
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

impl Drop for ScopedRecorder {
    fn drop(&mut self) {
        let mut frames = self.frames.take().unwrap_or_else(drain_to_dataframes);
        if frames.is_empty() {
            return;
        }
        if let Err(e) = save_parquet(&mut frames, &self.run_dir) {
            eprintln!("ScopedRecorder: failed to write {}: {e}", self.run_dir.display());
            return;
        }
        if let Err(e) = std::fs::File::create(self.run_dir.join("_ready")) {
            eprintln!("ScopedRecorder: failed to write _ready marker: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataframe_columns_sorted_and_typed() {
        let ((), recorder) = crate::record(|| {
            tracing::info!(target: "solver_step", step = 1u64, badness = 2.0f64, accepted = true);
            tracing::info!(target: "solver_step", step = 2u64, badness = 1.0f64, accepted = true);
        });
        let frames = recorder.to_dataframes();
        let df = &frames["solver_step"];
        assert_eq!(df.height(), 2);
        let names: Vec<&str> = df.get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["accepted", "badness", "step"]);
        let badness: Vec<f64> = df
            .column("badness")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(badness, vec![2.0, 1.0]);
    }

    #[test]
    fn test_run_dir_name_is_sanitized() {
        let name = run_dir_name("village / line search");
        let (secs, rest) = name.split_once('_').unwrap();
        assert!(secs.parse::<u64>().is_ok());
        assert_eq!(rest, "village___line_search");
    }
}
