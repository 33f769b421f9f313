use crate::Result;
use crate::sweep::ResultTable;
use anyhow::{Context, anyhow};
use std::path::Path;
use tracing::info;

/// Process-count sweep.
pub const MULT_SCHEMA: [&str; 3] = ["num_proc", "avg_exec_time", "avg_final_cost"];

/// Jobs x processors x cooling sweep.
pub const SOLO_SCHEMA: [&str; 5] = [
    "num_jobs",
    "num_processors",
    "cooling_method",
    "final_cost",
    "execution_time",
];

/// Overwrite `path` with `schema` as header and one row per aggregated point.
///
/// Every row is rendered before the file is opened, so a schema the rows
/// cannot satisfy fails without touching the previous results.
pub fn write_results(table: &ResultTable, path: &Path, schema: &[&str]) -> Result<()> {
    let records = table
        .rows
        .iter()
        .map(|row| {
            schema
                .iter()
                .map(|col| {
                    row.column(col)
                        .ok_or_else(|| anyhow!("column {:?} not available for {}", col, row.point))
                })
                .collect::<Result<Vec<String>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let mut writer = ::csv::Writer::from_path(path)
        .with_context(|| format!("open result file {}", path.display()))?;
    writer
        .write_record(schema)
        .with_context(|| format!("write header to {}", path.display()))?;
    for record in &records {
        writer
            .write_record(record)
            .with_context(|| format!("write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush result file {}", path.display()))?;

    info!(rows = records.len(), path = %path.display(), "wrote results");
    Ok(())
}
