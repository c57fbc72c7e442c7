use anyhow::{Context, Result};
use apilog_core::aggregate::EndpointPivot;
use serde::Serialize;
use std::path::Path;

/// Write rows to a CSV file, with a header row taken from the field names
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    tracing::debug!("Exporting {} rows to {}", rows.len(), path.display());

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Write the pivot table: one row per endpoint, one column per verb
pub fn write_pivot(path: &Path, pivot: &EndpointPivot) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header = vec!["endpoint"];
    header.extend(pivot.verbs.iter().map(String::as_str));
    writer.write_record(&header)?;

    for (endpoint, counts) in pivot.endpoints.iter().zip(&pivot.counts) {
        let mut record = vec![endpoint.to_string()];
        record.extend(counts.iter().map(|count| count.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    tracing::info!(
        "Wrote {} x {} pivot to {}",
        pivot.endpoints.len(),
        pivot.verbs.len(),
        path.display()
    );
    Ok(())
}
