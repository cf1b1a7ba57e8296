use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use engagelytics_core::record::{format_timestamp, LabeledSession};

pub const TRANSFORMED_HEADER: [&str; 7] = [
    "datetime_session",
    "user_id",
    "session_number",
    "pageviews",
    "datetime_first_engagement",
    "is_conversion",
    "pageviews_cum_sum",
];

fn bool_field(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Serialise labeled sessions to CSV in memory, preserving row order.
pub fn build_csv(rows: &[LabeledSession]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::with_capacity(rows.len().saturating_mul(96)));

    wtr.write_record(TRANSFORMED_HEADER)
        .map_err(|e| anyhow::anyhow!("csv write_record failed: {e}"))?;

    for row in rows {
        let session_number = row.session_number.to_string();
        let pageviews = row.pageviews.to_string();
        let cum_sum = row.pageviews_cum_sum.to_string();
        wtr.write_record([
            format_timestamp(&row.session_ts).as_str(),
            row.user_id.as_str(),
            session_number.as_str(),
            pageviews.as_str(),
            format_timestamp(&row.first_engagement).as_str(),
            bool_field(row.is_conversion),
            cum_sum.as_str(),
        ])
        .map_err(|e| anyhow::anyhow!("csv write_record failed: {e}"))?;
    }

    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("csv flush failed: {e}"))
}

/// Write the transformed table to `path`. The parent directory must exist.
pub fn write_transformed(path: &Path, rows: &[LabeledSession]) -> Result<()> {
    let bytes = build_csv(rows)?;
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "Wrote transformed sessions");
    Ok(())
}
