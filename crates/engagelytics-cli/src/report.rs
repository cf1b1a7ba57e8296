//! Console report: dataset previews, the headline prediction, and the
//! machine-readable model summary.

use std::fmt::{self, Write as _};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use engagelytics_core::model::{LogitFit, ProbabilityCurve};
use engagelytics_core::record::{format_timestamp, EngagementRecord, SessionRecord};

/// Rows shown by the dataset previews.
pub const PREVIEW_ROWS: usize = 5;

pub fn preview_sessions(sessions: &[SessionRecord]) -> Result<String> {
    let mut out = String::new();
    write_session_preview(&mut out, sessions)?;
    Ok(out)
}

fn write_session_preview(out: &mut String, sessions: &[SessionRecord]) -> fmt::Result {
    writeln!(
        out,
        "{:>4}  {:<19}  {:<16}  {:>14}  {:>9}",
        "", "datetime", "user_id", "session_number", "pageviews"
    )?;
    for (i, s) in sessions.iter().take(PREVIEW_ROWS).enumerate() {
        writeln!(
            out,
            "{:>4}  {:<19}  {:<16}  {:>14}  {:>9}",
            i,
            format_timestamp(&s.session_ts),
            s.user_id,
            s.session_number,
            s.pageviews
        )?;
    }
    write!(out, "[{} rows]", sessions.len())
}

pub fn preview_engagements(engagements: &[EngagementRecord]) -> Result<String> {
    let mut out = String::new();
    write_engagement_preview(&mut out, engagements)?;
    Ok(out)
}

fn write_engagement_preview(out: &mut String, engagements: &[EngagementRecord]) -> fmt::Result {
    writeln!(out, "{:>4}  {:<19}  {:<16}", "", "datetime", "user_id")?;
    for (i, e) in engagements.iter().take(PREVIEW_ROWS).enumerate() {
        writeln!(
            out,
            "{:>4}  {:<19}  {:<16}",
            i,
            format_timestamp(&e.engaged_at),
            e.user_id
        )?;
    }
    write!(out, "[{} rows]", engagements.len())
}

pub fn prediction_line(pageviews: usize, probability: f64) -> String {
    format!("The probability of converting after {pageviews} pageviews is {probability}")
}

#[derive(Debug, Serialize)]
pub struct ModelSummary<'a> {
    pub fit: &'a LogitFit,
    pub prediction_pageviews: usize,
    pub predicted_probability: f64,
    pub curve: &'a ProbabilityCurve,
}

pub fn write_model_summary(path: &Path, summary: &ModelSummary<'_>) -> Result<()> {
    let json = serde_json::to_vec_pretty(summary)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Wrote model summary");
    Ok(())
}
