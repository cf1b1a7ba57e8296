//! CSV readers for the two input datasets.
//!
//! Both files carry a header row. Analysis columns are looked up by name;
//! the timestamp is always the third column, whatever its header says, and
//! becomes the record's uniform timestamp field.

use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::info;

use engagelytics_core::error::CoreError;
use engagelytics_core::record::{
    parse_calendar_timestamp, parse_unix_timestamp, EngagementRecord, SessionRecord,
};

/// Zero-based position of the timestamp column in both input files.
pub const TIMESTAMP_POSITION: usize = 2;

pub fn read_sessions(path: impl AsRef<Path>) -> Result<Vec<SessionRecord>> {
    let path = path.as_ref();
    let file = path.display().to_string();
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .with_context(|| format!("reading header of {file}"))?
        .clone();

    require_timestamp_column(&headers, &file)?;
    let user_idx = column_index(&headers, "user_id", &file)?;
    let number_idx = column_index(&headers, "session_number", &file)?;
    let pageviews_idx = column_index(&headers, "pageviews", &file)?;

    let mut sessions = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row = i + 1;
        let record = record.with_context(|| format!("reading {file} row {row}"))?;
        let raw_ts = field(&record, TIMESTAMP_POSITION);
        let session_ts =
            parse_calendar_timestamp(raw_ts).ok_or_else(|| CoreError::InvalidTimestamp {
                file: file.clone(),
                row,
                value: raw_ts.to_string(),
            })?;
        sessions.push(SessionRecord {
            session_ts,
            user_id: field(&record, user_idx).to_string(),
            session_number: parse_integer(&record, number_idx, "session_number", &file, row)?,
            pageviews: parse_integer(&record, pageviews_idx, "pageviews", &file, row)?,
        });
    }

    info!(file = %file, rows = sessions.len(), "Read sessions");
    Ok(sessions)
}

pub fn read_engagements(path: impl AsRef<Path>) -> Result<Vec<EngagementRecord>> {
    let path = path.as_ref();
    let file = path.display().to_string();
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .with_context(|| format!("reading header of {file}"))?
        .clone();

    require_timestamp_column(&headers, &file)?;
    let user_idx = column_index(&headers, "user_id", &file)?;

    let mut engagements = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row = i + 1;
        let record = record.with_context(|| format!("reading {file} row {row}"))?;
        let raw_ts = field(&record, TIMESTAMP_POSITION);
        let engaged_at =
            parse_unix_timestamp(raw_ts).ok_or_else(|| CoreError::InvalidTimestamp {
                file: file.clone(),
                row,
                value: raw_ts.to_string(),
            })?;
        engagements.push(EngagementRecord {
            engaged_at,
            user_id: field(&record, user_idx).to_string(),
        });
    }

    info!(file = %file, rows = engagements.len(), "Read engagements");
    Ok(engagements)
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))
}

fn require_timestamp_column(headers: &StringRecord, file: &str) -> Result<(), CoreError> {
    if headers.len() <= TIMESTAMP_POSITION {
        return Err(CoreError::MissingColumn {
            file: file.to_string(),
            column: format!("#{} (timestamp)", TIMESTAMP_POSITION + 1),
        });
    }
    Ok(())
}

fn column_index(headers: &StringRecord, name: &str, file: &str) -> Result<usize, CoreError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| CoreError::MissingColumn {
            file: file.to_string(),
            column: name.to_string(),
        })
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn parse_integer(
    record: &StringRecord,
    idx: usize,
    column: &str,
    file: &str,
    row: usize,
) -> Result<i64, CoreError> {
    let raw = field(record, idx);
    raw.parse().map_err(|_| CoreError::InvalidInteger {
        file: file.to_string(),
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}
