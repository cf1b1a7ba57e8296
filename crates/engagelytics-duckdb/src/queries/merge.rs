use anyhow::Result;

use engagelytics_core::record::MergedSession;

use crate::queries::{parse_ts, ts_sql};
use crate::DuckDbBackend;

/// Which stage of the join to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStage {
    /// Every session, with a NULL first engagement for users that never engaged.
    Merged,
    /// Only sessions at or before the user's first engagement.
    PreEngagement,
}

impl MergeStage {
    fn view(self) -> &'static str {
        match self {
            MergeStage::Merged => "merged_sessions",
            MergeStage::PreEngagement => "pre_engagement_sessions",
        }
    }
}

pub fn get_merged_sessions_inner(db: &DuckDbBackend, stage: MergeStage) -> Result<Vec<MergedSession>> {
    let sql = format!(
        r#"
        SELECT
            {session_ts},
            user_id,
            session_number,
            pageviews,
            {first_engagement}
        FROM {view}
        ORDER BY row_idx
        "#,
        session_ts = ts_sql("session_ts"),
        first_engagement = ts_sql("first_engagement"),
        view = stage.view(),
    );

    let mut stmt = db.conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let session_ts: String = row.get(0)?;
        let user_id: String = row.get(1)?;
        let session_number: i64 = row.get(2)?;
        let pageviews: i64 = row.get(3)?;
        let first_engagement: Option<String> = row.get(4)?;
        Ok((session_ts, user_id, session_number, pageviews, first_engagement))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (session_ts, user_id, session_number, pageviews, first_engagement) = row?;
        out.push(MergedSession {
            session_ts: parse_ts(&session_ts)?,
            user_id,
            session_number,
            pageviews,
            first_engagement: first_engagement.as_deref().map(parse_ts).transpose()?,
        });
    }
    Ok(out)
}
