use anyhow::{anyhow, Result};

use engagelytics_core::record::LabeledSession;

use crate::queries::{parse_ts, ts_sql};
use crate::DuckDbBackend;

/// Pre-engagement sessions with `is_conversion` and `pageviews_cum_sum`, in
/// input order.
pub fn get_labeled_sessions_inner(db: &DuckDbBackend) -> Result<Vec<LabeledSession>> {
    let sql = format!(
        r#"
        SELECT
            {session_ts},
            user_id,
            session_number,
            pageviews,
            {first_engagement},
            is_conversion,
            pageviews_cum_sum
        FROM labeled_sessions
        ORDER BY row_idx
        "#,
        session_ts = ts_sql("session_ts"),
        first_engagement = ts_sql("first_engagement"),
    );

    let mut stmt = db.conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let session_ts: String = row.get(0)?;
        let user_id: String = row.get(1)?;
        let session_number: i64 = row.get(2)?;
        let pageviews: i64 = row.get(3)?;
        let first_engagement: Option<String> = row.get(4)?;
        let is_conversion: bool = row.get(5)?;
        let pageviews_cum_sum: i64 = row.get(6)?;
        Ok((
            session_ts,
            user_id,
            session_number,
            pageviews,
            first_engagement,
            is_conversion,
            pageviews_cum_sum,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (
            session_ts,
            user_id,
            session_number,
            pageviews,
            first_engagement,
            is_conversion,
            pageviews_cum_sum,
        ) = row?;
        // The filter view drops NULL first engagements; a NULL here is a schema bug.
        let first_engagement = first_engagement
            .ok_or_else(|| anyhow!("labeled session for {user_id} has no first engagement"))?;
        out.push(LabeledSession {
            session_ts: parse_ts(&session_ts)?,
            user_id,
            session_number,
            pageviews,
            first_engagement: parse_ts(&first_engagement)?,
            is_conversion,
            pageviews_cum_sum,
        });
    }
    Ok(out)
}
