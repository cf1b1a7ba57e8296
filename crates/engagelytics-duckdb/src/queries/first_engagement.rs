use anyhow::Result;

use engagelytics_core::record::FirstEngagement;

use crate::queries::{parse_ts, ts_sql};
use crate::DuckDbBackend;

pub fn get_first_engagements_inner(db: &DuckDbBackend) -> Result<Vec<FirstEngagement>> {
    let sql = format!(
        "SELECT user_id, {} FROM first_engagements ORDER BY user_id",
        ts_sql("first_engagement")
    );
    let mut stmt = db.conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let user_id: String = row.get(0)?;
        let first_engagement: String = row.get(1)?;
        Ok((user_id, first_engagement))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (user_id, first_engagement) = row?;
        out.push(FirstEngagement {
            user_id,
            first_engagement: parse_ts(&first_engagement)?,
        });
    }
    Ok(out)
}
