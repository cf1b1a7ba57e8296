pub mod first_engagement;
pub mod labels;
pub mod merge;

use anyhow::{anyhow, Result};
use chrono::NaiveDateTime;

/// Text form used to bind timestamps into DuckDB. TIMESTAMP keeps
/// microseconds, so finer digits are dropped here rather than by the cast.
const STAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Layout [`ts_sql`] produces; `%f` in DuckDB's `strftime` is microseconds.
const READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub(crate) fn stage_ts(ts: &NaiveDateTime) -> String {
    ts.format(STAGE_FORMAT).to_string()
}

/// Render a TIMESTAMP column in the format [`parse_ts`] reads back.
pub(crate) fn ts_sql(column: &str) -> String {
    format!("strftime({column}, '%Y-%m-%d %H:%M:%S.%f')")
}

pub(crate) fn parse_ts(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, READ_FORMAT)
        .map_err(|e| anyhow!("unexpected timestamp `{raw}` from DuckDB: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_text_keeps_microseconds() {
        let ts = parse_ts("2017-01-01 10:00:00.300000").expect("parse");
        assert_eq!(stage_ts(&ts), "2017-01-01 10:00:00.300000");
        assert_eq!(
            parse_ts("2017-01-01 10:00:00.000000").expect("parse"),
            parse_ts("2017-01-01 10:00:00").expect("parse")
        );
    }

    #[test]
    fn strftime_round_trip_is_lossless_to_the_microsecond() {
        let conn = duckdb::Connection::open_in_memory().expect("db");
        let ts = parse_ts("2017-01-01 10:00:00.123456").expect("parse");
        let raw: String = conn
            .query_row(
                &format!("SELECT {} FROM (SELECT CAST(?1 AS TIMESTAMP) AS t)", ts_sql("t")),
                duckdb::params![stage_ts(&ts)],
                |row| row.get(0),
            )
            .expect("round trip");
        assert_eq!(parse_ts(&raw).expect("parse"), ts);
    }
}
