/// DuckDB initialization SQL.
///
/// Executed once when the in-memory database is opened. The staging tables
/// hold raw input rows; each pipeline step is a view over the previous one,
/// so reading any view re-derives it from the staged rows.
///
/// `row_idx` records input order. Views that need a stable order (the
/// running page-view total, the tie-break for the conversion flag, and the
/// final output) order by it rather than by any timestamp.
///
/// `memory_limit` is interpolated verbatim; `Config::from_env` only accepts
/// `<digits><unit>` values.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 1;

-- ===========================================
-- STAGING
-- ===========================================
CREATE TABLE IF NOT EXISTS sessions (
    row_idx         BIGINT NOT NULL,               -- position in the input file
    session_ts      TIMESTAMP NOT NULL,
    user_id         VARCHAR NOT NULL,
    session_number  BIGINT NOT NULL,
    pageviews       BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS engagements (
    row_idx         BIGINT NOT NULL,
    engaged_at      TIMESTAMP NOT NULL,
    user_id         VARCHAR NOT NULL
);

-- ===========================================
-- PIPELINE VIEWS
-- ===========================================
CREATE OR REPLACE VIEW first_engagements AS
SELECT
    user_id,
    MIN(engaged_at) AS first_engagement
FROM engagements
GROUP BY user_id;

-- Left join: users without engagements keep a NULL first_engagement.
CREATE OR REPLACE VIEW merged_sessions AS
SELECT
    s.row_idx,
    s.session_ts,
    s.user_id,
    s.session_number,
    s.pageviews,
    f.first_engagement
FROM sessions s
LEFT JOIN first_engagements f ON f.user_id = s.user_id;

-- NULL >= x is never true, so users without engagements drop out here.
CREATE OR REPLACE VIEW pre_engagement_sessions AS
SELECT *
FROM merged_sessions
WHERE first_engagement >= session_ts;

CREATE OR REPLACE VIEW labeled_sessions AS
SELECT
    row_idx,
    session_ts,
    user_id,
    session_number,
    pageviews,
    first_engagement,
    ROW_NUMBER() OVER (
        PARTITION BY user_id
        ORDER BY session_ts DESC, row_idx ASC
    ) = 1 AS is_conversion,
    CAST(SUM(pageviews) OVER (
        PARTITION BY user_id
        ORDER BY row_idx
        ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW
    ) AS BIGINT) AS pageviews_cum_sum
FROM pre_engagement_sessions;
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_sql_sets_resource_limits() {
        let sql = init_sql("256MB");
        assert!(sql.starts_with("SET memory_limit = '256MB';"));
        assert!(sql.contains("SET threads = 1;"));
    }

    #[test]
    fn init_sql_runs_on_fresh_connection() {
        let conn = duckdb::Connection::open_in_memory().expect("open");
        conn.execute_batch(&init_sql("256MB")).expect("schema");
        // Idempotent: safe to run twice.
        conn.execute_batch(&init_sql("256MB")).expect("schema rerun");
        let views: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM duckdb_views() WHERE view_name IN \
                 ('first_engagements', 'merged_sessions', 'pre_engagement_sessions', 'labeled_sessions')",
                [],
                |row| row.get(0),
            )
            .expect("count views");
        assert_eq!(views, 4);
    }
}
