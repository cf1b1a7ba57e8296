use anyhow::Result;
use duckdb::Connection;
use tracing::info;

use engagelytics_core::record::{EngagementRecord, SessionRecord};

use crate::queries::stage_ts;
use crate::schema::init_sql;

/// An in-memory DuckDB backend for one analysis run.
///
/// The connection is owned outright: the pipeline is single-threaded and
/// the database lives only as long as the run. Staging writes take
/// `&mut self` so each load is one transaction.
pub struct DuckDbBackend {
    pub(crate) conn: Connection,
}

impl DuckDbBackend {
    /// Open an in-memory database and create the staging tables and views.
    ///
    /// `memory_limit` is a DuckDB size string such as `"512MB"`, read from
    /// `Config.duckdb_memory_limit` at the call site.
    pub fn open_in_memory(memory_limit: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(memory_limit, "DuckDB opened in memory");
        Ok(Self { conn })
    }

    /// Insert sessions in a single transaction, numbering rows after any
    /// already staged so input order survives repeated loads.
    pub(crate) fn insert_sessions(&mut self, sessions: &[SessionRecord]) -> Result<()> {
        if sessions.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let start: i64 =
                tx.query_row("SELECT COALESCE(MAX(row_idx) + 1, 0) FROM sessions", [], |row| {
                    row.get(0)
                })?;
            let mut stmt = tx.prepare(
                "INSERT INTO sessions (row_idx, session_ts, user_id, session_number, pageviews) \
                 VALUES (?1, CAST(?2 AS TIMESTAMP), ?3, ?4, ?5)",
            )?;
            for (offset, session) in (0_i64..).zip(sessions) {
                stmt.execute(duckdb::params![
                    start + offset,
                    stage_ts(&session.session_ts),
                    session.user_id,
                    session.session_number,
                    session.pageviews,
                ])?;
            }
        }
        tx.commit()?;
        info!(rows = sessions.len(), "Staged sessions");
        Ok(())
    }

    pub(crate) fn insert_engagements(&mut self, engagements: &[EngagementRecord]) -> Result<()> {
        if engagements.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let start: i64 = tx.query_row(
                "SELECT COALESCE(MAX(row_idx) + 1, 0) FROM engagements",
                [],
                |row| row.get(0),
            )?;
            let mut stmt = tx.prepare(
                "INSERT INTO engagements (row_idx, engaged_at, user_id) \
                 VALUES (?1, CAST(?2 AS TIMESTAMP), ?3)",
            )?;
            for (offset, engagement) in (0_i64..).zip(engagements) {
                stmt.execute(duckdb::params![
                    start + offset,
                    stage_ts(&engagement.engaged_at),
                    engagement.user_id,
                ])?;
            }
        }
        tx.commit()?;
        info!(rows = engagements.len(), "Staged engagements");
        Ok(())
    }

    /// Number of staged session rows.
    pub fn session_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?)
    }

    pub fn engagement_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM engagements", [], |row| row.get(0))?)
    }

    /// Borrow the connection for direct queries.
    ///
    /// Intended for integration tests that need to inspect staged data.
    /// Production code should use the typed methods.
    pub fn conn_for_test(&self) -> &Connection {
        &self.conn
    }
}
