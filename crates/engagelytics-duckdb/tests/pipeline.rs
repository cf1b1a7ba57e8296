use chrono::NaiveDateTime;

use engagelytics_core::backend::ConversionBackend;
use engagelytics_core::record::{EngagementRecord, SessionRecord};
use engagelytics_duckdb::DuckDbBackend;

fn ts(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").expect("fixture timestamp")
}

fn session(user_id: &str, at: &str, session_number: i64, pageviews: i64) -> SessionRecord {
    SessionRecord {
        session_ts: ts(at),
        user_id: user_id.to_string(),
        session_number,
        pageviews,
    }
}

fn engagement(user_id: &str, at: &str) -> EngagementRecord {
    EngagementRecord {
        engaged_at: ts(at),
        user_id: user_id.to_string(),
    }
}

fn backend_with(sessions: &[SessionRecord], engagements: &[EngagementRecord]) -> DuckDbBackend {
    let mut db = DuckDbBackend::open_in_memory("256MB").expect("db");
    db.load_sessions(sessions).expect("load sessions");
    db.load_engagements(engagements).expect("load engagements");
    db
}

#[test]
fn staging_preserves_row_counts() {
    let db = backend_with(
        &[
            session("u1", "2017-01-01 10:00:00", 1, 5),
            session("u1", "2017-01-02 10:00:00", 2, 3),
            session("u2", "2017-01-01 09:00:00", 1, 1),
        ],
        &[engagement("u1", "2017-01-02 10:00:00")],
    );
    assert_eq!(db.session_count().expect("count"), 3);
    assert_eq!(db.engagement_count().expect("count"), 1);
}

#[test]
fn repeated_loads_continue_row_numbering() {
    let mut db = DuckDbBackend::open_in_memory("256MB").expect("db");
    db.load_sessions(&[session("u1", "2017-01-01 10:00:00", 1, 5)])
        .expect("first load");
    db.load_sessions(&[session("u1", "2017-01-01 09:00:00", 2, 7)])
        .expect("second load");
    let max_idx: i64 = db
        .conn_for_test()
        .query_row("SELECT MAX(row_idx) FROM sessions", [], |row| row.get(0))
        .expect("max idx");
    assert_eq!(max_idx, 1);

    let merged = db.merged_sessions().expect("merged");
    assert_eq!(merged[0].pageviews, 5);
    assert_eq!(merged[1].pageviews, 7);
}

#[test]
fn empty_loads_are_noops() {
    let db = backend_with(&[], &[]);
    assert_eq!(db.session_count().expect("count"), 0);
    assert!(db.first_engagements().expect("first").is_empty());
    assert!(db.labeled_sessions().expect("labeled").is_empty());
}

#[test]
fn first_engagement_is_minimum_per_user() {
    let db = backend_with(
        &[],
        &[
            engagement("u2", "2017-03-05 12:00:00"),
            engagement("u1", "2017-02-01 08:00:00"),
            engagement("u1", "2017-01-15 08:00:00"),
            engagement("u1", "2017-01-20 08:00:00"),
            engagement("u2", "2017-03-04 12:00:00"),
            engagement("u1", "2017-01-15 08:00:00"),
        ],
    );
    let first = db.first_engagements().expect("first engagements");
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].user_id, "u1");
    assert_eq!(first[0].first_engagement, ts("2017-01-15 08:00:00"));
    assert_eq!(first[1].user_id, "u2");
    assert_eq!(first[1].first_engagement, ts("2017-03-04 12:00:00"));
}

#[test]
fn left_join_keeps_unengaged_users_with_null() {
    let db = backend_with(
        &[
            session("u1", "2017-01-01 10:00:00", 1, 5),
            session("ghost", "2017-01-01 11:00:00", 1, 9),
        ],
        &[engagement("u1", "2017-01-03 00:00:00")],
    );
    let merged = db.merged_sessions().expect("merged");
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].user_id, "u1");
    assert_eq!(merged[0].first_engagement, Some(ts("2017-01-03 00:00:00")));
    assert_eq!(merged[1].user_id, "ghost");
    assert_eq!(merged[1].first_engagement, None);
}

#[test]
fn filter_drops_post_engagement_and_unengaged_sessions() {
    let db = backend_with(
        &[
            session("u1", "2017-01-01 10:00:00", 1, 5),
            session("u1", "2017-01-02 10:00:00", 2, 3),
            session("u1", "2017-01-04 10:00:00", 3, 8),
            session("ghost", "2017-01-01 11:00:00", 1, 9),
        ],
        &[
            engagement("u1", "2017-01-02 10:00:00"),
            engagement("u1", "2017-01-05 10:00:00"),
        ],
    );
    let retained = db.pre_engagement_sessions().expect("filtered");
    assert_eq!(retained.len(), 2);
    for row in &retained {
        let first = row.first_engagement.expect("retained rows have a first engagement");
        assert!(row.session_ts <= first);
        assert_eq!(row.user_id, "u1");
    }
    assert_eq!(retained[0].session_number, 1);
    assert_eq!(retained[1].session_number, 2);
}

#[test]
fn two_session_example_flags_last_row_and_sums_pageviews() {
    let db = backend_with(
        &[
            session("u1", "2017-01-01 10:00:00", 1, 5),
            session("u1", "2017-01-02 10:00:00", 2, 3),
        ],
        &[engagement("u1", "2017-01-02 10:00:00")],
    );
    let labeled = db.labeled_sessions().expect("labeled");
    assert_eq!(labeled.len(), 2);
    assert!(!labeled[0].is_conversion);
    assert!(labeled[1].is_conversion);
    assert_eq!(labeled[1].session_ts, ts("2017-01-02 10:00:00"));
    let cum: Vec<i64> = labeled.iter().map(|r| r.pageviews_cum_sum).collect();
    assert_eq!(cum, vec![5, 8]);
}

#[test]
fn exactly_one_conversion_per_user_at_latest_session() {
    let db = backend_with(
        &[
            session("a", "2017-01-01 10:00:00", 1, 1),
            session("b", "2017-01-01 10:00:00", 1, 2),
            session("a", "2017-01-03 10:00:00", 3, 1),
            session("a", "2017-01-02 10:00:00", 2, 1),
            session("b", "2017-01-05 10:00:00", 2, 2),
            session("c", "2017-01-01 10:00:00", 1, 4),
        ],
        &[
            engagement("a", "2017-01-10 00:00:00"),
            engagement("b", "2017-01-10 00:00:00"),
            engagement("c", "2017-01-10 00:00:00"),
        ],
    );
    let labeled = db.labeled_sessions().expect("labeled");
    assert_eq!(labeled.len(), 6);

    for user in ["a", "b", "c"] {
        let rows: Vec<_> = labeled.iter().filter(|r| r.user_id == user).collect();
        let flagged: Vec<_> = rows.iter().filter(|r| r.is_conversion).collect();
        assert_eq!(flagged.len(), 1, "user {user}");
        let latest = rows.iter().map(|r| r.session_ts).max().expect("rows");
        assert_eq!(flagged[0].session_ts, latest, "user {user}");
    }
}

#[test]
fn tied_latest_sessions_flag_first_occurrence() {
    let db = backend_with(
        &[
            session("u1", "2017-01-01 10:00:00", 1, 2),
            session("u1", "2017-01-02 10:00:00", 2, 3),
            session("u1", "2017-01-02 10:00:00", 3, 4),
        ],
        &[engagement("u1", "2017-01-02 10:00:00")],
    );
    let labeled = db.labeled_sessions().expect("labeled");
    let flags: Vec<bool> = labeled.iter().map(|r| r.is_conversion).collect();
    assert_eq!(flags, vec![false, true, false]);
}

#[test]
fn cumulative_pageviews_follow_input_order_not_session_number() {
    let db = backend_with(
        &[
            session("u1", "2017-01-03 10:00:00", 3, 10),
            session("u2", "2017-01-01 10:00:00", 1, 100),
            session("u1", "2017-01-01 10:00:00", 1, 1),
            session("u1", "2017-01-02 10:00:00", 2, 5),
            session("u2", "2017-01-02 10:00:00", 2, 50),
        ],
        &[
            engagement("u1", "2017-01-09 00:00:00"),
            engagement("u2", "2017-01-09 00:00:00"),
        ],
    );
    let labeled = db.labeled_sessions().expect("labeled");
    let pairs: Vec<(&str, i64)> = labeled
        .iter()
        .map(|r| (r.user_id.as_str(), r.pageviews_cum_sum))
        .collect();
    assert_eq!(
        pairs,
        vec![("u1", 10), ("u2", 100), ("u1", 11), ("u1", 16), ("u2", 150)]
    );
}

#[test]
fn users_without_engagement_have_no_labeled_rows() {
    let db = backend_with(
        &[
            session("u1", "2017-01-01 10:00:00", 1, 5),
            session("lurker", "2017-01-01 10:00:00", 1, 50),
            session("lurker", "2017-01-02 10:00:00", 2, 50),
        ],
        &[engagement("u1", "2017-01-01 10:00:00")],
    );
    let labeled = db.labeled_sessions().expect("labeled");
    assert_eq!(labeled.len(), 1);
    assert_eq!(labeled[0].user_id, "u1");
    assert!(labeled[0].is_conversion);
    assert!(labeled.iter().all(|r| r.user_id != "lurker"));
}

#[test]
fn user_engaging_before_any_session_drops_out() {
    let db = backend_with(
        &[session("early", "2017-01-05 10:00:00", 1, 3)],
        &[engagement("early", "2017-01-01 10:00:00")],
    );
    assert!(db.pre_engagement_sessions().expect("filtered").is_empty());
    assert!(db.labeled_sessions().expect("labeled").is_empty());
}

#[test]
fn sub_second_times_survive_staging() {
    let db = backend_with(
        &[
            session("u1", "2017-01-01 10:00:00.300", 1, 2),
            session("u1", "2017-01-01 10:00:00.700", 2, 3),
            session("u1", "2017-01-02 10:00:00.500", 3, 4),
        ],
        &[engagement("u1", "2017-01-02 10:00:00")],
    );

    let retained = db.pre_engagement_sessions().expect("filtered");
    let numbers: Vec<i64> = retained.iter().map(|r| r.session_number).collect();
    assert_eq!(numbers, vec![1, 2]);

    let labeled = db.labeled_sessions().expect("labeled");
    assert_eq!(labeled.len(), 2);
    assert_eq!(labeled[0].session_ts, ts("2017-01-01 10:00:00.300"));
    assert!(!labeled[0].is_conversion);
    assert_eq!(labeled[1].session_ts, ts("2017-01-01 10:00:00.700"));
    assert!(labeled[1].is_conversion);
    assert_eq!(labeled[1].pageviews_cum_sum, 5);
}
