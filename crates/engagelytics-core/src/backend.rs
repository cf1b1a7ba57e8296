//! Storage/compute backend abstraction for the conversion pipeline.

use crate::record::{
    EngagementRecord, FirstEngagement, LabeledSession, MergedSession, SessionRecord,
};

/// Stages raw records and exposes each transformation step of the pipeline.
///
/// Every read returns rows in session input order unless noted otherwise, so
/// callers can rely on positional alignment between steps.
pub trait ConversionBackend {
    /// Append sessions. Input order is recorded and used as the row order
    /// for every later step.
    fn load_sessions(&mut self, sessions: &[SessionRecord]) -> anyhow::Result<()>;

    fn load_engagements(&mut self, engagements: &[EngagementRecord]) -> anyhow::Result<()>;

    /// Earliest engagement per user, ordered by `user_id`.
    fn first_engagements(&self) -> anyhow::Result<Vec<FirstEngagement>>;

    /// Sessions left-joined to first engagements.
    fn merged_sessions(&self) -> anyhow::Result<Vec<MergedSession>>;

    /// Merged sessions at or before the user's first engagement.
    fn pre_engagement_sessions(&self) -> anyhow::Result<Vec<MergedSession>>;

    /// Pre-engagement sessions with the conversion flag and cumulative
    /// page views attached.
    fn labeled_sessions(&self) -> anyhow::Result<Vec<LabeledSession>>;
}
