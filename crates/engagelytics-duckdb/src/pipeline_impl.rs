use anyhow::Result;

use engagelytics_core::backend::ConversionBackend;
use engagelytics_core::record::{
    EngagementRecord, FirstEngagement, LabeledSession, MergedSession, SessionRecord,
};

use crate::queries::merge::MergeStage;
use crate::DuckDbBackend;

impl ConversionBackend for DuckDbBackend {
    fn load_sessions(&mut self, sessions: &[SessionRecord]) -> Result<()> {
        self.insert_sessions(sessions)
    }

    fn load_engagements(&mut self, engagements: &[EngagementRecord]) -> Result<()> {
        self.insert_engagements(engagements)
    }

    fn first_engagements(&self) -> Result<Vec<FirstEngagement>> {
        crate::queries::first_engagement::get_first_engagements_inner(self)
    }

    fn merged_sessions(&self) -> Result<Vec<MergedSession>> {
        crate::queries::merge::get_merged_sessions_inner(self, MergeStage::Merged)
    }

    fn pre_engagement_sessions(&self) -> Result<Vec<MergedSession>> {
        crate::queries::merge::get_merged_sessions_inner(self, MergeStage::PreEngagement)
    }

    fn labeled_sessions(&self) -> Result<Vec<LabeledSession>> {
        crate::queries::labels::get_labeled_sessions_inner(self)
    }
}
