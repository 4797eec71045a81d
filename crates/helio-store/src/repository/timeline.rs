//! Client event log, kept as a tab of the clients workbook.

use helio_core::{timeline, TimelineEvent};

use crate::error::StoreResult;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct TimelineRepository {
    orchestrator: Orchestrator,
    key: String,
}

impl TimelineRepository {
    pub fn new(orchestrator: Orchestrator, key: impl Into<String>) -> Self {
        TimelineRepository {
            orchestrator,
            key: key.into(),
        }
    }

    /// Appends the event and returns its sheet row.
    pub async fn add(&self, event: &TimelineEvent) -> StoreResult<u32> {
        self.orchestrator
            .update(&self.key, |workbook| timeline::add_event(workbook, event))
            .await
    }

    pub async fn events_for(&self, client_name: &str) -> StoreResult<Vec<TimelineEvent>> {
        self.orchestrator
            .read(&self.key, |workbook| Ok(timeline::events_for(workbook, client_name)))
            .await
    }
}
