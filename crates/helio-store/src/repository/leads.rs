//! Lead pipeline on the leads workbook.

use helio_core::{leads, Lead, LeadField, NewLead};

use crate::error::StoreResult;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct LeadRepository {
    orchestrator: Orchestrator,
    key: String,
}

impl LeadRepository {
    pub fn new(orchestrator: Orchestrator, key: impl Into<String>) -> Self {
        LeadRepository {
            orchestrator,
            key: key.into(),
        }
    }

    /// Reference the next lead would get. `A0001` before the first lead.
    pub async fn next_ref_no(&self) -> StoreResult<String> {
        match self
            .orchestrator
            .read(&self.key, |workbook| {
                Ok(leads::next_ref_no(workbook.get_sheet(&leads::leads_sheet_name())))
            })
            .await
        {
            Err(err) if err.is_not_found() => Ok(leads::next_ref_no(None)),
            other => other,
        }
    }

    /// Appends the lead and returns its reference number.
    pub async fn add(&self, new_lead: &NewLead) -> StoreResult<String> {
        self.orchestrator
            .update(&self.key, |workbook| leads::add_lead(workbook, new_lead))
            .await
    }

    /// `index` is zero-based over the data rows, as returned by [`list`].
    ///
    /// [`list`]: LeadRepository::list
    pub async fn update_field(&self, index: usize, field: LeadField, value: &str) -> StoreResult<()> {
        self.orchestrator
            .update(&self.key, |workbook| leads::update_lead_field(workbook, index, field, value))
            .await
    }

    pub async fn delete(&self, index: usize) -> StoreResult<()> {
        self.orchestrator
            .update(&self.key, |workbook| leads::delete_lead(workbook, index))
            .await
    }

    pub async fn list(&self) -> StoreResult<Vec<Lead>> {
        self.orchestrator.read(&self.key, leads::list_leads).await
    }
}
