//! # Proposal Repository
//!
//! Quotations live in their own workbook. Transferring them into the lead
//! list reads the proposals workbook and updates the leads workbook; the
//! two keys are written independently.

use tracing::warn;

use helio_core::{proposals, NewProposal, ProposalFields, TransferSummary};

use crate::error::StoreResult;
use crate::orchestrator::Orchestrator;
use crate::render::{render_proposal, ProposalRenderer};

#[derive(Clone)]
pub struct ProposalRepository {
    orchestrator: Orchestrator,
    key: String,
    leads_key: String,
}

impl ProposalRepository {
    pub fn new(orchestrator: Orchestrator, key: impl Into<String>, leads_key: impl Into<String>) -> Self {
        ProposalRepository {
            orchestrator,
            key: key.into(),
            leads_key: leads_key.into(),
        }
    }

    pub async fn next_ref(&self) -> StoreResult<String> {
        match self
            .orchestrator
            .read(&self.key, |workbook| {
                Ok(proposals::next_proposal_ref(
                    workbook.get_sheet(&proposals::proposals_sheet_name()),
                ))
            })
            .await
        {
            Err(err) if err.is_not_found() => Ok(proposals::next_proposal_ref(None)),
            other => other,
        }
    }

    /// Stores the proposal and returns its reference.
    pub async fn save(&self, proposal: &NewProposal) -> StoreResult<String> {
        self.orchestrator
            .update(&self.key, |workbook| proposals::save_proposal(workbook, proposal))
            .await
    }

    pub async fn get(&self, ref_no: &str) -> StoreResult<ProposalFields> {
        self.orchestrator
            .read(&self.key, |workbook| proposals::get_proposal(workbook, ref_no))
            .await
    }

    pub async fn list(&self) -> StoreResult<Vec<ProposalFields>> {
        self.orchestrator
            .read(&self.key, |workbook| Ok(proposals::list_proposals(workbook)))
            .await
    }

    /// Copies every proposal into the lead list as `Sent`.
    pub async fn transfer_to_leads(&self) -> StoreResult<TransferSummary> {
        let source = self.orchestrator.load(&self.key).await?;
        self.orchestrator
            .update(&self.leads_key, |leads| {
                proposals::transfer_to_leads(&source.workbook, leads)
            })
            .await
    }

    /// Saves the proposal, then renders it. The row stays stored when
    /// rendering fails.
    pub async fn save_and_render(
        &self,
        proposal: &NewProposal,
        template: &str,
        renderer: &dyn ProposalRenderer,
    ) -> StoreResult<(String, Vec<u8>)> {
        let ref_no = self.save(proposal).await?;
        let fields = self.get(&ref_no).await?;
        let document = render_proposal(renderer, template, &fields)
            .await
            .inspect_err(|e| warn!(ref_no = %ref_no, error = %e, "proposal stored but not rendered"))?;
        Ok((ref_no, document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ConcurrencyPolicy, MemoryStore};
    use crate::codec::XlsxCodec;
    use crate::config::RetrySettings;
    use crate::error::StoreError;
    use crate::repository::LeadRepository;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Arc;

    struct Failing;

    #[async_trait]
    impl ProposalRenderer for Failing {
        async fn render(&self, _html: &str) -> StoreResult<Vec<u8>> {
            Err(StoreError::Render("page size unsupported".into()))
        }
    }

    fn orchestrator(store: Arc<MemoryStore>) -> Orchestrator {
        Orchestrator::new(store, Arc::new(XlsxCodec), RetrySettings::immediate(1)).create_missing(true)
    }

    fn proposal(to_whom: &str, mobile: &str, kw: f64) -> NewProposal {
        NewProposal {
            date: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
            subsidy: "PM Surya Ghar".to_string(),
            kw,
            address: "Sector 13".to_string(),
            state: "Haryana".to_string(),
            city: "Karnal".to_string(),
            to_whom: to_whom.to_string(),
            mobile: mobile.to_string(),
            price: 180000.0,
            panel_brand: "Waaree".to_string(),
            panel_wp: "540".to_string(),
            inverter_brand: "Growatt".to_string(),
            sent_by: "Anil".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_get_and_list() {
        let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
        let repo = ProposalRepository::new(orchestrator(store), "proposal.xlsx", "leads.xlsx");

        assert_eq!(repo.next_ref().await.unwrap(), "01P");
        assert_eq!(repo.save(&proposal("Mr. Yadav", "9811100001", 3.0)).await.unwrap(), "01P");
        assert_eq!(repo.save(&proposal("Mrs. Rao", "9811100002", 5.0)).await.unwrap(), "02P");

        let fields = repo.get("02P").await.unwrap();
        assert_eq!(fields["towhom"], "Mrs. Rao");
        assert_eq!(repo.list().await.unwrap().len(), 2);
        assert!(repo.get("09P").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_transfer_writes_only_leads() {
        let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
        let orchestrator = orchestrator(store.clone());
        let repo = ProposalRepository::new(orchestrator.clone(), "proposal.xlsx", "leads.xlsx");
        repo.save(&proposal("Mr. Yadav", "9811100001", 3.0)).await.unwrap();
        let proposals_before = store.bytes("proposal.xlsx").await;

        let summary = repo.transfer_to_leads().await.unwrap();
        assert_eq!(summary.appended, 1);
        assert_eq!(store.bytes("proposal.xlsx").await, proposals_before);

        let leads = LeadRepository::new(orchestrator, "leads.xlsx").list().await.unwrap();
        assert_eq!(leads[0].name, "Mr. Yadav");
        assert_eq!(leads[0].proposal, proposals::PROPOSAL_SENT);

        let again = repo.transfer_to_leads().await.unwrap();
        assert_eq!(again.replaced, 1);
        assert_eq!(again.appended, 0);
    }

    #[tokio::test]
    async fn test_render_failure_keeps_row() {
        let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
        let repo = ProposalRepository::new(orchestrator(store), "proposal.xlsx", "leads.xlsx");

        let err = repo
            .save_and_render(&proposal("Mr. Yadav", "9811100001", 3.0), "{{towhom}}", &Failing)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Render(_)));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
