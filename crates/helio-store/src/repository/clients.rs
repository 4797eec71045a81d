//! Client ledger operations on the clients workbook.

use helio_core::{
    clients, ApplicationTimeline, ClientIntake, ClientRecord, ClientRef, DashboardStats, Located,
    PaymentBreakdown, PaymentDue, PaymentStatus, ProjectStatus,
};

use crate::error::StoreResult;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct ClientRepository {
    orchestrator: Orchestrator,
    key: String,
}

impl ClientRepository {
    pub fn new(orchestrator: Orchestrator, key: impl Into<String>) -> Self {
        ClientRepository {
            orchestrator,
            key: key.into(),
        }
    }

    /// Inserts the client, or refreshes the intake columns of the row with
    /// the same name, kW and mobile.
    pub async fn upsert(&self, intake: &ClientIntake) -> StoreResult<Located> {
        clients::validate_intake(intake)?;
        self.orchestrator
            .update(&self.key, |workbook| clients::upsert_client(workbook, intake))
            .await
    }

    pub async fn get(&self, client: &ClientRef) -> StoreResult<ClientRecord> {
        self.orchestrator
            .read(&self.key, |workbook| clients::get_client(workbook, client))
            .await
    }

    pub async fn search(&self, query: &str) -> StoreResult<Vec<ClientRecord>> {
        self.orchestrator
            .read(&self.key, |workbook| clients::search_clients(workbook, query))
            .await
    }

    // =========================================================================
    // Follow-ups
    // =========================================================================

    pub async fn save_application_timeline(&self, client: &ClientRef, timeline: &ApplicationTimeline) -> StoreResult<()> {
        self.orchestrator
            .update(&self.key, |workbook| {
                clients::save_application_timeline(workbook, client, timeline)
            })
            .await
    }

    pub async fn application_timeline(&self, client: &ClientRef) -> StoreResult<ApplicationTimeline> {
        self.orchestrator
            .read(&self.key, |workbook| clients::get_application_timeline(workbook, client))
            .await
    }

    pub async fn save_project_status(&self, client: &ClientRef, status: &ProjectStatus) -> StoreResult<()> {
        self.orchestrator
            .update(&self.key, |workbook| clients::save_project_status(workbook, client, status))
            .await
    }

    pub async fn project_status(&self, client: &ClientRef) -> StoreResult<ProjectStatus> {
        self.orchestrator
            .read(&self.key, |workbook| clients::get_project_status(workbook, client))
            .await
    }

    pub async fn save_payment_status(&self, client: &ClientRef, payment: &PaymentStatus) -> StoreResult<()> {
        self.orchestrator
            .update(&self.key, |workbook| clients::save_payment_status(workbook, client, payment))
            .await
    }

    pub async fn payment_status(&self, client: &ClientRef) -> StoreResult<PaymentStatus> {
        self.orchestrator
            .read(&self.key, |workbook| clients::get_payment_status(workbook, client))
            .await
    }

    // =========================================================================
    // Reports
    // =========================================================================

    pub async fn dashboard(&self) -> StoreResult<DashboardStats> {
        self.orchestrator
            .read(&self.key, clients::dashboard_stats)
            .await
    }

    /// Installment totals for the dashboard bar graph.
    pub async fn payment_breakdown(&self) -> StoreResult<PaymentBreakdown> {
        self.orchestrator
            .read(&self.key, clients::payment_breakdown)
            .await
    }

    pub async fn payments_due(&self) -> StoreResult<Vec<PaymentDue>> {
        self.orchestrator
            .read(&self.key, clients::payments_due)
            .await
    }
}
