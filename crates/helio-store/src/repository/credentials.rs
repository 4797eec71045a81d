//! Staff directory on the clients workbook. Sign-in codes and sessions are
//! checked against it by [`StaffSessions`](crate::session::StaffSessions).

use helio_core::{credentials, Credential};

use crate::error::StoreResult;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct CredentialRepository {
    orchestrator: Orchestrator,
    key: String,
}

impl CredentialRepository {
    pub fn new(orchestrator: Orchestrator, key: impl Into<String>) -> Self {
        CredentialRepository {
            orchestrator,
            key: key.into(),
        }
    }

    pub async fn find(&self, email: &str) -> StoreResult<Option<Credential>> {
        self.orchestrator
            .read(&self.key, |workbook| Ok(credentials::find_credential(workbook, email)))
            .await
    }

    pub async fn list(&self) -> StoreResult<Vec<Credential>> {
        self.orchestrator
            .read(&self.key, |workbook| Ok(credentials::list_credentials(workbook)))
            .await
    }

    /// Adds the entry, or updates name and role of the same email.
    pub async fn add(&self, entry: &Credential) -> StoreResult<u32> {
        self.orchestrator
            .update(&self.key, |workbook| credentials::add_credential(workbook, entry))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ConcurrencyPolicy, MemoryStore};
    use crate::codec::XlsxCodec;
    use crate::config::RetrySettings;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add_then_find_case_insensitive() {
        let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
        let orchestrator = Orchestrator::new(store, Arc::new(XlsxCodec), RetrySettings::immediate(1))
            .create_missing(true);
        let repo = CredentialRepository::new(orchestrator, "TempData.xlsx");

        let entry = Credential {
            email: "anil@heliosolar.in".to_string(),
            display_name: "Anil".to_string(),
            role: "sales".to_string(),
        };
        let row = repo.add(&entry).await.unwrap();
        let updated = Credential {
            role: "admin".to_string(),
            ..entry.clone()
        };
        assert_eq!(repo.add(&updated).await.unwrap(), row);

        let found = repo.find("ANIL@heliosolar.in").await.unwrap().unwrap();
        assert_eq!(found.role, "admin");
        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.find("nobody@heliosolar.in").await.unwrap().is_none());
    }
}
