//! Dashboard notes and tasks, kept as tabs of the clients workbook.

use helio_core::{notes, NewNote, NewTask, Note, Task};

use crate::error::StoreResult;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct NotesRepository {
    orchestrator: Orchestrator,
    key: String,
}

impl NotesRepository {
    pub fn new(orchestrator: Orchestrator, key: impl Into<String>) -> Self {
        NotesRepository {
            orchestrator,
            key: key.into(),
        }
    }

    pub async fn add_note(&self, note: &NewNote) -> StoreResult<u32> {
        self.orchestrator
            .update(&self.key, |workbook| notes::add_note(workbook, note))
            .await
    }

    /// All notes, or one client's when `client` is given.
    pub async fn notes(&self, client: Option<&str>) -> StoreResult<Vec<Note>> {
        self.orchestrator
            .read(&self.key, |workbook| Ok(notes::list_notes(workbook, client)))
            .await
    }

    pub async fn delete_note(&self, index: usize) -> StoreResult<Note> {
        self.orchestrator
            .update(&self.key, |workbook| notes::delete_note(workbook, index))
            .await
    }

    pub async fn add_task(&self, task: &NewTask) -> StoreResult<u32> {
        self.orchestrator
            .update(&self.key, |workbook| notes::add_task(workbook, task))
            .await
    }

    pub async fn tasks(&self) -> StoreResult<Vec<Task>> {
        self.orchestrator
            .read(&self.key, |workbook| Ok(notes::list_tasks(workbook)))
            .await
    }

    pub async fn delete_task(&self, index: usize) -> StoreResult<Task> {
        self.orchestrator
            .update(&self.key, |workbook| notes::delete_task(workbook, index))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ConcurrencyPolicy, MemoryStore};
    use crate::codec::XlsxCodec;
    use crate::config::RetrySettings;
    use crate::error::StoreError;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn repo_over(store: Arc<MemoryStore>) -> NotesRepository {
        let orchestrator = Orchestrator::new(store, Arc::new(XlsxCodec), RetrySettings::immediate(1))
            .create_missing(true);
        NotesRepository::new(orchestrator, "TempData.xlsx")
    }

    #[tokio::test]
    async fn test_notes_round_trip_and_delete() {
        let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
        let repo = repo_over(store.clone());
        let date = NaiveDate::from_ymd_opt(2024, 8, 2).unwrap();

        for (client, text) in [("", "Renew DHBVN login"), ("Ravi Kumar", "Prefers Waaree panels")] {
            repo.add_note(&NewNote {
                date,
                client: client.to_string(),
                text: text.to_string(),
            })
            .await
            .unwrap();
        }

        let ravi = repo.notes(Some("ravi kumar")).await.unwrap();
        assert_eq!(ravi.len(), 1);
        assert_eq!(ravi[0].index, 1);

        let removed = repo.delete_note(0).await.unwrap();
        assert_eq!(removed.text, "Renew DHBVN login");
        assert_eq!(repo.notes(None).await.unwrap().len(), 1);
        assert_eq!(store.store_count(), 3);
    }

    #[tokio::test]
    async fn test_task_out_of_range_writes_nothing() {
        let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
        let repo = repo_over(store.clone());
        repo.add_task(&NewTask {
            date: NaiveDate::from_ymd_opt(2024, 8, 5).unwrap(),
            time: "10:00".to_string(),
            description: "Inverter delivery".to_string(),
        })
        .await
        .unwrap();

        let err = repo.delete_task(3).await.unwrap_err();
        assert!(matches!(err, StoreError::Core(_)));
        assert_eq!(store.store_count(), 1);
        assert_eq!(repo.tasks().await.unwrap()[0].time, "10:00");
    }
}
