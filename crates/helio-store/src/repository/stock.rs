//! # Stock Repository
//!
//! Stock movements against the stock workbook, including the date-block
//! retry protocol.
//!
//! ## Write Count per Movement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  day block present         → 1 store (journal + master together)       │
//! │  day block missing         → 2 stores (backfill, then the movement)    │
//! │  still missing on reload   → 1 store (backfill), DateColumnMissing     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use tracing::info;

use helio_core::{stock, DailyMovement, StockLevels, StockMovement};

use crate::error::StoreResult;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct StockRepository {
    orchestrator: Orchestrator,
    key: String,
}

impl StockRepository {
    pub fn new(orchestrator: Orchestrator, key: impl Into<String>) -> Self {
        StockRepository {
            orchestrator,
            key: key.into(),
        }
    }

    /// Records one movement: journal row plus the day's In/Out cell.
    pub async fn record_movement(&self, movement: &StockMovement) -> StoreResult<StockLevels> {
        stock::validate_movement(movement)?;

        let mut loaded = self.orchestrator.load_for_update(&self.key).await?;
        stock::ensure_month_sheets(&mut loaded.workbook, movement.date)?;
        let cols = self
            .orchestrator
            .ensure_date_block(&mut loaded, movement.date)
            .await?;

        stock::append_journal_entry(&mut loaded.workbook, movement)?;
        let levels = stock::apply_movement(&mut loaded.workbook, movement, cols)?;
        self.orchestrator.persist(&mut loaded).await?;

        info!(
            material = %levels.material,
            direction = %movement.direction,
            quantity = movement.quantity,
            current = levels.current,
            alert = levels.alert,
            "stock movement recorded"
        );
        Ok(levels)
    }

    pub async fn stock_in(
        &self,
        date: NaiveDate,
        material: &str,
        invoice: &str,
        quantity: f64,
    ) -> StoreResult<StockLevels> {
        self.record_movement(&StockMovement::stock_in(date, material, invoice, quantity))
            .await
    }

    pub async fn stock_out(
        &self,
        date: NaiveDate,
        material: &str,
        quantity: f64,
        remarks: Option<&str>,
    ) -> StoreResult<StockLevels> {
        self.record_movement(&StockMovement::stock_out(date, material, quantity, remarks))
            .await
    }

    /// Creates the month's master and journals. Returns false when the
    /// master already existed.
    pub async fn initialize_month(&self, date: NaiveDate) -> StoreResult<bool> {
        self.orchestrator
            .update(&self.key, |workbook| stock::ensure_month_sheets(workbook, date))
            .await
    }

    pub async fn set_opening_stock(&self, date: NaiveDate, material: &str, opening: f64) -> StoreResult<StockLevels> {
        self.orchestrator
            .update(&self.key, |workbook| {
                stock::set_opening_stock(workbook, date, material, opening)
            })
            .await
    }

    // =========================================================================
    // Reports
    // =========================================================================

    pub async fn current_stock(&self, month: u32, material: &str) -> StoreResult<StockLevels> {
        self.orchestrator
            .read(&self.key, |workbook| stock::current_stock(workbook, month, material))
            .await
    }

    pub async fn summary(&self, month: u32) -> StoreResult<Vec<StockLevels>> {
        self.orchestrator
            .read(&self.key, |workbook| stock::stock_summary(workbook, month))
            .await
    }

    pub async fn low_stock(&self, month: u32) -> StoreResult<Vec<StockLevels>> {
        self.orchestrator
            .read(&self.key, |workbook| stock::low_stock(workbook, month))
            .await
    }

    pub async fn on_date(&self, date: NaiveDate) -> StoreResult<Vec<DailyMovement>> {
        self.orchestrator
            .read(&self.key, |workbook| stock::stock_on_date(workbook, date))
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
    use std::sync::Arc;

    fn repo(store: Arc<MemoryStore>) -> StockRepository {
        let orchestrator = Orchestrator::new(store, Arc::new(XlsxCodec), RetrySettings::immediate(2))
            .create_missing(true);
        StockRepository::new(orchestrator, "Stock Sheet.xlsx")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_movement_never_fetches() {
        let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
        let err = repo(store.clone())
            .stock_in(date(2024, 3, 1), "Panel", "  ", 5.0)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(_)));
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_movements_and_reports() {
        let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
        let repo = repo(store.clone());

        repo.set_opening_stock(date(2024, 3, 1), "Inverter 5kW", 10.0).await.unwrap();
        repo.stock_in(date(2024, 3, 4), "Inverter 5kW", "INV-88", 4.0).await.unwrap();
        let levels = repo
            .stock_out(date(2024, 3, 4), "inverter 5kw", 13.0, Some("Site: Sharma"))
            .await
            .unwrap();

        assert_eq!(levels.current, 1.0);
        assert_eq!(levels.minimum, 1.0);
        assert!(levels.alert);
        assert_eq!(store.store_count(), 3);

        let low = repo.low_stock(3).await.unwrap();
        assert_eq!(low.len(), 1);

        let moved = repo.on_date(date(2024, 3, 4)).await.unwrap();
        assert_eq!(moved[0].stock_in, 4.0);
        assert_eq!(moved[0].stock_out, 13.0);
        assert_eq!(moved[0].remarks, "Site: Sharma");

        assert!(repo.current_stock(3, "Battery").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_initialize_month_is_idempotent() {
        let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
        let repo = repo(store.clone());
        assert!(repo.initialize_month(date(2024, 2, 1)).await.unwrap());
        assert!(!repo.initialize_month(date(2024, 2, 20)).await.unwrap());
        assert_eq!(store.store_count(), 1);
    }
}
