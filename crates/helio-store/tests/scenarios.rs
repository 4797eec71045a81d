//! End-to-end flows through the ledger over an in-memory store, checking
//! both the returned values and the workbooks left in the store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use helio_core::{clients, stock, ClientIntake, ClientRef, Workbook};
use helio_store::{
    ConcurrencyPolicy, DocumentCodec, FetchedDocument, Ledger, MemoryStore, Orchestrator,
    RetrySettings, StorageSettings, StoreError, StoreResult, WorkbookStore, WriteToken, XlsxCodec,
};

const STOCK: &str = "Stock Sheet.xlsx";
const CLIENTS: &str = "TempData.xlsx";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ledger_over(store: Arc<dyn WorkbookStore>) -> Ledger {
    let orchestrator = Orchestrator::new(store, Arc::new(XlsxCodec::new()), RetrySettings::immediate(3))
        .create_missing(true);
    Ledger::new(orchestrator, StorageSettings::default())
}

async fn stored_workbook(store: &MemoryStore, key: &str) -> Workbook {
    let bytes = store.bytes(key).await.expect("document stored");
    XlsxCodec::new().parse(&bytes).unwrap()
}

/// Seeds the stock workbook with March laid out but the block of `missing`
/// blanked, as left behind by a hand edit.
async fn seed_march_without(store: &MemoryStore, missing: NaiveDate) {
    let mut workbook = Workbook::new();
    stock::ensure_month_sheets(&mut workbook, missing).unwrap();
    let cols = stock::locate_date_block(&workbook, missing).unwrap().unwrap();
    workbook
        .require_sheet_mut(&stock::master_sheet_name(3))
        .unwrap()
        .set_value(1, cols.in_col, "");
    let bytes = XlsxCodec::new().serialize(&workbook).unwrap();
    store.insert(STOCK, bytes).await;
}

// =============================================================================
// Stock
// =============================================================================

#[tokio::test]
async fn test_stock_in_on_leap_day() {
    let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
    let ledger = ledger_over(store.clone());

    let levels = ledger
        .stock()
        .stock_in(date(2024, 2, 29), "Panel 540W", "INV-2024-117", 50.0)
        .await
        .unwrap();

    assert_eq!(levels.current, 50.0);
    assert_eq!(levels.minimum, 0.0);
    assert!(!levels.alert);
    assert_eq!(store.store_count(), 1);

    let workbook = stored_workbook(&store, STOCK).await;
    assert!(workbook.has_sheet("Stock 02"));
    assert!(workbook.has_sheet("Stock In 02"));
    assert!(workbook.has_sheet("Stock Out 02"));
    assert!(stock::locate_date_block(&workbook, date(2024, 2, 29)).unwrap().is_some());

    let moved = ledger.stock().on_date(date(2024, 2, 29)).await.unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].stock_in, 50.0);
}

#[tokio::test]
async fn test_stock_out_in_new_month_raises_alert() {
    let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
    let ledger = ledger_over(store.clone());

    ledger
        .stock()
        .stock_in(date(2024, 2, 29), "Panel 540W", "INV-2024-117", 50.0)
        .await
        .unwrap();
    let levels = ledger
        .stock()
        .stock_out(date(2024, 3, 1), "panel 540w", 45.0, Some("Site: Gupta, 5kW"))
        .await
        .unwrap();

    assert_eq!(levels.opening, 50.0);
    assert_eq!(levels.current, 5.0);
    assert_eq!(levels.minimum, 5.0);
    assert!(levels.alert);

    let low = ledger.stock().low_stock(3).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].material, "Panel 540W");

    // February is untouched by the March movement.
    let february = ledger.stock().current_stock(2, "Panel 540W").await.unwrap();
    assert_eq!(february.current, 50.0);
    assert!(!february.alert);
}

#[tokio::test]
async fn test_missing_date_block_is_backfilled_then_written() {
    let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
    let missing = date(2024, 3, 15);
    seed_march_without(&store, missing).await;
    let ledger = ledger_over(store.clone());

    let levels = ledger
        .stock()
        .stock_in(missing, "Inverter 5kW", "INV-77", 4.0)
        .await
        .unwrap();

    assert_eq!(levels.current, 4.0);
    assert_eq!(store.store_count(), 2);
    assert_eq!(store.fetch_count(), 2);

    let workbook = stored_workbook(&store, STOCK).await;
    let cols = stock::locate_date_block(&workbook, missing).unwrap().unwrap();
    assert!(cols.in_col > 5 + 3 * 30);

    let journal = workbook.require_sheet("Stock In 03").unwrap();
    assert_eq!(journal.row_count(), 2);
}

/// Accepts every store but keeps serving the seeded bytes.
struct ForgetfulStore {
    inner: MemoryStore,
}

#[async_trait]
impl WorkbookStore for ForgetfulStore {
    async fn fetch(&self, key: &str) -> StoreResult<FetchedDocument> {
        self.inner.fetch(key).await
    }

    async fn store(&self, _key: &str, _bytes: Vec<u8>, token: &WriteToken) -> StoreResult<WriteToken> {
        Ok(*token)
    }
}

#[tokio::test]
async fn test_block_still_missing_after_reload() {
    let inner = MemoryStore::new(ConcurrencyPolicy::LastWriteWins);
    let missing = date(2024, 3, 15);
    seed_march_without(&inner, missing).await;
    let ledger = ledger_over(Arc::new(ForgetfulStore { inner }));

    let err = ledger
        .stock()
        .stock_out(missing, "Inverter 5kW", 1.0, None)
        .await
        .unwrap_err();

    match err {
        StoreError::DateColumnMissing { sheet, date } => {
            assert_eq!(sheet, "Stock 03");
            assert_eq!(date, "15-03-2024");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// Clients
// =============================================================================

fn intake(mobile: &str, total_cost: f64) -> ClientIntake {
    ClientIntake {
        date: date(2024, 3, 5),
        name: "Ravi Kumar".to_string(),
        address: "12 Sector 9".to_string(),
        city: "Hisar".to_string(),
        state: "Haryana".to_string(),
        email: "ravi@example.com".to_string(),
        reference: "walk-in".to_string(),
        alternate_mobile: String::new(),
        mobile: mobile.to_string(),
        electricity_account: "HR-7781".to_string(),
        kw: 5.0,
        advance: 20000.0,
        total_cost,
        photo_extension: Some("jpg".to_string()),
    }
}

#[tokio::test]
async fn test_client_resubmission_updates_one_row() {
    let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
    let ledger = ledger_over(store.clone());

    let first = ledger.clients().upsert(&intake("9876543210", 250000.0)).await.unwrap();
    let second = ledger
        .clients()
        .upsert(&intake("+91 98765-43210", 265000.0))
        .await
        .unwrap();

    assert!(first.was_created());
    assert!(!second.was_created());
    assert_eq!(first.row(), second.row());

    let workbook = stored_workbook(&store, CLIENTS).await;
    let ledger_sheet = workbook.require_sheet(&clients::ledger_sheet_name()).unwrap();
    assert_eq!(ledger_sheet.row_count(), first.row());

    let record = ledger
        .clients()
        .get(&ClientRef {
            name: "ravi kumar".to_string(),
            kw: 5.0,
            mobile: "98765 43210".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(record.get(&helio_core::schema::client::TOTAL_COST), "265000");
    assert_eq!(record.get(&helio_core::schema::client::MOBILE), "+91 98765-43210");
}

#[tokio::test]
async fn test_concurrent_edit_is_rejected() {
    let store = Arc::new(MemoryStore::new(ConcurrencyPolicy::Optimistic));
    let ledger = ledger_over(store.clone());
    ledger.clients().upsert(&intake("9812345678", 250000.0)).await.unwrap();

    let orchestrator = ledger.orchestrator();
    let mut stale = orchestrator.load_for_update(CLIENTS).await.unwrap();
    ledger.clients().upsert(&intake("9812345678", 260000.0)).await.unwrap();

    clients::upsert_client(&mut stale.workbook, &intake("9812345678", 1.0)).unwrap();
    let err = orchestrator.persist(&mut stale).await.unwrap_err();
    assert!(matches!(err, StoreError::ConcurrentModification { .. }));
}
