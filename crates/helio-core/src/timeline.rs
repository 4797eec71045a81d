//! Per-client event log on the `Timeline` tab.

use tracing::{info, warn};

use crate::dates::parse_input_date;
use crate::document::{CellValue, Row, Workbook};
use crate::error::CoreResult;
use crate::locator::normalize_text;
use crate::schema::{timeline, SheetKind, TIMELINE};
use crate::types::TimelineEvent;
use crate::validation::{validate_name, validate_required};

pub fn timeline_sheet_name() -> String {
    SheetKind::Timeline.sheet_name(0)
}

pub fn add_event(workbook: &mut Workbook, event: &TimelineEvent) -> CoreResult<u32> {
    validate_name(&event.client_name)?;
    validate_required("event", &event.event)?;

    let sheet = workbook.ensure_sheet(&timeline_sheet_name(), |sheet| {
        TIMELINE.write_headers(sheet);
        Ok(())
    })?;
    let values: Vec<CellValue> = vec![
        event.client_name.trim().into(),
        event.event.trim().into(),
        event.event_date.into(),
        event.description.trim().into(),
        event.status.trim().into(),
    ];
    let row = sheet.append_row(values);
    info!(client = %event.client_name, event = %event.event, row, "timeline event added");
    Ok(row)
}

fn event_of(row: &Row<'_>) -> Option<TimelineEvent> {
    let event_date = match row.value(timeline::EVENT_DATE.column) {
        CellValue::Date(date) => *date,
        other => match parse_input_date(&other.to_string()) {
            Ok(date) => date,
            Err(_) => {
                warn!(row = row.index(), value = %other, "timeline row without a readable date");
                return None;
            }
        },
    };
    Some(TimelineEvent {
        client_name: row.text(timeline::CLIENT.column),
        event: row.text(timeline::EVENT.column),
        event_date,
        description: row.text(timeline::DESCRIPTION.column),
        status: row.text(timeline::STATUS.column),
    })
}

/// Events of one client in sheet order; names compare case-insensitively.
pub fn events_for(workbook: &Workbook, client_name: &str) -> Vec<TimelineEvent> {
    let Some(sheet) = workbook.get_sheet(&timeline_sheet_name()) else {
        return Vec::new();
    };
    let wanted = normalize_text(client_name);
    sheet
        .rows_from(TIMELINE.first_data_row())
        .filter(|row| normalize_text(&row.text(timeline::CLIENT.column)) == wanted)
        .filter_map(|row| event_of(&row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(client: &str, name: &str, day: u32) -> TimelineEvent {
        TimelineEvent {
            client_name: client.to_string(),
            event: name.to_string(),
            event_date: NaiveDate::from_ymd_opt(2024, 7, day).unwrap(),
            description: String::new(),
            status: "Done".to_string(),
        }
    }

    #[test]
    fn test_events_are_filtered_by_client() {
        let mut workbook = Workbook::new();
        assert_eq!(add_event(&mut workbook, &event("Ravi Kumar", "Site survey", 2)).unwrap(), 2);
        add_event(&mut workbook, &event("Meena", "Site survey", 3)).unwrap();
        add_event(&mut workbook, &event("Ravi Kumar", "Installation", 9)).unwrap();

        let events = events_for(&workbook, " ravi kumar");
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event, "Installation");
        assert_eq!(events[1].event_date, NaiveDate::from_ymd_opt(2024, 7, 9).unwrap());
        assert!(events_for(&Workbook::new(), "Ravi Kumar").is_empty());
    }

    #[test]
    fn test_text_dates_are_read_back() {
        let mut workbook = Workbook::new();
        add_event(&mut workbook, &event("Ravi", "Survey", 1)).unwrap();
        let sheet = workbook.get_sheet_mut("Timeline").unwrap();
        sheet.set_value(2, timeline::EVENT_DATE.column, "15-07-2024");
        sheet.append_row(vec![CellValue::text("Ravi"), CellValue::text("Broken"), CellValue::text("soon")]);

        let events = events_for(&workbook, "Ravi");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_date, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
    }

    #[test]
    fn test_event_requires_name() {
        let mut workbook = Workbook::new();
        assert!(add_event(&mut workbook, &event("  ", "Survey", 1)).is_err());
        assert!(!workbook.has_sheet("Timeline"));
    }
}
