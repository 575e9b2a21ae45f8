use std::sync::Arc;

use chrono::Weekday;
use study_plan::calendar::{COLUMN_DATE, COLUMN_MEMORIZATION, COLUMN_RECITATION, HEADER};
use study_plan::catalog::{Catalog, Chapter};
use study_plan::render::DocumentFormat;
use study_plan::{PlanMetadata, PlanSession, RecitationType, ScheduleSettings, SessionError};

fn session() -> PlanSession {
    let catalog = Catalog::new(vec![
        Chapter::new(1, "الفاتحة", 1, 1),
        Chapter::new(2, "البقرة", 2, 49),
    ])
    .unwrap();
    PlanSession::new(Arc::new(catalog), PlanMetadata::new("سارة", 1, 2024)).unwrap()
}

#[test]
fn new_session_has_rows_but_no_assignments() {
    let session = session();
    assert_eq!(session.rows().len(), 29);
    assert!(session.rows().iter().all(|row| row.memorization.is_empty()));
    let table = session.table();
    assert_eq!(table[0], HEADER.iter().map(|h| h.to_string()).collect::<Vec<_>>());
    assert_eq!(table.len(), 30);
}

#[test]
fn recompute_without_selection_does_nothing() {
    let mut session = session();
    let summary = session.recompute().unwrap();
    assert!(!summary.ran);
    assert_eq!(summary.to_cli_summary(), "no starting chapter/page selected");
}

#[test]
fn selecting_a_chapter_resets_page_and_recomputes() {
    let mut session = session();
    session.select_chapter(1).unwrap();
    session.select_page(1).unwrap();
    let summary = session.select_chapter(2).unwrap();
    assert!(summary.ran);
    assert_eq!(session.settings().start_page, Some(2));
    assert_eq!(session.rows()[0].memorization, "البقرة 2");
    assert_eq!(session.available_pages().len(), 48);
}

#[test]
fn unknown_chapter_is_an_error() {
    let mut session = session();
    let err = session.select_chapter(7).unwrap_err();
    assert!(matches!(err, SessionError::Schedule(e) if e.is_invalid_start_position()));
}

#[test]
fn invalid_page_leaves_rows_alone() {
    let mut session = session();
    session.select_chapter(2).unwrap();
    let before = session.rows().to_vec();
    assert!(session.select_page(70).is_err());
    assert_eq!(session.rows(), &before[..]);
    assert_eq!(session.settings().start_page, Some(2));
}

#[test]
fn rejected_page_does_not_block_later_edits() {
    let mut session = session();
    session.select_chapter(2).unwrap();
    assert!(session.select_page(70).is_err());

    let summary = session.set_month(2).unwrap();
    assert!(summary.ran);
    assert_eq!(session.metadata().month, 2);
    assert_eq!(session.rows().len(), 31);
    assert_eq!(session.rows()[0].memorization, "البقرة 2");
}

#[test]
fn rejected_settings_keep_the_previous_ones() {
    let mut session = session();
    session.select_chapter(2).unwrap();
    session.set_pages_per_day(3).unwrap();
    let before = session.settings().clone();

    let err = session
        .apply_settings(ScheduleSettings {
            start_chapter: Some(1),
            start_page: Some(9),
            ..ScheduleSettings::default()
        })
        .unwrap_err();
    assert!(matches!(err, SessionError::Schedule(e) if e.is_invalid_start_position()));
    assert_eq!(session.settings(), &before);
    assert_eq!(session.rows()[0].memorization, "البقرة 2-4");
}

#[test]
fn rejected_period_changes_nothing() {
    let mut session = session();
    session.set_starting_day(10).unwrap();
    let err = session
        .apply_metadata(PlanMetadata {
            participant_name: "هدى".into(),
            month: 12,
            year: 2023,
            starting_day: 1,
        })
        .unwrap_err();
    assert!(matches!(err, SessionError::Calendar(_)));
    assert_eq!(session.metadata().participant_name, "سارة");
    assert_eq!(session.metadata().year, 2024);
    assert_eq!(session.metadata().starting_day, 10);
    assert_eq!(session.rows().len(), 20);
}

#[test]
fn faster_pace_clears_rows_past_the_catalog_end() {
    let catalog = Catalog::new(vec![
        Chapter::new(1, "A", 1, 5),
        Chapter::new(2, "B", 6, 10),
        Chapter::new(3, "C", 11, 11),
    ])
    .unwrap();
    let mut session =
        PlanSession::new(Arc::new(catalog), PlanMetadata::new("سارة", 1, 2024)).unwrap();
    session.select_chapter(1).unwrap();
    assert_eq!(session.rows()[3].memorization, "A 4");
    assert_eq!(session.rows()[7].memorization, "B 8");

    let summary = session.set_pages_per_day(5).unwrap();
    assert!(summary.exhausted);
    assert_eq!(summary.exhausted_rows, 26);
    let labels: Vec<_> = session.rows().iter().map(|row| row.memorization.as_str()).collect();
    assert_eq!(labels[..3], ["A 1-5", "B 6-10", "C 11"]);
    assert!(labels[3..].iter().all(|label| label.is_empty()));
}

#[test]
fn settings_changes_recompute() {
    let mut session = session();
    session.select_chapter(2).unwrap();
    session.set_pages_per_day(2).unwrap();
    assert_eq!(session.rows()[0].memorization, "البقرة 2-3");

    // 2024-02-02 is a Friday.
    session.set_weekday_excluded(Weekday::Fri, true).unwrap();
    assert_eq!(session.rows()[1].memorization, "");
    assert_eq!(session.rows()[2].memorization, "البقرة 4-5");

    session.set_weekday_excluded(Weekday::Fri, false).unwrap();
    session.set_alternate_day(true).unwrap();
    assert_eq!(session.rows()[1].memorization, "");
    assert_eq!(session.rows()[2].memorization, "البقرة 4-5");

    let summary = session
        .apply_settings(ScheduleSettings {
            start_chapter: Some(1),
            start_page: Some(1),
            pages_per_day: 0,
            ..ScheduleSettings::default()
        })
        .unwrap();
    assert_eq!(session.settings().pages_per_day, 1);
    assert_eq!(summary.assigned, 29);
    assert_eq!(session.rows()[1].memorization, "البقرة 2");
}

#[test]
fn month_changes_regenerate_rows() {
    let mut session = session();
    session.set_starting_day(29).unwrap();
    assert_eq!(session.rows().len(), 1);

    session.set_year(2023).unwrap();
    assert_eq!(session.metadata().starting_day, 28);
    assert_eq!(session.rows().len(), 1);

    session.set_month(2).unwrap();
    assert_eq!(session.rows().len(), 4);
    assert!(matches!(
        session.set_month(12),
        Err(SessionError::Calendar(_))
    ));
}

#[test]
fn manual_edits_are_overwritten_by_recompute() {
    let mut session = session();
    session.select_chapter(2).unwrap();
    session.update_cell(1, COLUMN_MEMORIZATION, "custom").unwrap();
    assert_eq!(session.rows()[0].memorization, "custom");
    session.recompute().unwrap();
    assert_eq!(session.rows()[0].memorization, "البقرة 2");
}

#[test]
fn cell_updates_are_validated() {
    let mut session = session();
    session
        .update_cell(3, COLUMN_RECITATION, "اختبار")
        .unwrap();
    assert_eq!(session.rows()[2].recitation, Some(RecitationType::Test));
    session.update_cell(3, COLUMN_RECITATION, "").unwrap();
    assert_eq!(session.rows()[2].recitation, None);

    assert!(matches!(
        session.update_cell(1, COLUMN_DATE, "x"),
        Err(SessionError::ReadOnlyColumn(COLUMN_DATE))
    ));
    assert!(matches!(
        session.update_cell(0, COLUMN_MEMORIZATION, "x"),
        Err(SessionError::RowOutOfRange(0))
    ));
    assert!(matches!(
        session.update_cell(30, COLUMN_MEMORIZATION, "x"),
        Err(SessionError::RowOutOfRange(30))
    ));
    assert!(matches!(
        session.update_cell(1, 9, "x"),
        Err(SessionError::ColumnOutOfRange(9))
    ));
    assert!(matches!(
        session.update_cell(1, COLUMN_RECITATION, "maybe"),
        Err(SessionError::InvalidRecitation(_))
    ));
}

#[test]
fn title_and_file_name() {
    let session = session();
    assert_eq!(session.document_title(), "خطة المشترك/ة : سارة    خلال شهر 2");
    assert_eq!(
        session.export_file_name(DocumentFormat::Pdf),
        "خطة_الحفظ_سارة_1_2024.pdf"
    );
    let document = session.document(None);
    assert_eq!(document.body().len(), 29);
}
