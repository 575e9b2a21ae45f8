use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::calendar::{
    self, COLUMN_DATE, COLUMN_DAY, COLUMN_MEMORIZATION, COLUMN_RECITATION, COLUMN_REVIEW,
    CalendarDay, HEADER, RecitationType,
};
use crate::catalog::Catalog;
use crate::error::{ScheduleError, SessionError};
use crate::metadata::{PlanMetadata, ScheduleSettings};
use crate::render::{DocumentFormat, PlanDocument, Watermark, export_file_name, plan_title};
use crate::schedule::{self, ScheduleRequest};

/// Counts reported after a recompute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeSummary {
    pub ran: bool,
    pub assigned: usize,
    pub blank: usize,
    pub exhausted_rows: usize,
    pub exhausted: bool,
}

impl RecomputeSummary {
    pub fn to_cli_summary(&self) -> String {
        if !self.ran {
            return "no starting chapter/page selected".to_string();
        }
        let mut summary = format!(
            "assigned={}, blank={}, past_end={}",
            self.assigned, self.blank, self.exhausted_rows
        );
        if self.exhausted {
            summary.push_str(", catalog exhausted");
        }
        summary
    }
}

/// The editing context: one month of rows plus the settings that fill them.
///
/// Every settings change recomputes the memorization column from scratch, so
/// manual edits in that column survive only until the next change.
#[derive(Debug, Clone)]
pub struct PlanSession {
    catalog: Arc<Catalog>,
    metadata: PlanMetadata,
    settings: ScheduleSettings,
    rows: Vec<CalendarDay>,
}

impl PlanSession {
    pub fn new(catalog: Arc<Catalog>, metadata: PlanMetadata) -> Result<Self, SessionError> {
        let mut session = Self {
            catalog,
            metadata: metadata.clone(),
            settings: ScheduleSettings::default(),
            rows: Vec::new(),
        };
        session.apply_metadata(metadata)?;
        Ok(session)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn metadata(&self) -> &PlanMetadata {
        &self.metadata
    }

    pub fn settings(&self) -> &ScheduleSettings {
        &self.settings
    }

    pub fn rows(&self) -> &[CalendarDay] {
        &self.rows
    }

    pub fn set_participant_name(&mut self, name: impl Into<String>) {
        self.metadata.participant_name = name.into();
    }

    pub fn set_month(&mut self, month: u32) -> Result<RecomputeSummary, SessionError> {
        self.apply_metadata(PlanMetadata {
            month,
            ..self.metadata.clone()
        })
    }

    pub fn set_year(&mut self, year: i32) -> Result<RecomputeSummary, SessionError> {
        self.apply_metadata(PlanMetadata {
            year,
            ..self.metadata.clone()
        })
    }

    /// Clamped to the month length.
    pub fn set_starting_day(&mut self, day: u32) -> Result<RecomputeSummary, SessionError> {
        self.apply_metadata(PlanMetadata {
            starting_day: day,
            ..self.metadata.clone()
        })
    }

    /// Replace the plan period and participant at once.
    ///
    /// The month and year are checked before anything changes, so a rejected
    /// update leaves the session as it was.
    pub fn apply_metadata(
        &mut self,
        mut metadata: PlanMetadata,
    ) -> Result<RecomputeSummary, SessionError> {
        metadata.starting_day =
            calendar::clamp_starting_day(metadata.starting_day, metadata.month, metadata.year)?;
        let rows = calendar::generate_rows(metadata.month, metadata.year, metadata.starting_day)?;
        self.metadata = metadata;
        self.rows = rows;
        self.recompute()
    }

    /// Selecting a chapter moves the page to the chapter's first page.
    pub fn select_chapter(&mut self, number: u32) -> Result<RecomputeSummary, SessionError> {
        let chapter = self
            .catalog
            .find(number)
            .ok_or(ScheduleError::UnknownChapter { chapter: number })?;
        self.settings.start_chapter = Some(chapter.number);
        self.settings.start_page = Some(chapter.start_page);
        self.recompute()
    }

    /// Rejects a page outside the selected chapter and keeps the previous one.
    pub fn select_page(&mut self, page: u32) -> Result<RecomputeSummary, SessionError> {
        let candidate = ScheduleSettings {
            start_page: Some(page),
            ..self.settings.clone()
        };
        self.check_start(&candidate)?;
        self.settings = candidate;
        self.recompute()
    }

    /// Pages of the selected chapter, empty when none is selected.
    pub fn available_pages(&self) -> Vec<u32> {
        self.settings
            .start_chapter
            .and_then(|number| self.catalog.find(number))
            .map(|chapter| chapter.pages().collect())
            .unwrap_or_default()
    }

    pub fn set_pages_per_day(&mut self, pages: u32) -> Result<RecomputeSummary, SessionError> {
        self.settings.pages_per_day = pages.max(1);
        self.recompute()
    }

    pub fn set_alternate_day(&mut self, enabled: bool) -> Result<RecomputeSummary, SessionError> {
        self.settings.alternate_day = enabled;
        self.recompute()
    }

    pub fn set_weekday_excluded(
        &mut self,
        weekday: Weekday,
        excluded: bool,
    ) -> Result<RecomputeSummary, SessionError> {
        if excluded {
            self.settings.excluded_weekdays.insert(weekday);
        } else {
            self.settings.excluded_weekdays.remove(&weekday);
        }
        self.recompute()
    }

    /// Replace all walk settings at once. Pace is clamped to at least one page.
    pub fn apply_settings(
        &mut self,
        mut settings: ScheduleSettings,
    ) -> Result<RecomputeSummary, SessionError> {
        settings.pages_per_day = settings.pages_per_day.max(1);
        self.check_start(&settings)?;
        self.settings = settings;
        self.recompute()
    }

    fn check_start(&self, settings: &ScheduleSettings) -> Result<(), SessionError> {
        if let Some(request) = Self::request_for(settings) {
            schedule::validate_start(&self.catalog, &request)?;
        }
        Ok(())
    }

    pub fn schedule_request(&self) -> Option<ScheduleRequest> {
        Self::request_for(&self.settings)
    }

    fn request_for(settings: &ScheduleSettings) -> Option<ScheduleRequest> {
        Some(ScheduleRequest {
            start_chapter: settings.start_chapter?,
            start_page: settings.start_page?,
            pages_per_day: settings.pages_per_day.max(1),
            alternate_day: settings.alternate_day,
            excluded_weekdays: settings.excluded_weekdays.clone(),
        })
    }

    /// Rerun the walk over the current rows.
    ///
    /// Does nothing until a start chapter and page are chosen. An invalid
    /// start position leaves the memorization column as it was.
    pub fn recompute(&mut self) -> Result<RecomputeSummary, SessionError> {
        let Some(request) = self.schedule_request() else {
            return Ok(RecomputeSummary::default());
        };
        if self.rows.is_empty() {
            return Ok(RecomputeSummary::default());
        }

        let result = schedule::assign(&self.rows, &self.catalog, &request)?;
        schedule::apply(&mut self.rows, &result);
        Ok(RecomputeSummary {
            ran: true,
            assigned: result.assigned_count(),
            blank: result.blank_count(),
            exhausted_rows: result.exhausted_count(),
            exhausted: result.exhausted_at.is_some(),
        })
    }

    /// Manual edit of one cell. `row` is 1-based (row 0 is the header).
    pub fn update_cell(
        &mut self,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<(), SessionError> {
        if row == 0 || row > self.rows.len() {
            return Err(SessionError::RowOutOfRange(row));
        }
        let day = &mut self.rows[row - 1];
        match column {
            COLUMN_DAY | COLUMN_DATE => Err(SessionError::ReadOnlyColumn(column)),
            COLUMN_MEMORIZATION => {
                day.memorization = value.to_string();
                Ok(())
            }
            COLUMN_REVIEW => {
                day.review = value.to_string();
                Ok(())
            }
            COLUMN_RECITATION => {
                if value.trim().is_empty() {
                    day.recitation = None;
                    return Ok(());
                }
                let kind = RecitationType::from_label(value)
                    .ok_or_else(|| SessionError::InvalidRecitation(value.to_string()))?;
                day.recitation = Some(kind);
                Ok(())
            }
            _ => Err(SessionError::ColumnOutOfRange(column)),
        }
    }

    /// Header plus one string row per day, as the renderers consume it.
    pub fn table(&self) -> Vec<Vec<String>> {
        let mut table = Vec::with_capacity(self.rows.len() + 1);
        table.push(HEADER.iter().map(|h| h.to_string()).collect());
        table.extend(self.rows.iter().map(|row| row.cells().to_vec()));
        table
    }

    pub fn document_title(&self) -> String {
        plan_title(&self.metadata.participant_name, self.metadata.month)
    }

    pub fn export_file_name(&self, format: DocumentFormat) -> String {
        export_file_name(
            &self.metadata.participant_name,
            self.metadata.month,
            self.metadata.year,
            format,
        )
    }

    /// Snapshot for a renderer; later edits do not affect it.
    pub fn document(&self, watermark: Option<Watermark>) -> PlanDocument {
        PlanDocument {
            title: self.document_title(),
            table: self.table(),
            watermark,
        }
    }
}
