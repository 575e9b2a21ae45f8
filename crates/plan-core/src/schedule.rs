//! The schedule walk: assigns consecutive page spans from the catalog to the
//! eligible days of a month.
//!
//! Two sequences move together here. Rows advance one per calendar day; the
//! page cursor only advances on eligible days. Excluded weekdays and
//! alternate-day rows are blanked without touching the cursor, so the next
//! eligible day picks up exactly where the previous one stopped.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::calendar::CalendarDay;
use crate::catalog::{Catalog, Chapter};
use crate::error::ScheduleError;

/// Inputs of one walk. Rebuilt from the session on every recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub start_chapter: u32,
    pub start_page: u32,
    pub pages_per_day: u32,
    #[serde(default)]
    pub alternate_day: bool,
    #[serde(default)]
    pub excluded_weekdays: HashSet<Weekday>,
}

impl ScheduleRequest {
    pub fn new(start_chapter: u32, start_page: u32, pages_per_day: u32) -> Self {
        Self {
            start_chapter,
            start_page,
            pages_per_day: pages_per_day.max(1),
            alternate_day: false,
            excluded_weekdays: HashSet::new(),
        }
    }

    pub fn with_alternate_day(mut self, alternate_day: bool) -> Self {
        self.alternate_day = alternate_day;
        self
    }

    pub fn excluding(mut self, weekday: Weekday) -> Self {
        self.excluded_weekdays.insert(weekday);
        self
    }
}

/// Non-numeric or zero pace input becomes one page per day.
pub fn parse_pace(input: &str) -> u32 {
    input.trim().parse::<u32>().unwrap_or(1).max(1)
}

/// A chapter-bounded sub-range of one day's reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub chapter: u32,
    pub chapter_name: String,
    pub first_page: u32,
    pub last_page: u32,
}

impl Segment {
    fn new(chapter: &Chapter, first_page: u32, last_page: u32) -> Self {
        Self {
            chapter: chapter.number,
            chapter_name: chapter.name.clone(),
            first_page,
            last_page,
        }
    }

    pub fn pages(&self) -> u32 {
        self.last_page - self.first_page + 1
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first_page == self.last_page {
            write!(f, "{} {}", self.chapter_name, self.first_page)
        } else {
            write!(
                f,
                "{} {}-{}",
                self.chapter_name, self.first_page, self.last_page
            )
        }
    }
}

/// Outcome for a single row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "segments", rename_all = "snake_case")]
pub enum DayAssignment {
    Assigned(Vec<Segment>),
    /// Excluded weekday or alternate day.
    Blank,
    /// The walk had already run out of catalog. Cleared like a blank day.
    Exhausted,
}

impl DayAssignment {
    /// Text for the memorization column.
    pub fn label(&self) -> String {
        match self {
            DayAssignment::Assigned(segments) => segments
                .iter()
                .map(Segment::to_string)
                .collect::<Vec<_>>()
                .join(" + "),
            DayAssignment::Blank | DayAssignment::Exhausted => String::new(),
        }
    }
}

/// Position of the next unread page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub chapter_index: usize,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub days: Vec<DayAssignment>,
    /// Where the next walk would continue; `None` once the catalog is used up.
    pub end_cursor: Option<Cursor>,
    /// Row index at which the catalog ran out.
    pub exhausted_at: Option<usize>,
}

impl ScheduleResult {
    pub fn labels(&self) -> Vec<String> {
        self.days.iter().map(DayAssignment::label).collect()
    }

    pub fn assigned_count(&self) -> usize {
        self.count(|day| matches!(day, DayAssignment::Assigned(_)))
    }

    pub fn blank_count(&self) -> usize {
        self.count(|day| matches!(day, DayAssignment::Blank))
    }

    pub fn exhausted_count(&self) -> usize {
        self.count(|day| matches!(day, DayAssignment::Exhausted))
    }

    fn count(&self, pred: impl Fn(&DayAssignment) -> bool) -> usize {
        self.days.iter().filter(|day| pred(day)).count()
    }
}

/// Resolve the starting position or explain why it does not exist.
fn start_cursor(catalog: &Catalog, request: &ScheduleRequest) -> Result<Cursor, ScheduleError> {
    let chapter_index =
        catalog
            .position(request.start_chapter)
            .ok_or(ScheduleError::UnknownChapter {
                chapter: request.start_chapter,
            })?;
    let chapter = &catalog.chapters()[chapter_index];
    if !chapter.contains_page(request.start_page) {
        return Err(ScheduleError::PageOutsideChapter {
            chapter: chapter.number,
            page: request.start_page,
            first: chapter.start_page,
            last: chapter.end_page,
        });
    }
    Ok(Cursor {
        chapter_index,
        page: request.start_page,
    })
}

/// Check that the request's starting chapter and page exist in the catalog.
pub fn validate_start(catalog: &Catalog, request: &ScheduleRequest) -> Result<(), ScheduleError> {
    start_cursor(catalog, request).map(|_| ())
}

/// Take `budget` pages starting at the cursor.
///
/// Returns the segments read and the cursor after them, or `None` for the
/// cursor when the catalog ran out before the budget was met.
fn consume(catalog: &Catalog, cursor: Cursor, budget: u32) -> (Vec<Segment>, Option<Cursor>) {
    let chapters = catalog.chapters();
    let mut segments = Vec::new();
    let mut remaining = budget;
    let mut chapter_index = cursor.chapter_index;
    let mut page = cursor.page;

    loop {
        let chapter = &chapters[chapter_index];
        if page <= chapter.end_page {
            let available = chapter.end_page - page + 1;
            let take = remaining.min(available);
            let last = page + take - 1;
            segments.push(Segment::new(chapter, page, last));
            remaining -= take;
            page = last + 1;
        }
        if remaining == 0 {
            return (
                segments,
                Some(Cursor {
                    chapter_index,
                    page,
                }),
            );
        }
        if chapter_index + 1 >= chapters.len() {
            return (segments, None);
        }
        chapter_index += 1;
        page = chapters[chapter_index].start_page;
    }
}

/// Walk `rows` in calendar order and decide every row's memorization label.
///
/// Positions used for the alternate-day rule are 1-based over all rows, so
/// excluded days still count towards the parity.
pub fn assign(
    rows: &[CalendarDay],
    catalog: &Catalog,
    request: &ScheduleRequest,
) -> Result<ScheduleResult, ScheduleError> {
    let mut cursor = Some(start_cursor(catalog, request)?);
    let pages_per_day = request.pages_per_day.max(1);
    let mut days = Vec::with_capacity(rows.len());
    let mut exhausted_at = None;

    for (idx, row) in rows.iter().enumerate() {
        let position = idx + 1;
        let Some(current) = cursor else {
            days.push(DayAssignment::Exhausted);
            continue;
        };

        if request.excluded_weekdays.contains(&row.weekday) {
            days.push(DayAssignment::Blank);
            continue;
        }
        if request.alternate_day && position % 2 == 0 {
            days.push(DayAssignment::Blank);
            continue;
        }

        let (segments, next) = consume(catalog, current, pages_per_day);
        if segments.is_empty() {
            days.push(DayAssignment::Exhausted);
        } else {
            days.push(DayAssignment::Assigned(segments));
        }
        if next.is_none() {
            exhausted_at = Some(idx);
        }
        cursor = next;
    }

    tracing::debug!(
        rows = rows.len(),
        pages_per_day,
        exhausted = exhausted_at.is_some(),
        "schedule walk finished"
    );

    Ok(ScheduleResult {
        days,
        end_cursor: cursor,
        exhausted_at,
    })
}

/// Replace the memorization column with a result. Other columns are left alone.
pub fn apply(rows: &mut [CalendarDay], result: &ScheduleResult) {
    for (row, day) in rows.iter_mut().zip(&result.days) {
        row.memorization = day.label();
    }
}

/// Pure form of [`assign`] + [`apply`]: returns new rows, the input is untouched.
pub fn schedule_rows(
    rows: &[CalendarDay],
    catalog: &Catalog,
    request: &ScheduleRequest,
) -> Result<Vec<CalendarDay>, ScheduleError> {
    let result = assign(rows, catalog, request)?;
    let mut updated = rows.to_vec();
    apply(&mut updated, &result);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Chapter::new(1, "A", 1, 5),
            Chapter::new(2, "B", 6, 10),
            Chapter::new(3, "C", 11, 11),
        ])
        .unwrap()
    }

    #[test]
    fn consume_within_chapter() {
        let cat = catalog();
        let (segments, next) = consume(&cat, Cursor { chapter_index: 0, page: 1 }, 3);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].to_string(), "A 1-3");
        assert_eq!(next, Some(Cursor { chapter_index: 0, page: 4 }));
    }

    #[test]
    fn consume_from_end_of_chapter_moves_on() {
        let cat = catalog();
        // Cursor sits one past the end of A, as left by a day that finished it.
        let (segments, next) = consume(&cat, Cursor { chapter_index: 0, page: 6 }, 2);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].to_string(), "B 6-7");
        assert_eq!(next, Some(Cursor { chapter_index: 1, page: 8 }));
    }

    #[test]
    fn consume_spans_several_chapters() {
        let cat = catalog();
        let (segments, next) = consume(&cat, Cursor { chapter_index: 0, page: 5 }, 7);
        let labels: Vec<String> = segments.iter().map(Segment::to_string).collect();
        assert_eq!(labels, vec!["A 5", "B 6-10", "C 11"]);
        assert_eq!(next, Some(Cursor { chapter_index: 2, page: 12 }));
    }

    #[test]
    fn consume_past_last_chapter_reports_exhaustion() {
        let cat = catalog();
        let (segments, next) = consume(&cat, Cursor { chapter_index: 1, page: 10 }, 4);
        let labels: Vec<String> = segments.iter().map(Segment::to_string).collect();
        assert_eq!(labels, vec!["B 10", "C 11"]);
        assert_eq!(next, None);
    }

    #[test]
    fn parse_pace_coerces_bad_input() {
        assert_eq!(parse_pace("3"), 3);
        assert_eq!(parse_pace("0"), 1);
        assert_eq!(parse_pace("abc"), 1);
        assert_eq!(parse_pace("-2"), 1);
    }
}
