use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CalendarError;

/// Column titles of the plan table, right to left.
pub const HEADER: [&str; 5] = ["اليوم", "التاريخ", "الحفظ", "المراجعة", "نوع التسميع"];

pub const COLUMN_DAY: usize = 0;
pub const COLUMN_DATE: usize = 1;
pub const COLUMN_MEMORIZATION: usize = 2;
pub const COLUMN_REVIEW: usize = 3;
pub const COLUMN_RECITATION: usize = 4;

/// Week as displayed in the table, starting on Sunday.
pub const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

const WEEKDAY_LABELS: [&str; 7] = [
    "الأحد",
    "الإثنين",
    "الثلاثاء",
    "الأربعاء",
    "الخميس",
    "الجمعة",
    "السبت",
];

pub fn weekday_label(weekday: Weekday) -> &'static str {
    WEEKDAY_LABELS[weekday.num_days_from_sunday() as usize]
}

/// Parse either the Arabic label or an English weekday name ("sun", "Sunday").
pub fn parse_weekday(input: &str) -> Option<Weekday> {
    let trimmed = input.trim();
    if let Some(idx) = WEEKDAY_LABELS.iter().position(|label| *label == trimmed) {
        return Some(WEEK[idx]);
    }
    trimmed.parse::<Weekday>().ok()
}

/// How a day's memorization is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecitationType {
    SelfReview,
    Call,
    Test,
}

impl RecitationType {
    pub const ALL: [RecitationType; 3] = [
        RecitationType::SelfReview,
        RecitationType::Call,
        RecitationType::Test,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RecitationType::SelfReview => "مراجعة ذاتية",
            RecitationType::Call => "اتصال",
            RecitationType::Test => "اختبار",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|kind| {
            kind.label() == value
                || match kind {
                    RecitationType::SelfReview => value == "self_review",
                    RecitationType::Call => value == "call",
                    RecitationType::Test => value == "test",
                }
        })
    }
}

impl fmt::Display for RecitationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One data row of the plan table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub date_label: String,
    #[serde(default)]
    pub memorization: String,
    #[serde(default)]
    pub review: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recitation: Option<RecitationType>,
}

impl CalendarDay {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            weekday: date.weekday(),
            date_label: format!("{}/{}", date.day(), date.month()),
            memorization: String::new(),
            review: String::new(),
            recitation: None,
        }
    }

    pub fn weekday_name(&self) -> &'static str {
        weekday_label(self.weekday)
    }

    /// Cell values in header order.
    pub fn cells(&self) -> [String; 5] {
        [
            self.weekday_name().to_string(),
            self.date_label.clone(),
            self.memorization.clone(),
            self.review.clone(),
            self.recitation
                .map(|kind| kind.label().to_string())
                .unwrap_or_default(),
        ]
    }
}

fn first_of_month(month: u32, year: i32) -> Result<NaiveDate, CalendarError> {
    if month > 11 {
        return Err(CalendarError::InvalidMonth(month));
    }
    NaiveDate::from_ymd_opt(year, month + 1, 1).ok_or(CalendarError::InvalidYear(year))
}

/// Number of days in a 0-based month.
pub fn days_in_month(month: u32, year: i32) -> Result<u32, CalendarError> {
    let first = first_of_month(month, year)?;
    let next = if month == 11 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 2, 1)
    };
    let next = next.ok_or(CalendarError::InvalidYear(year))?;
    Ok((next - first).num_days() as u32)
}

/// Rows from `starting_day` through the end of a 0-based month.
///
/// A starting day past the end of the month yields no rows.
pub fn generate_rows(
    month: u32,
    year: i32,
    starting_day: u32,
) -> Result<Vec<CalendarDay>, CalendarError> {
    let first = first_of_month(month, year)?;
    let days = days_in_month(month, year)?;
    let start = starting_day.max(1);
    if start > days {
        return Ok(Vec::new());
    }

    let mut rows = Vec::with_capacity((days - start + 1) as usize);
    let mut current = first + Duration::days(i64::from(start - 1));
    while current.month() == first.month() {
        rows.push(CalendarDay::new(current));
        current = current + Duration::days(1);
    }
    Ok(rows)
}

pub fn clamp_starting_day(value: u32, month: u32, year: i32) -> Result<u32, CalendarError> {
    let days = days_in_month(month, year)?;
    Ok(value.clamp(1, days))
}

/// Non-numeric input becomes day 1; callers clamp afterwards.
pub fn parse_starting_day(input: &str) -> u32 {
    input.trim().parse::<u32>().unwrap_or(1).max(1)
}
