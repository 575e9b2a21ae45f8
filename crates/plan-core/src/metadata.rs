use chrono::{Datelike, Local, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Who the plan is for and which month it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub participant_name: String,
    /// 0-based month (January is 0).
    pub month: u32,
    pub year: i32,
    pub starting_day: u32,
}

impl PlanMetadata {
    pub fn new(participant_name: impl Into<String>, month: u32, year: i32) -> Self {
        Self {
            participant_name: participant_name.into(),
            month,
            year,
            starting_day: 1,
        }
    }
}

impl Default for PlanMetadata {
    fn default() -> Self {
        let today = Local::now().date_naive();
        Self::new(String::new(), today.month0(), today.year())
    }
}

/// The knobs that drive the schedule walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default)]
    pub start_chapter: Option<u32>,
    #[serde(default)]
    pub start_page: Option<u32>,
    #[serde(default = "default_pages_per_day")]
    pub pages_per_day: u32,
    #[serde(default)]
    pub alternate_day: bool,
    #[serde(default)]
    pub excluded_weekdays: HashSet<Weekday>,
}

fn default_pages_per_day() -> u32 {
    1
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            start_chapter: None,
            start_page: None,
            pages_per_day: default_pages_per_day(),
            alternate_day: false,
            excluded_weekdays: HashSet::new(),
        }
    }
}
