//! Error types for the plan generator.
//!
//! Each concern gets its own enum so callers can match on the failures they
//! can actually act on. Binaries turn all of them into user-facing messages.

use std::path::PathBuf;

/// Problems with the chapter catalog itself.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog contains no chapters")]
    Empty,

    #[error("chapter {number} has invalid page range {start_page}-{end_page}")]
    InvalidRange {
        number: u32,
        start_page: u32,
        end_page: u32,
    },

    #[error("chapter number {0} appears more than once")]
    DuplicateChapter(u32),
}

/// Calendar generation only fails for out-of-range month/year input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("month {0} is out of range (expected 0-11)")]
    InvalidMonth(u32),

    #[error("year {0} cannot be represented")]
    InvalidYear(i32),
}

/// Failures of the schedule walk.
///
/// Catalog exhaustion is deliberately absent: running out of pages ends the
/// walk without an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("chapter {chapter} is not in the catalog")]
    UnknownChapter { chapter: u32 },

    #[error("page {page} is outside chapter {chapter} (pages {first}-{last})")]
    PageOutsideChapter {
        chapter: u32,
        page: u32,
        first: u32,
        last: u32,
    },
}

impl ScheduleError {
    /// Both variants describe a start position that does not resolve in the catalog.
    pub fn is_invalid_start_position(&self) -> bool {
        matches!(
            self,
            ScheduleError::UnknownChapter { .. } | ScheduleError::PageOutsideChapter { .. }
        )
    }
}

/// Errors raised by edits to a [`crate::plan::PlanSession`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("row {0} does not exist")]
    RowOutOfRange(usize),

    #[error("column {0} is read-only")]
    ReadOnlyColumn(usize),

    #[error("column {0} does not exist")]
    ColumnOutOfRange(usize),

    #[error("'{0}' is not a recitation type")]
    InvalidRecitation(String),
}

/// Failures inside the document renderers.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("table has no header row")]
    MissingHeader,

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("font error: {0}")]
    Font(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("render task failed: {0}")]
    Task(String),
}

/// Watermark fetches never abort a render; this type only travels as far as a log line.
#[derive(Debug, thiserror::Error)]
pub enum ResourceLoadError {
    #[error("failed to fetch {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// File import/export of catalogs and tables.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("unsupported file extension for {0:?}")]
    UnsupportedFormat(PathBuf),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_start_position_messages() {
        let err = ScheduleError::PageOutsideChapter {
            chapter: 2,
            page: 60,
            first: 2,
            last: 49,
        };
        assert!(err.is_invalid_start_position());
        assert_eq!(
            err.to_string(),
            "page 60 is outside chapter 2 (pages 2-49)"
        );
    }

    #[test]
    fn session_error_wraps_schedule_error() {
        let err: SessionError = ScheduleError::UnknownChapter { chapter: 9 }.into();
        assert_eq!(err.to_string(), "chapter 9 is not in the catalog");
    }
}
