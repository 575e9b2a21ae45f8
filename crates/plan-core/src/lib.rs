pub mod calendar;
pub mod catalog;
pub mod config;
pub mod error;
#[cfg(feature = "http_api")]
pub mod http_api;
#[cfg(any(feature = "cli", feature = "http_api"))]
pub mod logging;
pub mod metadata;
pub mod persistence;
pub mod plan;
pub mod preview;
pub mod render;
pub mod schedule;

pub use calendar::{CalendarDay, HEADER, RecitationType, generate_rows};
pub use catalog::{Catalog, Chapter};
pub use config::{AppConfig, load_config, load_config_from, load_config_or_default};
pub use error::{
    CalendarError, CatalogError, ConfigError, PersistenceError, RenderError, ScheduleError,
    SessionError,
};
pub use metadata::{PlanMetadata, ScheduleSettings};
pub use persistence::{
    TableSnapshot, load_catalog, load_catalog_from_csv, load_catalog_from_json,
    save_table_to_csv, save_table_to_json,
};
pub use plan::{PlanSession, RecomputeSummary};
pub use preview::{PreviewHandle, PreviewScheduler};
pub use render::{
    DocumentFormat, DocumentRenderer, DocxRenderer, PdfRenderer, PlanDocument, Watermark,
};
pub use schedule::{DayAssignment, ScheduleRequest, ScheduleResult, Segment};
