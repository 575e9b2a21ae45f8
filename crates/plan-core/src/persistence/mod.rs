//! File import of chapter catalogs and export of the plan table.

pub use crate::error::{PersistenceError, PersistenceResult};

pub mod file;

pub use file::{
    TableSnapshot, load_catalog, load_catalog_from_csv, load_catalog_from_json,
    load_table_from_json, save_table_to_csv, save_table_to_json,
};
