//! monizze-export: fixed-schema CSV output and the fetch → normalize → export pipeline

pub mod atomic;
pub mod csv_export;
pub mod pipeline;

pub use atomic::{preflight, write_atomically};
pub use csv_export::{COLUMNS, CsvExporter};
pub use pipeline::{ExportSummary, collect_history, run_export};
