//! Survey CSV → `edificio` XML → ZIP.
//!
//! Shared by the `gerador` CLI and the `api` upload service. Data flows one
//! way: [`loader`] reads the CSV, [`mapper`] turns each row into a
//! [`BuildingRecord`](mapper::BuildingRecord) (using [`complement`] for the
//! complement slots), [`xml`] serializes it and [`archive`] packages the
//! batch. [`pipeline`] wires the stages together.

pub mod archive;
pub mod clock;
pub mod complement;
pub mod error;
pub mod loader;
pub mod logging;
pub mod mapper;
pub mod pipeline;
pub mod xml;

pub use archive::{sweep_stale_archives, Document};
pub use clock::{Clock, FixedClock, SystemClock};
pub use complement::{extract_argument, resolve_complement_code, Complement};
pub use error::{GeradorError, Result};
pub use loader::{load_csv, parse_csv_bytes, CsvTable, InputRow};
pub use mapper::{map_row, BuildingRecord};
pub use pipeline::{build_documents, process_csv, process_table, BatchOptions, BatchReport, BuiltBatch};
pub use xml::to_xml;
