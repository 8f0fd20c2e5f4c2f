//! Export engine for the maintenance dashboard's tables.
//!
//! A page snapshot is parsed into an owned element tree ([`dom`]), a table
//! is bound by id ([`TableExporter`]), and the visible rows and columns are
//! written out as an XLSX workbook or an A4 landscape PDF.

pub mod chart;
pub mod dom;
pub mod exporter;
pub mod fields;
pub mod table;

pub use chart::{ChartBackend, ChartData, ChartKind, ChartSlot, ChartSpec, Dataset};
pub use dom::{Document, Element, Node};
pub use exporter::{DocumentTable, ExportedFile, TableExporter, TableMatrix, export_file_name};
pub use fields::{FieldRule, IdentifierRule, extract_human_readable_row};
pub use table::{ColumnDescriptor, RowSnapshot, TableView};
