//! Table export engine: visible table data to XLSX and PDF files.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use maint_core::{ExportConfig, ReportError};
use maint_docs::{DEFAULT_SHEET_NAME, RenderPass, generate_pdf_table_report, generate_xlsx};
use tracing::{error, info, warn};

use crate::dom::{Document, Element};
use crate::fields::{
    REPORT_DATE_FIELD, extract_human_readable_row, extract_spreadsheet_row, spreadsheet_headers,
};
use crate::table::{ColumnDescriptor, TableView};

/// Header row plus data rows, ready for a writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMatrix {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Rows for the paginated document, plus the column to pin narrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTable {
    pub matrix: TableMatrix,
    pub pinned_column: Option<usize>,
}

/// A file written by an export.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub row_count: usize,
    /// Rendering passes for PDF exports; empty for spreadsheets.
    pub render_passes: Vec<RenderPass>,
}

/// Exports the visible part of one bound table.
///
/// A missing table leaves the exporter inert: every operation returns an
/// empty result instead of failing.
#[derive(Debug, Clone)]
pub struct TableExporter {
    table_id: String,
    table: Option<Element>,
    output_dir: PathBuf,
}

impl TableExporter {
    pub fn new(document: &Document, table_id: &str, output_dir: impl Into<PathBuf>) -> Self {
        let table = document.element_by_id(table_id).cloned();
        if table.is_none() {
            error!("Table with ID \"{table_id}\" not found");
        }
        Self {
            table_id: table_id.to_string(),
            table,
            output_dir: output_dir.into(),
        }
    }

    /// Binds `table_id` and writes into the configured output directory.
    pub fn from_config(document: &Document, table_id: &str, config: &ExportConfig) -> Result<Self> {
        let output_dir = config.resolve_output_dir()?;
        Ok(Self::new(document, table_id, output_dir))
    }

    pub fn is_bound(&self) -> bool {
        self.table.is_some()
    }

    fn view(&self) -> Option<TableView<'_>> {
        self.table.as_ref().map(TableView::new)
    }

    pub fn resolve_visible_columns(&self) -> Vec<ColumnDescriptor> {
        self.view()
            .map(|view| view.resolve_visible_columns())
            .unwrap_or_default()
    }

    /// Header row and one row per visible data row: cleaned values followed
    /// by identifier values. `None` when there is nothing to export.
    pub fn spreadsheet_matrix(&self) -> Option<TableMatrix> {
        let view = self.view()?;
        let columns = view.resolve_visible_columns();
        if columns.is_empty() {
            warn!("No visible columns in table \"{}\"; nothing to export", self.table_id);
            return None;
        }
        let rows = view
            .visible_rows()
            .iter()
            .map(|row| extract_spreadsheet_row(row, &columns))
            .collect();
        Some(TableMatrix {
            headers: spreadsheet_headers(&columns),
            rows,
        })
    }

    /// Visible labels and cleaned rows for the PDF path. Rows without any
    /// cells are left out.
    pub fn document_table(&self) -> Option<DocumentTable> {
        let view = self.view()?;
        let columns = view.resolve_visible_columns();
        if columns.is_empty() {
            warn!("No visible columns in table \"{}\"; nothing to export", self.table_id);
            return None;
        }
        let rows = view
            .visible_rows()
            .iter()
            .filter(|row| row.has_cells())
            .map(|row| extract_human_readable_row(row, &columns))
            .collect();
        let pinned_column = columns
            .iter()
            .position(|col| col.field_key == REPORT_DATE_FIELD);
        Some(DocumentTable {
            matrix: TableMatrix {
                headers: columns.into_iter().map(|col| col.display_label).collect(),
                rows,
            },
            pinned_column,
        })
    }

    /// Writes `{prefix}_{YYYY-MM-DD}.xlsx` with today's UTC date.
    pub fn export_spreadsheet(&self, filename_prefix: &str) -> Result<Option<ExportedFile>> {
        self.export_spreadsheet_on(filename_prefix, Utc::now().date_naive())
    }

    pub fn export_spreadsheet_on(
        &self,
        filename_prefix: &str,
        date: NaiveDate,
    ) -> Result<Option<ExportedFile>> {
        let Some(matrix) = self.spreadsheet_matrix() else {
            return Ok(None);
        };
        let bytes = generate_xlsx(DEFAULT_SHEET_NAME, &matrix.headers, &matrix.rows)
            .map_err(|e| ReportError::Render(format!("{e:#}")))?;
        let path = self.write_output(&export_file_name(filename_prefix, date, "xlsx"), &bytes)?;
        info!(
            "Exported {} rows x {} columns to {}",
            matrix.rows.len(),
            matrix.headers.len(),
            path.display()
        );
        Ok(Some(ExportedFile {
            path,
            row_count: matrix.rows.len(),
            render_passes: Vec::new(),
        }))
    }

    /// Writes `{prefix}_{YYYY-MM-DD}.pdf` with today's UTC date.
    pub fn export_document(&self, filename_prefix: &str) -> Result<Option<ExportedFile>> {
        self.export_document_on(filename_prefix, Utc::now().date_naive())
    }

    pub fn export_document_on(
        &self,
        filename_prefix: &str,
        date: NaiveDate,
    ) -> Result<Option<ExportedFile>> {
        let Some(table) = self.document_table() else {
            return Ok(None);
        };
        let report = generate_pdf_table_report(
            filename_prefix,
            &table.matrix.headers,
            &table.matrix.rows,
            table.pinned_column,
        )
        .map_err(|e| ReportError::Render(format!("{e:#}")))?;
        let path = self.write_output(&export_file_name(filename_prefix, date, "pdf"), &report.bytes)?;
        info!(
            "Exported {} rows to {} in {} pass(es)",
            table.matrix.rows.len(),
            path.display(),
            report.passes.len()
        );
        Ok(Some(ExportedFile {
            path,
            row_count: table.matrix.rows.len(),
            render_passes: report.passes,
        }))
    }

    fn write_output(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            ReportError::FileSystem(format!(
                "Failed to create output directory {}: {e}",
                self.output_dir.display()
            ))
        })?;
        let path = self.output_dir.join(file_name);
        std::fs::write(&path, bytes).map_err(|e| {
            ReportError::FileSystem(format!("Failed to write export {}: {e}", path.display()))
        })?;
        Ok(path)
    }
}

/// `{prefix}_{YYYY-MM-DD}.{extension}`; path separators in the prefix
/// become underscores.
pub fn export_file_name(prefix: &str, date: NaiveDate, extension: &str) -> String {
    let prefix: String = prefix
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{prefix}_{}.{extension}", date.format("%Y-%m-%d"))
}
