use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};

/// Sheet name used for table exports.
pub const DEFAULT_SHEET_NAME: &str = "Data";

/// Generate a single-sheet XLSX file from headers and rows.
///
/// Every cell is written as a string so identifiers such as `"00123"` keep
/// their leading zeros. Returns the raw bytes of the workbook.
pub fn generate_xlsx(sheet_name: &str, headers: &[String], rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(sheet_name)
        .with_context(|| format!("Failed to set sheet name: {sheet_name}"))?;

    let header_format = Format::new().set_bold();

    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &header_format)
            .with_context(|| format!("Failed to write header at column {col}"))?;
    }

    for (row_idx, row) in rows.iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            worksheet
                .write_string(excel_row, col_idx as u16, cell)
                .with_context(|| format!("Failed to write string at ({excel_row}, {col_idx})"))?;
        }
    }

    worksheet.autofit();

    let bytes = workbook
        .save_to_buffer()
        .context("Failed to save workbook to buffer")?;

    Ok(bytes)
}
