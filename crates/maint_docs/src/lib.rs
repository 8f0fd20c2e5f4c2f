// Document writers for table exports (XLSX, PDF)

pub mod metrics;
pub mod pdf;
pub mod xlsx;

pub use pdf::{PdfTableReport, RenderPass, generate_pdf_table_report};
pub use xlsx::{DEFAULT_SHEET_NAME, generate_xlsx};
