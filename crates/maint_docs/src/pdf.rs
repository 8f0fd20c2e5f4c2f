//! Paginated PDF table generation.
//!
//! Generates PDF 1.4 files using raw PDF format construction with the
//! built-in Helvetica faces, so no font files are required. Tables are laid
//! out from Helvetica metrics: columns fill the usable page width, cell text
//! wraps on word boundaries, rows that do not fit start a new page with a
//! repeated header row, and every page carries a page-number footer.
//!
//! When the columns cannot be narrowed enough to fit the page, the first
//! rendering is thrown away and the table is rendered once more with
//! proportionally smaller fonts. There is no third attempt.

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::metrics::{FontFace, longest_word_width, text_width};

/// Points per millimetre.
pub const MM: f64 = 72.0 / 25.4;

const LINE_HEIGHT: f64 = 1.15;
const OVERFLOW_TOLERANCE: f64 = 0.01;
const HEAD_FILL: [u8; 3] = [33, 150, 243];
const GRID_GRAY: f64 = 0.78;
const FOOTER_FONT_SIZE: f64 = 10.0;
const TITLE_FONT_SIZE: f64 = 16.0;

/// Page size and fixed positions, in points from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin_x: f64,
    pub title_top: f64,
    pub table_top: f64,
    pub margin_bottom: f64,
    /// Distance of the footer baseline from the bottom edge.
    pub footer_bottom: f64,
}

impl PageGeometry {
    pub fn a4_landscape() -> Self {
        Self {
            width: 841.89,
            height: 595.28,
            margin_x: 10.0 * MM,
            title_top: 15.0 * MM,
            table_top: 25.0 * MM,
            margin_bottom: 15.0 * MM,
            footer_bottom: 10.0 * MM,
        }
    }

    pub fn usable_width(&self) -> f64 {
        self.width - 2.0 * self.margin_x
    }
}

/// A column rendered at a fixed width on a single clipped line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinnedColumn {
    pub index: usize,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableStyle {
    pub body_font_size: f64,
    pub head_font_size: f64,
    pub cell_padding: f64,
    pub pinned: Option<PinnedColumn>,
}

impl TableStyle {
    /// First-pass style: 7pt body, 8pt head, 1mm padding.
    pub fn standard(pinned_index: Option<usize>) -> Self {
        Self {
            body_font_size: 7.0,
            head_font_size: 8.0,
            cell_padding: 1.0 * MM,
            pinned: pinned_index.map(|index| PinnedColumn {
                index,
                width: 18.0 * MM,
            }),
        }
    }

    /// Re-layout style for an overflowing table. `scale` is usable width over
    /// the overflowed width. Fonts never drop below 5pt (body) and 6pt (head).
    pub fn scaled(scale: f64) -> Self {
        Self {
            body_font_size: (7.0 * scale).floor().max(5.0),
            head_font_size: (8.0 * scale).floor().max(6.0),
            cell_padding: 0.75 * MM,
            pinned: None,
        }
    }
}

/// Summary of one rendering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPass {
    pub body_font_size: f64,
    pub head_font_size: f64,
    pub table_width: f64,
    pub page_count: usize,
    pub overflowed: bool,
}

/// A finished PDF plus the passes it took to produce it.
#[derive(Debug, Clone)]
pub struct PdfTableReport {
    pub bytes: Vec<u8>,
    pub passes: Vec<RenderPass>,
}

impl PdfTableReport {
    /// The pass whose rendering ended up in `bytes`.
    pub fn final_pass(&self) -> Option<&RenderPass> {
        self.passes.last()
    }
}

/// Generate an A4 landscape PDF with a title line and a grid table.
///
/// `pinned_column` names a column index rendered at a fixed narrow width
/// without wrapping during the first pass.
pub fn generate_pdf_table_report(
    title: &str,
    headers: &[String],
    rows: &[Vec<String>],
    pinned_column: Option<usize>,
) -> Result<PdfTableReport> {
    if let Some(bad) = rows.iter().position(|row| row.len() != headers.len()) {
        bail!(
            "Row {bad} has {} cells but the table has {} columns",
            rows[bad].len(),
            headers.len()
        );
    }

    let geometry = PageGeometry::a4_landscape();
    let usable = geometry.usable_width();
    let pinned_column = pinned_column.filter(|index| *index < headers.len());

    let first = render_table(title, headers, rows, &TableStyle::standard(pinned_column), &geometry);
    let first_overflowed = first.table_width > usable + OVERFLOW_TOLERANCE;
    let mut passes = vec![first.summary(first_overflowed)];

    let rendered = if first_overflowed {
        let scale = usable / first.table_width;
        info!(
            "Table width {:.1}pt exceeds usable {:.1}pt; re-rendering at scale {:.3}",
            first.table_width, usable, scale
        );
        let second = render_table(title, headers, rows, &TableStyle::scaled(scale), &geometry);
        let second_overflowed = second.table_width > usable + OVERFLOW_TOLERANCE;
        if second_overflowed {
            debug!(
                "Table still {:.1}pt wide after re-layout; keeping it",
                second.table_width
            );
        }
        passes.push(second.summary(second_overflowed));
        second
    } else {
        first
    };

    let builder = PdfBuilder {
        title: title.to_string(),
        geometry,
        pages: rendered.pages,
    };
    Ok(PdfTableReport {
        bytes: builder.build(),
        passes,
    })
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

struct RenderedTable {
    pages: Vec<String>,
    table_width: f64,
    body_font_size: f64,
    head_font_size: f64,
}

impl RenderedTable {
    fn summary(&self, overflowed: bool) -> RenderPass {
        RenderPass {
            body_font_size: self.body_font_size,
            head_font_size: self.head_font_size,
            table_width: self.table_width,
            page_count: self.pages.len(),
            overflowed,
        }
    }
}

/// Column widths for the "auto" table width: fill the available width,
/// shrinking toward each column's longest word when content is too wide.
/// When even the longest words do not fit, the table overflows.
fn layout_columns(
    headers: &[String],
    rows: &[Vec<String>],
    style: &TableStyle,
    available: f64,
) -> Vec<f64> {
    let pad = 2.0 * style.cell_padding;
    let mut natural = Vec::with_capacity(headers.len());
    let mut minimum = Vec::with_capacity(headers.len());

    for (col, header) in headers.iter().enumerate() {
        if let Some(pin) = style.pinned.filter(|p| p.index == col) {
            natural.push(pin.width);
            minimum.push(pin.width);
            continue;
        }
        let mut nat = collapsed_width(header, FontFace::Bold, style.head_font_size);
        let mut min = longest_word_width(header, FontFace::Bold, style.head_font_size);
        for row in rows {
            let cell = &row[col];
            nat = nat.max(collapsed_width(cell, FontFace::Regular, style.body_font_size));
            min = min.max(longest_word_width(cell, FontFace::Regular, style.body_font_size));
        }
        natural.push(nat + pad);
        minimum.push(min + pad);
    }

    let is_flex = |col: usize| style.pinned.is_none_or(|p| p.index != col);
    let fixed: f64 = (0..headers.len())
        .filter(|c| !is_flex(*c))
        .map(|c| natural[c])
        .sum();
    let flex: Vec<usize> = (0..headers.len()).filter(|c| is_flex(*c)).collect();
    if flex.is_empty() {
        return natural;
    }

    let available = (available - fixed).max(0.0);
    let sum_natural: f64 = flex.iter().map(|c| natural[*c]).sum();
    let sum_minimum: f64 = flex.iter().map(|c| minimum[*c]).sum();

    let mut widths = natural.clone();
    if sum_natural <= available {
        let grow = if sum_natural > 0.0 {
            available / sum_natural
        } else {
            1.0
        };
        for c in &flex {
            widths[*c] = natural[*c] * grow;
        }
    } else if sum_minimum <= available {
        let k = (available - sum_minimum) / (sum_natural - sum_minimum);
        for c in &flex {
            widths[*c] = minimum[*c] + (natural[*c] - minimum[*c]) * k;
        }
    } else {
        for c in &flex {
            widths[*c] = minimum[*c];
        }
    }
    widths
}

fn collapsed_width(text: &str, face: FontFace, size: f64) -> f64 {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    text_width(&collapsed, face, size)
}

/// Greedy word wrap. Words wider than `max_width` are broken between
/// characters.
fn wrap_text(text: &str, face: FontFace, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, face, size) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if text_width(word, face, size) <= max_width {
            current = word.to_string();
            continue;
        }
        for ch in word.chars() {
            current.push(ch);
            if text_width(&current, face, size) > max_width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Single line truncated to fit `max_width`.
fn clip_text(text: &str, face: FontFace, size: f64, max_width: f64) -> String {
    let mut clipped = String::new();
    for word in text.split_whitespace() {
        let sep = if clipped.is_empty() { "" } else { " " };
        for (i, ch) in sep.chars().chain(word.chars()).enumerate() {
            clipped.push(ch);
            if text_width(&clipped, face, size) > max_width {
                clipped.pop();
                if i == 0 {
                    return clipped;
                }
                return clipped.trim_end().to_string();
            }
        }
    }
    clipped
}

struct LaidOutRow {
    cells: Vec<Vec<String>>,
    height: f64,
}

fn lay_out_row(
    cells: &[String],
    widths: &[f64],
    face: FontFace,
    size: f64,
    style: &TableStyle,
) -> LaidOutRow {
    let inner = |w: f64| (w - 2.0 * style.cell_padding).max(0.0);
    let cells: Vec<Vec<String>> = cells
        .iter()
        .enumerate()
        .map(|(col, text)| {
            let width = inner(widths[col]);
            if style.pinned.is_some_and(|p| p.index == col) {
                vec![clip_text(text, face, size, width)]
            } else {
                wrap_text(text, face, size, width)
            }
        })
        .collect();
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let height = lines as f64 * size * LINE_HEIGHT + 2.0 * style.cell_padding;
    LaidOutRow { cells, height }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_table(
    title: &str,
    headers: &[String],
    rows: &[Vec<String>],
    style: &TableStyle,
    geometry: &PageGeometry,
) -> RenderedTable {
    let widths = layout_columns(headers, rows, style, geometry.usable_width());
    let table_width: f64 = widths.iter().sum();

    let head = lay_out_row(headers, &widths, FontFace::Bold, style.head_font_size, style);
    let body: Vec<LaidOutRow> = rows
        .iter()
        .map(|row| lay_out_row(row, &widths, FontFace::Regular, style.body_font_size, style))
        .collect();

    let bottom = geometry.height - geometry.margin_bottom;
    let mut pages = Vec::new();
    let mut page = PageCanvas::new(*geometry);
    page.text(
        geometry.margin_x,
        geometry.title_top,
        FontFace::Regular,
        TITLE_FONT_SIZE,
        title,
        [0, 0, 0],
    );

    let mut y = geometry.table_top;
    y = page.row(&head, &widths, y, style.head_font_size, style, RowKind::Head);
    let mut rows_on_page = 0usize;

    for row in &body {
        if y + row.height > bottom && rows_on_page > 0 {
            pages.push(page.finish(pages.len() + 1));
            page = PageCanvas::new(*geometry);
            y = page.row(
                &head,
                &widths,
                geometry.table_top,
                style.head_font_size,
                style,
                RowKind::Head,
            );
            rows_on_page = 0;
        }
        y = page.row(row, &widths, y, style.body_font_size, style, RowKind::Body);
        rows_on_page += 1;
    }
    pages.push(page.finish(pages.len() + 1));

    debug!(
        "Rendered {} rows over {} pages at {}pt/{}pt, table width {:.1}pt",
        rows.len(),
        pages.len(),
        style.body_font_size,
        style.head_font_size,
        table_width
    );

    RenderedTable {
        pages,
        table_width,
        body_font_size: style.body_font_size,
        head_font_size: style.head_font_size,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Head,
    Body,
}

/// Content stream for one page. Positions passed in are measured from the
/// top-left corner and flipped to PDF user space here.
struct PageCanvas {
    geometry: PageGeometry,
    content: String,
}

impl PageCanvas {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            content: String::new(),
        }
    }

    fn flip(&self, y: f64) -> f64 {
        self.geometry.height - y
    }

    fn text(&mut self, x: f64, baseline: f64, face: FontFace, size: f64, text: &str, rgb: [u8; 3]) {
        let y = self.flip(baseline);
        self.content.push_str(&format!("{} rg\n", rgb_operands(rgb)));
        self.content.push_str("BT\n");
        self.content
            .push_str(&format!("/{} {size:.2} Tf\n", face.resource()));
        self.content.push_str(&format!("{x:.2} {y:.2} Td\n"));
        self.content.push_str(&format!("({}) Tj\n", pdf_escape(text)));
        self.content.push_str("ET\n");
    }

    /// Draws one row and returns the y position below it.
    fn row(
        &mut self,
        row: &LaidOutRow,
        widths: &[f64],
        top: f64,
        size: f64,
        style: &TableStyle,
        kind: RowKind,
    ) -> f64 {
        let total: f64 = widths.iter().sum();
        let x0 = self.geometry.margin_x;
        let bottom_pdf = self.flip(top + row.height);

        if kind == RowKind::Head {
            self.content
                .push_str(&format!("{} rg\n", rgb_operands(HEAD_FILL)));
            self.content.push_str(&format!(
                "{x0:.2} {bottom_pdf:.2} {total:.2} {:.2} re f\n",
                row.height
            ));
        }

        // Cell borders
        self.content.push_str(&format!("{GRID_GRAY} G\n0.28 w\n"));
        let mut x = x0;
        for width in widths {
            self.content.push_str(&format!(
                "{x:.2} {bottom_pdf:.2} {width:.2} {:.2} re S\n",
                row.height
            ));
            x += width;
        }

        let (face, color) = match kind {
            RowKind::Head => (FontFace::Bold, [255, 255, 255]),
            RowKind::Body => (FontFace::Regular, [20, 20, 20]),
        };
        let line_height = size * LINE_HEIGHT;
        let mut x = x0;
        for (col, lines) in row.cells.iter().enumerate() {
            // Vertically centred within the row.
            let block = lines.len() as f64 * line_height;
            let offset = (row.height - 2.0 * style.cell_padding - block) / 2.0;
            for (i, line) in lines.iter().enumerate() {
                if line.is_empty() {
                    continue;
                }
                let baseline =
                    top + style.cell_padding + offset + i as f64 * line_height + size * 0.9;
                self.text(x + style.cell_padding, baseline, face, size, line, color);
            }
            x += widths[col];
        }

        top + row.height
    }

    fn finish(mut self, page_number: usize) -> String {
        let baseline = self.geometry.height - self.geometry.footer_bottom;
        self.text(
            self.geometry.margin_x,
            baseline,
            FontFace::Regular,
            FOOTER_FONT_SIZE,
            &format!("Page {page_number}"),
            [0, 0, 0],
        );
        self.content
    }
}

fn rgb_operands(rgb: [u8; 3]) -> String {
    let [r, g, b] = rgb.map(|c| f64::from(c) / 255.0);
    format!("{r:.3} {g:.3} {b:.3}")
}

/// Escape a string for a PDF literal. Latin-1 characters are written as octal
/// escapes for WinAnsiEncoding; anything else becomes `?`.
fn pdf_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' | '\r' | '\t' => out.push(' '),
            ' '..='~' => out.push(c),
            '\u{A0}'..='\u{FF}' => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// File assembly
// ---------------------------------------------------------------------------

/// Minimal multi-page PDF 1.4 writer.
struct PdfBuilder {
    title: String,
    geometry: PageGeometry,
    pages: Vec<String>,
}

impl PdfBuilder {
    /// Object layout: 1 catalog, 2 page tree, 3-4 fonts, 5 info, then a
    /// (page, content stream) pair per page starting at 6.
    fn build(&self) -> Vec<u8> {
        let mut pdf = String::new();
        let mut offsets: Vec<usize> = Vec::new();

        pdf.push_str("%PDF-1.4\n");

        offsets.push(pdf.len());
        pdf.push_str("1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

        let kids: Vec<String> = (0..self.pages.len())
            .map(|i| format!("{} 0 R", 6 + 2 * i))
            .collect();
        offsets.push(pdf.len());
        pdf.push_str(&format!(
            "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\n",
            kids.join(" "),
            self.pages.len()
        ));

        offsets.push(pdf.len());
        pdf.push_str(
            "3 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>\nendobj\n",
        );

        offsets.push(pdf.len());
        pdf.push_str(
            "4 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>\nendobj\n",
        );

        offsets.push(pdf.len());
        pdf.push_str(&format!(
            "5 0 obj\n<< /Title ({}) /Producer (maint-export) >>\nendobj\n",
            pdf_escape(&self.title)
        ));

        for (i, stream) in self.pages.iter().enumerate() {
            let page_id = 6 + 2 * i;
            let content_id = page_id + 1;

            offsets.push(pdf.len());
            pdf.push_str(&format!(
                "{page_id} 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {content_id} 0 R /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> >>\nendobj\n",
                self.geometry.width, self.geometry.height
            ));

            offsets.push(pdf.len());
            pdf.push_str(&format!(
                "{content_id} 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
                stream.len(),
                stream
            ));
        }

        // Cross-reference table
        let xref_offset = pdf.len();
        let num_objects = offsets.len() + 1; // +1 for free entry
        pdf.push_str(&format!("xref\n0 {num_objects}\n"));
        pdf.push_str("0000000000 65535 f \n");
        for offset in &offsets {
            pdf.push_str(&format!("{:010} 00000 n \n", offset));
        }

        pdf.push_str(&format!(
            "trailer\n<< /Size {num_objects} /Root 1 0 R /Info 5 0 R >>\n"
        ));
        pdf.push_str(&format!("startxref\n{xref_offset}\n%%EOF\n"));

        pdf.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn wide_table(columns: usize) -> (Vec<String>, Vec<Vec<String>>) {
        let headers = (0..columns).map(|i| format!("Column{i}")).collect();
        let rows = vec![(0..columns).map(|_| "ABCDEFGHIJKLMNOPQRSTUV".to_string()).collect()];
        (headers, rows)
    }

    #[test]
    fn test_pdf_escape() {
        assert_eq!(pdf_escape("hello"), "hello");
        assert_eq!(pdf_escape("(test)"), "\\(test\\)");
        assert_eq!(pdf_escape("a\\b"), "a\\\\b");
        assert_eq!(pdf_escape("café"), "caf\\351");
        assert_eq!(pdf_escape("日本"), "??");
    }

    #[test]
    fn test_scaled_style_floors() {
        let style = TableStyle::scaled(0.1);
        assert_eq!(style.body_font_size, 5.0);
        assert_eq!(style.head_font_size, 6.0);
        assert!(style.pinned.is_none());

        let style = TableStyle::scaled(0.95);
        assert_eq!(style.body_font_size, 6.0);
        assert_eq!(style.head_font_size, 7.0);
    }

    #[test]
    fn test_wrap_text_breaks_on_words() {
        let size = 10.0;
        let width = text_width("Replace pump", FontFace::Regular, size) + 0.1;
        let lines = wrap_text("Replace pump seal today", FontFace::Regular, size, width);
        assert_eq!(lines, vec!["Replace pump", "seal today"]);
    }

    #[test]
    fn test_wrap_text_splits_long_word() {
        let size = 10.0;
        let width = text_width("ABCD", FontFace::Regular, size) + 0.1;
        let lines = wrap_text("ABCDEFGH", FontFace::Regular, size, width);
        assert_eq!(lines, vec!["ABCD", "EFGH"]);
    }

    #[test]
    fn test_wrap_text_empty_is_one_line() {
        assert_eq!(wrap_text("   ", FontFace::Regular, 7.0, 50.0), vec![String::new()]);
    }

    #[test]
    fn test_clip_text_truncates() {
        let size = 7.0;
        let width = text_width("2025-08-01", FontFace::Regular, size);
        assert_eq!(
            clip_text("2025-08-01 14:30", FontFace::Regular, size, width),
            "2025-08-01"
        );
        assert_eq!(clip_text("short", FontFace::Regular, size, 100.0), "short");
    }

    #[test]
    fn test_layout_fills_usable_width() {
        let headers = strings(&["Code", "Title"]);
        let rows = vec![strings(&["EQ1", "Pump"])];
        let style = TableStyle::standard(None);
        let widths = layout_columns(&headers, &rows, &style, 785.0);
        let total: f64 = widths.iter().sum();
        assert!((total - 785.0).abs() < 1e-6);
    }

    #[test]
    fn test_layout_pins_column_width() {
        let headers = strings(&["Report Date", "Title"]);
        let rows = vec![strings(&["2025-08-01 14:30:00", "Pump"])];
        let style = TableStyle::standard(Some(0));
        let widths = layout_columns(&headers, &rows, &style, 785.0);
        assert!((widths[0] - 18.0 * MM).abs() < 1e-9);
        assert!((widths.iter().sum::<f64>() - 785.0).abs() < 1e-6);
    }

    #[test]
    fn test_layout_shrinks_toward_longest_word() {
        let headers = strings(&["Notes"]);
        let long_text = "word ".repeat(400);
        let rows = vec![vec![long_text]];
        let style = TableStyle::standard(None);
        let widths = layout_columns(&headers, &rows, &style, 300.0);
        assert!((widths[0] - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_report_basic_single_pass() {
        let headers = strings(&["Code", "Reporter"]);
        let rows = vec![strings(&["EQ1", "Jane"])];
        let report = generate_pdf_table_report("WorkReports", &headers, &rows, None).unwrap();
        assert!(report.bytes.starts_with(b"%PDF"));
        assert_eq!(report.passes.len(), 1);
        assert!(!report.passes[0].overflowed);

        let content = String::from_utf8_lossy(&report.bytes);
        assert!(content.contains("(Page 1) Tj"));
        assert!(content.contains("(WorkReports) Tj"));
        assert!(content.contains("/MediaBox [0 0 841.89 595.28]"));
    }

    #[test]
    fn test_report_empty_rows() {
        let headers = strings(&["Col1", "Col2"]);
        let report = generate_pdf_table_report("Empty", &headers, &[], None).unwrap();
        assert!(report.bytes.starts_with(b"%PDF"));
        assert_eq!(report.final_pass().unwrap().page_count, 1);
    }

    #[test]
    fn test_report_rejects_ragged_rows() {
        let headers = strings(&["A", "B"]);
        let rows = vec![strings(&["only one"])];
        assert!(generate_pdf_table_report("Bad", &headers, &rows, None).is_err());
    }

    #[test]
    fn test_report_paginates_and_numbers_pages() {
        let headers = strings(&["Code", "Title"]);
        let rows: Vec<Vec<String>> = (0..200)
            .map(|i| vec![format!("EQ{i}"), format!("Inspection {i}")])
            .collect();
        let report = generate_pdf_table_report("Long", &headers, &rows, None).unwrap();
        let pages = report.final_pass().unwrap().page_count;
        assert!(pages > 1);

        let content = String::from_utf8_lossy(&report.bytes);
        assert!(content.contains(&format!("/Count {pages}")));
        for page in 1..=pages {
            assert!(content.contains(&format!("(Page {page}) Tj")));
        }
        // Header row repeats on every page.
        assert_eq!(content.matches("(Code) Tj").count(), pages);
    }

    #[test]
    fn test_report_overflow_renders_twice_with_smaller_fonts() {
        let (headers, rows) = wide_table(30);
        let report = generate_pdf_table_report("Wide", &headers, &rows, None).unwrap();
        assert_eq!(report.passes.len(), 2);

        let first = &report.passes[0];
        let second = &report.passes[1];
        assert!(first.overflowed);
        assert!(first.table_width > PageGeometry::a4_landscape().usable_width());
        assert!(second.body_font_size < first.body_font_size);
        assert!(second.head_font_size < first.head_font_size);
        assert!(second.body_font_size >= 5.0);
        assert!(second.head_font_size >= 6.0);
    }

    #[test]
    fn test_report_overflow_keeps_only_second_rendering() {
        let (headers, rows) = wide_table(30);
        let report = generate_pdf_table_report("Wide", &headers, &rows, None).unwrap();
        let content = String::from_utf8_lossy(&report.bytes);
        let pages = report.final_pass().unwrap().page_count;
        assert_eq!(content.matches("(Wide) Tj").count(), 1);
        assert!(content.contains(&format!("/Count {pages}")));
        assert!(!content.contains("/F2 7.00 Tf"));
    }
}
