//! Reading a bound table: visible columns and per-row cell indexes.

use std::collections::HashMap;

use tracing::warn;

use crate::dom::Element;

/// A header cell paired with the field key of the data cell beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub display_label: String,
    pub field_key: String,
}

/// Cells of one data row indexed by their declared `data-field`.
#[derive(Debug, Clone)]
pub struct RowSnapshot<'a> {
    cells: HashMap<&'a str, &'a Element>,
    td_count: usize,
}

impl<'a> RowSnapshot<'a> {
    pub fn from_row(row: &'a Element) -> Self {
        let tds = row.find_all_tag("td");
        let mut cells = HashMap::new();
        for &td in &tds {
            if let Some(field) = td.data("field").filter(|f| !f.is_empty()) {
                cells.insert(field, td);
            }
        }
        Self {
            cells,
            td_count: tds.len(),
        }
    }

    /// False for a row with no `td` at all, with or without `data-field`.
    pub fn has_cells(&self) -> bool {
        self.td_count > 0
    }

    pub fn cell(&self, field_key: &str) -> Option<&'a Element> {
        self.cells.get(field_key).copied()
    }
}

/// Read-only view over a `<table>` element.
#[derive(Debug, Clone, Copy)]
pub struct TableView<'a> {
    table: &'a Element,
}

impl<'a> TableView<'a> {
    pub fn new(table: &'a Element) -> Self {
        Self { table }
    }

    /// `thead th`, or the `th` cells of the first row holding any when the
    /// table has no `thead`.
    pub fn header_cells(&self) -> Vec<&'a Element> {
        if let Some(thead) = self.table.find_tag("thead") {
            return thead.find_all_tag("th");
        }
        self.table
            .find_all_tag("tr")
            .into_iter()
            .map(|tr| tr.find_all_tag("th"))
            .find(|ths| !ths.is_empty())
            .unwrap_or_default()
    }

    /// `tbody tr`, or every `tr` without header cells when the table has no
    /// `tbody`.
    pub fn body_rows(&self) -> Vec<&'a Element> {
        if let Some(tbody) = self.table.find_tag("tbody") {
            return tbody.find_all_tag("tr");
        }
        self.table
            .find_all_tag("tr")
            .into_iter()
            .filter(|tr| tr.find_tag("th").is_none())
            .collect()
    }

    /// Body rows not hidden by an inline `display: none`.
    pub fn visible_rows(&self) -> Vec<RowSnapshot<'a>> {
        self.body_rows()
            .into_iter()
            .filter(|tr| !tr.is_display_none())
            .map(RowSnapshot::from_row)
            .collect()
    }

    /// Visible columns in left-to-right order. Header cells are matched by
    /// position against the first body row; columns that are hidden, have
    /// no width, or have no resolvable field key are skipped.
    pub fn resolve_visible_columns(&self) -> Vec<ColumnDescriptor> {
        let mut columns = Vec::new();

        let Some(sample_row) = self.body_rows().into_iter().next() else {
            warn!("No sample row found to map columns");
            return columns;
        };
        let sample_cells = sample_row.find_all_tag("td");
        if sample_cells.is_empty() {
            warn!("No sample cells found to map columns");
            return columns;
        }

        for (index, th) in self.header_cells().into_iter().enumerate() {
            if !is_rendered(th) {
                continue;
            }
            let Some(field_key) = sample_cells.get(index).and_then(|td| field_key_of(td)) else {
                warn!("No data-field found for column index {index}");
                continue;
            };
            columns.push(ColumnDescriptor {
                display_label: th.text_content().trim().to_string(),
                field_key: field_key.to_string(),
            });
        }

        columns
    }
}

/// The cell's own `data-field`, else that of its first descendant carrying one.
fn field_key_of(td: &Element) -> Option<&str> {
    let own = td.data("field").filter(|f| !f.is_empty());
    own.or_else(|| {
        td.find(|el| el.data("field").is_some_and(|f| !f.is_empty()))
            .and_then(|el| el.data("field"))
    })
}

/// Header visibility from inline style: not `display: none`, not `hidden`,
/// and a `min-width` (or `width`) that does not resolve to zero or less.
/// Undeclared and `auto` widths count as rendered.
fn is_rendered(th: &Element) -> bool {
    if th.is_display_none() || th.attr("hidden").is_some() {
        return false;
    }
    let width = th.style("min-width").or_else(|| th.style("width"));
    match width.as_deref().and_then(leading_number) {
        Some(value) => value > 0.0,
        None => true,
    }
}

/// Leading decimal number of a CSS length (`"12.5px"` → 12.5, `"auto"` → None).
fn leading_number(value: &str) -> Option<f64> {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn table(markup: &str) -> Document {
        Document::parse(markup).unwrap()
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("0px"), Some(0.0));
        assert_eq!(leading_number("12.5em"), Some(12.5));
        assert_eq!(leading_number("-3px"), Some(-3.0));
        assert_eq!(leading_number("auto"), None);
        assert_eq!(leading_number(""), None);
    }

    #[test]
    fn test_is_rendered() {
        assert!(is_rendered(&Element::new("th")));
        assert!(is_rendered(&Element::new("th").with_attr("style", "width: auto")));
        assert!(is_rendered(&Element::new("th").with_attr("style", "width: 80px")));
        assert!(!is_rendered(&Element::new("th").with_attr("style", "width: 0")));
        assert!(!is_rendered(&Element::new("th").with_attr("style", "display: none")));
        assert!(!is_rendered(&Element::new("th").with_attr("hidden", "")));
        // min-width takes precedence over width
        assert!(!is_rendered(
            &Element::new("th").with_attr("style", "min-width: 0px; width: 90px")
        ));
    }

    #[test]
    fn test_field_key_from_descendant() {
        let td = Element::new("td").with_child(
            Element::new("div").with_child(Element::new("span").with_attr("data-field", "assignee")),
        );
        assert_eq!(field_key_of(&td), Some("assignee"));
        assert_eq!(field_key_of(&Element::new("td")), None);
    }

    #[test]
    fn test_resolve_without_rows_is_empty() {
        let doc = table(r#"<table id="t"><thead><tr><th>Code</th></tr></thead><tbody></tbody></table>"#);
        let view = TableView::new(doc.element_by_id("t").unwrap());
        assert!(view.resolve_visible_columns().is_empty());
    }

    #[test]
    fn test_resolve_without_cells_is_empty() {
        let doc = table(
            r#"<table id="t"><thead><tr><th>Code</th></tr></thead><tbody><tr></tr></tbody></table>"#,
        );
        let view = TableView::new(doc.element_by_id("t").unwrap());
        assert!(view.resolve_visible_columns().is_empty());
    }

    #[test]
    fn test_header_and_body_without_sections() {
        let doc = table(
            r#"<table id="t"><tr><th>Code</th></tr><tr><td data-field="code">EQ1</td></tr></table>"#,
        );
        let view = TableView::new(doc.element_by_id("t").unwrap());
        assert_eq!(view.header_cells().len(), 1);
        assert_eq!(view.body_rows().len(), 1);
        assert_eq!(view.resolve_visible_columns().len(), 1);
    }

    #[test]
    fn test_row_snapshot_indexes_by_field() {
        let row = Element::new("tr")
            .with_child(Element::new("td").with_attr("data-field", "code").with_text("EQ1"))
            .with_child(Element::new("td").with_text("no key"));
        let snapshot = RowSnapshot::from_row(&row);
        assert_eq!(snapshot.cell("code").unwrap().text_content(), "EQ1");
        assert!(snapshot.cell("reporter").is_none());
    }
}
