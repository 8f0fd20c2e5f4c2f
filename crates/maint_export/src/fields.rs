//! Field-specific cleanup rules.
//!
//! Each field key maps to a [`FieldRule`] through a fixed lookup table.
//! Badges always take precedence; the link and person rules only apply to
//! cells without badges.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::Element;
use crate::table::{ColumnDescriptor, RowSnapshot};

/// Placeholder for a missing or empty value.
pub const EMPTY_VALUE: &str = "-";
/// Identifier used for a badge without a trailing `(ID)`.
pub const UNKNOWN_ID: &str = "UNK";

pub const LINK_FIELD: &str = "code";
pub const BADGE_LIST_FIELD: &str = "technicians";
pub const REPORT_DATE_FIELD: &str = "reportDate";

const BADGE_CLASS: &str = "badge";

/// Data attributes holding a cell-level identifier, in lookup order.
const ID_ATTRIBUTES: [&str; 3] = ["employeeId", "areaCode", "equipmentCode"];

static TRAILING_PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)$").expect("valid regex"));
static TRAILING_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Text of the cell's hyperlink.
    Link,
    /// Person or place name with a trailing `(ID)` removed.
    Person,
    /// One value per badge.
    BadgeList,
    /// Trimmed cell text.
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierRule {
    /// Each badge's trailing `(ID)`.
    BadgeSuffix,
    /// A `data-*` identifier attribute on the cell.
    CellAttribute,
}

const FIELD_RULES: &[(&str, FieldRule)] = &[
    (LINK_FIELD, FieldRule::Link),
    ("reporter", FieldRule::Person),
    ("assignee", FieldRule::Person),
    ("area", FieldRule::Person),
    ("equipment", FieldRule::Person),
    ("supervisor", FieldRule::Person),
    (BADGE_LIST_FIELD, FieldRule::BadgeList),
];

const IDENTIFIER_FIELDS: &[(&str, IdentifierRule)] = &[
    ("reporter", IdentifierRule::CellAttribute),
    ("assignee", IdentifierRule::CellAttribute),
    ("supervisor", IdentifierRule::CellAttribute),
    ("area", IdentifierRule::CellAttribute),
    ("equipment", IdentifierRule::CellAttribute),
    (BADGE_LIST_FIELD, IdentifierRule::BadgeSuffix),
];

impl FieldRule {
    pub fn for_field(field_key: &str) -> Self {
        FIELD_RULES
            .iter()
            .find(|(key, _)| *key == field_key)
            .map(|(_, rule)| *rule)
            .unwrap_or(FieldRule::Plain)
    }
}

impl IdentifierRule {
    /// `None` when the field has no separate identifier column.
    pub fn for_field(field_key: &str) -> Option<Self> {
        IDENTIFIER_FIELDS
            .iter()
            .find(|(key, _)| *key == field_key)
            .map(|(_, rule)| *rule)
    }
}

/// Removes a trailing `" (anything)"`: `"John Doe (E123)"` → `"John Doe"`.
pub fn strip_parenthetical(text: &str) -> String {
    TRAILING_PARENTHETICAL.replace(text, "").into_owned()
}

fn trailing_id(text: &str) -> Option<&str> {
    TRAILING_ID
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn or_placeholder(value: String) -> String {
    if value.is_empty() {
        EMPTY_VALUE.to_string()
    } else {
        value
    }
}

fn trimmed_text(el: &Element) -> String {
    el.text_content().trim().to_string()
}

fn badge_names(badges: &[&Element]) -> String {
    let names: Vec<String> = badges
        .iter()
        .map(|badge| strip_parenthetical(&trimmed_text(badge)))
        .filter(|name| !name.is_empty())
        .collect();
    or_placeholder(names.join(", "))
}

/// Human-readable value of a cell, or `"-"` when the cell is missing.
pub fn human_readable_value(cell: Option<&Element>, field_key: &str) -> String {
    let Some(cell) = cell else {
        return EMPTY_VALUE.to_string();
    };

    let badges = cell.find_all_class(BADGE_CLASS);
    if !badges.is_empty() {
        return badge_names(&badges);
    }

    match FieldRule::for_field(field_key) {
        FieldRule::Link => {
            if let Some(link) = cell.find_tag("a") {
                return or_placeholder(trimmed_text(link));
            }
            or_placeholder(trimmed_text(cell))
        }
        FieldRule::Person => or_placeholder(strip_parenthetical(&trimmed_text(cell))),
        FieldRule::BadgeList | FieldRule::Plain => or_placeholder(trimmed_text(cell)),
    }
}

/// Spreadsheet value: like [`human_readable_value`], except a badge-list
/// field is always rendered as its joined badges.
pub fn spreadsheet_value(cell: Option<&Element>, field_key: &str) -> String {
    match (cell, FieldRule::for_field(field_key)) {
        (Some(cell), FieldRule::BadgeList) => badge_names(&cell.find_all_class(BADGE_CLASS)),
        _ => human_readable_value(cell, field_key),
    }
}

/// Identifier value of a cell for the spreadsheet's ID columns.
pub fn identifier_value(cell: Option<&Element>, rule: IdentifierRule) -> String {
    let Some(cell) = cell else {
        return EMPTY_VALUE.to_string();
    };

    match rule {
        IdentifierRule::BadgeSuffix => {
            let ids: Vec<String> = cell
                .find_all_class(BADGE_CLASS)
                .iter()
                .map(|badge| {
                    let text = trimmed_text(badge);
                    trailing_id(&text).unwrap_or(UNKNOWN_ID).to_string()
                })
                .collect();
            or_placeholder(ids.join(", "))
        }
        IdentifierRule::CellAttribute => ID_ATTRIBUTES
            .iter()
            .filter_map(|key| cell.data(key))
            .find(|value| !value.is_empty())
            .unwrap_or(EMPTY_VALUE)
            .to_string(),
    }
}

/// Header for a field's identifier column: `"Technician IDs"` for the badge
/// list, otherwise `"Reporter ID"` style.
pub fn identifier_header(field_key: &str) -> String {
    if field_key == BADGE_LIST_FIELD {
        return "Technician IDs".to_string();
    }
    let mut chars = field_key.chars();
    match chars.next() {
        Some(first) => format!("{}{} ID", first.to_uppercase(), chars.as_str()),
        None => "ID".to_string(),
    }
}

/// One cleaned value per column, in column order.
pub fn extract_human_readable_row(row: &RowSnapshot<'_>, columns: &[ColumnDescriptor]) -> Vec<String> {
    columns
        .iter()
        .map(|col| human_readable_value(row.cell(&col.field_key), &col.field_key))
        .collect()
}

/// Main values followed by the identifier values of identifier columns.
pub fn extract_spreadsheet_row(row: &RowSnapshot<'_>, columns: &[ColumnDescriptor]) -> Vec<String> {
    let main = columns
        .iter()
        .map(|col| spreadsheet_value(row.cell(&col.field_key), &col.field_key));
    let ids = columns.iter().filter_map(|col| {
        IdentifierRule::for_field(&col.field_key)
            .map(|rule| identifier_value(row.cell(&col.field_key), rule))
    });
    main.chain(ids).collect()
}

/// Visible labels followed by one label per identifier column.
pub fn spreadsheet_headers(columns: &[ColumnDescriptor]) -> Vec<String> {
    let labels = columns.iter().map(|col| col.display_label.clone());
    let id_labels = columns
        .iter()
        .filter(|col| IdentifierRule::for_field(&col.field_key).is_some())
        .map(|col| identifier_header(&col.field_key));
    labels.chain(id_labels).collect()
}
