// crates/core/src/render.rs
//! Human-readable rendering of handoff data.
//!
//! Values are formatted according to their configured [`FieldType`]; the
//! text renderer lays sections out for a terminal.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use handoff_view_types::HandoffState;
use serde::Serialize;
use serde_json::Value;

use crate::display::{FieldType, ProjectConfig};

/// Shown in place of a missing or null value.
pub const NOT_PROVIDED: &str = "Not provided";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedField {
    pub label: String,
    pub value: String,
    /// Link target for url and email fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSection {
    pub title: String,
    pub collapsible: bool,
    pub expanded: bool,
    pub fields: Vec<RenderedField>,
}

/// Format one value for display.
pub fn format_value(value: Option<&Value>, field_type: FieldType) -> String {
    let value = match value {
        None | Some(Value::Null) => return NOT_PROVIDED.to_string(),
        Some(v) => v,
    };
    match field_type {
        FieldType::Boolean => if is_truthy(value) { "Yes" } else { "No" }.to_string(),
        FieldType::Number => format_number(value).unwrap_or_else(|| value_to_string(value)),
        FieldType::Datetime => {
            let raw = value_to_string(value);
            format_datetime(&raw).unwrap_or(raw)
        }
        FieldType::Url | FieldType::Email | FieldType::Text => value_to_string(value),
    }
}

fn link_for(value: Option<&Value>, field_type: FieldType) -> Option<String> {
    let value = value.filter(|v| !v.is_null())?;
    match field_type {
        FieldType::Url => Some(value_to_string(value)),
        FieldType::Email => Some(format!("mailto:{}", value_to_string(value))),
        _ => None,
    }
}

/// Resolve `config` against the handoff data, one entry per section.
pub fn render_sections(config: &ProjectConfig, handoff: &HandoffState) -> Vec<RenderedSection> {
    config
        .resolve_sections(&handoff.data)
        .into_iter()
        .map(|section| RenderedSection {
            fields: section
                .fields
                .iter()
                .map(|field| {
                    let value = handoff.data.get(&field.key);
                    RenderedField {
                        label: field.label.clone(),
                        value: format_value(value, field.field_type),
                        link: link_for(value, field.field_type),
                    }
                })
                .collect(),
            title: section.title,
            collapsible: section.collapsible,
            expanded: !section.collapsible || section.default_expanded,
        })
        .collect()
}

/// Plain-text view of a handoff for terminal output.
///
/// Collapsed sections show their title only. The raw payload is appended
/// when `show_raw` is set or the project asks for it by default.
pub fn render_text(config: &ProjectConfig, handoff: &HandoffState, show_raw: bool) -> String {
    let mut out = String::new();
    if let Some(title) = &config.title {
        let _ = writeln!(out, "{title}");
    }
    for section in render_sections(config, handoff) {
        if !section.expanded {
            let _ = writeln!(out, "== {} == (collapsed)", section.title);
            continue;
        }
        let _ = writeln!(out, "== {} ==", section.title);
        for field in &section.fields {
            match &field.link {
                Some(link) if link != &field.value => {
                    let _ = writeln!(out, "  {}: {} <{}>", field.label, field.value, link);
                }
                _ => {
                    let _ = writeln!(out, "  {}: {}", field.label, field.value);
                }
            }
        }
    }
    if show_raw || config.show_raw_by_default {
        let raw = serde_json::to_string_pretty(handoff).unwrap_or_default();
        let _ = writeln!(out, "-- raw --\n{raw}");
    }
    out
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Thousands-grouped number with at most three fractional digits.
fn format_number(value: &Value) -> Option<String> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    let rounded = format!("{:.3}", number.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if number < 0.0 && !rounded.trim_matches(|c: char| c == '0' || c == '.').is_empty() {
        "-"
    } else {
        ""
    };
    if frac_part.is_empty() {
        Some(format!("{sign}{grouped}"))
    } else {
        Some(format!("{sign}{grouped}.{frac_part}"))
    }
}

fn format_datetime(raw: &str) -> Option<String> {
    const OUTPUT: &str = "%Y-%m-%d %H:%M:%S";
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local().format(OUTPUT).to_string());
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(dt.format(OUTPUT).to_string());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}
