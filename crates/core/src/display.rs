// crates/core/src/display.rs
//! Per-project display configuration.
//!
//! A project maps to an ordered list of sections, each listing the handoff
//! fields to show and how to show them. Projects without an entry fall back
//! to a single section whose fields are generated from the data itself.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Keys in handoff data that are metadata rather than case fields.
const RESERVED_KEYS: [&str; 2] = ["id", "shared_id"];

/// Semantic type of a displayed field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Datetime,
    Boolean,
    Url,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub key: String,
    pub label: String,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub title: String,
    /// Empty means "generate from the data".
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub collapsible: bool,
    #[serde(default = "default_expanded")]
    pub default_expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub sections: Vec<SectionConfig>,
    #[serde(default)]
    pub show_raw_by_default: bool,
}

fn default_expanded() -> bool {
    true
}

impl ProjectConfig {
    /// Configuration used for projects without an explicit entry.
    pub fn fallback() -> Self {
        Self {
            title: None,
            sections: vec![SectionConfig {
                title: "Call Information".into(),
                fields: Vec::new(),
                collapsible: false,
                default_expanded: true,
            }],
            show_raw_by_default: false,
        }
    }

    /// Sections with empty field lists filled in from `data`.
    pub fn resolve_sections(&self, data: &Map<String, Value>) -> Vec<SectionConfig> {
        self.sections
            .iter()
            .map(|section| {
                if section.fields.is_empty() {
                    SectionConfig {
                        fields: auto_generate_fields(data),
                        ..section.clone()
                    }
                } else {
                    section.clone()
                }
            })
            .collect()
    }
}

/// On-disk shape of a display config file:
///
/// ```toml
/// [projects."PROJ-1"]
/// title = "Support"
///
/// [[projects."PROJ-1".sections]]
/// title = "Case"
/// fields = [{ key = "case_id", label = "Case Number", type = "text" }]
/// ```
#[derive(Debug, Deserialize)]
struct DisplayConfigFile {
    #[serde(default)]
    projects: HashMap<String, ProjectConfig>,
}

/// Lookup table from project id to display configuration.
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    projects: HashMap<String, ProjectConfig>,
    fallback: ProjectConfig,
}

impl Default for ProjectRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProjectRegistry {
    /// Registry with no project entries; every lookup falls back.
    pub fn empty() -> Self {
        Self {
            projects: HashMap::new(),
            fallback: ProjectConfig::fallback(),
        }
    }

    /// Registry seeded with the example project shipped with the agent.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.insert("EXAMPLE-PROJECT-123", example_project());
        registry
    }

    pub fn insert(&mut self, project_id: impl Into<String>, config: ProjectConfig) {
        self.projects.insert(project_id.into(), config);
    }

    /// Merge project entries from a TOML document. Entries replace existing
    /// ones with the same id.
    pub fn extend_from_toml(&mut self, source: &str, origin: &Path) -> Result<usize, ConfigError> {
        let file: DisplayConfigFile = toml::from_str(source).map_err(|e| ConfigError::Invalid {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        let count = file.projects.len();
        self.projects.extend(file.projects);
        Ok(count)
    }

    /// Merge project entries from a TOML file on disk.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let count = self.extend_from_toml(&source, path)?;
        tracing::debug!(path = %path.display(), projects = count, "Loaded display config");
        Ok(count)
    }

    /// Configuration for `project_id`, or the fallback if it has none.
    pub fn get(&self, project_id: &str) -> &ProjectConfig {
        self.projects.get(project_id).unwrap_or(&self.fallback)
    }

    pub fn contains(&self, project_id: &str) -> bool {
        self.projects.contains_key(project_id)
    }
}

fn example_project() -> ProjectConfig {
    let field = |key: &str, label: &str, field_type| FieldConfig {
        key: key.into(),
        label: label.into(),
        field_type,
        format: None,
    };
    ProjectConfig {
        title: Some("Test Project".into()),
        sections: vec![
            SectionConfig {
                title: "Case Information".into(),
                fields: vec![
                    field("test_value_1", "Case Number", FieldType::Text),
                    field("test_value_2", "Call Purpose", FieldType::Text),
                ],
                collapsible: false,
                default_expanded: true,
            },
            SectionConfig {
                title: "Metadata".into(),
                fields: vec![
                    field("current_date_time", "Timestamp", FieldType::Datetime),
                    field("x_trace_id", "Trace ID", FieldType::Text),
                ],
                collapsible: true,
                default_expanded: false,
            },
        ],
        show_raw_by_default: false,
    }
}

/// One field per data key, in data order, skipping reserved metadata keys.
pub fn auto_generate_fields(data: &Map<String, Value>) -> Vec<FieldConfig> {
    data.iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| FieldConfig {
            key: key.clone(),
            label: format_label(key),
            field_type: infer_type(value),
            format: None,
        })
        .collect()
}

/// `snake_case` key to a label: split on `_`, capitalise each token.
pub fn format_label(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Guess a field type from a sample value.
///
/// String checks run in a fixed order: datetime, url, email, then text.
pub fn infer_type(value: &Value) -> FieldType {
    match value {
        Value::Bool(_) => FieldType::Boolean,
        Value::Number(_) => FieldType::Number,
        Value::String(s) => {
            let patterns = patterns();
            if patterns.datetime.is_match(s) {
                FieldType::Datetime
            } else if patterns.url.is_match(s) {
                FieldType::Url
            } else if patterns.email.is_match(s) {
                FieldType::Email
            } else {
                FieldType::Text
            }
        }
        _ => FieldType::Text,
    }
}

struct TypePatterns {
    datetime: Regex,
    url: Regex,
    email: Regex,
}

fn patterns() -> &'static TypePatterns {
    static PATTERNS: OnceLock<TypePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| TypePatterns {
        datetime: Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("valid datetime regex"),
        url: Regex::new(r"^https?://").expect("valid url regex"),
        email: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"),
    })
}
