//! Artifact types stored as frontmatter + Markdown files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Tag that marks a prompt as an archived prior version.
pub const ARCHIVE_TAG: &str = "archive";

fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

/// A prompt artifact: YAML frontmatter metadata plus a Markdown body.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Prompt {
    pub id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,
    #[serde(rename = "template", default, skip_serializing_if = "Option::is_none")]
    pub template_ref: Option<String>,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,

    /// Markdown body after the frontmatter, trimmed.
    #[serde(skip)]
    pub content: String,
    /// Storage path relative to the library root.
    #[serde(skip)]
    pub file_path: PathBuf,
    /// SHA-256 hex of the on-disk bytes, recomputed on every read.
    #[serde(skip)]
    pub content_hash: String,
}

impl Prompt {
    /// True when the prompt carries the `archive` tag.
    pub fn is_archived(&self) -> bool {
        self.tags.iter().any(|t| t == ARCHIVE_TAG)
    }

    /// The haystack string matched by fuzzy search.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title,
            self.description,
            self.id,
            self.tags.join(" ")
        )
    }
}

/// A variable declared by a prompt, filled at render time.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type", default)]
    pub var_type: VariableType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// The declared type of a prompt variable.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    #[default]
    String,
    Number,
    Boolean,
    List,
}

/// A reusable scaffold whose `{{content}}` slot receives a prompt body.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<Slot>,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,

    #[serde(skip)]
    pub content: String,
    #[serde(skip)]
    pub file_path: PathBuf,
}

/// A slot declared by a template.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Slot {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A named, persisted boolean + free-text query.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SavedSearch {
    pub name: String,
    pub expression: crate::core::boolean::BooleanExpr,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text_query: String,
}

/// One entry of the messages-shaped render output.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
}
