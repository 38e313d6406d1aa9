//! Core data types for the storage layer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;

/// A decoded note. Snapshot of a `Note` row at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Generated primary key
    pub id: i64,

    /// Generated unique identifier (lowercase hyphenated UUID)
    pub guid: String,

    /// Note title; the display layer decides the placeholder for `None`
    pub title: Option<String>,

    /// Plain-text note content
    pub content: Option<String>,

    /// Timestamp of the last mutation
    pub last_modified: DateTime<Utc>,

    /// Timestamp the note was created
    pub created: DateTime<Utc>,

    /// Block type discriminator from the archive schema
    pub block_type: i64,
}

/// A decoded tag. Snapshot of a `Tag` row at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    /// Generated primary key
    pub id: i64,

    /// Tag type discriminator (`Tag.Type`); note tags use type 1
    #[serde(rename = "type")]
    pub kind: i64,

    /// Display name, unique within a type
    pub name: String,
}

/// Read-only projection of a whole archive, for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedArchive {
    /// The archive's descriptor as parsed
    pub manifest: Manifest,

    /// All notes, most-recently-touched first
    pub notes: Vec<Note>,

    /// All tags, by id
    pub tags: Vec<Tag>,
}

/// An externally authored note to merge into an archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteImport {
    /// Note title; stored as given (empty allowed)
    pub title: String,

    /// Rich-text content reduced to plain text by the host
    pub content: String,

    /// Host-side tag identifiers, resolved through a [`TagNameResolver`]
    pub tags: Vec<String>,
}

impl NoteImport {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Field-level patch for a single note.
///
/// Fields left `None` are untouched; `LastModified` is always bumped.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NotePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Name-resolution table mapping host-side tag identifiers to display
/// names.
///
/// The host application tracks tags by opaque id; the archive tracks tags
/// by name. The table is fixed once per merge call.
#[derive(Debug, Clone, Default)]
pub struct TagNameResolver {
    names: HashMap<String, String>,
}

impl TagNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a display name for a host-side tag identifier.
    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(id.into(), name.into());
    }

    /// Display name for an identifier, or `None` if unmapped.
    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagNameResolver {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
