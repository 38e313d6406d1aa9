//! Zip container codec for study archives.
//!
//! An archive is a plain zip file whose entries are treated as named byte
//! members. The codec is a pure transform: `open` reads every member into
//! memory, `build` serializes the current member set back out. Member names
//! are preserved exactly as stored; no path normalization is applied.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{Result, StudypackError};

/// Upper bound on the declared uncompressed size of all members combined.
/// Rejects zip bombs before any entry is inflated.
const MAX_UNCOMPRESSED_BYTES: u64 = 256 * 1024 * 1024;

/// An open study archive: named byte members, manifest and database included.
///
/// Members are held in a sorted map so `build` output is deterministic for a
/// given member set.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    members: BTreeMap<String, Vec<u8>>,
}

impl Archive {
    /// Create an empty archive with no members.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an archive from its serialized bytes.
    ///
    /// Directory entries are skipped; every file entry is read fully into
    /// memory.
    ///
    /// # Errors
    ///
    /// Returns `StudypackError::MalformedArchive` if the bytes are not a
    /// readable zip file or the declared uncompressed size exceeds the
    /// safety limit.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let cursor = Cursor::new(bytes);
        let mut archive = ZipArchive::new(cursor)
            .map_err(|e| StudypackError::MalformedArchive(format!("Unreadable zip: {}", e)))?;

        // Pre-check: sum of uncompressed sizes declared in the archive.
        let mut total_uncompressed: u64 = 0;
        for i in 0..archive.len() {
            if let Ok(file) = archive.by_index(i) {
                total_uncompressed = total_uncompressed.saturating_add(file.size());
            }
        }
        if total_uncompressed > MAX_UNCOMPRESSED_BYTES {
            return Err(StudypackError::MalformedArchive(format!(
                "Declared uncompressed size ({} bytes) exceeds the {} byte limit",
                total_uncompressed, MAX_UNCOMPRESSED_BYTES
            )));
        }

        let mut members = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(|e| {
                StudypackError::MalformedArchive(format!("Unreadable zip entry {}: {}", i, e))
            })?;

            let name = file.name().to_string();
            if name.ends_with('/') {
                continue;
            }

            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).map_err(|e| {
                StudypackError::MalformedArchive(format!("Failed to read member '{}': {}", name, e))
            })?;
            members.insert(name, data);
        }

        Ok(Self { members })
    }

    /// Get a member's bytes by exact name, or `None` if absent.
    pub fn member(&self, name: &str) -> Option<&[u8]> {
        self.members.get(name).map(Vec::as_slice)
    }

    /// Iterate member names in deterministic (sorted) order.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the archive has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Add a member, replacing any existing member of the same name.
    pub fn insert_member(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.members.insert(name.into(), bytes);
    }

    /// Serialize the archive containing exactly the current members.
    ///
    /// Output is deterministic for a given member set: members are written
    /// in sorted name order with fixed entry metadata.
    ///
    /// # Errors
    ///
    /// Returns `StudypackError::Encoding` only on I/O-level failure, never
    /// on member content shape.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        for (name, data) in &self.members {
            writer.start_file(name.as_str(), options).map_err(|e| {
                StudypackError::Encoding(format!("Failed to start member '{}': {}", name, e))
            })?;
            writer.write_all(data).map_err(|e| {
                StudypackError::Encoding(format!("Failed to write member '{}': {}", name, e))
            })?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| StudypackError::Encoding(format!("Failed to finish archive: {}", e)))?;
        Ok(cursor.into_inner())
    }
}
