//! Manifest descriptor parsing and integrity hash stamping.
//!
//! The manifest is the `manifest.json` member of a study archive. It names
//! the embedded database member and records a SHA-256 digest of that
//! member's exact bytes, which the receiving application uses as its sole
//! integrity check. Foreign descriptor fields are carried through a
//! round-trip untouched.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, StudypackError};

/// Name of the manifest member inside an archive.
pub const MANIFEST_MEMBER: &str = "manifest.json";

/// Structured descriptor naming the embedded database and its content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Archive member name of the embedded database file.
    pub database_name: String,

    /// Hex-encoded SHA-256 digest of the database member bytes.
    ///
    /// Defaults to empty on input; every persisting operation restamps it
    /// from the exported database bytes.
    #[serde(default)]
    pub database_hash: String,

    /// Date the archive was first created (YYYY-MM-DD). Preserved across
    /// edits.
    pub creation_date: NaiveDate,

    /// Timestamp of the last mutation. Some writers spell this
    /// `lastModifiedDate`; both are accepted on input.
    #[serde(alias = "lastModifiedDate")]
    pub last_modified: DateTime<Utc>,

    /// Descriptor fields this engine does not interpret, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    /// Parse a manifest from the raw bytes of the manifest member.
    ///
    /// # Errors
    ///
    /// Returns `StudypackError::InvalidManifest` if the bytes are not
    /// well-formed JSON or `databaseName` is missing or empty. A manifest
    /// that cannot be parsed is fatal to the whole load operation.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let manifest: Manifest = serde_json::from_slice(bytes)
            .map_err(|e| StudypackError::InvalidManifest(e.to_string()))?;
        if manifest.database_name.is_empty() {
            return Err(StudypackError::InvalidManifest(
                "databaseName is empty".to_string(),
            ));
        }
        Ok(manifest)
    }

    /// Serialize the manifest to the bytes of the manifest member.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| StudypackError::Encoding(format!("Failed to serialize manifest: {}", e)))
    }

    /// Return an updated copy with `databaseHash` and `lastModified`
    /// replaced. `databaseName`, `creationDate` and foreign fields are
    /// preserved.
    pub fn stamped(&self, hash: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            database_hash: hash.into(),
            last_modified: now,
            ..self.clone()
        }
    }

    /// Whether the recorded hash matches the given database bytes.
    pub fn verify(&self, database: &[u8]) -> bool {
        self.database_hash == digest_hex(database)
    }
}

/// Hash bytes with SHA-256, hex-encoded.
pub fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_minimal_manifest() {
        let raw = br#"{
            "databaseName": "userData.db",
            "databaseHash": "abc123",
            "creationDate": "2024-03-01",
            "lastModified": "2024-03-02T10:00:00Z"
        }"#;

        let manifest = Manifest::parse(raw).unwrap();
        assert_eq!(manifest.database_name, "userData.db");
        assert_eq!(manifest.database_hash, "abc123");
        assert_eq!(
            manifest.creation_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_parse_accepts_last_modified_date_spelling() {
        let raw = br#"{
            "databaseName": "userData.db",
            "creationDate": "2024-03-01",
            "lastModifiedDate": "2024-03-02T10:00:00-03:00"
        }"#;

        let manifest = Manifest::parse(raw).unwrap();
        assert_eq!(
            manifest.last_modified,
            Utc.with_ymd_and_hms(2024, 3, 2, 13, 0, 0).unwrap()
        );
        assert!(manifest.database_hash.is_empty());
    }

    #[test]
    fn test_parse_preserves_foreign_fields() {
        let raw = br#"{
            "databaseName": "userData.db",
            "creationDate": "2024-03-01",
            "lastModified": "2024-03-02T10:00:00Z",
            "version": 1,
            "name": "backup"
        }"#;

        let manifest = Manifest::parse(raw).unwrap();
        assert_eq!(manifest.extra["version"], serde_json::json!(1));

        let emitted = manifest.to_bytes().unwrap();
        let reparsed = Manifest::parse(&emitted).unwrap();
        assert_eq!(reparsed.extra["name"], serde_json::json!("backup"));
    }

    #[test]
    fn test_parse_rejects_empty_database_name() {
        let raw = br#"{
            "databaseName": "",
            "creationDate": "2024-03-01",
            "lastModified": "2024-03-02T10:00:00Z"
        }"#;
        assert!(matches!(
            Manifest::parse(raw),
            Err(StudypackError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            Manifest::parse(b"not json"),
            Err(StudypackError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_digest_hex_known_vector() {
        assert_eq!(
            digest_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_stamped_preserves_identity_fields() {
        let raw = br#"{
            "databaseName": "userData.db",
            "databaseHash": "old",
            "creationDate": "2024-03-01",
            "lastModified": "2024-03-02T10:00:00Z",
            "version": 1
        }"#;
        let manifest = Manifest::parse(raw).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let stamped = manifest.stamped("new", now);
        assert_eq!(stamped.database_hash, "new");
        assert_eq!(stamped.last_modified, now);
        assert_eq!(stamped.database_name, manifest.database_name);
        assert_eq!(stamped.creation_date, manifest.creation_date);
        assert_eq!(stamped.extra, manifest.extra);
    }

    #[test]
    fn test_verify_matches_digest() {
        let raw = br#"{
            "databaseName": "userData.db",
            "creationDate": "2024-03-01",
            "lastModified": "2024-03-02T10:00:00Z"
        }"#;
        let manifest = Manifest::parse(raw).unwrap();
        let stamped = manifest.stamped(digest_hex(b"db bytes"), Utc::now());

        assert!(stamped.verify(b"db bytes"));
        assert!(!stamped.verify(b"tampered"));
    }
}
