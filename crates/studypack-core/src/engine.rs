//! Byte-level engine operations.
//!
//! Each operation is a pure function from archive bytes (plus a request) to
//! a projection or to new archive bytes. Mutating operations compose the
//! same pipeline: open container, parse manifest, open session, mutate,
//! export, recompute the hash, stamp the manifest, rebuild the container.
//! Members unrelated to the manifest and database ride through unchanged.

use chrono::Utc;

use crate::container::Archive;
use crate::error::{Result, StudypackError};
use crate::manifest::{digest_hex, Manifest, MANIFEST_MEMBER};
use crate::storage::types::{LoadedArchive, NoteImport, NotePatch, TagNameResolver};
use crate::storage::{merge, projection, Session};

/// Database member name used for archives this engine creates.
pub const DEFAULT_DATABASE_NAME: &str = "userData.db";

fn read_manifest(archive: &Archive) -> Result<Manifest> {
    let bytes = archive.member(MANIFEST_MEMBER).ok_or_else(|| {
        StudypackError::InvalidManifest(format!("Archive has no '{}' member", MANIFEST_MEMBER))
    })?;
    Manifest::parse(bytes)
}

fn database_member<'a>(archive: &'a Archive, manifest: &Manifest) -> Result<&'a [u8]> {
    archive.member(&manifest.database_name).ok_or_else(|| {
        StudypackError::MalformedArchive(format!(
            "Archive has no member '{}' named by the manifest",
            manifest.database_name
        ))
    })
}

/// Rebuild archive bytes around the session's current database state.
fn repack(mut archive: Archive, manifest: &Manifest, session: &Session) -> Result<Vec<u8>> {
    let database = session.export()?;
    let stamped = manifest.stamped(digest_hex(&database), Utc::now());
    archive.insert_member(stamped.database_name.clone(), database);
    archive.insert_member(MANIFEST_MEMBER, stamped.to_bytes()?);
    archive.build()
}

/// Read-only projection of an archive for display: manifest, notes
/// (most-recently-touched first) and tags.
pub fn load_archive(bytes: &[u8]) -> Result<LoadedArchive> {
    let archive = Archive::open(bytes)?;
    let manifest = read_manifest(&archive)?;
    let session = Session::open(database_member(&archive, &manifest)?)?;

    let notes = projection::list_notes(&session)?;
    let tags = projection::list_tags(&session)?;

    Ok(LoadedArchive {
        manifest,
        notes,
        tags,
    })
}

/// Merge a batch of externally authored notes into an archive.
///
/// Pure function from old archive bytes plus merge request to new archive
/// bytes; on any failure the input archive is untouched and no bytes are
/// produced.
pub fn merge_notes(
    bytes: &[u8],
    notes: &[NoteImport],
    tag_names: &TagNameResolver,
) -> Result<Vec<u8>> {
    let archive = Archive::open(bytes)?;
    let manifest = read_manifest(&archive)?;
    let session = Session::open(database_member(&archive, &manifest)?)?;

    merge::merge_into(&session, notes, tag_names)?;
    repack(archive, &manifest, &session)
}

/// Apply a field-level patch to one note, returning new archive bytes.
pub fn update_note_field(bytes: &[u8], note_id: i64, patch: &NotePatch) -> Result<Vec<u8>> {
    let archive = Archive::open(bytes)?;
    let manifest = read_manifest(&archive)?;
    let session = Session::open(database_member(&archive, &manifest)?)?;

    projection::update_note_fields(&session, note_id, patch)?;
    repack(archive, &manifest, &session)
}

/// Produce an empty but valid archive: fresh schema, manifest stamped with
/// the database hash, creation date of today.
pub fn new_archive() -> Result<Vec<u8>> {
    let session = Session::create()?;
    let database = session.export()?;
    let now = Utc::now();

    let manifest = Manifest {
        database_name: DEFAULT_DATABASE_NAME.to_string(),
        database_hash: digest_hex(&database),
        creation_date: now.date_naive(),
        last_modified: now,
        extra: serde_json::Map::new(),
    };

    let mut archive = Archive::new();
    archive.insert_member(MANIFEST_MEMBER, manifest.to_bytes()?);
    archive.insert_member(DEFAULT_DATABASE_NAME, database);
    archive.build()
}

/// Verify an archive end to end: the recorded hash matches the database
/// member's bytes, the database opens, and its foreign keys are consistent.
pub fn verify_archive(bytes: &[u8]) -> Result<()> {
    let archive = Archive::open(bytes)?;
    let manifest = read_manifest(&archive)?;
    let database = database_member(&archive, &manifest)?;

    if !manifest.verify(database) {
        return Err(StudypackError::CorruptDatabase(format!(
            "databaseHash does not match the bytes of '{}'",
            manifest.database_name
        )));
    }

    let session = Session::open(database)?;
    session.check_integrity()
}
