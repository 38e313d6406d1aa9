//! Merge engine: insert externally authored notes into an open session.
//!
//! A merge is all-or-nothing per call: every note of the batch lands, or
//! none does. The engine only mutates the live session; exporting,
//! re-hashing and repacking the archive are the caller's composition, so
//! several merges can share one re-serialization.

use chrono::Utc;
use rusqlite::{OptionalExtension, Transaction};
use uuid::Uuid;

use crate::error::{Result, StudypackError};
use crate::storage::row::format_timestamp;
use crate::storage::types::{NoteImport, TagNameResolver};
use crate::storage::Session;

/// `Tag.Type` value for user note tags.
pub const NOTE_TAG_TYPE: i64 = 1;

/// Merge a batch of notes inside one transaction.
///
/// Per note: a fresh guid and `Note` row (`Created = LastModified = now`),
/// then for each resolvable tag a `Tag` row reused or created by exact name
/// and a `TagMap` row at the tag's next free position. Empty and
/// whitespace-only names are skipped; duplicate identifiers within one
/// note's list are merged once.
///
/// # Errors
///
/// Any failure rolls the entire transaction back and surfaces as
/// `StudypackError::Merge` naming the batch index and title of the failing
/// note. An identifier the resolver cannot map is such a failure.
pub fn merge_into(
    session: &Session,
    imports: &[NoteImport],
    tag_names: &TagNameResolver,
) -> Result<()> {
    if imports.is_empty() {
        return Ok(());
    }

    session.with_transaction(|tx| {
        for (index, import) in imports.iter().enumerate() {
            insert_import(tx, import, tag_names).map_err(|e| StudypackError::Merge {
                index,
                title: import.title.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    })
}

fn insert_import(
    tx: &Transaction<'_>,
    import: &NoteImport,
    tag_names: &TagNameResolver,
) -> Result<()> {
    let guid = Uuid::new_v4().to_string();
    let now = format_timestamp(Utc::now());

    tx.execute(
        r#"
        INSERT INTO Note (Guid, Title, Content, LastModified, Created, BlockType)
        VALUES (?, ?, ?, ?, ?, 0)
        "#,
        (&guid, &import.title, &import.content, &now, &now),
    )?;
    let note_id = tx.last_insert_rowid();

    let mut attached: Vec<String> = Vec::with_capacity(import.tags.len());
    for id in &import.tags {
        let name = tag_names.resolve(id).ok_or_else(|| {
            StudypackError::NotFound(format!("Tag identifier '{}' has no display name", id))
        })?;
        if name.trim().is_empty() {
            continue;
        }
        if attached.iter().any(|seen| seen == name) {
            continue;
        }
        attached.push(name.to_string());

        let tag_id = find_or_create_tag(tx, name)?;
        let position = next_position(tx, tag_id)?;
        tx.execute(
            "INSERT INTO TagMap (TagId, NoteId, Position) VALUES (?, ?, ?)",
            (tag_id, note_id, position),
        )?;
    }

    Ok(())
}

/// Look up a tag by exact name, inserting it when absent.
fn find_or_create_tag(tx: &Transaction<'_>, name: &str) -> Result<i64> {
    let existing: Option<i64> = tx
        .query_row(
            "SELECT TagId FROM Tag WHERE Type = ? AND Name = ?",
            (NOTE_TAG_TYPE, name),
            |row| row.get(0),
        )
        .optional()?;
    if let Some(tag_id) = existing {
        return Ok(tag_id);
    }

    tx.execute(
        "INSERT INTO Tag (Type, Name) VALUES (?, ?)",
        (NOTE_TAG_TYPE, name),
    )?;
    Ok(tx.last_insert_rowid())
}

/// Next free position under a tag: one past the current maximum, 0 when the
/// tag has no rows. Gaps from deletions are never renumbered.
fn next_position(tx: &Transaction<'_>, tag_id: i64) -> Result<i64> {
    let position: i64 = tx.query_row(
        "SELECT COALESCE(MAX(Position) + 1, 0) FROM TagMap WHERE TagId = ?",
        [tag_id],
        |row| row.get(0),
    )?;
    Ok(position)
}
