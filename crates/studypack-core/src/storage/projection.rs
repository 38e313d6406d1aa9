//! Note/Tag projection: read snapshots and field-level updates.
//!
//! No tag resolution happens here; tag names are only known to the merge
//! engine.

use chrono::Utc;

use crate::error::{Result, StudypackError};
use crate::storage::row::{format_timestamp, NoteRow};
use crate::storage::types::{Note, NotePatch, Tag};
use crate::storage::Session;

/// List all notes, most-recently-touched first.
///
/// Ordering is a display convenience re-derived on every call: `LastModified`
/// descending, ties broken by `NoteId` ascending (insertion order).
pub fn list_notes(session: &Session) -> Result<Vec<Note>> {
    session.with_conn(|conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT NoteId, Guid, Title, Content, LastModified, Created, BlockType
            FROM Note
            ORDER BY LastModified DESC, NoteId ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(NoteRow {
                id: row.get(0)?,
                guid: row.get(1)?,
                title: row.get(2)?,
                content: row.get(3)?,
                last_modified: row.get(4)?,
                created: row.get(5)?,
                block_type: row.get(6)?,
            })
        })?;

        let mut notes = Vec::new();
        for row in rows {
            notes.push(row?.try_into()?);
        }
        Ok(notes)
    })
}

/// List all tags by id.
pub fn list_tags(session: &Session) -> Result<Vec<Tag>> {
    session.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT TagId, Type, Name FROM Tag ORDER BY TagId")?;

        let rows = stmt.query_map([], |row| {
            Ok(Tag {
                id: row.get(0)?,
                kind: row.get(1)?,
                name: row.get(2)?,
            })
        })?;

        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    })
}

/// Apply a field-level patch to a single note.
///
/// `LastModified` is always set to the current time, even for an empty
/// patch.
///
/// # Errors
///
/// Returns `StudypackError::NotFound` if `note_id` does not exist.
pub fn update_note_fields(session: &Session, note_id: i64, patch: &NotePatch) -> Result<()> {
    let mut assignments = vec!["LastModified = ?".to_string()];
    let mut params: Vec<Box<dyn rusqlite::ToSql>> =
        vec![Box::new(format_timestamp(Utc::now()))];

    if let Some(ref title) = patch.title {
        assignments.push("Title = ?".to_string());
        params.push(Box::new(title.clone()));
    }
    if let Some(ref content) = patch.content {
        assignments.push("Content = ?".to_string());
        params.push(Box::new(content.clone()));
    }
    params.push(Box::new(note_id));

    let sql = format!(
        "UPDATE Note SET {} WHERE NoteId = ?",
        assignments.join(", ")
    );
    let affected = session.execute(&sql, rusqlite::params_from_iter(params.iter()))?;

    if affected == 0 {
        return Err(StudypackError::NotFound(format!(
            "Note {} does not exist",
            note_id
        )));
    }
    Ok(())
}
