//! Note row type for database queries.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{Result, StudypackError};
use crate::storage::types::Note;

/// Raw row data from the `Note` table, before parsing into domain types.
#[derive(Debug)]
pub struct NoteRow {
    pub id: i64,
    pub guid: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub last_modified: String,
    pub created: String,
    pub block_type: i64,
}

impl TryFrom<NoteRow> for Note {
    type Error = StudypackError;

    fn try_from(row: NoteRow) -> Result<Self> {
        let last_modified = parse_timestamp(&row.last_modified)?;
        let created = parse_timestamp(&row.created)?;

        Ok(Note {
            id: row.id,
            guid: row.guid,
            title: row.title,
            content: row.content,
            last_modified,
            created,
            block_type: row.block_type,
        })
    }
}

/// Format a timestamp for storage in a `LastModified`/`Created` column.
///
/// Fixed microsecond precision keeps the textual `ORDER BY` chronological.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp. Archives written by other applications omit
/// the offset, so a naive datetime is accepted and read as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| StudypackError::CorruptDatabase(format!("Invalid timestamp '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339_timestamp() {
        let at = parse_timestamp("2024-03-02T10:00:00.000000Z").unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_timestamp_reads_as_utc() {
        let at = parse_timestamp("2024-03-02T10:00:00").unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(StudypackError::CorruptDatabase(_))
        ));
    }

    #[test]
    fn test_format_round_trips() {
        let at = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(at)).unwrap(), at);
    }

    #[test]
    fn test_format_collates_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1);
        assert!(format_timestamp(earlier) < format_timestamp(later));
    }
}
