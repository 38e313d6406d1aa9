use chrono::{TimeZone, Utc};
use studypack_core::storage::projection;
use studypack_core::{
    load_archive, merge_notes, new_archive, update_note_field, verify_archive, NoteImport,
    NotePatch, Session, StudypackError, TagNameResolver,
};

fn archive_with_one_note() -> (Vec<u8>, i64) {
    let bytes = new_archive().expect("new archive");
    let merged = merge_notes(
        &bytes,
        &[NoteImport::new("Gênesis 1", "Rascunho inicial")],
        &TagNameResolver::new(),
    )
    .expect("merge should succeed");
    let loaded = load_archive(&merged).expect("load");
    (merged, loaded.notes[0].id)
}

fn seed_note(session: &Session, guid: &str, last_modified: &str) {
    session
        .execute(
            "INSERT INTO Note (Guid, Title, Content, LastModified, Created, BlockType) \
             VALUES (?, ?, ?, ?, ?, 0)",
            (guid, "Título", "Conteúdo", last_modified, last_modified),
        )
        .expect("seed insert should succeed");
}

#[test]
fn test_update_content() {
    let (bytes, note_id) = archive_with_one_note();

    let patch = NotePatch::new().content("Versão revisada");
    let updated = update_note_field(&bytes, note_id, &patch).expect("update should succeed");

    let loaded = load_archive(&updated).expect("load");
    assert_eq!(loaded.notes[0].content.as_deref(), Some("Versão revisada"));
    assert_eq!(loaded.notes[0].title.as_deref(), Some("Gênesis 1"));
    verify_archive(&updated).expect("updated archive should verify");
}

#[test]
fn test_update_title_only() {
    let (bytes, note_id) = archive_with_one_note();

    let patch = NotePatch::new().title("Gênesis 1:1-5");
    let updated = update_note_field(&bytes, note_id, &patch).expect("update should succeed");

    let loaded = load_archive(&updated).expect("load");
    assert_eq!(loaded.notes[0].title.as_deref(), Some("Gênesis 1:1-5"));
    assert_eq!(loaded.notes[0].content.as_deref(), Some("Rascunho inicial"));
}

#[test]
fn test_update_unknown_note_is_not_found() {
    let (bytes, _) = archive_with_one_note();

    let result = update_note_field(&bytes, 9999, &NotePatch::new().title("x"));
    assert!(matches!(result, Err(StudypackError::NotFound(_))));
}

#[test]
fn test_update_always_bumps_last_modified() {
    let session = Session::create().expect("create");
    seed_note(&session, "guid-1", "2020-01-01T00:00:00.000000Z");

    // Even an empty patch is a touch.
    projection::update_note_fields(&session, 1, &NotePatch::new()).expect("update");

    let notes = projection::list_notes(&session).expect("list");
    assert!(notes[0].last_modified > Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap());
}

#[test]
fn test_list_notes_orders_by_last_modified_then_insertion() {
    let session = Session::create().expect("create");
    seed_note(&session, "guid-1", "2024-01-02T10:00:00.000000Z");
    seed_note(&session, "guid-2", "2024-01-03T10:00:00.000000Z");
    seed_note(&session, "guid-3", "2024-01-02T10:00:00.000000Z");

    let notes = projection::list_notes(&session).expect("list");
    let guids: Vec<&str> = notes.iter().map(|n| n.guid.as_str()).collect();
    // Newest first; the two tied notes keep insertion order.
    assert_eq!(guids, ["guid-2", "guid-1", "guid-3"]);

    // Stable across repeated calls with no intervening writes.
    let again = projection::list_notes(&session).expect("list again");
    let again_guids: Vec<&str> = again.iter().map(|n| n.guid.as_str()).collect();
    assert_eq!(guids, again_guids);
}

#[test]
fn test_update_does_not_touch_other_notes() {
    let session = Session::create().expect("create");
    seed_note(&session, "guid-1", "2024-01-02T10:00:00.000000Z");
    seed_note(&session, "guid-2", "2024-01-03T10:00:00.000000Z");

    projection::update_note_fields(&session, 1, &NotePatch::new().content("novo"))
        .expect("update");

    let notes = projection::list_notes(&session).expect("list");
    let untouched = notes.iter().find(|n| n.guid == "guid-2").expect("guid-2");
    assert_eq!(untouched.content.as_deref(), Some("Conteúdo"));
    assert_eq!(
        untouched.last_modified,
        Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap()
    );
}
