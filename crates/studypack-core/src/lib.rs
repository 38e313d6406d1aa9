//! # Studypack Core
//!
//! Core library for Studypack - the personal-study backup container engine.
//!
//! A study archive is a zip container holding a `manifest.json` descriptor
//! and an embedded SQLite database of notes and tags. This crate opens such
//! an archive from a byte stream, exposes its notes/tags for display and
//! editing, merges externally authored notes into it, and re-serializes it
//! with the manifest's SHA-256 integrity hash recomputed. It is a pure
//! byte-stream transform: no CLI, no network, no persisted local state.
//!
//! ## Architecture
//!
//! - **container**: zip codec over named byte members
//! - **manifest**: descriptor parsing and integrity hash stamping
//! - **storage**: embedded database session, note/tag projection, merge engine
//! - **engine**: byte-level operations composing the above

pub mod container;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod storage;

pub use container::Archive;
pub use engine::{load_archive, merge_notes, new_archive, update_note_field, verify_archive};
pub use error::{Result, StudypackError};
pub use manifest::Manifest;
pub use storage::types::{LoadedArchive, Note, NoteImport, NotePatch, Tag, TagNameResolver};
pub use storage::Session;

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
