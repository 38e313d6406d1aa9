//! Storage layer: embedded database session, note/tag projection, merge
//! engine.
//!
//! The session exclusively owns the live row set while open; projections
//! are snapshots that never outlive the data they were read from.

pub mod merge;
pub mod projection;
pub mod row;
pub mod session;
pub mod types;

pub use session::Session;
