//! Error types for the traynotes application.
//!
//! This module defines custom error types that categorize different failures
//! that can occur while managing the note collection.

use std::io;

use thiserror::Error;

/// The main error type for the traynotes application.
#[derive(Error, Debug)]
pub enum NotesError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persisted note collection could not be parsed. Recovered locally
    /// by resetting to an empty collection; never returned from `load`.
    #[error("Persisted note collection is corrupt: {message}")]
    CorruptStore { message: String },

    /// Deletion was requested for a pinned note.
    #[error("Note {id} is pinned and cannot be deleted")]
    PinnedNote { id: i64 },

    /// The import document's top-level value is not an array.
    #[error("Import document is not an array of notes")]
    ImportFormat,

    /// The import document contains no structurally valid notes.
    #[error("Import document contains no valid notes")]
    NoValidNotes,

    /// The host shell could not service a show-window request.
    #[error("Host shell unavailable: {message}")]
    HostUnavailable { message: String },

    /// Generic application error with a custom message.
    #[error("{message}")]
    Application { message: String },
}
