//! Core data structures for the traynotes application.
//!
//! This module contains shared types used throughout the application,
//! including the mutation commands and the CLI command surface.
use std::path::PathBuf;

use clap::Subcommand;

use crate::NotesError;

/// A specialized Result type for traynotes operations.
pub type Result<T> = std::result::Result<T, NotesError>;

/// Summary of loading the persisted collection.
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    /// Number of notes read from the substrate
    pub loaded: usize,
    /// Number of missing fields (color, stacking rank) assigned by migration
    pub migrated: usize,
    /// Whether a corrupt collection was reset to empty
    pub recovered: bool,
}

/// A single field mutation applied to a note through the store.
///
/// Title and content edits arrive at keystroke frequency and take the
/// debounced write path; every other variant persists immediately.
#[derive(Debug, Clone)]
pub enum NoteUpdate {
    Title(String),
    Content(String),
    /// Whitespace-separated tag input, split and cleaned by the store
    Tags(String),
    Pinned(bool),
    Blurred(bool),
    Preview(bool),
    Reminder(Option<i64>),
    /// Canvas position, committed once at drag end
    Position { x: f64, y: f64 },
    /// Observed rendered size, committed when the pointer leaves the card
    Size { width: f64, height: f64 },
}

/// Available subcommands for the traynotes application
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    Create {
        /// Title of the note (defaults to "New Note")
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// Content of the note, can be markdown formatted
        #[clap(short, long)]
        content: Option<String>,

        /// Tags to associate with the note (whitespace-separated)
        #[clap(short, long)]
        tags: Option<String>,
    },

    /// List notes with optional filtering
    List {
        /// Filter notes by a search query
        #[clap(short, long)]
        query: Option<String>,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,

        /// Only show note ids and titles
        #[clap(short, long)]
        brief: bool,
    },

    /// Search notes by title, content, or tag
    Search {
        /// Search query text
        query: String,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Delete a note by id
    Delete {
        /// Id of the note to delete
        id: i64,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Pin or unpin a note
    Pin {
        /// Id of the note to toggle
        id: i64,
    },

    /// Export all notes to a JSON file
    Export {
        /// Path for the export file (defaults to notes_export.json)
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Import notes from a JSON file
    Import {
        /// Path to the file to import from
        source: PathBuf,
    },

    /// Set or clear a reminder
    Remind {
        /// Id of the note to remind about; omitted targets the global reminder
        #[clap(short, long)]
        id: Option<i64>,

        /// Local datetime, e.g. 2026-08-05T14:30; omitted clears the reminder
        #[clap(short, long)]
        at: Option<String>,
    },

    /// Run the reminder scheduler in the foreground
    Watch,
}
