//! Import/export of the note collection as an interchange document.
//!
//! The interchange format is the persisted schema itself: a plain JSON
//! array of note objects, no wrapper envelope.

use std::collections::HashSet;

use log::{info, warn};
use serde_json::Value;

use crate::{Note, NoteStore, NotesError, Result};

/// Default filename for an exported collection.
pub const EXPORT_FILE_NAME: &str = "notes_export.json";

/// Serializes the full note collection as a pretty-printed JSON array.
pub fn export_json(store: &NoteStore) -> Result<String> {
    Ok(serde_json::to_string_pretty(store.notes())?)
}

/// Parses `document` and appends its structurally valid notes to the store.
///
/// The top-level value must be an array, or the import aborts with
/// [`NotesError::ImportFormat`]. Entries are kept only when they carry at
/// minimum a numeric `id`, string `title`, string `content`, and `created`;
/// anything else is silently dropped, as is any entry whose id duplicates
/// the existing collection or an earlier entry in the document. When
/// nothing survives, the import aborts with [`NotesError::NoValidNotes`]
/// and no partial merge happens; otherwise the survivors are appended
/// (never replacing existing notes) and the collection is persisted.
///
/// Returns the number of notes appended.
pub fn import_json(store: &mut NoteStore, document: &str) -> Result<usize> {
    let value: Value = serde_json::from_str(document).map_err(|_| NotesError::ImportFormat)?;
    let Value::Array(entries) = value else {
        return Err(NotesError::ImportFormat);
    };

    let total = entries.len();
    let mut seen: HashSet<i64> = store.notes().iter().map(|n| n.id).collect();
    let mut valid = Vec::new();

    for entry in entries {
        match serde_json::from_value::<Note>(entry) {
            Ok(note) => {
                if seen.insert(note.id) {
                    valid.push(note);
                } else {
                    warn!("Dropping imported note with duplicate id {}", note.id);
                }
            }
            Err(e) => warn!("Dropping malformed import entry: {}", e),
        }
    }

    if valid.is_empty() {
        return Err(NotesError::NoValidNotes);
    }

    info!("Importing {} of {} entries", valid.len(), total);
    store.append_imported(valid)
}
