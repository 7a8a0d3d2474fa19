//! In-memory note collection and its write-through persistence.
//!
//! The store is the single authoritative owner of the notes, the global
//! reminder, and the live search query. Every durable mutation writes
//! through to the persistence substrate; high-frequency text edits are
//! coalesced by a debounced write path instead of hitting the substrate on
//! every keystroke.

use std::sync::{Arc, Weak};

use log::{debug, info, trace, warn};
use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use crate::{
    palette, Config, KeyValueStore, LoadSummary, Note, NoteUpdate, NotesError, Result,
    GLOBAL_REMINDER_KEY, NOTES_KEY,
};

/// Shared handle to the note store used by the scheduler, the debounced
/// write path, and the command surface.
pub type SharedStore = Arc<Mutex<NoteStore>>;

/// Owns the note collection and coordinates persistence.
pub struct NoteStore {
    /// Backing collection in insertion order; stacking is governed by
    /// `zIndex`, never by position in this sequence
    notes: Vec<Note>,

    /// Single process-wide reminder, independent of any note
    global_reminder: Option<i64>,

    /// Live search query; written by the UI and by firing note reminders
    search_query: String,

    /// Persistence substrate
    kv: Box<dyn KeyValueStore>,

    /// Debounced write path for title/content edits
    debounce: PersistDebouncer,

    /// Application configuration
    config: Config,
}

impl NoteStore {
    /// Creates an empty store over the given persistence substrate.
    ///
    /// Call [`NoteStore::load`] before use to read the persisted collection.
    pub fn new(kv: Box<dyn KeyValueStore>, config: Config) -> Self {
        let quiet = Duration::from_millis(config.debounce_ms);
        Self {
            notes: Vec::new(),
            global_reminder: None,
            search_query: String::new(),
            kv,
            debounce: PersistDebouncer::new(quiet),
            config,
        }
    }

    /// Wraps the store in its shared handle and points the debounced write
    /// path back at it.
    pub fn into_shared(self) -> SharedStore {
        let shared = Arc::new(Mutex::new(self));
        // The store was just created, so the lock cannot be contended yet.
        if let Ok(mut store) = shared.try_lock() {
            store.debounce.attach(Arc::downgrade(&shared));
        }
        shared
    }

    /// Loads the persisted collection and the global reminder.
    ///
    /// A collection that fails to parse is reset to empty and logged as a
    /// recoverable condition; the error never reaches the caller. Notes
    /// persisted by older revisions without a `color` or a `zIndex` are
    /// migrated in place, and a migration that changed anything is persisted
    /// immediately so it runs at most once.
    pub fn load(&mut self) -> Result<LoadSummary> {
        let mut summary = LoadSummary::default();

        self.notes = match self.kv.get(NOTES_KEY) {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<Note>>(&raw) {
                Ok(notes) => notes,
                Err(e) => {
                    let err = NotesError::CorruptStore {
                        message: e.to_string(),
                    };
                    warn!("{}; resetting to empty collection", err);
                    summary.recovered = true;
                    Vec::new()
                }
            },
        };
        summary.loaded = self.notes.len();

        self.global_reminder = self
            .kv
            .get(GLOBAL_REMINDER_KEY)
            .and_then(|raw| raw.trim().parse::<i64>().ok());

        summary.migrated = self.normalize_notes(0);
        if summary.migrated > 0 {
            info!(
                "Migrated {} missing note fields, persisting collection",
                summary.migrated
            );
            self.persist()?;
        }

        info!("Loaded {} notes", summary.loaded);
        Ok(summary)
    }

    /// Assigns a palette color and the next stacking rank to any note from
    /// index `from` onward that lacks them. Returns the number of fields
    /// assigned.
    fn normalize_notes(&mut self, from: usize) -> usize {
        let mut next_z = self.max_z() + 1;
        let mut assigned = 0;
        for note in self.notes.iter_mut().skip(from) {
            if note.color.is_none() {
                note.color = Some(palette::random_note_color());
                assigned += 1;
            }
            if note.z_index.is_none() {
                note.z_index = Some(next_z);
                next_z += 1;
                assigned += 1;
            }
        }
        assigned
    }

    /// Highest stacking rank currently in the collection.
    fn max_z(&self) -> i64 {
        self.notes.iter().filter_map(|n| n.z_index).max().unwrap_or(0)
    }

    /// Writes the collection and the global reminder through to the
    /// persistence substrate.
    pub fn persist(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.notes)?;
        self.kv.set(NOTES_KEY, &json)?;
        match self.global_reminder {
            Some(ts) => self.kv.set(GLOBAL_REMINDER_KEY, &ts.to_string())?,
            None => self.kv.remove(GLOBAL_REMINDER_KEY)?,
        }
        trace!("Persisted {} notes", self.notes.len());
        Ok(())
    }

    /// Creates a new note, appends it to the collection, and persists.
    ///
    /// The id doubles as the creation timestamp in ms; if the clock has not
    /// advanced past the newest existing id, the candidate is bumped to keep
    /// ids unique and monotone.
    pub fn create(&mut self) -> Result<Note> {
        let mut id = Note::now_ms();
        let max_id = self.notes.iter().map(|n| n.id).max().unwrap_or(0);
        if id <= max_id {
            id = max_id + 1;
        }

        let mut note = Note::new(id);
        note.color = Some(palette::random_note_color());
        note.z_index = Some(self.max_z() + 1);
        let (spawn_w, spawn_h) = self.config.spawn_area();
        let mut rng = rand::rng();
        note.x = Some(rng.random_range(0.0..spawn_w));
        note.y = Some(rng.random_range(0.0..spawn_h));

        info!("Created note {}", note.id);
        self.notes.push(note.clone());
        self.persist()?;
        Ok(note)
    }

    /// Applies a single field mutation to the note with the given id.
    ///
    /// An id that is no longer present (deleted by an interleaved handler)
    /// is a silent no-op. Title and content edits schedule a debounced
    /// persist; every other mutation persists immediately.
    pub fn update(&mut self, id: i64, change: NoteUpdate) -> Result<()> {
        let Some(note) = self.notes.iter_mut().find(|n| n.id == id) else {
            debug!("Update for missing note {} ignored", id);
            return Ok(());
        };

        let debounced = matches!(change, NoteUpdate::Title(_) | NoteUpdate::Content(_));
        match change {
            NoteUpdate::Title(title) => note.title = title,
            NoteUpdate::Content(content) => note.content = content,
            NoteUpdate::Tags(input) => note.set_tags_from_input(&input),
            NoteUpdate::Pinned(pinned) => note.pinned = pinned,
            NoteUpdate::Blurred(blurred) => note.blurred = blurred,
            NoteUpdate::Preview(preview) => note.preview = preview,
            NoteUpdate::Reminder(at) => note.reminder = at,
            NoteUpdate::Position { x, y } => {
                note.x = Some(x);
                note.y = Some(y);
            }
            NoteUpdate::Size { width, height } => {
                note.width = Some(width);
                note.height = Some(height);
            }
        }

        if debounced && self.debounce.schedule() {
            Ok(())
        } else {
            self.persist()
        }
    }

    /// Removes the note with the given id and persists.
    ///
    /// Fails with [`NotesError::PinnedNote`] while the note is pinned; the
    /// caller surfaces that to the user without retrying. A missing id is a
    /// silent no-op.
    pub fn delete(&mut self, id: i64) -> Result<()> {
        match self.notes.iter().position(|n| n.id == id) {
            Some(idx) if self.notes[idx].pinned => Err(NotesError::PinnedNote { id }),
            Some(idx) => {
                self.notes.remove(idx);
                info!("Deleted note {}", id);
                self.persist()
            }
            None => {
                debug!("Delete for missing note {} ignored", id);
                Ok(())
            }
        }
    }

    /// Raises the note above everything else by assigning the next stacking
    /// rank, persists, and returns the new rank so the caller can reflect it
    /// without a full re-render. Returns `Ok(None)` when the id is gone.
    pub fn bring_to_front(&mut self, id: i64) -> Result<Option<i64>> {
        let next = self.max_z() + 1;
        let Some(note) = self.notes.iter_mut().find(|n| n.id == id) else {
            debug!("bring_to_front for missing note {} ignored", id);
            return Ok(None);
        };
        note.z_index = Some(next);
        trace!("Note {} raised to z {}", id, next);
        self.persist()?;
        Ok(Some(next))
    }

    /// Lazily filters the collection by a case-insensitive substring match
    /// over title, content, and tags. An empty query matches all notes.
    ///
    /// The result preserves insertion order and is recomputed on every call;
    /// there is no hidden iterator state.
    pub fn filter<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a Note> + 'a {
        let lowered = query.to_lowercase();
        self.notes.iter().filter(move |note| note.matches(&lowered))
    }

    /// The whole collection in insertion order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Looks a note up by id.
    pub fn get(&self, id: i64) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Appends pre-validated imported notes, assigns missing colors and
    /// stacking ranks, and persists. Returns the number appended.
    pub fn append_imported(&mut self, imported: Vec<Note>) -> Result<usize> {
        let appended = imported.len();
        let from = self.notes.len();
        self.notes.extend(imported);
        self.normalize_notes(from);
        self.persist()?;
        info!("Appended {} imported notes", appended);
        Ok(appended)
    }

    /// The live search query.
    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// Replaces the live search query. Not persisted.
    pub fn set_search_query(&mut self, query: String) {
        self.search_query = query;
    }

    /// The global reminder timestamp, if armed.
    pub fn global_reminder(&self) -> Option<i64> {
        self.global_reminder
    }

    /// Arms or clears the global reminder and persists immediately.
    pub fn set_global_reminder(&mut self, at: Option<i64>) -> Result<()> {
        self.global_reminder = at;
        self.persist()
    }

    /// Clears and returns the global reminder when it is due.
    ///
    /// Clearing happens before the caller emits any signal, so a reminder
    /// fires exactly once no matter how late the poll tick runs.
    pub fn take_due_global(&mut self, now: i64) -> Option<i64> {
        let due = self.global_reminder.filter(|&ts| now >= ts)?;
        self.global_reminder = None;
        if let Err(e) = self.persist() {
            warn!("Failed to persist cleared global reminder: {}", e);
        }
        Some(due)
    }

    /// Clears every due note reminder and returns the (id, title) of each
    /// fired note, in insertion order. Persists once when anything fired.
    pub fn take_due_note_reminders(&mut self, now: i64) -> Vec<(i64, String)> {
        let mut fired = Vec::new();
        for note in &mut self.notes {
            if note.reminder.is_some_and(|ts| now >= ts) {
                note.reminder = None;
                fired.push((note.id, note.title.clone()));
            }
        }
        if !fired.is_empty() {
            if let Err(e) = self.persist() {
                warn!("Failed to persist cleared note reminders: {}", e);
            }
        }
        fired
    }

    /// Cancels any pending debounced write and persists synchronously.
    ///
    /// Used before process exit so a trailing text edit is not lost to a
    /// timer that never fires.
    pub fn flush_pending(&mut self) -> Result<()> {
        if self.debounce.cancel_pending() {
            self.persist()
        } else {
            Ok(())
        }
    }
}

/// Coalesces bursts of text edits into a single persisted write.
///
/// Every trigger cancels the pending write and restarts the quiet period,
/// so a typing burst produces exactly one write and no queue of pending
/// writes ever grows. The task holds only a weak store handle, mirroring
/// how the reminder scheduler references the store, so a dropped store
/// simply ends the write instead of leaking it.
struct PersistDebouncer {
    quiet: Duration,
    store: Weak<Mutex<NoteStore>>,
    pending: Option<JoinHandle<()>>,
}

impl PersistDebouncer {
    fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            store: Weak::new(),
            pending: None,
        }
    }

    fn attach(&mut self, store: Weak<Mutex<NoteStore>>) {
        self.store = store;
    }

    /// Starts (or restarts) the quiet period. Returns false when the store
    /// has no shared handle to write back through; the caller then persists
    /// synchronously instead.
    fn schedule(&mut self) -> bool {
        if self.store.strong_count() == 0 {
            return false;
        }
        if let Some(task) = self.pending.take() {
            task.abort();
        }
        let store = self.store.clone();
        let quiet = self.quiet;
        self.pending = Some(tokio::spawn(async move {
            sleep(quiet).await;
            if let Some(store) = store.upgrade() {
                let mut store = store.lock().await;
                if let Err(e) = store.persist() {
                    warn!("Debounced persist failed: {}", e);
                }
            }
        }));
        true
    }

    /// Aborts the pending write, if any. Returns whether one was pending.
    fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}
