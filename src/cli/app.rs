//! Command dispatcher for the traynotes CLI.

use std::{
    fs,
    io::{stdin, stdout, Write},
    path::PathBuf,
    sync::Arc,
};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use log::info;
use tokio::time::Duration;

use crate::{
    created_label, export_json, import_json, ChannelHost, Commands, Config, HostShell,
    HostSignal, Note, NoteUpdate, NotesError, ReminderScheduler, Result, SharedStore,
    EXPORT_FILE_NAME,
};

/// CLI application handler - processes commands against the shared store.
pub struct App {
    /// The shared note store
    store: SharedStore,

    /// Application configuration
    config: Config,
}

impl App {
    /// Creates a new CLI application over the given store and config.
    pub fn new(store: SharedStore, config: Config) -> Self {
        Self { store, config }
    }

    /// Runs the CLI application with the given command.
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Create {
                title,
                content,
                tags,
            } => self.handle_create(title, content, tags).await,

            Commands::List { query, json, brief } => {
                self.handle_list(query.unwrap_or_default(), json, brief).await
            }

            Commands::Search { query, json } => self.handle_list(query, json, false).await,

            Commands::Delete { id, force } => self.handle_delete(id, force).await,

            Commands::Pin { id } => self.handle_pin(id).await,

            Commands::Export { output } => self.handle_export(output).await,

            Commands::Import { source } => self.handle_import(source).await,

            Commands::Remind { id, at } => self.handle_remind(id, at).await,

            Commands::Watch => self.handle_watch().await,
        }
    }

    async fn handle_create(
        &self,
        title: Option<String>,
        content: Option<String>,
        tags: Option<String>,
    ) -> Result<()> {
        let mut store = self.store.lock().await;
        let id = store.create()?.id;
        if let Some(title) = title {
            store.update(id, NoteUpdate::Title(title))?;
        }
        if let Some(content) = content {
            store.update(id, NoteUpdate::Content(content))?;
        }
        if let Some(tags) = tags {
            store.update(id, NoteUpdate::Tags(tags))?;
        }
        // Text edits take the debounced write path; the process is about to
        // exit, so force them out now.
        store.flush_pending()?;
        println!("Note created with id {id}");
        Ok(())
    }

    async fn handle_list(&self, query: String, json: bool, brief: bool) -> Result<()> {
        let store = self.store.lock().await;
        let notes: Vec<&Note> = store.filter(&query).collect();

        if notes.is_empty() {
            if query.is_empty() {
                println!("No notes yet.");
            } else {
                println!("No notes found matching \"{query}\"");
            }
            return Ok(());
        }

        if json {
            self.display_notes_json(&notes, brief)?;
        } else {
            self.display_notes_text(&notes, brief);
        }

        println!(
            "\nFound {} note{}",
            notes.len(),
            if notes.len() == 1 { "" } else { "s" }
        );
        Ok(())
    }

    /// Display notes in JSON format
    fn display_notes_json(&self, notes: &[&Note], brief: bool) -> Result<()> {
        if brief {
            let simplified: Vec<serde_json::Value> = notes
                .iter()
                .map(|note| {
                    serde_json::json!({
                        "id": note.id,
                        "title": note.title,
                        "tags": note.tags,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&simplified)?);
        } else {
            println!("{}", serde_json::to_string_pretty(notes)?);
        }
        Ok(())
    }

    /// Display notes in text format
    fn display_notes_text(&self, notes: &[&Note], brief: bool) {
        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, note) in notes.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }

            println!("ID: {} | {}", note.id, created_label(note.created));
            if note.pinned {
                println!(
                    "Title: {} {}",
                    console::style(&note.title).bold(),
                    console::style("[pinned]").red()
                );
            } else {
                println!("Title: {}", console::style(&note.title).bold());
            }

            if !note.tags.is_empty() {
                let tags = note
                    .tags
                    .iter()
                    .map(|tag| format!("#{tag}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("Tags: {}", console::style(tags).cyan());
            }

            if let Some(at) = note.reminder {
                println!("Reminder: {}", format_ms(at));
            }

            if !brief {
                let preview = content_preview(&note.content, 100);
                if !preview.is_empty() {
                    println!("\n{preview}");
                }
            }
        }
    }

    async fn handle_delete(&self, id: i64, force: bool) -> Result<()> {
        let title = {
            let store = self.store.lock().await;
            match store.get(id) {
                Some(note) => note.title.clone(),
                None => {
                    println!("No note with id {id}");
                    return Ok(());
                }
            }
        };

        if !force && !confirm(&format!("Delete note \"{title}\"?"))? {
            println!("Aborted.");
            return Ok(());
        }

        match self.store.lock().await.delete(id) {
            Ok(()) => {
                println!("Note {id} deleted");
                Ok(())
            }
            Err(NotesError::PinnedNote { .. }) => {
                println!(
                    "{}",
                    console::style("This note is pinned and cannot be deleted. Unpin it first.")
                        .red()
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn handle_pin(&self, id: i64) -> Result<()> {
        let mut store = self.store.lock().await;
        let Some(pinned) = store.get(id).map(|n| n.pinned) else {
            println!("No note with id {id}");
            return Ok(());
        };
        store.update(id, NoteUpdate::Pinned(!pinned))?;
        println!("Note {} {}", id, if pinned { "unpinned" } else { "pinned" });
        Ok(())
    }

    async fn handle_export(&self, output: Option<PathBuf>) -> Result<()> {
        let path = output.unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
        let store = self.store.lock().await;
        let json = export_json(&store)?;
        fs::write(&path, json)?;
        println!("Exported {} notes to {}", store.notes().len(), path.display());
        Ok(())
    }

    async fn handle_import(&self, source: PathBuf) -> Result<()> {
        let document = fs::read_to_string(&source)?;
        let mut store = self.store.lock().await;
        match import_json(&mut store, &document) {
            Ok(appended) => {
                println!("Imported {appended} notes from {}", source.display());
                Ok(())
            }
            Err(e @ (NotesError::ImportFormat | NotesError::NoValidNotes)) => {
                println!("{}", console::style(e).red());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn handle_remind(&self, id: Option<i64>, at: Option<String>) -> Result<()> {
        let at_ms = match at {
            Some(raw) => Some(parse_reminder(&raw)?),
            None => None,
        };

        let mut store = self.store.lock().await;
        match id {
            Some(id) => {
                if store.get(id).is_none() {
                    println!("No note with id {id}");
                    return Ok(());
                }
                store.update(id, NoteUpdate::Reminder(at_ms))?;
                match at_ms {
                    Some(ts) => println!("Reminder for note {id} set for {}", format_ms(ts)),
                    None => println!("Reminder for note {id} cleared"),
                }
            }
            None => {
                store.set_global_reminder(at_ms)?;
                match at_ms {
                    Some(ts) => println!("Global reminder set for {}", format_ms(ts)),
                    None => println!("Global reminder cleared"),
                }
            }
        }
        Ok(())
    }

    /// Runs the reminder scheduler in the foreground until interrupted.
    async fn handle_watch(&self) -> Result<()> {
        let (host, mut signals) = ChannelHost::new();
        let printer = tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                match signal {
                    HostSignal::ShowWindow => println!("Reminder due - window raise requested"),
                }
            }
        });

        let mut scheduler = ReminderScheduler::new(
            Duration::from_secs(self.config.poll_period_secs),
            Arc::new(host) as Arc<dyn HostShell>,
        );
        scheduler.set_store(&self.store);
        scheduler.start().await?;

        println!(
            "Watching for reminders every {}s. Press Ctrl-C to stop.",
            self.config.poll_period_secs
        );
        tokio::signal::ctrl_c().await?;
        info!("Interrupted, shutting down");

        scheduler.stop().await?;
        printer.abort();
        Ok(())
    }
}

/// Formats an epoch-ms timestamp in local time.
fn format_ms(ts: i64) -> String {
    Local
        .timestamp_millis_opt(ts)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// First non-empty content line, truncated to `max_len` bytes.
fn content_preview(content: &str, max_len: usize) -> String {
    let first_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");
    if first_line.len() <= max_len {
        first_line.to_string()
    } else {
        let cut = first_line
            .char_indices()
            .take_while(|(i, _)| *i < max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &first_line[..cut])
    }
}

/// Parses a reminder datetime: RFC 3339, or a local datetime in the shapes
/// the datetime input of the UI produces.
fn parse_reminder(raw: &str) -> Result<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            if let Some(dt) = Local.from_local_datetime(&naive).single() {
                return Ok(dt.timestamp_millis());
            }
        }
    }
    Err(NotesError::Application {
        message: format!("Unrecognized datetime: {raw}"),
    })
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    stdout().flush()?;
    let mut input = String::new();
    stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
