//! Projection of the note collection into view models, plus the gesture
//! bindings that turn user input back into store mutations.
//!
//! Presentation is purely a function of note data: the engine holds no
//! authoritative state, only the last rendered projection so that
//! high-frequency gestures can be patched incrementally instead of
//! discarding editor focus with a full re-render.

use chrono::{Local, TimeZone};
use log::debug;
use pulldown_cmark::{html, Options, Parser};

use crate::{palette, Note, NoteStore, NoteUpdate, Result};

/// Side length of the reserved resize-handle corner of a card; presses in
/// that region never start a drag.
pub const RESIZE_HANDLE_SIZE: f64 = 16.0;

/// One tag rendered as a colored chip.
#[derive(Debug, Clone, PartialEq)]
pub struct TagChip {
    pub text: String,
    pub color: &'static str,
}

/// The two mutually exclusive body modes of a card.
#[derive(Debug, Clone, PartialEq)]
pub enum CardBody {
    /// Raw Markdown source in an editable area
    Editor(String),
    /// Rendered Markdown HTML, read-only
    Preview(String),
}

/// View model for a single note.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteCard {
    pub id: i64,
    pub title: String,
    pub created_label: String,
    pub body: CardBody,
    pub tags: Vec<TagChip>,
    pub reminder: Option<i64>,
    pub pinned: bool,
    pub blurred: bool,
    /// Whether the delete affordance acts; a pinned card warns instead
    pub deletable: bool,
    pub color: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub z_index: i64,
}

impl NoteCard {
    fn from_note(note: &Note) -> Self {
        NoteCard {
            id: note.id,
            title: note.title.clone(),
            created_label: created_label(note.created),
            body: if note.preview {
                CardBody::Preview(render_markdown(&note.content))
            } else {
                CardBody::Editor(note.content.clone())
            },
            tags: note
                .tags
                .iter()
                .map(|tag| TagChip {
                    text: tag.clone(),
                    color: palette::tag_color(tag),
                })
                .collect(),
            reminder: note.reminder,
            pinned: note.pinned,
            blurred: note.blurred,
            deletable: !note.pinned,
            color: note
                .color
                .clone()
                .unwrap_or_else(|| palette::NOTE_PALETTE[0].to_string()),
            x: note.x,
            y: note.y,
            width: note.width,
            height: note.height,
            z_index: note.stacking(),
        }
    }
}

/// Formats the read-only creation label shown on every card.
pub fn created_label(created_ms: i64) -> String {
    match Local.timestamp_millis_opt(created_ms).single() {
        Some(dt) => format!("Created: {}", dt.format("%Y-%m-%d %H:%M")),
        None => "Created: unknown".to_string(),
    }
}

/// Converts a Markdown string to HTML, with strikethrough and tables.
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(text, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// Where inside a card a press landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitRegion {
    /// The card surface: raises the card and is eligible to start a drag
    Surface,
    /// An interactive control (button, input, editor); never a drag
    Control,
    /// The reserved resize corner
    ResizeHandle,
}

/// User gestures the presentation layer forwards to the engine.
#[derive(Debug, Clone)]
pub enum Gesture {
    CreateNote,
    DeleteNote { id: i64 },
    Search { query: String },
    EditTitle { id: i64, title: String },
    EditContent { id: i64, content: String },
    EditTags { id: i64, input: String },
    TogglePin { id: i64 },
    ToggleBlur { id: i64 },
    TogglePreview { id: i64 },
    SetReminder { id: i64, at: Option<i64> },
    SetGlobalReminder { at: Option<i64> },
    /// Pointer pressed at (x, y) inside the card
    Press { id: i64, x: f64, y: f64, region: HitRegion },
    /// Pointer moved while pressed
    Motion { x: f64, y: f64 },
    /// Pointer released
    Release,
    /// Pointer left the card's bounding box at the given observed size
    PointerLeave { id: i64, width: f64, height: f64 },
}

/// What the presentation layer must do after a gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderUpdate {
    /// Re-render the whole filtered list
    Full(Vec<NoteCard>),
    /// Apply targeted patches, keeping focus and selection intact
    Patch(Vec<CardPatch>),
    /// Nothing visible changed beyond what the input control itself shows
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardPatch {
    pub id: i64,
    pub change: PatchChange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatchChange {
    /// Visual position while dragging, or the committed position on release
    Moved { x: f64, y: f64 },
    Pinned { pinned: bool, deletable: bool },
    Blurred(bool),
    Body(CardBody),
    ZIndex(i64),
}

/// Drag bookkeeping: visual position updates continuously, the store is
/// written once on release.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging {
        id: i64,
        press_x: f64,
        press_y: f64,
        origin_x: f64,
        origin_y: f64,
        current_x: f64,
        current_y: f64,
    },
}

/// Deterministic projection of the store plus gesture dispatch.
pub struct RenderEngine {
    /// Cached last-rendered projection for incremental patching
    last: Vec<NoteCard>,
    drag: DragState,
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEngine {
    pub fn new() -> Self {
        Self {
            last: Vec::new(),
            drag: DragState::Idle,
        }
    }

    /// Full projection of the filtered collection, in insertion order.
    /// Stacking order is the consumer's concern via each card's `z_index`.
    pub fn project(&mut self, store: &NoteStore) -> Vec<NoteCard> {
        let cards: Vec<NoteCard> = store
            .filter(store.search_query())
            .map(NoteCard::from_note)
            .collect();
        self.last = cards.clone();
        cards
    }

    /// The last rendered projection.
    pub fn last_rendered(&self) -> &[NoteCard] {
        &self.last
    }

    /// Applies a gesture to the store and reports what to repaint.
    ///
    /// Structural gestures (create, delete, search, tag edits) re-project
    /// fully; visual or high-frequency gestures patch the affected card.
    /// A gesture against a note that vanished underneath it degrades to
    /// `RenderUpdate::None`.
    pub fn handle(&mut self, store: &mut NoteStore, gesture: Gesture) -> Result<RenderUpdate> {
        match gesture {
            Gesture::CreateNote => {
                store.create()?;
                Ok(RenderUpdate::Full(self.project(store)))
            }
            Gesture::DeleteNote { id } => {
                store.delete(id)?;
                Ok(RenderUpdate::Full(self.project(store)))
            }
            Gesture::Search { query } => {
                store.set_search_query(query);
                Ok(RenderUpdate::Full(self.project(store)))
            }
            Gesture::EditTitle { id, title } => {
                store.update(id, NoteUpdate::Title(title))?;
                Ok(RenderUpdate::None)
            }
            Gesture::EditContent { id, content } => {
                store.update(id, NoteUpdate::Content(content))?;
                Ok(RenderUpdate::None)
            }
            Gesture::EditTags { id, input } => {
                store.update(id, NoteUpdate::Tags(input))?;
                Ok(RenderUpdate::Full(self.project(store)))
            }
            Gesture::TogglePin { id } => {
                let Some(pinned) = store.get(id).map(|n| n.pinned) else {
                    return Ok(RenderUpdate::None);
                };
                let pinned = !pinned;
                store.update(id, NoteUpdate::Pinned(pinned))?;
                Ok(self.patch(
                    id,
                    PatchChange::Pinned {
                        pinned,
                        deletable: !pinned,
                    },
                ))
            }
            Gesture::ToggleBlur { id } => {
                let Some(blurred) = store.get(id).map(|n| n.blurred) else {
                    return Ok(RenderUpdate::None);
                };
                let blurred = !blurred;
                store.update(id, NoteUpdate::Blurred(blurred))?;
                Ok(self.patch(id, PatchChange::Blurred(blurred)))
            }
            Gesture::TogglePreview { id } => {
                let Some((preview, content)) =
                    store.get(id).map(|n| (n.preview, n.content.clone()))
                else {
                    return Ok(RenderUpdate::None);
                };
                let preview = !preview;
                store.update(id, NoteUpdate::Preview(preview))?;
                let body = if preview {
                    CardBody::Preview(render_markdown(&content))
                } else {
                    CardBody::Editor(content)
                };
                Ok(self.patch(id, PatchChange::Body(body)))
            }
            Gesture::SetReminder { id, at } => {
                store.update(id, NoteUpdate::Reminder(at))?;
                Ok(RenderUpdate::None)
            }
            Gesture::SetGlobalReminder { at } => {
                store.set_global_reminder(at)?;
                Ok(RenderUpdate::None)
            }
            Gesture::Press { id, x, y, region } => self.press(store, id, x, y, region),
            Gesture::Motion { x, y } => Ok(self.motion(x, y)),
            Gesture::Release => self.release(store),
            Gesture::PointerLeave { id, width, height } => {
                store.update(id, NoteUpdate::Size { width, height })?;
                Ok(RenderUpdate::None)
            }
        }
    }

    /// A press on the card surface raises the card and arms a drag; presses
    /// on controls or the resize corner do neither.
    fn press(
        &mut self,
        store: &mut NoteStore,
        id: i64,
        x: f64,
        y: f64,
        region: HitRegion,
    ) -> Result<RenderUpdate> {
        if region != HitRegion::Surface {
            return Ok(RenderUpdate::None);
        }
        let Some((origin_x, origin_y)) = store
            .get(id)
            .map(|n| (n.x.unwrap_or(0.0), n.y.unwrap_or(0.0)))
        else {
            return Ok(RenderUpdate::None);
        };
        self.drag = DragState::Dragging {
            id,
            press_x: x,
            press_y: y,
            origin_x,
            origin_y,
            current_x: origin_x,
            current_y: origin_y,
        };
        match store.bring_to_front(id)? {
            Some(z) => Ok(self.patch(id, PatchChange::ZIndex(z))),
            None => Ok(RenderUpdate::None),
        }
    }

    /// Updates the visual position only; nothing is committed to the store
    /// until release, which avoids persistence thrashing mid-drag.
    fn motion(&mut self, x: f64, y: f64) -> RenderUpdate {
        let DragState::Dragging {
            id,
            press_x,
            press_y,
            origin_x,
            origin_y,
            ..
        } = self.drag
        else {
            return RenderUpdate::None;
        };
        let current_x = origin_x + (x - press_x);
        let current_y = origin_y + (y - press_y);
        self.drag = DragState::Dragging {
            id,
            press_x,
            press_y,
            origin_x,
            origin_y,
            current_x,
            current_y,
        };
        self.patch(
            id,
            PatchChange::Moved {
                x: current_x,
                y: current_y,
            },
        )
    }

    /// Commits the final position once.
    fn release(&mut self, store: &mut NoteStore) -> Result<RenderUpdate> {
        let DragState::Dragging {
            id,
            current_x,
            current_y,
            ..
        } = self.drag
        else {
            return Ok(RenderUpdate::None);
        };
        self.drag = DragState::Idle;
        debug!("Drag of note {} released at ({}, {})", id, current_x, current_y);
        store.update(
            id,
            NoteUpdate::Position {
                x: current_x,
                y: current_y,
            },
        )?;
        Ok(RenderUpdate::None)
    }

    /// Builds a single-card patch and folds it into the cached projection.
    fn patch(&mut self, id: i64, change: PatchChange) -> RenderUpdate {
        if let Some(card) = self.last.iter_mut().find(|c| c.id == id) {
            match &change {
                PatchChange::Moved { x, y } => {
                    card.x = Some(*x);
                    card.y = Some(*y);
                }
                PatchChange::Pinned { pinned, deletable } => {
                    card.pinned = *pinned;
                    card.deletable = *deletable;
                }
                PatchChange::Blurred(blurred) => card.blurred = *blurred,
                PatchChange::Body(body) => card.body = body.clone(),
                PatchChange::ZIndex(z) => card.z_index = *z,
            }
        }
        RenderUpdate::Patch(vec![CardPatch { id, change }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, MemoryStore, NotesError};

    fn engine_and_store() -> (RenderEngine, NoteStore) {
        let store = NoteStore::new(Box::new(MemoryStore::new()), Config::default());
        (RenderEngine::new(), store)
    }

    fn create(engine: &mut RenderEngine, store: &mut NoteStore) -> i64 {
        match engine.handle(store, Gesture::CreateNote).unwrap() {
            RenderUpdate::Full(cards) => cards.last().unwrap().id,
            other => panic!("expected full render, got {other:?}"),
        }
    }

    #[test]
    fn test_new_note_projects_with_defaults() {
        let (mut engine, mut store) = engine_and_store();
        let id = create(&mut engine, &mut store);

        let cards = engine.project(&store);
        assert_eq!(cards.len(), 1);
        let card = &cards[0];
        assert_eq!(card.id, id);
        assert_eq!(card.title, "New Note");
        assert_eq!(card.body, CardBody::Editor(String::new()));
        assert!(card.deletable);
        assert!(!card.blurred);
        assert!(card.created_label.starts_with("Created: "));
    }

    #[test]
    fn test_search_gesture_projects_filtered_list() {
        let (mut engine, mut store) = engine_and_store();
        let a = create(&mut engine, &mut store);
        let b = create(&mut engine, &mut store);
        store.update(a, NoteUpdate::Title("Shopping".into())).unwrap();
        store.update(b, NoteUpdate::Title("Dentist".into())).unwrap();

        let update = engine
            .handle(&mut store, Gesture::Search { query: "shop".into() })
            .unwrap();
        match update {
            RenderUpdate::Full(cards) => {
                assert_eq!(cards.len(), 1);
                assert_eq!(cards[0].id, a);
            }
            other => panic!("expected full render, got {other:?}"),
        }
        assert_eq!(store.search_query(), "shop");
    }

    #[test]
    fn test_toggle_preview_swaps_body_and_persists_mode() {
        let (mut engine, mut store) = engine_and_store();
        let id = create(&mut engine, &mut store);
        store
            .update(id, NoteUpdate::Content("**bold**".into()))
            .unwrap();
        engine.project(&store);

        let update = engine
            .handle(&mut store, Gesture::TogglePreview { id })
            .unwrap();
        match update {
            RenderUpdate::Patch(patches) => match &patches[0].change {
                PatchChange::Body(CardBody::Preview(html)) => {
                    assert!(html.contains("<strong>bold</strong>"));
                }
                other => panic!("expected preview body, got {other:?}"),
            },
            other => panic!("expected patch, got {other:?}"),
        }
        assert!(store.get(id).unwrap().preview);

        // Toggling back returns the raw editor with the source intact.
        let update = engine
            .handle(&mut store, Gesture::TogglePreview { id })
            .unwrap();
        match update {
            RenderUpdate::Patch(patches) => assert_eq!(
                patches[0].change,
                PatchChange::Body(CardBody::Editor("**bold**".into()))
            ),
            other => panic!("expected patch, got {other:?}"),
        }
        assert!(!store.get(id).unwrap().preview);
    }

    #[test]
    fn test_delete_of_pinned_note_surfaces_error() {
        let (mut engine, mut store) = engine_and_store();
        let id = create(&mut engine, &mut store);
        engine.handle(&mut store, Gesture::TogglePin { id }).unwrap();

        let result = engine.handle(&mut store, Gesture::DeleteNote { id });
        assert!(matches!(result, Err(NotesError::PinnedNote { .. })));
        assert!(store.get(id).is_some());

        // The pin patch marked the card non-deletable.
        let card = engine
            .last_rendered()
            .iter()
            .find(|c| c.id == id)
            .unwrap();
        assert!(card.pinned);
        assert!(!card.deletable);
    }

    #[test]
    fn test_drag_commits_position_only_on_release() {
        let (mut engine, mut store) = engine_and_store();
        let id = create(&mut engine, &mut store);
        store
            .update(id, NoteUpdate::Position { x: 100.0, y: 100.0 })
            .unwrap();
        engine.project(&store);

        let press = engine
            .handle(
                &mut store,
                Gesture::Press {
                    id,
                    x: 110.0,
                    y: 120.0,
                    region: HitRegion::Surface,
                },
            )
            .unwrap();
        // Pressing the surface raises the card.
        match press {
            RenderUpdate::Patch(patches) => {
                assert!(matches!(patches[0].change, PatchChange::ZIndex(_)))
            }
            other => panic!("expected z-index patch, got {other:?}"),
        }

        let update = engine
            .handle(&mut store, Gesture::Motion { x: 140.0, y: 150.0 })
            .unwrap();
        assert_eq!(
            update,
            RenderUpdate::Patch(vec![CardPatch {
                id,
                change: PatchChange::Moved { x: 130.0, y: 130.0 }
            }])
        );
        // Visual only: the store still has the pre-drag position.
        assert_eq!(store.get(id).unwrap().x, Some(100.0));

        engine.handle(&mut store, Gesture::Release).unwrap();
        assert_eq!(store.get(id).unwrap().x, Some(130.0));
        assert_eq!(store.get(id).unwrap().y, Some(130.0));

        // A stray motion after release moves nothing.
        let update = engine
            .handle(&mut store, Gesture::Motion { x: 500.0, y: 500.0 })
            .unwrap();
        assert_eq!(update, RenderUpdate::None);
    }

    #[test]
    fn test_press_on_control_or_resize_handle_never_drags() {
        let (mut engine, mut store) = engine_and_store();
        let id = create(&mut engine, &mut store);
        let before = store.get(id).unwrap().stacking();

        for region in [HitRegion::Control, HitRegion::ResizeHandle] {
            let update = engine
                .handle(
                    &mut store,
                    Gesture::Press {
                        id,
                        x: 0.0,
                        y: 0.0,
                        region,
                    },
                )
                .unwrap();
            assert_eq!(update, RenderUpdate::None);
            let update = engine
                .handle(&mut store, Gesture::Motion { x: 50.0, y: 50.0 })
                .unwrap();
            assert_eq!(update, RenderUpdate::None);
        }
        assert_eq!(store.get(id).unwrap().stacking(), before);
    }

    #[test]
    fn test_pointer_leave_commits_observed_size() {
        let (mut engine, mut store) = engine_and_store();
        let id = create(&mut engine, &mut store);

        engine
            .handle(
                &mut store,
                Gesture::PointerLeave {
                    id,
                    width: 240.0,
                    height: 180.0,
                },
            )
            .unwrap();
        let note = store.get(id).unwrap();
        assert_eq!(note.width, Some(240.0));
        assert_eq!(note.height, Some(180.0));
    }

    #[test]
    fn test_gestures_on_vanished_note_degrade_to_none() {
        let (mut engine, mut store) = engine_and_store();
        let id = create(&mut engine, &mut store);
        store.delete(id).unwrap();

        for gesture in [
            Gesture::TogglePin { id },
            Gesture::ToggleBlur { id },
            Gesture::TogglePreview { id },
            Gesture::Press {
                id,
                x: 0.0,
                y: 0.0,
                region: HitRegion::Surface,
            },
        ] {
            assert_eq!(
                engine.handle(&mut store, gesture).unwrap(),
                RenderUpdate::None
            );
        }
    }

    #[test]
    fn test_tag_chips_are_deterministic_across_notes() {
        let (mut engine, mut store) = engine_and_store();
        let a = create(&mut engine, &mut store);
        let b = create(&mut engine, &mut store);
        store.update(a, NoteUpdate::Tags("work urgent".into())).unwrap();
        store.update(b, NoteUpdate::Tags("work".into())).unwrap();

        let cards = engine.project(&store);
        let chip_a = cards[0].tags.iter().find(|c| c.text == "work").unwrap();
        let chip_b = cards[1].tags.iter().find(|c| c.text == "work").unwrap();
        assert_eq!(chip_a.color, chip_b.color);
    }

    #[test]
    fn test_render_markdown_basics() {
        let html = render_markdown("# Heading\n\n**bold** and ~~gone~~");
        assert!(html.contains("<h1>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(render_markdown("").is_empty());
    }
}
