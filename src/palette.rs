//! Fixed color palettes and the deterministic tag-color hash.

use rand::seq::IndexedRandom;

/// Background colors a new note may be assigned, chosen once at creation.
pub const NOTE_PALETTE: [&str; 6] = [
    "#fff9c4", "#ffe0b2", "#c8e6c9", "#b3e5fc", "#f8bbd0", "#e1bee7",
];

/// Chip colors for tag display.
pub const TAG_PALETTE: [&str; 7] = [
    "#e57373", "#81c784", "#64b5f6", "#ffd54f", "#90a4ae", "#ffb74d", "#ba68c8",
];

/// Uniform random choice from the note palette.
pub fn random_note_color() -> String {
    let mut rng = rand::rng();
    NOTE_PALETTE
        .choose(&mut rng)
        .copied()
        .unwrap_or(NOTE_PALETTE[0])
        .to_string()
}

/// Deterministic chip color for a tag.
///
/// Folds the tag text into a 32-bit signed integer (`hash * 31 + char`) with
/// wraparound, then indexes the palette with `abs(hash) % len`, so the same
/// tag text renders the same color across sessions and notes with nothing
/// stored per tag.
pub fn tag_color(tag: &str) -> &'static str {
    let mut hash: i32 = 0;
    for c in tag.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(c as i32);
    }
    TAG_PALETTE[hash.unsigned_abs() as usize % TAG_PALETTE.len()]
}
