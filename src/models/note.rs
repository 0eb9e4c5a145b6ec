use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a note title, in characters.
pub const TITLE_MAX_LENGTH: usize = 100;
/// Maximum length of a note slug, in characters.
pub const SLUG_MAX_LENGTH: usize = 100;

/// A note authored by a single user.
///
/// The slug is unique across all notes regardless of author, and is what
/// every note-scoped URL is keyed on. `author_id` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub slug: String,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw note fields as submitted by a form.
///
/// `slug` may be blank, in which case one is derived from the title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub slug: String,
}

impl From<&Note> for NoteInput {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            text: note.text.clone(),
            slug: note.slug.clone(),
        }
    }
}

/// Validated fields ready to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFields {
    pub title: String,
    pub text: String,
    pub slug: String,
}
