mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::*;

/// Another note already owns this slug.
#[derive(Debug, thiserror::Error)]
#[error("a note with slug {0:?} already exists")]
pub struct DuplicateSlug(pub String);

/// Another account already owns this username.
#[derive(Debug, thiserror::Error)]
#[error("a user named {0:?} already exists")]
pub struct DuplicateUsername(pub String);

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "notekeeper")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("notekeeper.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // User operations
    // ============================================================

    pub fn create_user(&self, input: CreateUserInput) -> Result<User> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
            (
                id.to_string(),
                &input.username,
                &input.password_hash,
                now.to_rfc3339(),
            ),
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                anyhow::Error::new(DuplicateUsername(input.username.clone()))
            } else {
                e.into()
            }
        })?;

        Ok(User {
            id,
            username: input.username,
            created_at: now,
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let user = conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?",
                [id.to_string()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let user = conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE username = ?",
                [username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Returns the stored PHC hash, or `None` when the user does not exist
    /// or has an unusable password.
    pub fn get_password_hash(&self, user_id: Uuid) -> Result<Option<String>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let hash = conn
            .query_row(
                "SELECT password_hash FROM users WHERE id = ?",
                [user_id.to_string()],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(hash.flatten())
    }

    /// Deletes a user together with their notes and sessions.
    pub fn delete_user(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM users WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Session operations
    // ============================================================

    pub fn create_session(&self, user_id: Uuid) -> Result<AuthSession> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let token = Uuid::new_v4().simple().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO auth_sessions (token, user_id, created_at) VALUES (?, ?, ?)",
            (&token, user_id.to_string(), now.to_rfc3339()),
        )?;

        Ok(AuthSession {
            token,
            user_id,
            created_at: now,
        })
    }

    /// Resolves a session token to its user.
    pub fn get_session_user(&self, token: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let user = conn
            .query_row(
                "SELECT u.id, u.username, u.created_at
                 FROM auth_sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?",
                [token],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM auth_sessions WHERE token = ?", [token])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Note operations
    // ============================================================

    pub fn create_note(&self, author_id: Uuid, fields: NoteFields) -> Result<Note> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO notes (id, title, text, slug, author_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &fields.title,
                &fields.text,
                &fields.slug,
                author_id.to_string(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )
        .map_err(|e| slug_error(e, &fields.slug))?;

        Ok(Note {
            id,
            title: fields.title,
            text: fields.text,
            slug: fields.slug,
            author_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_all_notes(&self) -> Result<Vec<Note>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, title, text, slug, author_id, created_at, updated_at
             FROM notes ORDER BY created_at, rowid",
        )?;

        let notes = stmt
            .query_map([], note_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    pub fn get_note_by_slug(&self, slug: &str) -> Result<Option<Note>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let note = conn
            .query_row(
                "SELECT id, title, text, slug, author_id, created_at, updated_at
                 FROM notes WHERE slug = ?",
                [slug],
                note_from_row,
            )
            .optional()?;
        Ok(note)
    }

    /// Looks a note up by slug within one author's notes.
    ///
    /// A note owned by someone else is indistinguishable from a missing one.
    pub fn get_author_note(&self, author_id: Uuid, slug: &str) -> Result<Option<Note>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let note = conn
            .query_row(
                "SELECT id, title, text, slug, author_id, created_at, updated_at
                 FROM notes WHERE slug = ? AND author_id = ?",
                (slug, author_id.to_string()),
                note_from_row,
            )
            .optional()?;
        Ok(note)
    }

    pub fn get_notes_by_author(&self, author_id: Uuid) -> Result<Vec<Note>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, title, text, slug, author_id, created_at, updated_at
             FROM notes WHERE author_id = ? ORDER BY created_at, rowid",
        )?;

        let notes = stmt
            .query_map([author_id.to_string()], note_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    /// Whether `slug` belongs to any note other than `exclude`.
    pub fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let exclude = exclude.map(|id| id.to_string()).unwrap_or_default();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE slug = ? AND id != ?",
            (slug, &exclude),
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn update_note(&self, id: Uuid, fields: NoteFields) -> Result<Option<Note>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();

        let rows = conn
            .execute(
                "UPDATE notes SET title = ?, text = ?, slug = ?, updated_at = ? WHERE id = ?",
                (
                    &fields.title,
                    &fields.text,
                    &fields.slug,
                    now.to_rfc3339(),
                    id.to_string(),
                ),
            )
            .map_err(|e| slug_error(e, &fields.slug))?;

        if rows == 0 {
            return Ok(None);
        }

        let note = conn.query_row(
            "SELECT id, title, text, slug, author_id, created_at, updated_at
             FROM notes WHERE id = ?",
            [id.to_string()],
            note_from_row,
        )?;
        Ok(Some(note))
    }

    pub fn delete_note(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM notes WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    pub fn count_notes(&self) -> Result<i64> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(row.get::<_, String>(0)?),
        username: row.get(1)?,
        created_at: parse_datetime(row.get::<_, String>(2)?),
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: parse_uuid(row.get::<_, String>(0)?),
        title: row.get(1)?,
        text: row.get(2)?,
        slug: row.get(3)?,
        author_id: parse_uuid(row.get::<_, String>(4)?),
        created_at: parse_datetime(row.get::<_, String>(5)?),
        updated_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == ErrorCode::ConstraintViolation
                && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn slug_error(e: rusqlite::Error, slug: &str) -> anyhow::Error {
    if is_unique_violation(&e) {
        anyhow::Error::new(DuplicateSlug(slug.to_string()))
    } else {
        e.into()
    }
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
