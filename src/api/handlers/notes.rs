use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Extension, Form, Json,
};
use serde::Serialize;

use super::{internal_error, not_found, HandlerError};
use crate::api::middleware::redirect;
use crate::api::{routes, AppState};
use crate::db::{Database, DuplicateSlug};
use crate::forms::{NoteForm, WARNING};
use crate::models::*;

#[derive(Debug, Serialize)]
pub struct NoteListPage {
    pub object_list: Vec<Note>,
}

#[derive(Debug, Serialize)]
pub struct NoteFormPage {
    pub form: NoteForm,
}

#[derive(Debug, Serialize)]
pub struct NotePage {
    pub object: Note,
}

#[derive(Debug, Serialize)]
pub struct SuccessPage {
    pub message: &'static str,
}

/// Fetch a note through its author's scope. Anything else is a 404.
fn owned_note(db: &Database, user: &User, slug: &str) -> Result<Note, HandlerError> {
    db.get_author_note(user.id, slug)
        .map_err(internal_error)?
        .ok_or_else(not_found)
}

fn render_form(form: NoteForm) -> Response {
    Json(NoteFormPage { form }).into_response()
}

/// Map a store error from a write, turning a lost slug race into the same
/// field error validation would have produced.
fn write_error(form: &mut NoteForm, e: anyhow::Error) -> Result<(), HandlerError> {
    if let Some(DuplicateSlug(slug)) = e.downcast_ref::<DuplicateSlug>() {
        form.errors.add("slug", format!("{slug}{WARNING}"));
        return Ok(());
    }
    Err(internal_error(e))
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<NoteListPage>, HandlerError> {
    let object_list = state
        .db
        .get_notes_by_author(user.id)
        .map_err(internal_error)?;
    Ok(Json(NoteListPage { object_list }))
}

pub async fn add_note_form(Extension(_user): Extension<User>) -> Json<NoteFormPage> {
    Json(NoteFormPage {
        form: NoteForm::empty(),
    })
}

pub async fn add_note(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Form(input): Form<NoteInput>,
) -> Result<Response, HandlerError> {
    let mut form = NoteForm::bind(input);
    let Some(fields) = form.clean(&state.db, None).map_err(internal_error)? else {
        tracing::warn!("Rejected new note from {}: {:?}", user.username, form.errors);
        return Ok(render_form(form));
    };

    match state.db.create_note(user.id, fields) {
        Ok(note) => {
            tracing::info!("{} created note {}", user.username, note.slug);
            Ok(redirect(routes::SUCCESS))
        }
        Err(e) => {
            write_error(&mut form, e)?;
            Ok(render_form(form))
        }
    }
}

pub async fn note_detail(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(slug): Path<String>,
) -> Result<Json<NotePage>, HandlerError> {
    let object = owned_note(&state.db, &user, &slug)?;
    Ok(Json(NotePage { object }))
}

pub async fn edit_note_form(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(slug): Path<String>,
) -> Result<Json<NoteFormPage>, HandlerError> {
    let note = owned_note(&state.db, &user, &slug)?;
    Ok(Json(NoteFormPage {
        form: NoteForm::for_note(&note),
    }))
}

pub async fn edit_note(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(slug): Path<String>,
    Form(input): Form<NoteInput>,
) -> Result<Response, HandlerError> {
    let note = owned_note(&state.db, &user, &slug)?;

    let mut form = NoteForm::bind(input);
    let Some(fields) = form.clean(&state.db, Some(note.id)).map_err(internal_error)? else {
        tracing::warn!("Rejected edit of {} by {}: {:?}", slug, user.username, form.errors);
        return Ok(render_form(form));
    };

    match state.db.update_note(note.id, fields) {
        Ok(Some(updated)) => {
            tracing::info!("{} updated note {} -> {}", user.username, slug, updated.slug);
            Ok(redirect(routes::SUCCESS))
        }
        Ok(None) => Err(not_found()),
        Err(e) => {
            write_error(&mut form, e)?;
            Ok(render_form(form))
        }
    }
}

pub async fn delete_note_confirm(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(slug): Path<String>,
) -> Result<Json<NotePage>, HandlerError> {
    let object = owned_note(&state.db, &user, &slug)?;
    Ok(Json(NotePage { object }))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(slug): Path<String>,
) -> Result<Response, HandlerError> {
    let note = owned_note(&state.db, &user, &slug)?;

    if state.db.delete_note(note.id).map_err(internal_error)? {
        tracing::info!("{} deleted note {}", user.username, slug);
        Ok(redirect(routes::SUCCESS))
    } else {
        Err(not_found())
    }
}

pub async fn success(Extension(_user): Extension<User>) -> Json<SuccessPage> {
    Json(SuccessPage {
        message: "Успешно! Изменения сохранены.",
    })
}
