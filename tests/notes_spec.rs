//! HTTP behaviour of the note pages.
//!
//! Sections mirror the three concerns of the service:
//! - routes: availability and redirects per role
//! - logic: creating, editing and deleting under ownership rules
//! - content: what each page puts in its context

use axum::http::StatusCode;
use axum_test::{TestResponse, TestServer};
use notekeeper::api::{create_router, routes};
use notekeeper::db::Database;
use notekeeper::forms::WARNING;
use notekeeper::models::*;
use serde_json::Value;

const NOTE_TEXT: &str = "Текст";
const NEW_NOTE_TEXT: &str = "Обновлённый текст";

struct Fixture {
    server: TestServer,
    db: Database,
    author: User,
    reader: User,
    note: Note,
}

impl Fixture {
    /// `Cookie` header value that signs `user` in without a password.
    fn login(&self, user: &User) -> String {
        let session = self
            .db
            .create_session(user.id)
            .expect("Failed to create session");
        format!("sessionid={}", session.token)
    }

    fn count(&self) -> i64 {
        self.db.count_notes().expect("Failed to count notes")
    }

    fn reload_note(&self) -> Note {
        self.db
            .get_note_by_slug(&self.note.slug)
            .expect("Query failed")
            .expect("Note should still exist")
    }
}

fn setup() -> Fixture {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");

    let author = create_user(&db, "Лев Толстой");
    let reader = create_user(&db, "Читатель простой");
    let note = db
        .create_note(
            author.id,
            NoteFields {
                title: "Заголовок".to_string(),
                text: NOTE_TEXT.to_string(),
                slug: "Heading".to_string(),
            },
        )
        .expect("Failed to create note");

    let server = TestServer::new(create_router(db.clone())).expect("Failed to create test server");

    Fixture {
        server,
        db,
        author,
        reader,
        note,
    }
}

fn create_user(db: &Database, username: &str) -> User {
    db.create_user(CreateUserInput {
        username: username.to_string(),
        password_hash: None,
    })
    .expect("Failed to create user")
}

fn form_data(slug: &str) -> NoteInput {
    NoteInput {
        title: "Заголовок".to_string(),
        text: NEW_NOTE_TEXT.to_string(),
        slug: slug.to_string(),
    }
}

fn assert_redirects(response: &TestResponse, location: &str) {
    response.assert_status(StatusCode::FOUND);
    assert_eq!(response.header("location"), location);
}

// ============================================================
// Routes
// ============================================================

mod routes_availability {
    use super::*;

    #[tokio::test]
    async fn public_pages_are_available_to_anonymous_users() {
        let fx = setup();

        for url in [routes::HOME, routes::LOGIN, routes::LOGOUT, routes::SIGNUP] {
            let response = fx.server.get(url).await;
            assert_eq!(response.status_code(), StatusCode::OK, "GET {url}");
        }
    }

    #[tokio::test]
    async fn public_pages_are_available_to_authenticated_users() {
        let fx = setup();
        let cookie = fx.login(&fx.reader);

        for url in [routes::HOME, routes::LOGIN, routes::SIGNUP] {
            let response = fx.server.get(url).add_header("Cookie", cookie.as_str()).await;
            assert_eq!(response.status_code(), StatusCode::OK, "GET {url}");
        }
    }

    #[tokio::test]
    async fn anonymous_users_are_redirected_to_login() {
        let fx = setup();
        let urls = [
            routes::edit(&fx.note.slug),
            routes::delete(&fx.note.slug),
            routes::detail(&fx.note.slug),
            routes::LIST.to_string(),
            routes::ADD.to_string(),
            routes::SUCCESS.to_string(),
        ];

        for url in urls {
            let response = fx.server.get(&url).await;
            assert_redirects(&response, &format!("{}?next={}", routes::LOGIN, url));
        }
    }

    #[tokio::test]
    async fn redirect_keeps_query_string_in_next() {
        let fx = setup();

        let response = fx.server.get("/notes/?page=2").await;

        assert_redirects(&response, "/auth/login/?next=/notes/%3Fpage%3D2");
    }

    #[tokio::test]
    async fn author_can_open_personal_pages() {
        let fx = setup();
        let cookie = fx.login(&fx.author);
        let urls = [
            routes::LIST.to_string(),
            routes::SUCCESS.to_string(),
            routes::ADD.to_string(),
            routes::detail(&fx.note.slug),
            routes::edit(&fx.note.slug),
            routes::delete(&fx.note.slug),
        ];

        for url in urls {
            let response = fx.server.get(&url).add_header("Cookie", cookie.as_str()).await;
            assert_eq!(response.status_code(), StatusCode::OK, "GET {url}");
        }
    }

    #[tokio::test]
    async fn other_users_get_not_found_for_foreign_notes() {
        let fx = setup();
        let cookie = fx.login(&fx.reader);
        let urls = [
            routes::detail(&fx.note.slug),
            routes::delete(&fx.note.slug),
            routes::edit(&fx.note.slug),
        ];

        for url in urls {
            let response = fx.server.get(&url).add_header("Cookie", cookie.as_str()).await;
            assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "GET {url}");
        }
    }

    #[tokio::test]
    async fn foreign_note_looks_like_missing_note() {
        let fx = setup();
        let cookie = fx.login(&fx.reader);

        let foreign = fx
            .server
            .get(&routes::detail(&fx.note.slug))
            .add_header("Cookie", cookie.as_str())
            .await;
        let missing = fx
            .server
            .get(&routes::detail("does-not-exist"))
            .add_header("Cookie", cookie.as_str())
            .await;

        foreign.assert_status_not_found();
        missing.assert_status_not_found();
        assert_eq!(foreign.text(), missing.text());
    }

    #[tokio::test]
    async fn unknown_session_token_is_anonymous() {
        let fx = setup();

        let response = fx
            .server
            .get(routes::LIST)
            .add_header("Cookie", "sessionid=forged")
            .await;

        assert_redirects(&response, "/auth/login/?next=/notes/");
    }

    #[tokio::test]
    async fn health_is_public() {
        let fx = setup();

        let response = fx.server.get(routes::HEALTH).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
    }
}

// ============================================================
// Logic
// ============================================================

mod logic {
    use super::*;

    #[tokio::test]
    async fn anonymous_user_cant_create_note() {
        let fx = setup();
        let initial = fx.count();

        let response = fx.server.post(routes::ADD).form(&form_data("new-note")).await;

        assert_redirects(&response, "/auth/login/?next=/add/");
        assert_eq!(fx.count(), initial);
    }

    #[tokio::test]
    async fn user_can_create_note() {
        let fx = setup();
        fx.db.delete_note(fx.note.id).expect("Failed to delete note");
        let cookie = fx.login(&fx.author);
        let data = form_data("Heading");

        let response = fx
            .server
            .post(routes::ADD)
            .add_header("Cookie", cookie.as_str())
            .form(&data)
            .await;

        assert_redirects(&response, routes::SUCCESS);
        assert_eq!(fx.count(), 1);
        let note = fx
            .db
            .get_note_by_slug("Heading")
            .expect("Query failed")
            .expect("Note should be created");
        assert_eq!(note.title, data.title);
        assert_eq!(note.text, data.text);
        assert_eq!(note.slug, data.slug);
        assert_eq!(note.author_id, fx.author.id);
    }

    #[tokio::test]
    async fn created_note_belongs_to_requester() {
        let fx = setup();
        let cookie = fx.login(&fx.reader);

        fx.server
            .post(routes::ADD)
            .add_header("Cookie", cookie.as_str())
            .form(&form_data("readers-note"))
            .await;

        let note = fx
            .db
            .get_note_by_slug("readers-note")
            .expect("Query failed")
            .expect("Note should be created");
        assert_eq!(note.author_id, fx.reader.id);
    }

    #[tokio::test]
    async fn user_cannot_create_note_with_duplicate_slug() {
        let fx = setup();
        let cookie = fx.login(&fx.author);
        let initial = fx.count();

        let response = fx
            .server
            .post(routes::ADD)
            .add_header("Cookie", cookie.as_str())
            .form(&form_data("Heading"))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(
            body["form"]["errors"]["slug"],
            serde_json::json!([format!("Heading{WARNING}")])
        );
        assert_eq!(fx.count(), initial);
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected_for_any_owner() {
        let fx = setup();
        let cookie = fx.login(&fx.reader);
        let initial = fx.count();

        let response = fx
            .server
            .post(routes::ADD)
            .add_header("Cookie", cookie.as_str())
            .form(&form_data("Heading"))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["form"]["errors"]["slug"][0], format!("Heading{WARNING}"));
        assert_eq!(fx.count(), initial);
    }

    #[tokio::test]
    async fn empty_slug_is_derived_from_title() {
        let fx = setup();
        let cookie = fx.login(&fx.author);

        let response = fx
            .server
            .post(routes::ADD)
            .add_header("Cookie", cookie.as_str())
            .form(&NoteInput {
                title: "Новая заметка".to_string(),
                text: NOTE_TEXT.to_string(),
                slug: String::new(),
            })
            .await;

        assert_redirects(&response, routes::SUCCESS);
        assert!(fx
            .db
            .get_note_by_slug("novaya-zametka")
            .expect("Query failed")
            .is_some());
    }

    #[tokio::test]
    async fn invalid_form_echoes_submitted_values() {
        let fx = setup();
        let cookie = fx.login(&fx.author);

        let response = fx
            .server
            .post(routes::ADD)
            .add_header("Cookie", cookie.as_str())
            .form(&NoteInput {
                title: String::new(),
                text: "kept".to_string(),
                slug: "fresh".to_string(),
            })
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["form"]["text"], "kept");
        assert_eq!(body["form"]["slug"], "fresh");
        assert!(body["form"]["errors"]["title"].is_array());
        assert!(fx.db.get_note_by_slug("fresh").expect("Query failed").is_none());
    }

    #[tokio::test]
    async fn author_can_delete_note() {
        let fx = setup();
        let cookie = fx.login(&fx.author);
        let expected = fx.count() - 1;

        let response = fx
            .server
            .delete(&routes::delete(&fx.note.slug))
            .add_header("Cookie", cookie.as_str())
            .await;

        assert_redirects(&response, routes::SUCCESS);
        assert_eq!(fx.count(), expected);
    }

    #[tokio::test]
    async fn author_can_delete_note_with_post() {
        let fx = setup();
        let cookie = fx.login(&fx.author);

        let response = fx
            .server
            .post(&routes::delete(&fx.note.slug))
            .add_header("Cookie", cookie.as_str())
            .await;

        assert_redirects(&response, routes::SUCCESS);
        assert_eq!(fx.count(), 0);
    }

    #[tokio::test]
    async fn user_cant_delete_note_of_another_author() {
        let fx = setup();
        let cookie = fx.login(&fx.reader);
        let initial = fx.count();

        let response = fx
            .server
            .delete(&routes::delete(&fx.note.slug))
            .add_header("Cookie", cookie.as_str())
            .await;

        response.assert_status_not_found();
        assert_eq!(fx.count(), initial);
    }

    #[tokio::test]
    async fn anonymous_user_cant_delete_note() {
        let fx = setup();

        let response = fx.server.delete(&routes::delete(&fx.note.slug)).await;

        assert_redirects(&response, "/auth/login/?next=/delete/Heading/");
        assert_eq!(fx.count(), 1);
    }

    #[tokio::test]
    async fn anonymous_user_cant_edit_note() {
        let fx = setup();

        let response = fx
            .server
            .post(&routes::edit(&fx.note.slug))
            .form(&form_data("Heading"))
            .await;

        assert_redirects(&response, "/auth/login/?next=/edit/Heading/");
        assert_eq!(fx.reload_note().text, NOTE_TEXT);
    }

    #[tokio::test]
    async fn author_can_edit_note() {
        let fx = setup();
        let cookie = fx.login(&fx.author);

        let response = fx
            .server
            .post(&routes::edit(&fx.note.slug))
            .add_header("Cookie", cookie.as_str())
            .form(&form_data("Heading"))
            .await;

        assert_redirects(&response, routes::SUCCESS);
        let note = fx.reload_note();
        assert_eq!(note.text, NEW_NOTE_TEXT);
        assert_eq!(note.author_id, fx.author.id);
    }

    #[tokio::test]
    async fn author_can_rename_slug() {
        let fx = setup();
        let cookie = fx.login(&fx.author);

        let response = fx
            .server
            .post(&routes::edit(&fx.note.slug))
            .add_header("Cookie", cookie.as_str())
            .form(&form_data("renamed"))
            .await;

        assert_redirects(&response, routes::SUCCESS);
        assert!(fx.db.get_note_by_slug("Heading").expect("Query failed").is_none());
        assert!(fx.db.get_note_by_slug("renamed").expect("Query failed").is_some());
    }

    #[tokio::test]
    async fn edit_cannot_take_another_notes_slug() {
        let fx = setup();
        fx.db
            .create_note(
                fx.reader.id,
                NoteFields {
                    title: "Чужая".to_string(),
                    text: NOTE_TEXT.to_string(),
                    slug: "taken".to_string(),
                },
            )
            .expect("Failed to create note");
        let cookie = fx.login(&fx.author);

        let response = fx
            .server
            .post(&routes::edit(&fx.note.slug))
            .add_header("Cookie", cookie.as_str())
            .form(&form_data("taken"))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["form"]["errors"]["slug"][0], format!("taken{WARNING}"));
        assert_eq!(fx.reload_note().text, NOTE_TEXT);
    }

    #[tokio::test]
    async fn user_cant_edit_note_of_another_author() {
        let fx = setup();
        let cookie = fx.login(&fx.reader);

        let response = fx
            .server
            .post(&routes::edit(&fx.note.slug))
            .add_header("Cookie", cookie.as_str())
            .form(&form_data("Heading"))
            .await;

        response.assert_status_not_found();
        assert_eq!(fx.reload_note().text, NOTE_TEXT);
    }
}

// ============================================================
// Content
// ============================================================

mod content {
    use super::*;

    fn listed_slugs(body: &Value) -> Vec<String> {
        body["object_list"]
            .as_array()
            .expect("object_list should be an array")
            .iter()
            .map(|note| note["slug"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn list_shows_note_only_to_its_author() {
        let fx = setup();

        for (user, visible) in [(&fx.author, true), (&fx.reader, false)] {
            let cookie = fx.login(user);
            let response = fx
                .server
                .get(routes::LIST)
                .add_header("Cookie", cookie.as_str())
                .await;

            response.assert_status_ok();
            let body: Value = response.json();
            let slugs = listed_slugs(&body);
            assert_eq!(
                slugs.contains(&fx.note.slug),
                visible,
                "list for {}",
                user.username
            );
        }
    }

    #[tokio::test]
    async fn list_contains_every_own_note_and_nothing_else() {
        let fx = setup();
        for (author, slug) in [(&fx.reader, "r1"), (&fx.author, "a2"), (&fx.reader, "r2")] {
            fx.db
                .create_note(
                    author.id,
                    NoteFields {
                        title: slug.to_string(),
                        text: NOTE_TEXT.to_string(),
                        slug: slug.to_string(),
                    },
                )
                .expect("Failed to create note");
        }
        let cookie = fx.login(&fx.reader);

        let response = fx
            .server
            .get(routes::LIST)
            .add_header("Cookie", cookie.as_str())
            .await;

        let body: Value = response.json();
        assert_eq!(listed_slugs(&body), vec!["r1", "r2"]);
    }

    #[tokio::test]
    async fn add_and_edit_pages_carry_a_note_form() {
        let fx = setup();
        let cookie = fx.login(&fx.author);

        for url in [routes::edit(&fx.note.slug), routes::ADD.to_string()] {
            let response = fx.server.get(&url).add_header("Cookie", cookie.as_str()).await;

            response.assert_status_ok();
            let body: Value = response.json();
            let form = &body["form"];
            for field in ["title", "text", "slug", "errors"] {
                assert!(form.get(field).is_some(), "{url} form lacks {field}");
            }
        }
    }

    #[tokio::test]
    async fn edit_form_is_prefilled() {
        let fx = setup();
        let cookie = fx.login(&fx.author);

        let response = fx
            .server
            .get(&routes::edit(&fx.note.slug))
            .add_header("Cookie", cookie.as_str())
            .await;

        let body: Value = response.json();
        assert_eq!(body["form"]["title"], "Заголовок");
        assert_eq!(body["form"]["text"], NOTE_TEXT);
        assert_eq!(body["form"]["slug"], "Heading");
        assert_eq!(body["form"]["errors"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn add_form_starts_empty() {
        let fx = setup();
        let cookie = fx.login(&fx.author);

        let response = fx
            .server
            .get(routes::ADD)
            .add_header("Cookie", cookie.as_str())
            .await;

        let body: Value = response.json();
        assert_eq!(body["form"]["title"], "");
        assert_eq!(body["form"]["slug"], "");
    }

    #[tokio::test]
    async fn detail_and_delete_pages_show_the_note() {
        let fx = setup();
        let cookie = fx.login(&fx.author);

        for url in [routes::detail(&fx.note.slug), routes::delete(&fx.note.slug)] {
            let response = fx.server.get(&url).add_header("Cookie", cookie.as_str()).await;

            let body: Value = response.json();
            assert_eq!(body["object"]["slug"], "Heading", "{url}");
            assert_eq!(body["object"]["text"], NOTE_TEXT, "{url}");
        }
    }

    #[tokio::test]
    async fn home_names_the_signed_in_user() {
        let fx = setup();
        let cookie = fx.login(&fx.author);

        let signed_in: Value = fx
            .server
            .get(routes::HOME)
            .add_header("Cookie", cookie.as_str())
            .await
            .json();
        let anonymous: Value = fx.server.get(routes::HOME).await.json();

        assert_eq!(signed_in["user"], "Лев Толстой");
        assert!(anonymous["user"].is_null());
    }
}
