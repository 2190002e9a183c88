//! HTTP route handlers for the Listkeeper server.
//!
//! This module maps HTML-form style requests onto [`ListStore`] operations:
//!
//! - `GET /` - Redirect to `/lists`
//! - `GET /lists` - All lists, incomplete ones first
//! - `POST /lists` - Create a list (`list_name`)
//! - `GET /lists/{id}` - One list with its todos
//! - `GET /lists/{id}/edit` - Data for the rename form
//! - `POST /lists/{id}` - Rename a list (`list_name`)
//! - `POST /lists/{id}/destroy` - Delete a list
//! - `POST /lists/{id}/todos` - Add a todo (`todo`)
//! - `POST /lists/{id}/todos/{todo_id}` - Set a todo's completion (`completed`)
//! - `POST /lists/{id}/todos/{todo_id}/destroy` - Delete a todo
//! - `POST /lists/{id}/complete_all` - Complete every todo of a list
//! - `GET /health` - Health check endpoint
//!
//! # Responses
//!
//! Views are JSON documents. Successful mutations answer `303 See Other`
//! and leave a success message in the session's flash, which the next view
//! returns once. A missing list or todo also redirects, to `/lists`, with
//! an error flash. Invalid names answer `422` with the message in the body
//! and change nothing.
//!
//! # Example
//!
//! ```rust,no_run
//! use listkeeper_server::config::Config;
//! use listkeeper_server::routes::{create_router, AppState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::new(Config::default());
//!     let app = create_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:4567").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::Config;
use crate::context::SessionContext;
use crate::error::{Entity, StoreError};
use crate::session::{Flash, SessionStore};
use crate::store::ListStore;
use crate::types::{ListId, Todo, TodoId, TodoList};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,

    /// Every visitor's session data.
    pub sessions: Arc<SessionStore>,

    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates application state with a session store sized by `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let sessions = Arc::new(SessionStore::new(config.session_store_config()));
        Self::with_sessions(config, sessions)
    }

    /// Creates application state around an existing session store.
    #[must_use]
    pub fn with_sessions(config: Config, sessions: Arc<SessionStore>) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            start_time: Instant::now(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .field("start_time", &self.start_time)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_root))
        .route("/lists", get(get_lists).post(post_lists))
        .route("/lists/{list_id}", get(get_list).post(post_list))
        .route("/lists/{list_id}/edit", get(get_edit_list))
        .route("/lists/{list_id}/destroy", post(post_list_destroy))
        .route("/lists/{list_id}/todos", post(post_todos))
        .route("/lists/{list_id}/todos/{todo_id}", post(post_todo))
        .route(
            "/lists/{list_id}/todos/{todo_id}/destroy",
            post(post_todo_destroy),
        )
        .route("/lists/{list_id}/complete_all", post(post_complete_all))
        .route("/health", get(get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Response Types
// ============================================================================

/// JSON error response body.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl ErrorResponse {
    pub(crate) fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }

    pub(crate) fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// One row of the lists overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSummary {
    pub id: ListId,
    pub name: String,
    pub todos_count: usize,
    pub todos_remaining_count: usize,
    pub complete: bool,
}

impl From<&TodoList> for ListSummary {
    fn from(list: &TodoList) -> Self {
        Self {
            id: list.id,
            name: list.name.clone(),
            todos_count: list.todos_count(),
            todos_remaining_count: list.todos_remaining_count(),
            complete: list.is_complete(),
        }
    }
}

/// Response body for `GET /lists`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListsView {
    pub lists: Vec<ListSummary>,
    #[serde(default, skip_serializing_if = "Flash::is_empty")]
    pub flash: Flash,
}

impl ListsView {
    fn new(store: &ListStore) -> Self {
        Self {
            lists: store.sorted_lists().into_iter().map(ListSummary::from).collect(),
            flash: Flash::default(),
        }
    }
}

/// Response body for `GET /lists/{id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListView {
    pub id: ListId,
    pub name: String,
    pub complete: bool,
    pub todos_count: usize,
    pub todos_remaining_count: usize,
    /// Todos ordered for display, open ones first.
    pub todos: Vec<Todo>,
    #[serde(default, skip_serializing_if = "Flash::is_empty")]
    pub flash: Flash,
}

impl From<&TodoList> for ListView {
    fn from(list: &TodoList) -> Self {
        Self {
            id: list.id,
            name: list.name.clone(),
            complete: list.is_complete(),
            todos_count: list.todos_count(),
            todos_remaining_count: list.todos_remaining_count(),
            todos: list.sorted_todos().into_iter().cloned().collect(),
            flash: Flash::default(),
        }
    }
}

/// Response body for `GET /lists/{id}/edit`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EditListView {
    pub id: ListId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Flash::is_empty")]
    pub flash: Flash,
}

impl From<&TodoList> for EditListView {
    fn from(list: &TodoList) -> Self {
        Self {
            id: list.id,
            name: list.name.clone(),
            flash: Flash::default(),
        }
    }
}

// ============================================================================
// Form Bodies
// ============================================================================

/// Form body for creating or renaming a list.
#[derive(Debug, Deserialize)]
pub struct ListNameForm {
    pub list_name: String,
}

/// Form body for adding a todo.
#[derive(Debug, Deserialize)]
pub struct TodoForm {
    pub todo: String,
}

/// Form body for toggling a todo. Only the literal `"true"` completes it.
#[derive(Debug, Deserialize)]
pub struct CompletedForm {
    #[serde(default)]
    pub completed: String,
}

impl CompletedForm {
    fn is_completed(&self) -> bool {
        self.completed == "true"
    }
}

// ============================================================================
// Shared Helpers
// ============================================================================

const LISTS_PATH: &str = "/lists";

fn list_path(list_id: ListId) -> String {
    format!("{LISTS_PATH}/{list_id}")
}

/// Parses an id taken from the path. A segment that is not a number names
/// no existing entity.
fn parse_id(raw: &str, entity: Entity) -> Result<u64, StoreError> {
    raw.parse().map_err(|_| StoreError::NotFound(entity))
}

/// Queues a success message and redirects.
fn redirect_with_success(mut session: SessionContext, to: &str, message: &str) -> Response {
    session.data.flash.success = Some(message.to_string());
    session.commit(Redirect::to(to))
}

fn error_code(err: &StoreError) -> &'static str {
    match err {
        StoreError::NotFound(_) => "not_found",
        StoreError::DuplicateName => "duplicate_name",
        StoreError::InvalidLength(_) => "invalid_length",
    }
}

/// Turns a store error into the response the caller should see.
///
/// A missing entity aborts back to the overview with an error flash;
/// validation errors are reported directly and nothing is committed to
/// the lists.
fn reject(mut session: SessionContext, err: StoreError) -> Response {
    if err.is_validation() {
        debug!(error = %err, "Rejected invalid name");
        let body = ErrorResponse::new(err.to_string()).with_code(error_code(&err));
        return session.commit((StatusCode::UNPROCESSABLE_ENTITY, Json(body)));
    }

    debug!(error = %err, "Requested entity not found");
    session.data.flash.error = Some(err.to_string());
    session.commit(Redirect::to(LISTS_PATH))
}

// ============================================================================
// Views
// ============================================================================

/// GET / - Redirect to the lists overview.
async fn get_root() -> Redirect {
    Redirect::to(LISTS_PATH)
}

/// GET /lists - All lists with completion counts, incomplete lists first.
async fn get_lists(mut session: SessionContext) -> Response {
    let mut view = ListsView::new(&session.data.lists);
    view.flash = session.data.flash.take();
    session.commit(Json(view))
}

/// GET /lists/{id} - One list with its todos, open todos first.
async fn get_list(mut session: SessionContext, Path(list_id): Path<String>) -> Response {
    let view = parse_id(&list_id, Entity::List)
        .and_then(|list_id| session.data.lists.list(list_id))
        .map(ListView::from);

    match view {
        Ok(mut view) => {
            view.flash = session.data.flash.take();
            session.commit(Json(view))
        }
        Err(err) => reject(session, err),
    }
}

/// GET /lists/{id}/edit - Current name of a list, for the rename form.
async fn get_edit_list(mut session: SessionContext, Path(list_id): Path<String>) -> Response {
    let view = parse_id(&list_id, Entity::List)
        .and_then(|list_id| session.data.lists.list(list_id))
        .map(EditListView::from);

    match view {
        Ok(mut view) => {
            view.flash = session.data.flash.take();
            session.commit(Json(view))
        }
        Err(err) => reject(session, err),
    }
}

// ============================================================================
// List Mutations
// ============================================================================

/// POST /lists - Create a list.
async fn post_lists(mut session: SessionContext, Form(form): Form<ListNameForm>) -> Response {
    let created = session
        .data
        .lists
        .create_list(form.list_name.trim())
        .map(|list| list.id);

    match created {
        Ok(list_id) => {
            info!(list_id, "List created");
            redirect_with_success(session, LISTS_PATH, "The list has been created.")
        }
        Err(err) => reject(session, err),
    }
}

/// POST /lists/{id} - Rename a list.
async fn post_list(
    mut session: SessionContext,
    Path(list_id): Path<String>,
    Form(form): Form<ListNameForm>,
) -> Response {
    let renamed = parse_id(&list_id, Entity::List).and_then(|list_id| {
        session
            .data
            .lists
            .rename_list(list_id, form.list_name.trim())
            .map(|list| list.id)
    });

    match renamed {
        Ok(list_id) => {
            info!(list_id, "List renamed");
            redirect_with_success(session, &list_path(list_id), "The list has been updated.")
        }
        Err(err) => reject(session, err),
    }
}

/// POST /lists/{id}/destroy - Delete a list. Unknown ids are ignored.
async fn post_list_destroy(mut session: SessionContext, Path(list_id): Path<String>) -> Response {
    let deleted = parse_id(&list_id, Entity::List)
        .ok()
        .and_then(|list_id| session.data.lists.delete_list(list_id));

    match deleted {
        Some(list) => info!(list_id = list.id, "List deleted"),
        None => debug!(%list_id, "Delete requested for unknown list"),
    }
    redirect_with_success(session, LISTS_PATH, "The list has been deleted.")
}

// ============================================================================
// Todo Mutations
// ============================================================================

/// POST /lists/{id}/todos - Add a todo to a list.
async fn post_todos(
    mut session: SessionContext,
    Path(list_id): Path<String>,
    Form(form): Form<TodoForm>,
) -> Response {
    let added = parse_id(&list_id, Entity::List).and_then(|list_id| {
        session
            .data
            .lists
            .add_todo(list_id, form.todo.trim())
            .map(|todo| (list_id, todo.id))
    });

    match added {
        Ok((list_id, todo_id)) => {
            info!(list_id, todo_id, "Todo added");
            redirect_with_success(session, &list_path(list_id), "The todo was added.")
        }
        Err(err) => reject(session, err),
    }
}

/// POST /lists/{id}/todos/{todo_id}/destroy - Delete a todo. Unknown todo
/// ids are ignored; an unknown list is not.
async fn post_todo_destroy(
    mut session: SessionContext,
    Path((list_id, todo_id)): Path<(String, String)>,
) -> Response {
    let todo_id = todo_id.parse::<TodoId>().ok();
    let deleted = parse_id(&list_id, Entity::List).and_then(|list_id| {
        let removed = match todo_id {
            Some(todo_id) => session.data.lists.delete_todo(list_id, todo_id)?,
            None => session.data.lists.list(list_id).map(|_| None)?,
        };
        Ok((list_id, removed))
    });

    match deleted {
        Ok((list_id, removed)) => {
            info!(list_id, ?todo_id, removed = removed.is_some(), "Todo deleted");
            redirect_with_success(session, &list_path(list_id), "The todo has been deleted.")
        }
        Err(err) => reject(session, err),
    }
}

/// POST /lists/{id}/todos/{todo_id} - Set a todo's completion flag.
async fn post_todo(
    mut session: SessionContext,
    Path((list_id, todo_id)): Path<(String, String)>,
    Form(form): Form<CompletedForm>,
) -> Response {
    let completed = form.is_completed();
    let updated = parse_id(&list_id, Entity::List).and_then(|list_id| {
        // The list is looked up first so a bad list wins over a bad todo.
        session.data.lists.list(list_id)?;
        let todo_id = parse_id(&todo_id, Entity::Todo)?;
        session
            .data
            .lists
            .set_todo_completed(list_id, todo_id, completed)
            .map(|_| (list_id, todo_id))
    });

    match updated {
        Ok((list_id, todo_id)) => {
            info!(list_id, todo_id, completed, "Todo updated");
            redirect_with_success(session, &list_path(list_id), "The todo has been updated.")
        }
        Err(err) => reject(session, err),
    }
}

/// POST /lists/{id}/complete_all - Complete every todo of a list.
async fn post_complete_all(mut session: SessionContext, Path(list_id): Path<String>) -> Response {
    let completed = parse_id(&list_id, Entity::List).and_then(|list_id| {
        session
            .data
            .lists
            .complete_all(list_id)
            .map(|list| (list_id, list.todos_count()))
    });

    match completed {
        Ok((list_id, todos_count)) => {
            info!(list_id, todos_count, "All todos completed");
            redirect_with_success(
                session,
                &list_path(list_id),
                "All todos have been completed.",
            )
        }
        Err(err) => reject(session, err),
    }
}

// ============================================================================
// GET /health - Health Check
// ============================================================================

/// Response body for health check endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server status (always "ok" if responding).
    pub status: String,

    /// Number of sessions currently held.
    pub sessions: usize,

    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

/// GET /health - Health check endpoint. Does not touch sessions.
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: state.sessions.len(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Tests
// ============================================================================
