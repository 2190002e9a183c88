//! Data model for todo lists held in a user's session.
//!
//! A [`TodoList`] owns an ordered sequence of [`Todo`] items. List ids are
//! unique within one session's collection; todo ids are unique only within
//! their owning list, so two lists may both contain a todo with id 1.

use serde::{Deserialize, Serialize};

/// Identifier of a list within a session's collection.
pub type ListId = u64;

/// Identifier of a todo within its owning list.
pub type TodoId = u64;

/// Entities addressable by an integer id inside an ordered collection.
///
/// Lets the id helpers in [`crate::store`] work the same way over the
/// session's lists and over one list's todos.
pub trait Identified {
    /// Returns the entity's id.
    fn id(&self) -> u64;
}

/// A single todo item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

impl Todo {
    /// Creates an incomplete todo.
    pub fn new(id: TodoId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            completed: false,
        }
    }
}

impl Identified for Todo {
    fn id(&self) -> u64 {
        self.id
    }
}

/// A named, ordered collection of todos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    pub id: ListId,
    pub name: String,
    #[serde(default)]
    pub todos: Vec<Todo>,

    /// Lowest todo id that has never been handed out in this list.
    #[serde(default)]
    pub(crate) next_todo_id: TodoId,
}

impl TodoList {
    /// Creates an empty list.
    pub fn new(id: ListId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            todos: Vec::new(),
            next_todo_id: 1,
        }
    }
}

impl Identified for TodoList {
    fn id(&self) -> u64 {
        self.id
    }
}
