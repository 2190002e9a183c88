//! The list store: lookups, id assignment, name validation and mutations
//! over a session's todo lists.
//!
//! The store is a plain value. It holds no locks and performs no I/O; the
//! caller loads it from the session, threads it through one request, and
//! writes it back.
//!
//! # Ids
//!
//! [`next_id`] is the classic `max + 1` scan. Collections additionally keep a
//! monotonically increasing counter so that ids freed by deletion are never
//! handed out again, even when the highest id was the one removed.
//!
//! # Example
//!
//! ```rust
//! use listkeeper_server::store::ListStore;
//!
//! let mut store = ListStore::new();
//! let list_id = store.create_list("Groceries").unwrap().id;
//! let todo_id = store.add_todo(list_id, "Milk").unwrap().id;
//!
//! store.set_todo_completed(list_id, todo_id, true).unwrap();
//! assert!(store.list(list_id).unwrap().is_complete());
//! ```

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Entity, Result, StoreError};
use crate::types::{Identified, ListId, Todo, TodoId, TodoList};

/// Shortest accepted list or todo name, in characters.
pub const MIN_NAME_LENGTH: usize = 1;

/// Longest accepted list or todo name, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// Finds the entity with the given id.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for `entity` if no item carries `id`.
pub fn lookup<T: Identified>(items: &[T], id: u64, entity: Entity) -> Result<&T> {
    items
        .iter()
        .find(|item| item.id() == id)
        .ok_or(StoreError::NotFound(entity))
}

/// Mutable variant of [`lookup`].
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for `entity` if no item carries `id`.
pub fn lookup_mut<T: Identified>(items: &mut [T], id: u64, entity: Entity) -> Result<&mut T> {
    items
        .iter_mut()
        .find(|item| item.id() == id)
        .ok_or(StoreError::NotFound(entity))
}

/// Returns one more than the largest id in `items`, or 1 when empty.
pub fn next_id<T: Identified>(items: &[T]) -> u64 {
    items.iter().map(Identified::id).max().unwrap_or(0) + 1
}

/// Hands out the next unused id and advances `counter` past it.
fn allocate_id<T: Identified>(counter: &mut u64, items: &[T]) -> u64 {
    let id = (*counter).max(next_id(items));
    *counter = id + 1;
    id
}

fn has_valid_length(name: &str) -> bool {
    (MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&name.chars().count())
}

/// Checks a candidate list name against every existing list.
///
/// The duplicate check runs first, so a name that is both taken and too
/// long reports only [`StoreError::DuplicateName`]. The scan includes the
/// list being renamed, so renaming a list to its current name is rejected.
///
/// # Errors
///
/// Returns [`StoreError::DuplicateName`] or [`StoreError::InvalidLength`].
pub fn validate_list_name(name: &str, existing: &[TodoList]) -> Result<()> {
    if existing.iter().any(|list| list.name == name) {
        return Err(StoreError::DuplicateName);
    }
    if !has_valid_length(name) {
        return Err(StoreError::InvalidLength(Entity::List));
    }
    Ok(())
}

/// Checks a candidate todo name. Todo names need not be unique.
///
/// # Errors
///
/// Returns [`StoreError::InvalidLength`] if the name is empty or too long.
pub fn validate_todo_name(name: &str) -> Result<()> {
    if has_valid_length(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidLength(Entity::Todo))
    }
}

/// Orders `items` for display: incomplete first, then complete.
///
/// The partition is stable; relative order inside each group is kept.
pub fn sort_for_display<T>(items: &[T], is_complete: impl Fn(&T) -> bool) -> Vec<&T> {
    let (complete, incomplete): (Vec<&T>, Vec<&T>) =
        items.iter().partition(|&item| is_complete(item));
    incomplete.into_iter().chain(complete).collect()
}

impl TodoList {
    /// Number of todos in the list.
    pub fn todos_count(&self) -> usize {
        self.todos.len()
    }

    /// Number of todos not yet completed.
    pub fn todos_remaining_count(&self) -> usize {
        self.todos.iter().filter(|todo| !todo.completed).count()
    }

    /// A list is complete when it has todos and none of them is open.
    /// An empty list is never complete.
    pub fn is_complete(&self) -> bool {
        self.todos_count() > 0 && self.todos_remaining_count() == 0
    }

    /// Todos ordered for display, open ones first.
    pub fn sorted_todos(&self) -> Vec<&Todo> {
        sort_for_display(&self.todos, |todo| todo.completed)
    }

    /// Finds a todo in this list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the todo is absent.
    pub fn todo(&self, id: TodoId) -> Result<&Todo> {
        lookup(&self.todos, id, Entity::Todo)
    }

    /// Validates `name` and appends a new incomplete todo.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidLength`]; the list is left unchanged.
    pub fn add_todo(&mut self, name: &str) -> Result<&Todo> {
        validate_todo_name(name)?;

        let id = allocate_id(&mut self.next_todo_id, &self.todos);
        trace!(list_id = self.id, todo_id = id, "Adding todo");

        let index = self.todos.len();
        self.todos.push(Todo::new(id, name));
        Ok(&self.todos[index])
    }

    /// Removes the todo with `id`, returning it if it existed.
    pub fn delete_todo(&mut self, id: TodoId) -> Option<Todo> {
        let index = self.todos.iter().position(|todo| todo.id == id)?;
        Some(self.todos.remove(index))
    }

    /// Sets the completion flag of one todo.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the todo is absent.
    pub fn set_todo_completed(&mut self, id: TodoId, completed: bool) -> Result<&Todo> {
        let todo = lookup_mut(&mut self.todos, id, Entity::Todo)?;
        todo.completed = completed;
        Ok(&*todo)
    }

    /// Marks every todo in the list as completed.
    pub fn complete_all(&mut self) {
        for todo in &mut self.todos {
            todo.completed = true;
        }
    }
}

/// The ordered collection of lists belonging to one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListStore {
    #[serde(default)]
    lists: Vec<TodoList>,

    /// Lowest list id that has never been handed out.
    #[serde(default)]
    next_list_id: ListId,
}

impl ListStore {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// All lists in insertion order.
    pub fn lists(&self) -> &[TodoList] {
        &self.lists
    }

    /// All lists ordered for display, incomplete ones first.
    pub fn sorted_lists(&self) -> Vec<&TodoList> {
        sort_for_display(&self.lists, TodoList::is_complete)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Finds a list by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the list is absent.
    pub fn list(&self, id: ListId) -> Result<&TodoList> {
        lookup(&self.lists, id, Entity::List)
    }

    /// Mutable variant of [`ListStore::list`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the list is absent.
    pub fn list_mut(&mut self, id: ListId) -> Result<&mut TodoList> {
        lookup_mut(&mut self.lists, id, Entity::List)
    }

    /// Validates `name` and appends a new empty list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateName`] or [`StoreError::InvalidLength`];
    /// the collection is left unchanged.
    pub fn create_list(&mut self, name: &str) -> Result<&TodoList> {
        validate_list_name(name, &self.lists)?;

        let id = allocate_id(&mut self.next_list_id, &self.lists);
        trace!(list_id = id, "Creating list");

        let index = self.lists.len();
        self.lists.push(TodoList::new(id, name));
        Ok(&self.lists[index])
    }

    /// Renames a list after validating the new name against all lists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the list is absent, otherwise the
    /// errors of [`validate_list_name`].
    pub fn rename_list(&mut self, id: ListId, name: &str) -> Result<&TodoList> {
        self.list(id)?;
        validate_list_name(name, &self.lists)?;

        let list = self.list_mut(id)?;
        trace!(list_id = id, "Renaming list");
        list.name = name.to_owned();
        Ok(&*list)
    }

    /// Removes a list, returning it if it existed.
    pub fn delete_list(&mut self, id: ListId) -> Option<TodoList> {
        let index = self.lists.iter().position(|list| list.id == id)?;
        trace!(list_id = id, "Deleting list");
        Some(self.lists.remove(index))
    }

    /// Adds a todo to the list with `list_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for a missing list, or
    /// [`StoreError::InvalidLength`] for a bad todo name.
    pub fn add_todo(&mut self, list_id: ListId, name: &str) -> Result<&Todo> {
        self.list_mut(list_id)?.add_todo(name)
    }

    /// Removes a todo from a list. A missing todo is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the list is absent.
    pub fn delete_todo(&mut self, list_id: ListId, todo_id: TodoId) -> Result<Option<Todo>> {
        Ok(self.list_mut(list_id)?.delete_todo(todo_id))
    }

    /// Sets the completion flag of a todo.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the list or the todo is absent.
    pub fn set_todo_completed(
        &mut self,
        list_id: ListId,
        todo_id: TodoId,
        completed: bool,
    ) -> Result<&Todo> {
        self.list_mut(list_id)?
            .set_todo_completed(todo_id, completed)
    }

    /// Completes every todo of a list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the list is absent.
    pub fn complete_all(&mut self, list_id: ListId) -> Result<&TodoList> {
        let list = self.list_mut(list_id)?;
        list.complete_all();
        Ok(&*list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(names: &[&str]) -> ListStore {
        let mut store = ListStore::new();
        for name in names {
            store.create_list(name).unwrap();
        }
        store
    }

    fn ids(lists: &[TodoList]) -> Vec<ListId> {
        lists.iter().map(|list| list.id).collect()
    }

    // ========================================================================
    // Id assignment
    // ========================================================================

    #[test]
    fn next_id_starts_at_one() {
        let empty: Vec<Todo> = Vec::new();
        assert_eq!(next_id(&empty), 1);
    }

    #[test]
    fn next_id_is_max_plus_one() {
        let todos = vec![Todo::new(4, "a"), Todo::new(2, "b")];
        assert_eq!(next_id(&todos), 5);
    }

    #[test]
    fn list_ids_are_sequential() {
        let store = store_with(&["A", "B", "C"]);
        assert_eq!(ids(store.lists()), vec![1, 2, 3]);
    }

    #[test]
    fn list_ids_are_not_reused_after_delete() {
        let mut store = store_with(&["A", "B", "C"]);
        store.delete_list(2);
        assert_eq!(store.create_list("D").unwrap().id, 4);
    }

    #[test]
    fn highest_list_id_is_not_reused_after_delete() {
        let mut store = store_with(&["A", "B", "C"]);
        store.delete_list(3);
        assert_eq!(store.create_list("D").unwrap().id, 4);
    }

    #[test]
    fn todo_ids_are_scoped_per_list() {
        let mut store = store_with(&["A", "B"]);
        assert_eq!(store.add_todo(1, "x").unwrap().id, 1);
        assert_eq!(store.add_todo(1, "y").unwrap().id, 2);
        assert_eq!(store.add_todo(2, "z").unwrap().id, 1);
    }

    #[test]
    fn todo_ids_are_not_reused_after_delete() {
        let mut store = store_with(&["A"]);
        store.add_todo(1, "x").unwrap();
        store.add_todo(1, "y").unwrap();
        store.delete_todo(1, 2).unwrap();
        assert_eq!(store.add_todo(1, "z").unwrap().id, 3);
    }

    #[test]
    fn counter_catches_up_with_deserialized_ids() {
        let json = r#"{"lists":[{"id":7,"name":"Old","todos":[{"id":3,"name":"t"}]}]}"#;
        let mut store: ListStore = serde_json::from_str(json).unwrap();

        assert_eq!(store.create_list("New").unwrap().id, 8);
        assert_eq!(store.add_todo(7, "u").unwrap().id, 4);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[test]
    fn lookup_finds_by_id() {
        let store = store_with(&["A", "B"]);
        assert_eq!(store.list(2).unwrap().name, "B");
    }

    #[test]
    fn lookup_missing_list_is_not_found() {
        let store = store_with(&["A"]);
        assert_eq!(store.list(9), Err(StoreError::NotFound(Entity::List)));
    }

    #[test]
    fn lookup_missing_todo_is_not_found() {
        let list = TodoList::new(1, "A");
        assert_eq!(list.todo(1), Err(StoreError::NotFound(Entity::Todo)));
    }

    // ========================================================================
    // Validation
    // ========================================================================

    #[test]
    fn duplicate_list_name_is_rejected_and_collection_unchanged() {
        let mut store = store_with(&["Groceries", "Chores"]);
        let before = store.clone();

        assert_eq!(
            store.create_list("Groceries").unwrap_err(),
            StoreError::DuplicateName
        );
        assert_eq!(store, before);
    }

    #[test]
    fn duplicate_check_is_case_sensitive() {
        let mut store = store_with(&["Groceries"]);
        assert!(store.create_list("groceries").is_ok());
    }

    #[test]
    fn invalid_list_name_lengths_are_rejected() {
        let mut store = store_with(&["A"]);
        let before = store.clone();

        for name in [String::new(), "x".repeat(101)] {
            assert_eq!(
                store.create_list(&name).unwrap_err(),
                StoreError::InvalidLength(Entity::List)
            );
            assert_eq!(
                store.rename_list(1, &name).unwrap_err(),
                StoreError::InvalidLength(Entity::List)
            );
        }
        assert_eq!(store, before);
    }

    #[test]
    fn boundary_lengths_are_accepted() {
        let mut store = ListStore::new();
        assert!(store.create_list("x").is_ok());
        assert!(store.create_list(&"y".repeat(100)).is_ok());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let name = "é".repeat(100);
        assert!(name.len() > MAX_NAME_LENGTH);
        assert!(validate_list_name(&name, &[]).is_ok());
        assert!(validate_todo_name(&name).is_ok());
    }

    #[test]
    fn duplicate_check_runs_before_length_check() {
        let long = "x".repeat(101);
        let existing = vec![TodoList::new(1, long.clone())];
        assert_eq!(
            validate_list_name(&long, &existing),
            Err(StoreError::DuplicateName)
        );
    }

    #[test]
    fn todo_names_may_repeat() {
        let mut store = store_with(&["A"]);
        store.add_todo(1, "Milk").unwrap();
        assert!(store.add_todo(1, "Milk").is_ok());
        assert_eq!(store.list(1).unwrap().todos_count(), 2);
    }

    #[test]
    fn invalid_todo_name_leaves_list_unchanged() {
        let mut store = store_with(&["A"]);
        let before = store.clone();

        assert_eq!(
            store.add_todo(1, "").unwrap_err(),
            StoreError::InvalidLength(Entity::Todo)
        );
        assert_eq!(store, before);
    }

    #[test]
    fn add_todo_to_missing_list_is_not_found() {
        let mut store = ListStore::new();
        assert_eq!(
            store.add_todo(1, "Milk").unwrap_err(),
            StoreError::NotFound(Entity::List)
        );
    }

    // ========================================================================
    // Rename / delete
    // ========================================================================

    #[test]
    fn rename_changes_name_in_place() {
        let mut store = store_with(&["A", "B"]);
        store.rename_list(1, "Z").unwrap();
        assert_eq!(store.list(1).unwrap().name, "Z");
        assert_eq!(ids(store.lists()), vec![1, 2]);
    }

    #[test]
    fn rename_to_current_name_is_a_duplicate() {
        let mut store = store_with(&["Groceries"]);
        assert_eq!(
            store.rename_list(1, "Groceries").unwrap_err(),
            StoreError::DuplicateName
        );
    }

    #[test]
    fn rename_missing_list_is_not_found() {
        let mut store = ListStore::new();
        assert_eq!(
            store.rename_list(1, "A").unwrap_err(),
            StoreError::NotFound(Entity::List)
        );
    }

    #[test]
    fn delete_missing_list_is_silent() {
        let mut store = store_with(&["A"]);
        assert!(store.delete_list(5).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_todo_removes_only_that_todo() {
        let mut store = store_with(&["A"]);
        store.add_todo(1, "x").unwrap();
        store.add_todo(1, "y").unwrap();

        let removed = store.delete_todo(1, 1).unwrap();
        assert_eq!(removed.map(|todo| todo.name), Some("x".to_string()));

        let remaining: Vec<_> = store.list(1).unwrap().todos.iter().map(|t| t.id).collect();
        assert_eq!(remaining, vec![2]);
    }

    #[test]
    fn delete_todo_in_missing_list_is_not_found() {
        let mut store = ListStore::new();
        assert_eq!(
            store.delete_todo(1, 1).unwrap_err(),
            StoreError::NotFound(Entity::List)
        );
    }

    // ========================================================================
    // Completion
    // ========================================================================

    #[test]
    fn empty_list_is_never_complete() {
        assert!(!TodoList::new(1, "A").is_complete());
    }

    #[test]
    fn list_completeness_follows_todos() {
        let mut list = TodoList::new(1, "A");
        list.add_todo("x").unwrap();
        list.add_todo("y").unwrap();
        assert!(!list.is_complete());
        assert_eq!(list.todos_remaining_count(), 2);

        list.set_todo_completed(1, true).unwrap();
        assert!(!list.is_complete());
        assert_eq!(list.todos_remaining_count(), 1);

        list.set_todo_completed(2, true).unwrap();
        assert!(list.is_complete());
        assert_eq!(list.todos_remaining_count(), 0);
        assert_eq!(list.todos_count(), 2);
    }

    #[test]
    fn toggle_missing_todo_is_not_found() {
        let mut store = store_with(&["A"]);
        assert_eq!(
            store.set_todo_completed(1, 42, true).unwrap_err(),
            StoreError::NotFound(Entity::Todo)
        );
        assert_eq!(
            store.set_todo_completed(9, 1, true).unwrap_err(),
            StoreError::NotFound(Entity::List)
        );
    }

    #[test]
    fn toggle_can_reopen_a_todo() {
        let mut store = store_with(&["A"]);
        store.add_todo(1, "x").unwrap();
        store.set_todo_completed(1, 1, true).unwrap();

        let todo = store.set_todo_completed(1, 1, false).unwrap();
        assert!(!todo.completed);
    }

    #[test]
    fn complete_all_marks_every_todo() {
        let mut store = store_with(&["A"]);
        store.add_todo(1, "x").unwrap();
        store.add_todo(1, "y").unwrap();

        let list = store.complete_all(1).unwrap();
        assert!(list.todos.iter().all(|todo| todo.completed));
        assert!(list.is_complete());
    }

    #[test]
    fn complete_all_on_missing_list_is_not_found() {
        let mut store = ListStore::new();
        assert_eq!(
            store.complete_all(3).unwrap_err(),
            StoreError::NotFound(Entity::List)
        );
    }

    #[test]
    fn groceries_scenario() {
        let mut store = ListStore::new();
        let list_id = store.create_list("Groceries").unwrap().id;
        let milk = store.add_todo(list_id, "Milk").unwrap().id;
        assert_eq!(milk, 1);

        store.set_todo_completed(list_id, milk, true).unwrap();
        assert!(store.list(list_id).unwrap().is_complete());

        let other = store.create_list("Errands").unwrap().id;
        store.add_todo(other, "Bank").unwrap();
        store.add_todo(other, "Post").unwrap();
        let list = store.complete_all(other).unwrap();
        assert!(list.todos.iter().all(|todo| todo.completed));
    }

    // ========================================================================
    // Display ordering
    // ========================================================================

    #[test]
    fn sort_for_display_moves_complete_items_last() {
        let mut todos = vec![Todo::new(1, "a"), Todo::new(2, "b"), Todo::new(3, "c")];
        todos[0].completed = true;
        todos[2].completed = true;

        let sorted: Vec<_> = sort_for_display(&todos, |todo| todo.completed)
            .into_iter()
            .map(|todo| todo.id)
            .collect();
        assert_eq!(sorted, vec![2, 1, 3]);
    }

    #[test]
    fn sorted_lists_puts_complete_lists_last() {
        let mut store = store_with(&["Done", "Empty", "Open"]);
        store.add_todo(1, "x").unwrap();
        store.complete_all(1).unwrap();
        store.add_todo(3, "y").unwrap();

        let order: Vec<_> = store.sorted_lists().iter().map(|list| list.id).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn sorted_todos_keeps_relative_order() {
        let mut list = TodoList::new(1, "A");
        for name in ["a", "b", "c", "d"] {
            list.add_todo(name).unwrap();
        }
        list.set_todo_completed(1, true).unwrap();
        list.set_todo_completed(3, true).unwrap();

        let order: Vec<_> = list.sorted_todos().iter().map(|todo| todo.id).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
    }
}
