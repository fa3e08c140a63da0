//! Asynchronous resource lifecycle.
//!
//! Every resource kind shares one state machine:
//!
//! ```text
//! Idle -> Pending -> Succeeded | Failed
//!            ^              |
//!            +--------------+   (a new operation restarts the cycle)
//! ```
//!
//! Results are applied in completion order. There is no request fencing: if
//! operation A is issued before B but lands after it, A's result is what the
//! slot ends up holding. When several concurrent operations fail, the first
//! failure to land is kept.
//!
//! State lives in a [`tokio::sync::watch`] channel so readers always observe a
//! whole entry and views can await changes through [`ResourceSlot::subscribe`].

use std::future::Future;

use tokio::sync::watch;

use crate::error::ApiError;
use crate::error::ApiResult;

/// Lifecycle phase of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Elements addressable by a stable identity.
pub trait Identified {
    type Id: PartialEq + Clone + std::fmt::Debug + Send + Sync;

    fn id(&self) -> &Self::Id;
}

/// One single-value slot as seen by readers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceEntry<T> {
    pub status: ResourceStatus,
    pub value: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> Default for ResourceEntry<T> {
    fn default() -> Self {
        Self {
            status: ResourceStatus::Idle,
            value: None,
            error: None,
        }
    }
}

impl<T> ResourceEntry<T> {
    pub fn is_pending(&self) -> bool {
        self.status == ResourceStatus::Pending
    }
}

/// Keeps the first error among failures that land without an intervening
/// `begin`, otherwise records `err`.
fn record_failure(status: &mut ResourceStatus, error: &mut Option<ApiError>, err: ApiError) {
    if *status != ResourceStatus::Failed || error.is_none() {
        *error = Some(err);
    }
    *status = ResourceStatus::Failed;
}

/// Single-value resource slot.
#[derive(Debug)]
pub struct ResourceSlot<T> {
    state: watch::Sender<ResourceEntry<T>>,
}

impl<T> Default for ResourceSlot<T> {
    fn default() -> Self {
        let (state, _) = watch::channel(ResourceEntry::default());
        Self { state }
    }
}

impl<T: Clone> ResourceSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResourceEntry<T>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ResourceEntry<T> {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> ResourceStatus {
        self.state.borrow().status
    }

    /// Marks the slot pending and discards the previous value and error.
    pub fn begin(&self) {
        self.state.send_modify(|entry| {
            entry.status = ResourceStatus::Pending;
            entry.value = None;
            entry.error = None;
        });
    }

    /// Applies the outcome of one operation.
    pub fn settle(&self, result: &ApiResult<T>) {
        self.state.send_modify(|entry| match result {
            Ok(value) => {
                entry.status = ResourceStatus::Succeeded;
                entry.value = Some(value.clone());
                entry.error = None;
            }
            Err(err) => {
                entry.value = None;
                record_failure(&mut entry.status, &mut entry.error, err.clone());
            }
        });
    }

    /// Runs `operation` through the slot: pending first, then its outcome.
    pub async fn run<F>(&self, operation: F) -> ApiResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        self.begin();
        let result = operation.await;
        self.settle(&result);
        result
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|entry| entry.error.take().is_some());
    }

    /// Back to `Idle` with nothing stored.
    pub fn reset(&self) {
        self.state.send_replace(ResourceEntry::default());
    }
}

/// Where [`Collection::create`] puts a new element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Append,
    /// Newest first, for history-style lists.
    Prepend,
}

/// Collection state as seen by readers.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionState<T> {
    pub items: Vec<T>,
    /// The "currently selected" element.
    pub selected: Option<T>,
    pub status: ResourceStatus,
    pub error: Option<ApiError>,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: None,
            status: ResourceStatus::Idle,
            error: None,
        }
    }
}

impl<T: Identified> CollectionState<T> {
    pub fn find(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }
}

/// A list of identified elements plus a selection, synchronized with the
/// backend. Failed operations leave the list and the selection untouched.
#[derive(Debug)]
pub struct Collection<T> {
    state: watch::Sender<CollectionState<T>>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        let (state, _) = watch::channel(CollectionState::default());
        Self { state }
    }
}

impl<T: Identified + Clone> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> watch::Receiver<CollectionState<T>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CollectionState<T> {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.state.borrow().items.clone()
    }

    pub fn selected(&self) -> Option<T> {
        self.state.borrow().selected.clone()
    }

    pub fn status(&self) -> ResourceStatus {
        self.state.borrow().status
    }

    /// Replaces the whole list.
    pub async fn fetch_all<F>(&self, operation: F) -> ApiResult<Vec<T>>
    where
        F: Future<Output = ApiResult<Vec<T>>>,
    {
        self.drive(operation, |state, items: &Vec<T>| {
            state.items = items.clone();
        })
        .await
    }

    /// Loads one element as the selection.
    pub async fn fetch_one<F>(&self, operation: F) -> ApiResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        self.drive(operation, |state, item: &T| {
            state.selected = Some(item.clone());
        })
        .await
    }

    /// Inserts the created element.
    pub async fn create<F>(&self, position: InsertPosition, operation: F) -> ApiResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        self.drive(operation, |state, item: &T| {
            insert(&mut state.items, item.clone(), position);
        })
        .await
    }

    /// Inserts the created element and makes it the selection.
    pub async fn create_selected<F>(&self, position: InsertPosition, operation: F) -> ApiResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        self.drive(operation, |state, item: &T| {
            insert(&mut state.items, item.clone(), position);
            state.selected = Some(item.clone());
        })
        .await
    }

    /// Replaces the element with the same identity, and the selection if it
    /// is that element.
    pub async fn update<F>(&self, operation: F) -> ApiResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        self.drive(operation, |state, item: &T| {
            if let Some(slot) = state.items.iter_mut().find(|i| i.id() == item.id()) {
                *slot = item.clone();
            }
            if state.selected.as_ref().is_some_and(|s| s.id() == item.id()) {
                state.selected = Some(item.clone());
            }
        })
        .await
    }

    /// Removes the element identified by `id` once `operation` succeeds.
    pub async fn delete<F>(&self, id: T::Id, operation: F) -> ApiResult<()>
    where
        F: Future<Output = ApiResult<()>>,
    {
        self.drive(operation, move |state, _: &()| {
            state.items.retain(|item| item.id() != &id);
            if state.selected.as_ref().is_some_and(|s| s.id() == &id) {
                state.selected = None;
            }
        })
        .await
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    pub fn clear_selected(&self) {
        self.state
            .send_if_modified(|state| state.selected.take().is_some());
    }

    /// Drops everything, e.g. after the session ends.
    pub fn reset(&self) {
        self.state.send_replace(CollectionState::default());
    }

    async fn drive<R, F, A>(&self, operation: F, apply: A) -> ApiResult<R>
    where
        F: Future<Output = ApiResult<R>>,
        A: FnOnce(&mut CollectionState<T>, &R),
    {
        self.state.send_modify(|state| {
            state.status = ResourceStatus::Pending;
            state.error = None;
        });

        let result = operation.await;

        self.state.send_modify(|state| match &result {
            Ok(value) => {
                apply(state, value);
                state.status = ResourceStatus::Succeeded;
                state.error = None;
            }
            Err(err) => record_failure(&mut state.status, &mut state.error, err.clone()),
        });
        result
    }
}

fn insert<T>(items: &mut Vec<T>, item: T, position: InsertPosition) {
    match position {
        InsertPosition::Append => items.push(item),
        InsertPosition::Prepend => items.insert(0, item),
    }
}
