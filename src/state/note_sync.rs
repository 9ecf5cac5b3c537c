use crate::api::{ApiClient, ApiError, HttpTransport};
use crate::models::{Note, Session};
use std::cell::{Cell, RefCell};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Failed to load notes: {0}")]
    Refresh(ApiError),
    #[error("Save failed: {0}")]
    Save(ApiError),
    #[error("Delete failed: {0}")]
    Delete(ApiError),
}

impl SyncError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SyncError::NotAuthenticated => None,
            SyncError::Refresh(e) | SyncError::Save(e) | SyncError::Delete(e) => Some(e),
        }
    }

    pub fn is_network(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_network)
    }

    /// A protected endpoint rejected our token.
    pub fn is_session_expired(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_unauthorized)
    }
}

/// Where [`NoteSyncController::select_saved`] left the selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SavedSelection {
    Selected,
    /// Not listed yet, but a newer refresh is in flight and will select it
    /// if it lists the note.
    Deferred,
    /// Not listed (e.g. filtered out by the query); the first item is
    /// selected instead.
    NotListed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer refresh was issued (or the collection was cleared) while this
    /// one was in flight; its response was dropped.
    Superseded,
}

/// Client-side mirror of the user's notes for the current search query.
///
/// Responsibilities:
/// - wholesale replacement of `items` from `GET /api/notes`
/// - last-issued-wins ordering between overlapping refreshes
/// - keeping the selection pointed at a note that exists
/// - refreshing after every successful mutation
///
/// Nothing here is borrowed across an `.await`, so operations can interleave
/// on a single-threaded executor.
#[derive(Debug, Default)]
pub struct NoteSyncController {
    items: RefCell<Vec<Note>>,
    query: RefCell<String>,
    selected_id: RefCell<Option<String>>,

    /// User asked for a blank note; don't auto-select the first item.
    composing_new: Cell<bool>,
    /// Saved note to select once an applied refresh lists it.
    pending_selection: RefCell<Option<String>>,

    loading: Cell<bool>,
    error: RefCell<Option<SyncError>>,

    /// Sequence number of the latest issued refresh.
    request_seq: Cell<u64>,
    /// Bumped by `clear`, so mutations started before it skip their refresh.
    generation: Cell<u64>,
}

impl NoteSyncController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<Note> {
        self.items.borrow().clone()
    }

    pub fn query(&self) -> String {
        self.query.borrow().clone()
    }

    pub fn selected_id(&self) -> Option<String> {
        self.selected_id.borrow().clone()
    }

    pub fn selected_note(&self) -> Option<Note> {
        let selected = self.selected_id.borrow();
        let id = selected.as_deref()?;
        self.items.borrow().iter().find(|n| n.id == id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn is_composing_new(&self) -> bool {
        self.composing_new.get()
    }

    pub fn error(&self) -> Option<SyncError> {
        self.error.borrow().clone()
    }

    pub async fn refresh<T: HttpTransport>(
        &self,
        api: &ApiClient<T>,
        session: &Session,
        query: &str,
    ) -> Result<RefreshOutcome, SyncError> {
        let seq = self.request_seq.get() + 1;
        self.request_seq.set(seq);
        self.query.replace(query.to_string());
        self.loading.set(true);
        log::debug!("notes refresh #{seq} q={query:?}");

        let result = api.list_notes(&session.token, query).await;

        if self.request_seq.get() != seq {
            log::debug!("notes refresh #{seq} superseded; dropping response");
            // A rejected token still matters to the caller, but stays out of
            // the error slot.
            return match result {
                Err(e) if e.is_unauthorized() => Err(SyncError::Refresh(e)),
                _ => Ok(RefreshOutcome::Superseded),
            };
        }

        self.loading.set(false);
        match result {
            Ok(notes) => {
                log::debug!("notes refresh #{seq} applied ({} notes)", notes.len());
                self.items.replace(notes);
                self.reconcile_selection();
                self.error.replace(None);
                Ok(RefreshOutcome::Applied)
            }
            Err(e) => {
                let e = SyncError::Refresh(e);
                log::warn!("{e}");
                self.error.replace(Some(e.clone()));
                Err(e)
            }
        }
    }

    /// Query changes always go to the server; filtering is not done locally.
    pub async fn set_query<T: HttpTransport>(
        &self,
        api: &ApiClient<T>,
        session: &Session,
        query: &str,
    ) -> Result<RefreshOutcome, SyncError> {
        self.refresh(api, session, query).await
    }

    pub async fn reload<T: HttpTransport>(
        &self,
        api: &ApiClient<T>,
        session: &Session,
    ) -> Result<RefreshOutcome, SyncError> {
        let query = self.query();
        self.refresh(api, session, &query).await
    }

    pub async fn create<T: HttpTransport>(
        &self,
        api: &ApiClient<T>,
        session: &Session,
        title: &str,
        content: &str,
    ) -> Result<Note, SyncError> {
        let generation = self.generation.get();
        let note = api
            .create_note(&session.token, title, content)
            .await
            .map_err(SyncError::Save)?;
        log::info!("created note {}", note.id);
        self.after_mutation(api, session, generation).await;
        Ok(note)
    }

    pub async fn update<T: HttpTransport>(
        &self,
        api: &ApiClient<T>,
        session: &Session,
        base: &Note,
        title: &str,
        content: &str,
    ) -> Result<Note, SyncError> {
        let generation = self.generation.get();
        let note = api
            .update_note(&session.token, base, title, content)
            .await
            .map_err(SyncError::Save)?;
        log::info!("updated note {}", note.id);
        self.after_mutation(api, session, generation).await;
        Ok(note)
    }

    pub async fn delete<T: HttpTransport>(
        &self,
        api: &ApiClient<T>,
        session: &Session,
        id: &str,
    ) -> Result<(), SyncError> {
        let generation = self.generation.get();
        api.delete_note(&session.token, id)
            .await
            .map_err(SyncError::Delete)?;
        log::info!("deleted note {id}");
        self.after_mutation(api, session, generation).await;
        Ok(())
    }

    /// Every successful mutation ends here. No local prediction of server
    /// fields: the list is simply fetched again for the current query.
    /// A failed refresh is recorded in the collection error slot.
    async fn after_mutation<T: HttpTransport>(
        &self,
        api: &ApiClient<T>,
        session: &Session,
        generation: u64,
    ) {
        if self.generation.get() != generation {
            log::debug!("collection cleared during mutation; skipping refresh");
            return;
        }
        let _ = self.reload(api, session).await;
    }

    /// Returns false (and leaves the selection alone) if `id` is not listed.
    pub fn select(&self, id: &str) -> bool {
        if !self.items.borrow().iter().any(|n| n.id == id) {
            return false;
        }
        self.selected_id.replace(Some(id.to_string()));
        self.composing_new.set(false);
        self.pending_selection.replace(None);
        true
    }

    pub fn select_first(&self) {
        let first = self.items.borrow().first().map(|n| n.id.clone());
        self.selected_id.replace(first);
        self.composing_new.set(false);
        self.pending_selection.replace(None);
    }

    /// Selects the first item that is not `id`, e.g. after `id` was deleted
    /// but the list could not be refreshed.
    pub fn select_first_except(&self, id: &str) {
        let first = self
            .items
            .borrow()
            .iter()
            .find(|n| n.id != id)
            .map(|n| n.id.clone());
        self.selected_id.replace(first);
        self.composing_new.set(false);
        self.pending_selection.replace(None);
    }

    /// Points the selection at a note the server just returned.
    pub fn select_saved(&self, id: &str) -> SavedSelection {
        if self.select(id) {
            return SavedSelection::Selected;
        }
        if self.loading.get() {
            self.pending_selection.replace(Some(id.to_string()));
            return SavedSelection::Deferred;
        }
        self.select_first();
        SavedSelection::NotListed
    }

    /// "New note": nothing selected, and refreshes won't pick one.
    pub fn clear_selection(&self) {
        self.selected_id.replace(None);
        self.composing_new.set(true);
        self.pending_selection.replace(None);
    }

    /// Session went away. No network.
    pub fn clear(&self) {
        self.request_seq.set(self.request_seq.get() + 1);
        self.generation.set(self.generation.get() + 1);
        self.items.replace(Vec::new());
        self.query.replace(String::new());
        self.selected_id.replace(None);
        self.composing_new.set(false);
        self.pending_selection.replace(None);
        self.loading.set(false);
        self.error.replace(None);
    }

    fn reconcile_selection(&self) {
        let items = self.items.borrow();
        let mut selected = self.selected_id.borrow_mut();

        if let Some(id) = self.pending_selection.take() {
            *selected = if items.iter().any(|n| n.id == id) {
                Some(id)
            } else {
                items.first().map(|n| n.id.clone())
            };
            self.composing_new.set(false);
            return;
        }

        let still_listed = selected
            .as_deref()
            .is_some_and(|id| items.iter().any(|n| n.id == id));
        if still_listed {
            return;
        }

        if selected.is_some() || !self.composing_new.get() {
            *selected = items.first().map(|n| n.id.clone());
        }
    }
}
