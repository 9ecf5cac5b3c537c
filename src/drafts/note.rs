use crate::api::{ApiClient, HttpTransport};
use crate::models::{Note, Session};
use crate::state::note_sync::{NoteSyncController, SavedSelection, SyncError};
use std::cell::{Cell, RefCell};

/// Local, unsaved edit buffer for one note.
///
/// `base` is the note being edited, or `None` for a note that does not exist
/// on the server yet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub base: Option<Note>,
}

impl NoteDraft {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            base: Some(note.clone()),
        }
    }

    pub fn is_new(&self) -> bool {
        self.base.is_none()
    }

    pub fn is_dirty(&self) -> bool {
        match &self.base {
            Some(n) => n.title != self.title || n.content != self.content,
            None => !self.title.is_empty() || !self.content.is_empty(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The draft is a new note; there is nothing on the server.
    NothingToDelete,
    Declined,
    Deleted,
}

/// Holds exactly one draft, derived from the collection's selection.
///
/// Changing the selection replaces the draft without a dirty check; unsaved
/// edits are dropped.
#[derive(Debug, Default)]
pub struct NoteEditor {
    draft: RefCell<NoteDraft>,
    busy: Cell<bool>,
    error: RefCell<Option<SyncError>>,
}

impl NoteEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> NoteDraft {
        self.draft.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    pub fn error(&self) -> Option<SyncError> {
        self.error.borrow().clone()
    }

    pub fn load(&self, selected: Option<&Note>) {
        let next = selected.map_or_else(NoteDraft::blank, NoteDraft::from_note);
        self.draft.replace(next);
    }

    /// Blank draft and no error, for when the session ends.
    pub fn reset(&self) {
        self.draft.replace(NoteDraft::blank());
        self.busy.set(false);
        self.error.replace(None);
    }

    pub fn set_title(&self, title: &str) {
        self.draft.borrow_mut().title = title.to_string();
    }

    pub fn set_content(&self, content: &str) {
        self.draft.borrow_mut().content = content.to_string();
    }

    /// Creates or updates depending on whether the draft has a base note.
    ///
    /// On failure the draft is left exactly as typed.
    pub async fn save<T: HttpTransport>(
        &self,
        api: &ApiClient<T>,
        session: &Session,
        notes: &NoteSyncController,
    ) -> Result<Note, SyncError> {
        let draft = self.draft();

        self.busy.set(true);
        let result = match &draft.base {
            Some(base) => {
                notes
                    .update(api, session, base, &draft.title, &draft.content)
                    .await
            }
            None => notes.create(api, session, &draft.title, &draft.content).await,
        };
        self.busy.set(false);

        match result {
            Ok(saved) => {
                match notes.select_saved(&saved.id) {
                    // A newer refresh will list it; keep editing what was saved.
                    SavedSelection::Deferred => self.load(Some(&saved)),
                    SavedSelection::Selected | SavedSelection::NotListed => {
                        self.load(notes.selected_note().as_ref())
                    }
                }
                self.error.replace(None);
                Ok(saved)
            }
            Err(e) => {
                log::warn!("{e}");
                self.error.replace(Some(e.clone()));
                Err(e)
            }
        }
    }

    /// `confirm` is the yes/no gate; it is only asked when there is a saved
    /// note to delete.
    pub async fn delete<T: HttpTransport>(
        &self,
        api: &ApiClient<T>,
        session: &Session,
        notes: &NoteSyncController,
        confirm: impl FnOnce(&Note) -> bool,
    ) -> Result<DeleteOutcome, SyncError> {
        let Some(base) = self.draft.borrow().base.clone() else {
            return Ok(DeleteOutcome::NothingToDelete);
        };
        if !confirm(&base) {
            return Ok(DeleteOutcome::Declined);
        }

        self.busy.set(true);
        let result = notes.delete(api, session, &base.id).await;
        self.busy.set(false);

        match result {
            Ok(()) => {
                // If the refresh failed the list still shows the deleted note.
                notes.select_first_except(&base.id);
                self.load(notes.selected_note().as_ref());
                self.error.replace(None);
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                log::warn!("{e}");
                self.error.replace(Some(e.clone()));
                Err(e)
            }
        }
    }
}
