pub mod note_sync;

use crate::api::{ApiClient, HttpTransport, ReqwestTransport};
use crate::drafts::{DeleteOutcome, NoteEditor};
use crate::models::{Note, Session};
use crate::session::{AuthError, AuthMode, SessionManager};
use crate::storage::{BrowserStorage, CredentialStore, KeyValueStorage};
use note_sync::{NoteSyncController, RefreshOutcome, SyncError};

/// Ties the session, the note collection and the editor together.
///
/// The collection only exists while there is a session: signing in rebuilds
/// it, signing out (or the backend rejecting our token) tears it down.
pub struct NotesClient<T, S> {
    api: ApiClient<T>,
    session: SessionManager<S>,
    notes: NoteSyncController,
    editor: NoteEditor,
}

pub type BrowserNotesClient = NotesClient<ReqwestTransport, BrowserStorage>;

impl NotesClient<ReqwestTransport, BrowserStorage> {
    pub fn from_browser() -> Self {
        Self::new(ApiClient::from_env(), BrowserStorage)
    }
}

impl<T: HttpTransport, S: KeyValueStorage> NotesClient<T, S> {
    pub fn new(api: ApiClient<T>, storage: S) -> Self {
        Self {
            api,
            session: SessionManager::restore(CredentialStore::new(storage)),
            notes: NoteSyncController::new(),
            editor: NoteEditor::new(),
        }
    }

    pub fn api(&self) -> &ApiClient<T> {
        &self.api
    }

    pub fn session(&self) -> &SessionManager<S> {
        &self.session
    }

    pub fn notes(&self) -> &NoteSyncController {
        &self.notes
    }

    pub fn editor(&self) -> &NoteEditor {
        &self.editor
    }

    /// Loads notes for a session restored from storage, if any.
    pub async fn start(&self) {
        if let Some(session) = self.session.session() {
            self.open_session(&session).await;
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        self.authenticate(AuthMode::Login, username, password).await
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<(), AuthError> {
        self.authenticate(AuthMode::Signup, username, password).await
    }

    async fn authenticate(
        &self,
        mode: AuthMode,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let session = self
            .session
            .authenticate(&self.api, mode, username, password)
            .await?;
        self.open_session(&session).await;
        Ok(())
    }

    pub fn logout(&self) {
        log::info!("signing out");
        self.session.logout();
        self.teardown();
    }

    async fn open_session(&self, session: &Session) {
        self.teardown();
        let result = self.notes.refresh(&self.api, session, "").await;
        self.after_refresh(&result);
    }

    fn teardown(&self) {
        self.notes.clear();
        self.editor.reset();
    }

    fn require_session(&self) -> Result<Session, SyncError> {
        self.session.session().ok_or(SyncError::NotAuthenticated)
    }

    pub async fn set_query(&self, query: &str) -> Result<RefreshOutcome, SyncError> {
        let session = self.require_session()?;
        let result = self.notes.set_query(&self.api, &session, query).await;
        self.after_refresh(&result);
        result
    }

    pub async fn reload(&self) -> Result<RefreshOutcome, SyncError> {
        let session = self.require_session()?;
        let result = self.notes.reload(&self.api, &session).await;
        self.after_refresh(&result);
        result
    }

    /// Returns false if `id` is not in the current list.
    pub fn select(&self, id: &str) -> bool {
        if !self.notes.select(id) {
            return false;
        }
        self.editor.load(self.notes.selected_note().as_ref());
        true
    }

    pub fn new_note(&self) {
        self.notes.clear_selection();
        self.editor.load(None);
    }

    pub fn edit_title(&self, title: &str) {
        self.editor.set_title(title);
    }

    pub fn edit_content(&self, content: &str) {
        self.editor.set_content(content);
    }

    pub async fn save(&self) -> Result<Note, SyncError> {
        let session = self.require_session()?;
        let result = self.editor.save(&self.api, &session, &self.notes).await;
        self.after_mutation(result.as_ref().err());
        result
    }

    pub async fn delete(
        &self,
        confirm: impl FnOnce(&Note) -> bool,
    ) -> Result<DeleteOutcome, SyncError> {
        let session = self.require_session()?;
        let result = self
            .editor
            .delete(&self.api, &session, &self.notes, confirm)
            .await;
        self.after_mutation(result.as_ref().err());
        result
    }

    fn after_refresh(&self, result: &Result<RefreshOutcome, SyncError>) {
        match result {
            Ok(RefreshOutcome::Applied) => self.sync_editor(),
            Ok(RefreshOutcome::Superseded) => {}
            Err(e) => self.expire_if_unauthorized(e),
        }
    }

    /// The mutation's own error, or the one its trailing refresh recorded.
    fn after_mutation(&self, err: Option<&SyncError>) {
        if let Some(e) = err {
            self.expire_if_unauthorized(e);
        }
        if let Some(e) = self.notes.error() {
            self.expire_if_unauthorized(&e);
        }
    }

    /// The draft follows the selection; a refresh that moved the selection
    /// replaces it.
    fn sync_editor(&self) {
        let draft_id = self.editor.draft().base.map(|n| n.id);
        if draft_id != self.notes.selected_id() {
            self.editor.load(self.notes.selected_note().as_ref());
        }
    }

    fn expire_if_unauthorized(&self, e: &SyncError) {
        if e.is_session_expired() && self.session.session().is_some() {
            log::warn!("backend rejected the session token; signing out");
            self.session.expire();
            self.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{Fault, FakeBackend};
    use crate::session::SessionState;
    use crate::storage::MemoryStorage;
    use futures::executor::block_on;

    fn client(storage: &MemoryStorage) -> NotesClient<FakeBackend, MemoryStorage> {
        let backend = FakeBackend::new();
        backend.add_user("alice", "pw");
        backend.seed_note("Groceries", "shopping: milk");
        backend.seed_note("Ideas", "a notes app");
        backend.seed_note("Journal", "quiet day");
        NotesClient::new(
            ApiClient::new("http://localhost:3001", backend),
            storage.clone(),
        )
    }

    fn signed_in() -> NotesClient<FakeBackend, MemoryStorage> {
        let c = client(&MemoryStorage::new());
        block_on(c.login("alice", "pw")).expect("login");
        c
    }

    #[test]
    fn test_login_loads_notes_and_editor() {
        let c = signed_in();
        assert_eq!(c.notes().items().len(), 3);
        assert_eq!(c.editor().draft().title, "Groceries");
    }

    #[test]
    fn test_cold_start_restores_session_without_prompt() {
        let storage = MemoryStorage::new();
        block_on(client(&storage).login("alice", "pw")).expect("login");
        let stored = CredentialStore::new(storage.clone())
            .load()
            .expect("credentials persisted");
        assert_eq!(stored.username, "alice");

        // New client over the same storage, as after a page reload.
        let reloaded = client(&storage);
        reloaded
            .api()
            .transport()
            .accept_token(&stored.token, "alice");
        assert!(matches!(
            reloaded.session().state(),
            SessionState::Authenticated(_)
        ));

        block_on(reloaded.start());
        assert_eq!(reloaded.notes().items().len(), 3);
        let requests = reloaded.api().transport().requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.ends_with("/api/notes"));
    }

    #[test]
    fn test_operations_require_session() {
        let c = client(&MemoryStorage::new());
        assert_eq!(block_on(c.reload()), Err(SyncError::NotAuthenticated));
        assert_eq!(block_on(c.save()).map(|_| ()), Err(SyncError::NotAuthenticated));
        assert!(c.api().transport().requests().is_empty());
    }

    #[test]
    fn test_search_moves_editor_to_remaining_note() {
        let c = signed_in();
        let journal = c.notes().items()[2].id.clone();
        assert!(c.select(&journal));
        assert_eq!(c.editor().draft().title, "Journal");

        block_on(c.set_query("shopping")).expect("search");
        assert_eq!(c.notes().items().len(), 1);
        assert_eq!(c.editor().draft().title, "Groceries");
    }

    #[test]
    fn test_refresh_keeps_draft_when_selection_unchanged() {
        let c = signed_in();
        c.edit_content("shopping: milk, bread");

        block_on(c.set_query("shopping")).expect("search");
        assert_eq!(c.editor().draft().content, "shopping: milk, bread");
    }

    #[test]
    fn test_unauthorized_refresh_signs_out() {
        let storage = MemoryStorage::new();
        let c = client(&storage);
        block_on(c.login("alice", "pw")).expect("login");

        c.api().transport().revoke_tokens();
        let err = block_on(c.reload()).expect_err("should fail");

        assert!(err.is_session_expired());
        assert_eq!(c.session().state(), SessionState::Anonymous);
        assert_eq!(c.session().error(), Some(AuthError::SessionExpired));
        assert!(CredentialStore::new(storage).load().is_none());
        assert!(c.notes().items().is_empty());
        assert_eq!(c.notes().selected_id(), None);
    }

    #[test]
    fn test_unauthorized_save_signs_out() {
        let c = signed_in();
        c.edit_title("Groceries (edited)");
        c.api().transport().revoke_tokens();

        let err = block_on(c.save()).expect_err("should fail");
        assert!(err.is_session_expired());
        assert!(c.session().session().is_none());
        assert!(c.notes().items().is_empty());
    }

    #[test]
    fn test_unauthorized_trailing_refresh_signs_out() {
        let c = signed_in();
        // Mutation succeeds, the refresh right after it is rejected.
        c.api()
            .transport()
            .push_fault(Fault::Respond(200, r#"{"_id": "n1", "title": "Groceries"}"#.to_string()));
        c.api()
            .transport()
            .push_fault(Fault::Respond(401, "Token expired".to_string()));

        block_on(c.save()).expect("mutation itself succeeded");
        assert!(c.session().session().is_none());
    }

    #[test]
    fn test_save_during_search_keeps_saved_note() {
        let c = signed_in();
        c.new_note();
        c.edit_title("Trip");
        c.edit_content("pack socks");

        let backend = c.api().transport();
        backend.push_fault(Fault::Pass);
        let trailing = backend.hold_next();
        let search = backend.hold_next();

        let (saved, searched, ()) = block_on(async {
            futures::join!(c.save(), c.set_query(""), async {
                trailing.release();
                search.release();
            })
        });
        let saved = saved.expect("save");
        searched.expect("search");

        assert_eq!(c.notes().items().len(), 4);
        assert_eq!(c.notes().selected_id(), Some(saved.id.clone()));
        let draft = c.editor().draft();
        assert_eq!(draft.title, "Trip");
        assert_eq!(draft.base.map(|n| n.id), Some(saved.id));
    }

    #[test]
    fn test_superseded_unauthorized_refresh_signs_out() {
        let c = signed_in();
        let token = c.session().session().expect("signed in").token;
        let backend = c.api().transport();

        backend.revoke_tokens();
        let gate = backend.hold_next();

        let (older, newer) = block_on(async {
            futures::join!(c.reload(), async {
                backend.accept_token(&token, "alice");
                let newer = c.set_query("shopping").await;
                gate.release();
                newer
            })
        });

        assert!(newer.is_ok());
        assert!(older.expect_err("rejected").is_session_expired());
        assert_eq!(c.session().error(), Some(AuthError::SessionExpired));
        assert!(c.notes().items().is_empty());
    }

    #[test]
    fn test_logout_tears_down_collection() {
        let c = signed_in();
        c.logout();
        assert_eq!(c.session().state(), SessionState::Anonymous);
        assert!(c.session().error().is_none());
        assert!(c.notes().items().is_empty());
        assert_eq!(c.editor().draft(), crate::drafts::NoteDraft::blank());
    }

    #[test]
    fn test_new_note_then_save_round_trip() {
        let c = signed_in();
        c.new_note();
        assert!(c.editor().draft().is_new());
        c.edit_title("Trip");
        c.edit_content("pack socks");

        let saved = block_on(c.save()).expect("save");
        assert_eq!(c.notes().selected_id(), Some(saved.id));
        assert_eq!(c.notes().items().len(), 4);
        assert_eq!(c.editor().draft().title, "Trip");
    }

    #[test]
    fn test_delete_through_client() {
        let c = signed_in();
        let outcome = block_on(c.delete(|_| true)).expect("delete");
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(c.notes().items().len(), 2);
        assert_eq!(c.editor().draft().title, "Ideas");
    }
}
