use crate::api::{ApiClient, ApiError, ApiErrorKind, HttpTransport};
use crate::models::Session;
use crate::storage::{CredentialStore, KeyValueStorage};
use std::cell::{Cell, RefCell};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AuthMode {
    Login,
    Signup,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated(Session),
}

/// Auth failures, classified for the login form.
///
/// `Unreachable` means the backend never answered and the user should check
/// configuration; `Rejected` carries the server's own message.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Username and password are required")]
    MissingCredentials,
    #[error("A sign-in request is already in progress")]
    InProgress,
    #[error("Already signed in")]
    AlreadyAuthenticated,
    #[error("{0}")]
    Unreachable(String),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Invalid server response: {0}")]
    InvalidResponse(String),
    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,
    #[error("Sign-in was cancelled")]
    Cancelled,
}

impl From<ApiError> for AuthError {
    fn from(e: ApiError) -> Self {
        match e.kind {
            ApiErrorKind::Network => AuthError::Unreachable(e.message),
            ApiErrorKind::Unauthorized { status } | ApiErrorKind::Http { status } => {
                AuthError::Rejected {
                    status,
                    message: e.message,
                }
            }
            ApiErrorKind::Parse => AuthError::InvalidResponse(e.message),
        }
    }
}

/// Owns the auth state machine and mirrors it into the credential store.
pub struct SessionManager<S> {
    credentials: CredentialStore<S>,
    state: RefCell<SessionState>,
    error: RefCell<Option<AuthError>>,
    /// Bumped on every logout so a late auth response can tell it lost.
    epoch: Cell<u64>,
}

impl<S: KeyValueStorage> SessionManager<S> {
    /// Starts authenticated iff both token and username are stored.
    pub fn restore(credentials: CredentialStore<S>) -> Self {
        let state = match credentials.load() {
            Some(stored) => {
                log::info!("restored session for {}", stored.username);
                SessionState::Authenticated(Session {
                    username: stored.username,
                    token: stored.token,
                })
            }
            None => SessionState::Anonymous,
        };

        Self {
            credentials,
            state: RefCell::new(state),
            error: RefCell::new(None),
            epoch: Cell::new(0),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        match &*self.state.borrow() {
            SessionState::Authenticated(session) => Some(session.clone()),
            _ => None,
        }
    }

    pub fn is_authenticating(&self) -> bool {
        *self.state.borrow() == SessionState::Authenticating
    }

    pub fn error(&self) -> Option<AuthError> {
        self.error.borrow().clone()
    }

    pub async fn login<T: HttpTransport>(
        &self,
        api: &ApiClient<T>,
        username: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.authenticate(api, AuthMode::Login, username, password)
            .await
    }

    pub async fn signup<T: HttpTransport>(
        &self,
        api: &ApiClient<T>,
        username: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.authenticate(api, AuthMode::Signup, username, password)
            .await
    }

    pub async fn authenticate<T: HttpTransport>(
        &self,
        api: &ApiClient<T>,
        mode: AuthMode,
        username: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        // Duplicate submits are rejected without touching the error slot.
        match &*self.state.borrow() {
            SessionState::Authenticating => return Err(AuthError::InProgress),
            SessionState::Authenticated(_) => return Err(AuthError::AlreadyAuthenticated),
            SessionState::Anonymous => {}
        }

        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            let e = AuthError::MissingCredentials;
            self.error.replace(Some(e.clone()));
            return Err(e);
        }

        self.state.replace(SessionState::Authenticating);
        self.error.replace(None);
        let epoch = self.epoch.get();

        let result = match mode {
            AuthMode::Login => api.login(username, password).await,
            AuthMode::Signup => api.signup(username, password).await,
        };

        if self.epoch.get() != epoch {
            log::debug!("discarding auth result for {username}: signed out meanwhile");
            return Err(AuthError::Cancelled);
        }

        match result {
            Ok(token) => {
                if let Err(e) = self.credentials.save(&token, username) {
                    log::warn!("session for {username} will not survive a reload: {e}");
                }
                let session = Session {
                    username: username.to_string(),
                    token,
                };
                log::info!("signed in as {username} ({mode})");
                self.state
                    .replace(SessionState::Authenticated(session.clone()));
                Ok(session)
            }
            Err(e) => {
                let e = AuthError::from(e);
                log::warn!("{mode} failed for {username}: {e}");
                self.state.replace(SessionState::Anonymous);
                self.error.replace(Some(e.clone()));
                Err(e)
            }
        }
    }

    pub fn logout(&self) {
        self.end_session(None);
    }

    /// The backend stopped accepting our token.
    pub fn expire(&self) {
        self.end_session(Some(AuthError::SessionExpired));
    }

    fn end_session(&self, reason: Option<AuthError>) {
        self.epoch.set(self.epoch.get() + 1);
        if let Err(e) = self.credentials.clear() {
            log::warn!("failed to clear stored credentials: {e}");
        }
        self.state.replace(SessionState::Anonymous);
        self.error.replace(reason);
    }
}
