pub mod api;
mod app;
mod components;
pub mod drafts;
mod logging;
pub mod models;
mod pages;
pub mod session;
pub mod state;
pub mod storage;
mod util;

pub use api::{ApiClient, ApiError, ApiErrorKind, EnvConfig, HttpTransport, ReqwestTransport};
pub use models::{Note, Session};
pub use session::{AuthError, AuthMode, SessionManager, SessionState};
pub use state::note_sync::{NoteSyncController, RefreshOutcome, SyncError};
pub use state::{BrowserNotesClient, NotesClient};

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    if let Err(e) = logging::init(logging::default_level()) {
        web_sys::console::warn_1(&format!("logger already installed: {e}").into());
    }
    leptos::mount::mount_to_body(app::App);
}
