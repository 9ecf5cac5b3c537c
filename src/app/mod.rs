use crate::pages::{AuthPage, NotesPage};
use crate::state::BrowserNotesClient;
use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use leptos::task::spawn_local;
use std::future::{poll_fn, Future};
use std::pin::pin;
use std::rc::Rc;

/// Shared handle on the notes client.
///
/// The client keeps its state in plain cells, which Leptos cannot observe.
/// Views call [`AppContext::track`] to subscribe and every operation bumps
/// `revision` when it changes something.
#[derive(Clone, Copy)]
pub struct AppContext {
    client: StoredValue<Rc<BrowserNotesClient>, LocalStorage>,
    revision: RwSignal<u64>,
}

impl AppContext {
    pub fn new(client: BrowserNotesClient) -> Self {
        Self {
            client: StoredValue::new_local(Rc::new(client)),
            revision: RwSignal::new(0),
        }
    }

    pub fn client(&self) -> Rc<BrowserNotesClient> {
        self.client.get_value()
    }

    pub fn track(&self) {
        self.revision.track();
    }

    pub fn touch(&self) {
        self.revision.update(|r| *r = r.wrapping_add(1));
    }

    /// Reads client state inside a reactive scope.
    pub fn with<R>(&self, f: impl FnOnce(&BrowserNotesClient) -> R) -> R {
        self.track();
        f(&self.client())
    }

    /// Spawns `op` on the local executor. The view refreshes after the first
    /// poll, once busy flags are set, and again when the operation finishes.
    pub fn run<F, Fut>(&self, op: F)
    where
        F: FnOnce(Rc<BrowserNotesClient>) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let ctx = *self;
        let fut = op(self.client());
        spawn_local(async move {
            let mut fut = pin!(fut);
            let mut started = false;
            poll_fn(|cx| {
                let poll = fut.as_mut().poll(cx);
                if !started {
                    started = true;
                    ctx.touch();
                }
                poll
            })
            .await;
            ctx.touch();
        });
    }
}

#[component]
pub fn App() -> impl IntoView {
    let ctx = AppContext::new(BrowserNotesClient::from_browser());
    provide_context(ctx);

    // A session restored from storage loads its notes without a prompt.
    ctx.run(|client| async move { client.start().await });

    let is_authenticated = move || ctx.with(|c| c.session().session().is_some());

    view! {
        <Show when=is_authenticated fallback=|| view! { <AuthPage /> }>
            <NotesPage />
        </Show>
    }
}
