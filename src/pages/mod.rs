use crate::app::AppContext;
use crate::components::ui::{
    Alert, AlertDescription, AlertTitle, Button, ButtonSize, ButtonVariant, Card, CardContent,
    CardDescription, CardHeader, CardTitle, Input, Label, Spinner, Textarea,
};
use crate::models::Note;
use crate::session::{AuthError, AuthMode};
use crate::state::note_sync::SyncError;
use crate::util::format_updated_at;
use leptos::prelude::*;

/// Troubleshooting steps shown under any "could not reach the server" error.
fn network_guidance(base_url: String) -> impl IntoView {
    view! {
        <ol>
            <li>"The app is configured to call " <code>{base_url}</code> "."</li>
            <li>
                "Set " <code>"window.ENV.API_URL"</code>
                " (or build with " <code>"NOTES_API_URL"</code>
                ") to the exact backend URL, including protocol and port."
            </li>
            <li>"Make sure the backend is running and allows requests from this origin (CORS)."</li>
            <li>"A page served over https:// cannot call an http:// backend."</li>
        </ol>
    }
}

fn error_alert(title: &'static str, message: String, network: bool) -> impl IntoView {
    let ctx = expect_context::<AppContext>();
    let guidance = network.then(|| network_guidance(ctx.client().api().base_url().to_string()));

    view! {
        <Alert class="border-destructive/30">
            <AlertTitle class="text-destructive text-xs">{title}</AlertTitle>
            <AlertDescription class="text-destructive text-xs">
                <p>{message}</p>
                {guidance}
            </AlertDescription>
        </Alert>
    }
}

fn auth_error_alert(e: AuthError) -> impl IntoView {
    let (title, network) = match &e {
        AuthError::Unreachable(_) => ("Could not connect to the server", true),
        AuthError::SessionExpired => ("Signed out", false),
        _ => ("Sign-in failed", false),
    };
    error_alert(title, e.to_string(), network)
}

fn sync_error_alert(e: SyncError) -> impl IntoView {
    let title = if e.is_network() {
        "Could not connect to the server"
    } else {
        "Something went wrong"
    };
    error_alert(title, e.to_string(), e.is_network())
}

#[component]
pub fn AuthPage() -> impl IntoView {
    let ctx = expect_context::<AppContext>();
    let mode: RwSignal<AuthMode> = RwSignal::new(AuthMode::Login);
    let username: RwSignal<String> = RwSignal::new(String::new());
    let password: RwSignal<String> = RwSignal::new(String::new());

    let submitting = move || ctx.with(|c| c.session().is_authenticating());
    let error = move || ctx.with(|c| c.session().error());

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();

        let mode_val = mode.get_untracked();
        let username_val = username.get_untracked();
        let password_val = password.get_untracked();

        ctx.run(move |client| async move {
            let result = match mode_val {
                AuthMode::Login => client.login(&username_val, &password_val).await,
                AuthMode::Signup => client.signup(&username_val, &password_val).await,
            };
            if let Err(e) = result {
                log::debug!("{mode_val} not completed: {e}");
            }
        });
    };

    let toggle_mode = move |_| {
        mode.update(|m| {
            *m = match m {
                AuthMode::Login => AuthMode::Signup,
                AuthMode::Signup => AuthMode::Login,
            }
        });
    };

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex min-h-screen w-full max-w-sm flex-col justify-center px-4 py-10">
                <div class="mb-6 flex items-center justify-center">
                    <span class="text-sm font-medium text-foreground">"Notes"</span>
                </div>

                <Card>
                    <CardHeader>
                        <CardTitle class="text-lg">
                            {move || match mode.get() {
                                AuthMode::Login => "Log in",
                                AuthMode::Signup => "Create an account",
                            }}
                        </CardTitle>
                        <CardDescription class="text-xs">
                            "Use your username and password to continue."
                        </CardDescription>
                    </CardHeader>

                    <CardContent>
                        <form class="flex flex-col gap-3" on:submit=on_submit>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="username">"Username"</Label>
                                <Input
                                    id="username"
                                    autocomplete="username"
                                    required=true
                                    class="h-8 text-sm"
                                    value=username
                                    on_value=move |v: String| username.set(v)
                                />
                            </div>

                            <div class="flex flex-col gap-1.5">
                                <Label html_for="password">"Password"</Label>
                                <Input
                                    id="password"
                                    r#type="password"
                                    placeholder="••••••••"
                                    autocomplete="current-password"
                                    required=true
                                    class="h-8 text-sm"
                                    value=password
                                    on_value=move |v: String| password.set(v)
                                />
                            </div>

                            {move || error().map(auth_error_alert)}

                            <Button
                                class="w-full"
                                size=ButtonSize::Sm
                                attr:disabled=submitting
                            >
                                <span class="inline-flex items-center gap-2">
                                    <Show when=submitting fallback=|| ().into_view()>
                                        <Spinner />
                                    </Show>
                                    {move || match (mode.get(), submitting()) {
                                        (AuthMode::Login, true) => "Signing in...",
                                        (AuthMode::Login, false) => "Log in",
                                        (AuthMode::Signup, true) => "Creating account...",
                                        (AuthMode::Signup, false) => "Sign up",
                                    }}
                                </span>
                            </Button>
                        </form>

                        <div class="pt-3 text-xs text-muted-foreground">
                            {move || match mode.get() {
                                AuthMode::Login => "No account? ",
                                AuthMode::Signup => "Already have an account? ",
                            }}
                            <button
                                type="button"
                                class="text-primary underline underline-offset-4"
                                on:click=toggle_mode
                            >
                                {move || match mode.get() {
                                    AuthMode::Login => "Sign up",
                                    AuthMode::Signup => "Log in",
                                }}
                            </button>
                        </div>
                    </CardContent>
                </Card>
            </div>
        </div>
    }
}

#[component]
pub fn NotesPage() -> impl IntoView {
    let ctx = expect_context::<AppContext>();
    let username = move || {
        ctx.with(|c| c.session().session().map(|s| s.username))
            .unwrap_or_default()
    };

    view! {
        <div class="flex min-h-screen flex-col bg-background">
            <header class="flex h-12 items-center justify-between border-b px-4">
                <span class="text-sm font-medium">"Notes"</span>
                <div class="flex items-center gap-3 text-xs text-muted-foreground">
                    <span>{username}</span>
                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::Sm
                        on:click=move |_| {
                            ctx.client().logout();
                            ctx.touch();
                        }
                    >
                        "Log out"
                    </Button>
                </div>
            </header>

            <div class="flex min-h-0 flex-1">
                <NoteSidebar />
                <main class="flex min-w-0 flex-1 flex-col gap-3 p-4">
                    {move || ctx.with(|c| c.notes().error()).map(sync_error_alert)}
                    <NoteEditorPane />
                </main>
            </div>
        </div>
    }
}

#[component]
fn NoteSidebar() -> impl IntoView {
    let ctx = expect_context::<AppContext>();
    let query = move || ctx.with(|c| c.notes().query());
    let loading = move || ctx.with(|c| c.notes().is_loading());

    let on_search = move |q: String| {
        ctx.run(move |client| async move {
            if let Err(e) = client.set_query(&q).await {
                log::debug!("search for {q:?} failed: {e}");
            }
        });
    };

    let on_new = move |_| {
        ctx.client().new_note();
        ctx.touch();
    };

    view! {
        <aside class="flex w-72 shrink-0 flex-col gap-3 border-r p-3">
            <Button class="w-full" size=ButtonSize::Sm on:click=on_new>
                "New note"
            </Button>

            <Input
                r#type="search"
                placeholder="Search notes"
                class="h-8 text-sm"
                value=Signal::derive(query)
                on_value=on_search
            />

            <Show when=loading fallback=|| ().into_view()>
                <div class="flex items-center gap-2 text-xs text-muted-foreground">
                    <Spinner />
                    "Loading..."
                </div>
            </Show>

            <ul class="flex flex-col gap-1 overflow-y-auto">
                {move || {
                    let (items, selected) = ctx.with(|c| (c.notes().items(), c.notes().selected_id()));
                    if items.is_empty() {
                        return view! {
                            <li class="px-2 py-4 text-xs text-muted-foreground">"No notes"</li>
                        }
                        .into_any();
                    }
                    items
                        .into_iter()
                        .map(|note| {
                            let active = selected.as_deref() == Some(note.id.as_str());
                            view! { <NoteListItem note=note active=active /> }
                        })
                        .collect_view()
                        .into_any()
                }}
            </ul>
        </aside>
    }
}

#[component]
fn NoteListItem(note: Note, active: bool) -> impl IntoView {
    let ctx = expect_context::<AppContext>();
    let id = note.id.clone();
    let title = if note.title.trim().is_empty() {
        "Untitled".to_string()
    } else {
        note.title.clone()
    };
    let updated = note.updated_at.as_deref().map(format_updated_at);

    let class = if active {
        "flex cursor-pointer flex-col rounded-md bg-accent px-2 py-1.5 text-accent-foreground"
    } else {
        "flex cursor-pointer flex-col rounded-md px-2 py-1.5 hover:bg-accent/50"
    };

    view! {
        <li
            class=class
            on:click=move |_| {
                if ctx.client().select(&id) {
                    ctx.touch();
                }
            }
        >
            <span class="truncate text-sm">{title}</span>
            {updated.map(|u| view! { <span class="text-[11px] text-muted-foreground">{u}</span> })}
        </li>
    }
}

#[component]
fn NoteEditorPane() -> impl IntoView {
    let ctx = expect_context::<AppContext>();
    let title = Signal::derive(move || ctx.with(|c| c.editor().draft().title));
    let content = Signal::derive(move || ctx.with(|c| c.editor().draft().content));
    let is_new = move || ctx.with(|c| c.editor().draft().is_new());
    let busy = move || ctx.with(|c| c.editor().is_busy());
    let error = move || ctx.with(|c| c.editor().error());

    // Keystrokes go straight into the draft; the inputs already show them.
    let on_title = move |v: String| ctx.client().edit_title(&v);
    let on_content = move |v: String| ctx.client().edit_content(&v);

    let on_save = move |_| {
        ctx.run(|client| async move {
            if let Err(e) = client.save().await {
                log::debug!("save not completed: {e}");
            }
        });
    };

    let on_delete = move |_| {
        ctx.run(|client| async move {
            let confirm = |_: &Note| {
                window()
                    .confirm_with_message("Delete this note?")
                    .unwrap_or(false)
            };
            if let Err(e) = client.delete(confirm).await {
                log::debug!("delete not completed: {e}");
            }
        });
    };

    view! {
        <div class="flex flex-col gap-3">
            <Input
                placeholder="Title"
                class="text-base font-medium"
                value=title
                on_value=on_title
            />
            <Textarea placeholder="Write something..." value=content on_value=on_content />

            {move || error().map(sync_error_alert)}

            <div class="flex items-center gap-2">
                <Button size=ButtonSize::Sm attr:disabled=busy on:click=on_save>
                    <Show when=busy fallback=|| ().into_view()>
                        <Spinner />
                    </Show>
                    {move || if is_new() { "Create" } else { "Save" }}
                </Button>
                <Show when=move || !is_new() fallback=|| ().into_view()>
                    <Button
                        variant=ButtonVariant::Destructive
                        size=ButtonSize::Sm
                        attr:disabled=busy
                        on:click=on_delete
                    >
                        "Delete"
                    </Button>
                </Show>
            </div>
        </div>
    }
}
