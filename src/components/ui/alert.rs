use leptos::prelude::*;
use leptos_ui::clx;

mod components {
    use super::*;
    clx! {Alert, div, "relative w-full rounded-lg border px-4 py-3 text-sm"}
    clx! {AlertTitle, h4, "mb-1 font-medium tracking-tight leading-none"}
    clx! {AlertDescription, div, "text-sm [&_p]:leading-relaxed [&_ol]:mt-2 [&_ol]:list-decimal [&_ol]:pl-5"}
}

pub use components::*;
