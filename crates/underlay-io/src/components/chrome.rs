//! Navbar, onboarding hint, and status banners.

use dioxus::prelude::*;
use dioxus_free_icons::Icon;
use dioxus_free_icons::icons::ld_icons::LdX;

use crate::account::Session;

/// Props for the [`Navbar`] component.
#[derive(Props, Clone, PartialEq)]
pub struct NavbarProps {
    session: Option<Session>,
}

#[component]
pub fn Navbar(props: NavbarProps) -> Element {
    rsx! {
        header { class: "px-6 py-4 border-b border-(--border) flex items-center justify-between",
            div {
                h1 { class: "text-2xl title-brand", "underlay" }
                p { class: "text-(--muted) text-sm",
                    "Put text behind, over, or around the subject of your photo"
                }
            }
            if let Some(ref session) = props.session {
                span { class: "text-sm text-(--text-secondary)", "{session.email}" }
            }
        }
    }
}

/// Props for the [`Banner`] component.
#[derive(Props, Clone, PartialEq)]
pub struct BannerProps {
    message: String,
    /// Render as an error rather than a warning.
    #[props(default)]
    error: bool,
    on_dismiss: EventHandler<()>,
}

/// A dismissible message strip.
#[component]
pub fn Banner(props: BannerProps) -> Element {
    let (container, text) = if props.error {
        ("bg-(--error-bg) border-(--error-border)", "text-(--text-error)")
    } else {
        ("bg-(--warning-bg) border-(--warning-border)", "text-(--text-warning)")
    };

    rsx! {
        div { class: "border rounded p-3 flex items-start gap-2 {container}",
            p { class: "flex-1 text-sm {text}", "{props.message}" }
            button {
                class: "opacity-70 hover:opacity-100",
                aria_label: "Dismiss",
                onclick: move |_| props.on_dismiss.call(()),
                Icon { width: 14, height: 14, icon: LdX }
            }
        }
    }
}

/// Props for the [`Onboarding`] component.
#[derive(Props, Clone, PartialEq)]
pub struct OnboardingProps {
    on_dismiss: EventHandler<()>,
}

/// First-run hint shown over the canvas until dismissed.
#[component]
pub fn Onboarding(props: OnboardingProps) -> Element {
    rsx! {
        div { class: "bg-[var(--surface)] rounded p-4 space-y-2",
            h3 { class: "text-sm font-semibold text-[var(--text-heading)]", "Getting started" }
            ol { class: "list-decimal list-inside text-sm text-[var(--text-secondary)] space-y-1",
                li { "Click a piece of text to select it, then drag to move it." }
                li { "Style it from the Text tab; tune the photo from the Image tab." }
                li { "Download the result when you are happy with it." }
            }
            button {
                class: "text-sm text-[var(--btn-primary)] hover:underline",
                onclick: move |_| props.on_dismiss.call(()),
                "Got it"
            }
        }
    }
}
