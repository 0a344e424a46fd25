/// Reusable UI components

use crate::bridge;
use crate::operations::{display_title, format_timestamp};
use crate::session::SessionGuard;
use crate::tab_data::{RemoteTabRecord, UserProfile};
use crate::ui::{Services, now};
use log::error;
use patternfly_yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct UserInfoProps {
    pub profile: Option<UserProfile>,
}

#[function_component(UserInfo)]
pub fn user_info(props: &UserInfoProps) -> Html {
    match &props.profile {
        Some(user) => html! {
            <div class="user-info">
                <p>{format!("Hello {} [{}]", user.name, user.username)}</p>
                <p>{format!("Your email: {}", user.email)}</p>
            </div>
        },
        None => html! {
            <div class="user-info">
                <p>{"User information not available."}</p>
            </div>
        },
    }
}

/// Title that opens (or focuses) the record's page when clicked
#[derive(Properties, PartialEq)]
pub struct TabLinkProps {
    pub record: RemoteTabRecord,
    #[prop_or(false)]
    pub show_url: bool,
}

#[function_component(TabLink)]
pub fn tab_link(props: &TabLinkProps) -> Html {
    let url = props.record.url.clone();
    let onclick = Callback::from(move |e: MouseEvent| {
        e.prevent_default();
        let url = url.clone();
        spawn_local(async move {
            if let Err(e) = bridge::openOrFocusTab(&url).await {
                error!("Error handling tab click: {:?}", e);
            }
        });
    });

    let text = if props.show_url {
        props.record.url.clone()
    } else {
        display_title(&props.record)
    };

    html! {
        <a href={props.record.url.clone()} class="tab-link" {onclick}>{text}</a>
    }
}

#[derive(Properties, PartialEq)]
pub struct TimestampProps {
    pub value: Option<String>,
}

#[function_component(Timestamp)]
pub fn timestamp(props: &TimestampProps) -> Html {
    html! { <span class="timestamp">{format_timestamp(props.value.as_deref())}</span> }
}

/// Shows `true` once the stored session is close to expiry. Checks on mount
/// and then on the configured interval.
#[hook]
pub fn use_expiry_watch() -> UseStateHandle<bool> {
    let prompt = use_state(|| false);

    {
        let prompt = prompt.clone();
        use_effect_with((), move |_| {
            let check = move || {
                let prompt = prompt.clone();
                spawn_local(async move {
                    let Ok(services) = Services::load() else {
                        return;
                    };
                    match services.store.get().await {
                        Ok(session) => {
                            if SessionGuard::new(&services.config).needs_revalidation(&session, now()) {
                                prompt.set(true);
                            }
                        }
                        Err(e) => error!("Failed to check token expiration: {}", e),
                    }
                });
            };
            check();

            let interval_ms = crate::config::Config::default().expiry_check_interval_ms;
            let closure = Closure::<dyn Fn()>::new(check);
            let window = web_sys::window();
            let handle = window.as_ref().and_then(|w| {
                w.set_interval_with_callback_and_timeout_and_arguments_0(
                    closure.as_ref().unchecked_ref(),
                    interval_ms as i32,
                )
                .ok()
            });

            move || {
                if let (Some(window), Some(handle)) = (window, handle) {
                    window.clear_interval_with_handle(handle);
                }
                drop(closure);
            }
        });
    }

    prompt
}

#[derive(Properties, PartialEq)]
pub struct RevalidateModalProps {
    pub on_close: Callback<()>,
}

#[function_component(RevalidateModal)]
pub fn revalidate_modal(props: &RevalidateModalProps) -> Html {
    let password = use_state(String::new);
    let error_message = use_state(|| None::<String>);
    let busy = use_state(|| false);

    let on_input = {
        let password = password.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                password.set(input.value());
            }
        })
    };

    let on_confirm = {
        let password = password.clone();
        let error_message = error_message.clone();
        let busy = busy.clone();
        let on_close = props.on_close.clone();

        Callback::from(move |_: MouseEvent| {
            let password = (*password).clone();
            let error_message = error_message.clone();
            let busy = busy.clone();
            let on_close = on_close.clone();
            busy.set(true);

            spawn_local(async move {
                let result = match Services::load() {
                    Ok(services) => {
                        SessionGuard::new(&services.config)
                            .revalidate(&services.api, services.store.as_ref(), &password, now())
                            .await
                    }
                    Err(e) => Err(e),
                };
                busy.set(false);
                match result {
                    Ok(_) => on_close.emit(()),
                    Err(e) => error_message.set(Some(e.user_message())),
                }
            });
        })
    };

    html! {
        <div class="modal-backdrop">
            <div class="modal-box">
                <h2 class="modal-title">{"Session Expiring Soon"}</h2>
                <p class="modal-text">{"Please enter your password to continue using the extension."}</p>
                <input
                    type="password"
                    placeholder="Enter your password"
                    class={if error_message.is_some() { "modal-input input-error" } else { "modal-input" }}
                    value={(*password).clone()}
                    oninput={on_input}
                />
                if let Some(message) = (*error_message).clone() {
                    <Alert r#type={AlertType::Danger} title={message} inline={true}>
                    </Alert>
                }
                <div class="modal-actions">
                    <Button
                        onclick={props.on_close.reform(|_| ())}
                        variant={ButtonVariant::Secondary}
                        disabled={*busy}
                    >
                        {"Cancel"}
                    </Button>
                    <Button onclick={on_confirm} disabled={*busy || password.is_empty()}>
                        {"Confirm"}
                    </Button>
                </div>
            </div>
        </div>
    }
}
