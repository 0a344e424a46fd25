/// Login and registration page

use crate::account::{LoginForm, RegisterForm};
use crate::session::SessionGuard;
use crate::ui::{Services, now, redirect};
use log::error;
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Login,
    Register,
}

#[derive(Clone, PartialEq)]
enum Message {
    None,
    Success(String),
    Failure(String),
}

/// Binds a text input to a state handle
fn bind(handle: &UseStateHandle<String>) -> Callback<InputEvent> {
    let handle = handle.clone();
    Callback::from(move |e: InputEvent| {
        if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
            handle.set(input.value());
        }
    })
}

#[function_component(LoginPage)]
pub fn login_page() -> Html {
    let mode = use_state(|| Mode::Login);
    let message = use_state(|| Message::None);
    let busy = use_state(|| false);
    let show_password = use_state(|| false);

    let login_username = use_state(String::new);
    let login_password = use_state(String::new);
    let register_name = use_state(String::new);
    let register_username = use_state(String::new);
    let register_password = use_state(String::new);
    let register_email = use_state(String::new);

    let switch_to = {
        let mode = mode.clone();
        let message = message.clone();
        move |target: Mode| {
            let mode = mode.clone();
            let message = message.clone();
            Callback::from(move |_: MouseEvent| {
                mode.set(target);
                message.set(Message::None);
            })
        }
    };

    let on_toggle_password = {
        let show_password = show_password.clone();
        Callback::from(move |_: MouseEvent| show_password.set(!*show_password))
    };

    let on_login = {
        let form = LoginForm {
            username: (*login_username).clone(),
            password: (*login_password).clone(),
        };
        let message = message.clone();
        let busy = busy.clone();

        Callback::from(move |_: MouseEvent| {
            let (username, password) = match form.validate() {
                Ok(fields) => fields,
                Err(e) => return message.set(Message::Failure(e.user_message())),
            };
            let message = message.clone();
            let busy = busy.clone();
            busy.set(true);

            spawn_local(async move {
                let result = match Services::load() {
                    Ok(services) => SessionGuard::new(&services.config)
                        .login(&services.api, services.store.as_ref(), &username, &password, now())
                        .await
                        .map(|_| services.config.popup_page.clone()),
                    Err(e) => Err(e),
                };
                busy.set(false);
                match result {
                    Ok(popup_page) => redirect(&popup_page),
                    Err(e) => {
                        error!("Login Error: {}", e);
                        message.set(Message::Failure(e.user_message()));
                    }
                }
            });
        })
    };

    let on_register = {
        let form = RegisterForm {
            name: (*register_name).clone(),
            username: (*register_username).clone(),
            password: (*register_password).clone(),
            email: (*register_email).clone(),
        };
        let message = message.clone();
        let busy = busy.clone();
        let mode = mode.clone();

        Callback::from(move |_: MouseEvent| {
            if let Err(e) = form.validate() {
                return message.set(Message::Failure(e.user_message()));
            }
            let form = form.clone();
            let message = message.clone();
            let busy = busy.clone();
            let mode = mode.clone();
            busy.set(true);

            spawn_local(async move {
                let result = match Services::load() {
                    Ok(services) => form.submit(&services.api).await,
                    Err(e) => Err(e),
                };
                busy.set(false);
                match result {
                    Ok(_) => {
                        message.set(Message::Success(
                            "Registration successful! Please login.".to_string(),
                        ));
                        mode.set(Mode::Login);
                    }
                    Err(e) => {
                        error!("Registration Error: {}", e);
                        message.set(Message::Failure(e.user_message()));
                    }
                }
            });
        })
    };

    let password_type = if *show_password { "text" } else { "password" };

    html! {
        <div class="login-container">
            <div class="login-switch">
                <Button
                    onclick={switch_to(Mode::Login)}
                    variant={if *mode == Mode::Login { ButtonVariant::Primary } else { ButtonVariant::Secondary }}
                >
                    {"Login"}
                </Button>
                <Button
                    onclick={switch_to(Mode::Register)}
                    variant={if *mode == Mode::Register { ButtonVariant::Primary } else { ButtonVariant::Secondary }}
                >
                    {"Register"}
                </Button>
            </div>

            if *mode == Mode::Login {
                <div class="login-form">
                    <input type="text" placeholder="Username" value={(*login_username).clone()} oninput={bind(&login_username)} />
                    <div class="password-field">
                        <input type={password_type} placeholder="Password" value={(*login_password).clone()} oninput={bind(&login_password)} />
                        <span class="toggle-password" onclick={on_toggle_password.clone()}>
                            {if *show_password { "Hide" } else { "Show" }}
                        </span>
                    </div>
                    <Button onclick={on_login} disabled={*busy} block={true}>{"Login"}</Button>
                </div>
            } else {
                <div class="login-form">
                    <input type="text" placeholder="Name" value={(*register_name).clone()} oninput={bind(&register_name)} />
                    <input type="text" placeholder="Username" value={(*register_username).clone()} oninput={bind(&register_username)} />
                    <div class="password-field">
                        <input type={password_type} placeholder="Password" value={(*register_password).clone()} oninput={bind(&register_password)} />
                        <span class="toggle-password" onclick={on_toggle_password}>
                            {if *show_password { "Hide" } else { "Show" }}
                        </span>
                    </div>
                    <input type="email" placeholder="Email" value={(*register_email).clone()} oninput={bind(&register_email)} />
                    <Button onclick={on_register} disabled={*busy} block={true}>{"Register"}</Button>
                </div>
            }

            {match &*message {
                Message::Success(text) => html! {
                    <Alert r#type={AlertType::Success} title={text.clone()} inline={true}></Alert>
                },
                Message::Failure(text) => html! {
                    <Alert r#type={AlertType::Danger} title={text.clone()} inline={true}></Alert>
                },
                Message::None => html! {},
            }}
        </div>
    }
}
