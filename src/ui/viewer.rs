/// Full-page tab history: search, edit titles, delete records

use crate::error::Error;
use crate::operations::{Selection, display_title, search_records};
use crate::session::SessionGuard;
use crate::tab_data::{RemoteTabRecord, UserProfile};
use crate::ui::components::{RevalidateModal, TabLink, Timestamp, UserInfo, use_expiry_watch};
use crate::ui::{Services, now, redirect};
use log::{error, warn};
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

#[derive(Clone, PartialEq)]
enum ViewState {
    Loading,
    Idle,
    Error(String),
}

fn show_error(state: &UseStateHandle<ViewState>, err: Error) {
    if err.is_auth() {
        redirect(&crate::config::Config::default().login_page);
    } else {
        state.set(ViewState::Error(err.user_message()));
    }
}

#[function_component(TabViewer)]
pub fn tab_viewer() -> Html {
    let state = use_state(|| ViewState::Loading);
    let tabs = use_state(Vec::<RemoteTabRecord>::new);
    let profile = use_state(|| None::<UserProfile>);
    let search_query = use_state(String::new);
    let selection = use_state(Selection::new);
    let editing = use_state(|| None::<String>); // URL being edited
    let edit_value = use_state(String::new);
    let delete_notice = use_state(|| None::<String>); // survives the reload after a delete
    let show_revalidate = use_expiry_watch();

    let refresh = {
        let state = state.clone();
        let tabs = tabs.clone();
        let profile = profile.clone();

        Callback::from(move |_: ()| {
            let state = state.clone();
            let tabs = tabs.clone();
            let profile = profile.clone();

            spawn_local(async move {
                let services = match Services::load() {
                    Ok(services) => services,
                    Err(e) => return show_error(&state, e),
                };
                let view = services.tab_view();
                match view.load(now()).await {
                    Ok(records) => {
                        tabs.set(records);
                        state.set(ViewState::Idle);
                        profile.set(view.user_profile(now()).await);
                    }
                    Err(e) => show_error(&state, e),
                }
            });
        })
    };

    // Load on mount
    {
        let refresh = refresh.clone();
        use_effect_with((), move |_| {
            refresh.emit(());
            || ()
        });
    }

    let on_search_input = {
        let search_query = search_query.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                search_query.set(input.value());
            }
        })
    };

    let on_toggle = {
        let selection = selection.clone();
        Callback::from(move |url: String| {
            let mut next = (*selection).clone();
            next.toggle(&url);
            selection.set(next);
        })
    };

    let on_delete = {
        let selection = selection.clone();
        let state = state.clone();
        let delete_notice = delete_notice.clone();
        let refresh = refresh.clone();

        Callback::from(move |_: MouseEvent| {
            let urls = selection.urls();
            if urls.is_empty() {
                return;
            }
            selection.set(Selection::new());
            delete_notice.set(None);

            let state = state.clone();
            let delete_notice = delete_notice.clone();
            let refresh = refresh.clone();
            spawn_local(async move {
                let result = match Services::load() {
                    Ok(services) => services.tab_view().delete(&urls, now()).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(outcome) => {
                        if let Some(summary) = outcome.summary() {
                            warn!("{}", summary);
                            for (url, reason) in &outcome.failed {
                                warn!("Could not delete {}: {}", url, reason);
                            }
                            delete_notice.set(Some(summary));
                        }
                        refresh.emit(());
                    }
                    Err(e) => show_error(&state, e),
                }
            });
        })
    };

    // Start editing the single selected record
    let on_start_edit = {
        let selection = selection.clone();
        let editing = editing.clone();
        let edit_value = edit_value.clone();
        let tabs = tabs.clone();

        Callback::from(move |_: MouseEvent| {
            if editing.is_some() {
                return;
            }
            let Some(url) = selection.editable() else {
                return;
            };
            let current = tabs
                .iter()
                .find(|t| t.url == url)
                .map(display_title)
                .unwrap_or_default();
            edit_value.set(current);
            editing.set(Some(url.to_string()));
        })
    };

    let finish_edit = {
        let editing = editing.clone();
        let selection = selection.clone();
        Callback::from(move |_: ()| {
            editing.set(None);
            selection.set(Selection::new());
        })
    };

    let on_edit_input = {
        let edit_value = edit_value.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                edit_value.set(input.value());
            }
        })
    };

    let on_edit_key = {
        let editing = editing.clone();
        let edit_value = edit_value.clone();
        let tabs = tabs.clone();
        let state = state.clone();
        let refresh = refresh.clone();
        let finish_edit = finish_edit.clone();

        Callback::from(move |e: KeyboardEvent| {
            match e.key().as_str() {
                "Enter" => e.prevent_default(),
                "Escape" => return finish_edit.emit(()),
                _ => return,
            }
            let Some(url) = (*editing).clone() else {
                return;
            };
            let current = tabs
                .iter()
                .find(|t| t.url == url)
                .map(display_title)
                .unwrap_or_default();
            let new_title = (*edit_value).clone();
            finish_edit.emit(());

            let state = state.clone();
            let refresh = refresh.clone();
            spawn_local(async move {
                let result = match Services::load() {
                    Ok(services) => {
                        services
                            .tab_view()
                            .edit_title(&url, &current, &new_title, now())
                            .await
                    }
                    Err(e) => Err(e),
                };
                match result {
                    Ok(true) => refresh.emit(()),
                    Ok(false) => {}
                    Err(e) => {
                        error!("Error updating tab title: {}", e);
                        show_error(&state, e);
                    }
                }
            });
        })
    };

    let on_logout = Callback::from(move |_: MouseEvent| {
        spawn_local(async move {
            match Services::load() {
                Ok(services) => {
                    if let Err(e) = SessionGuard::new(&services.config).logout(services.store.as_ref()).await {
                        error!("Logout error: {}", e);
                    }
                    redirect(&services.config.login_page);
                }
                Err(e) => error!("Logout error: {}", e),
            }
        });
    });

    let on_close_revalidate = {
        let show_revalidate = show_revalidate.clone();
        Callback::from(move |_: ()| show_revalidate.set(false))
    };

    let visible = search_records(&tabs, &search_query);

    html! {
        <div class="container">
            <div class="header">
                <h1 class="main-title">{"Tracked Tabs"}</h1>
                <div class="header-actions">
                    <Button onclick={refresh.reform(|_| ())} variant={ButtonVariant::Secondary}>
                        {"Refresh"}
                    </Button>
                    <Button onclick={on_logout} variant={ButtonVariant::Secondary}>
                        {"Logout"}
                    </Button>
                </div>
            </div>

            <UserInfo profile={(*profile).clone()} />

            {match &*state {
                ViewState::Loading => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{"Loading tabs..."}</p>
                    </div>
                },
                ViewState::Error(err) => html! {
                    <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                        {err.clone()}
                    </Alert>
                },
                ViewState::Idle => html! {}
            }}

            if let Some(summary) = (*delete_notice).clone() {
                <Alert r#type={AlertType::Warning} title={summary} inline={true}>
                </Alert>
            }

            <div class="search-container">
                <input
                    type="text"
                    placeholder="Search by title or URL..."
                    value={(*search_query).clone()}
                    oninput={on_search_input}
                    class="search-input"
                />
                if selection.editable().is_some() {
                    <Button onclick={on_start_edit} variant={ButtonVariant::Secondary}>
                        {"Edit"}
                    </Button>
                }
                if let Some(label) = selection.delete_label() {
                    <Button onclick={on_delete} variant={ButtonVariant::Danger}>
                        {label}
                    </Button>
                }
            </div>

            <table class="tab-table">
                <thead>
                    <tr>
                        <th></th>
                        <th>{"#"}</th>
                        <th>{"Title"}</th>
                        <th>{"URL"}</th>
                        <th>{"Browser"}</th>
                        <th>{"First Opened"}</th>
                        <th>{"Last Opened"}</th>
                    </tr>
                </thead>
                <tbody>
                    if visible.is_empty() && *state == ViewState::Idle {
                        <tr>
                            <td colspan="7" class="empty-state">{"No tabs found."}</td>
                        </tr>
                    }
                    {for visible.iter().enumerate().map(|(index, tab)| {
                        let url = tab.url.clone();
                        let checked = selection.contains(&tab.url);
                        let is_editing = (*editing).as_deref() == Some(tab.url.as_str());

                        html! {
                            <tr key={tab.url.clone()}>
                                <td>
                                    <div
                                        class={if checked { "custom-checkbox checked" } else { "custom-checkbox" }}
                                        onclick={on_toggle.reform(move |_: MouseEvent| url.clone())}
                                    />
                                </td>
                                <td>{index + 1}</td>
                                <td class="title-cell">
                                    if is_editing {
                                        <input
                                            type="text"
                                            class="editable-title"
                                            value={(*edit_value).clone()}
                                            oninput={on_edit_input.clone()}
                                            onkeydown={on_edit_key.clone()}
                                            onblur={finish_edit.reform(|_: FocusEvent| ())}
                                        />
                                    } else {
                                        {display_title(tab)}
                                    }
                                </td>
                                <td class="url-cell"><TabLink record={(*tab).clone()} show_url={true} /></td>
                                <td>{tab.browser.clone().unwrap_or_else(|| "Unknown".to_string())}</td>
                                <td><Timestamp value={tab.first_opened.clone()} /></td>
                                <td><Timestamp value={tab.last_opened.clone()} /></td>
                            </tr>
                        }
                    })}
                </tbody>
            </table>

            <div class="footer">
                {format!("{} tabs", tabs.len())}
            </div>

            if *show_revalidate {
                <RevalidateModal on_close={on_close_revalidate} />
            }
        </div>
    }
}
