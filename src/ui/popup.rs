/// Popup UI: the five most recently opened tabs

use crate::bridge;
use crate::error::Error;
use crate::operations::most_recent;
use crate::session::SessionGuard;
use crate::tab_data::{RemoteTabRecord, UserProfile};
use crate::ui::components::{RevalidateModal, TabLink, Timestamp, UserInfo, use_expiry_watch};
use crate::ui::{Services, now, redirect};
use log::error;
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

#[derive(Clone, PartialEq)]
enum PopupState {
    Loading,
    Idle,
    Error(String),
}

async fn load_popup() -> Result<(Vec<RemoteTabRecord>, Option<UserProfile>, usize), Error> {
    let services = Services::load()?;
    let view = services.tab_view();
    let records = view.load(now()).await?;
    let profile = view.user_profile(now()).await;
    Ok((records, profile, services.config.popup_tab_limit))
}

fn show_error(state: &UseStateHandle<PopupState>, err: Error) {
    if err.is_auth() {
        redirect(&crate::config::Config::default().login_page);
    } else {
        state.set(PopupState::Error(err.user_message()));
    }
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| PopupState::Loading);
    let tabs = use_state(Vec::<RemoteTabRecord>::new);
    let profile = use_state(|| None::<UserProfile>);
    let delete_notice = use_state(|| None::<String>);
    let show_revalidate = use_expiry_watch();

    let refresh = {
        let state = state.clone();
        let tabs = tabs.clone();
        let profile = profile.clone();

        Callback::from(move |_: ()| {
            let state = state.clone();
            let tabs = tabs.clone();
            let profile = profile.clone();
            state.set(PopupState::Loading);

            spawn_local(async move {
                match load_popup().await {
                    Ok((records, user, limit)) => {
                        tabs.set(most_recent(&records, limit));
                        profile.set(user);
                        state.set(PopupState::Idle);
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

    let on_delete = {
        let state = state.clone();
        let delete_notice = delete_notice.clone();
        let refresh = refresh.clone();

        Callback::from(move |url: String| {
            let state = state.clone();
            let delete_notice = delete_notice.clone();
            let refresh = refresh.clone();
            delete_notice.set(None);

            spawn_local(async move {
                let result = match Services::load() {
                    Ok(services) => services.tab_view().delete(&[url], now()).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(outcome) => {
                        if let Some((url, message)) = outcome.failed.first() {
                            error!("Error deleting {}: {}", url, message);
                            delete_notice.set(Some(message.clone()));
                        }
                        refresh.emit(());
                    }
                    Err(e) => show_error(&state, e),
                }
            });
        })
    };

    let on_view_all = Callback::from(move |_: MouseEvent| {
        spawn_local(async move {
            let page = crate::config::Config::default().viewer_page;
            if let Err(e) = bridge::openExtensionPage(&page).await {
                error!("Failed to open {}: {:?}", page, e);
            }
        });
    });

    let on_logout = Callback::from(move |_: MouseEvent| {
        spawn_local(async move {
            match Services::load() {
                Ok(services) => {
                    if let Err(e) = SessionGuard::new(&services.config).logout(services.store.as_ref()).await {
                        error!("Error in logout: {}", e);
                    }
                    redirect(&services.config.login_page);
                }
                Err(e) => error!("Error in logout: {}", e),
            }
        });
    });

    let on_close_revalidate = {
        let show_revalidate = show_revalidate.clone();
        Callback::from(move |_: ()| show_revalidate.set(false))
    };

    html! {
        <div class="padding-20" id="popupBody">
            <div class="header">
                <h1 class="popup-title">{"Tab Tracker"}</h1>
                <Button onclick={on_logout} variant={ButtonVariant::Secondary}>
                    {"Logout"}
                </Button>
            </div>

            <UserInfo profile={(*profile).clone()} />

            {match &*state {
                PopupState::Loading => html! {
                    <div class="loading-text-center">
                        <Spinner />
                    </div>
                },
                PopupState::Error(err) => html! {
                    <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                        {err.clone()}
                    </Alert>
                },
                PopupState::Idle => html! {}
            }}

            if let Some(message) = (*delete_notice).clone() {
                <Alert r#type={AlertType::Warning} title={message} inline={true}>
                </Alert>
            }

            <table class="tab-table">
                <thead>
                    <tr>
                        <th>{"Title"}</th>
                        <th>{"Browser"}</th>
                        <th>{"Last Opened"}</th>
                    </tr>
                </thead>
                <tbody>
                    if tabs.is_empty() && *state == PopupState::Idle {
                        <tr>
                            <td colspan="3" class="empty-state">{"No tabs tracked yet."}</td>
                        </tr>
                    }
                    {for tabs.iter().map(|tab| {
                        let url = tab.url.clone();
                        html! {
                            <tr key={tab.url.clone()}>
                                <td class="tab-cell">
                                    <TabLink record={tab.clone()} />
                                    <span
                                        class="delete-icon"
                                        title="Delete"
                                        onclick={on_delete.reform(move |_: MouseEvent| url.clone())}
                                    >
                                        {"✗"}
                                    </span>
                                </td>
                                <td>{tab.browser.clone().unwrap_or_else(|| "Unknown".to_string())}</td>
                                <td><Timestamp value={tab.last_opened.clone()} /></td>
                            </tr>
                        }
                    })}
                </tbody>
            </table>

            <div class="popup-actions">
                <Button onclick={refresh.reform(|_| ())} variant={ButtonVariant::Secondary}>
                    {"Refresh"}
                </Button>
                <Button onclick={on_view_all}>
                    {"View All Tabs"}
                </Button>
            </div>

            if *show_revalidate {
                <RevalidateModal on_close={on_close_revalidate} />
            }
        </div>
    }
}
