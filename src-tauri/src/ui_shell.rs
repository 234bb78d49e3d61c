use tauri::webview::PageLoadEvent;
use tauri::{AppHandle, Manager, Runtime, WebviewUrl, WebviewWindow, WindowEvent};

use crate::{
    bridge, notifications, open_external_url, settings::is_hosted_navigation,
    settings::StoredSettings, AppState, APP_NAME, MAIN_WINDOW_LABEL,
};

pub(crate) fn build_main_window<R: Runtime, M: Manager<R>>(
    manager: &M,
    settings: &StoredSettings,
) -> Result<WebviewWindow<R>, String> {
    let home_url = reqwest::Url::parse(&settings.home_url)
        .map_err(|error| format!("Invalid home URL: {error}"))?;
    let home_for_navigation = settings.home_url.clone();

    let window = tauri::WebviewWindowBuilder::new(
        manager,
        MAIN_WINDOW_LABEL,
        WebviewUrl::External(home_url),
    )
    .title(APP_NAME)
    .inner_size(1200.0, 800.0)
    .min_inner_size(800.0, 600.0)
    .user_agent(&settings.user_agent)
    .visible(false)
    .on_navigation(move |url| {
        if is_hosted_navigation(&home_for_navigation, url) {
            return true;
        }
        if let Err(error) = open_external_url(url.as_str()) {
            log::warn!("could not open external link: {error}");
        }
        false
    })
    .on_page_load(|window, payload| {
        if payload.event() == PageLoadEvent::Finished {
            log::debug!("page loaded: {}", payload.url());
            bridge::inject_bridge(&window);
        }
    })
    .build()
    .map_err(|error| format!("Failed to create main window: {error}"))?;

    #[cfg(debug_assertions)]
    if std::env::args().any(|arg| arg == "--dev") {
        window.open_devtools();
    }

    Ok(window)
}

pub(crate) fn show_main_window<R: Runtime>(app: &AppHandle<R>) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW_LABEL) {
        let _ = window.show();
        let _ = window.unminimize();
        let _ = window.set_focus();
    }
}

pub(crate) fn toggle_main_window<R: Runtime>(app: &AppHandle<R>) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW_LABEL) {
        if window.is_visible().unwrap_or(false) {
            let _ = window.hide();
        } else {
            show_main_window(app);
        }
    }
}

pub(crate) fn is_main_window_focused<R: Runtime>(app: &AppHandle<R>) -> bool {
    app.get_webview_window(MAIN_WINDOW_LABEL)
        .and_then(|window| window.is_focused().ok())
        .unwrap_or(false)
}

pub(crate) fn reload_main_window<R: Runtime>(app: &AppHandle<R>) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW_LABEL) {
        if let Err(error) = window.eval("window.location.reload()") {
            log::debug!("reload failed: {error}");
        }
    }
}

/// Closing the main window only hides it; the first hide per run explains where it went.
pub(crate) fn handle_window_event(window: &tauri::Window, event: &WindowEvent) {
    if window.label() != MAIN_WINDOW_LABEL {
        return;
    }
    if let WindowEvent::CloseRequested { api, .. } = event {
        api.prevent_close();
        let _ = window.hide();

        let first_hide = window
            .app_handle()
            .try_state::<AppState>()
            .and_then(|state| {
                let mut shown = state.minimize_hint_shown.lock().ok()?;
                let first = !*shown;
                *shown = true;
                Some(first)
            })
            .unwrap_or(false);
        if first_hide {
            notifications::show_info_notification(
                window.app_handle(),
                APP_NAME,
                "Minimized to the system tray",
            );
        }
    }
}
