use serde::Serialize;
use tauri::{AppHandle, Manager, Runtime, WebviewWindow};

use crate::{
    notifications, settings::PageSelectors, settings::StoredSettings, tray, AppState,
    ChatSearchReply, NotificationPayload,
};

const BRIDGE_TEMPLATE: &str = include_str!("../scripts/bridge.js");
const CONFIG_PLACEHOLDER: &str = "__ZAPTRAY_CONFIG__";

#[derive(Debug, Serialize)]
struct BridgeConfig<'a> {
    probe_interval_ms: u64,
    selectors: &'a PageSelectors,
}

/// Renders the page-side bridge with the configured probes baked in as a JSON literal.
pub(crate) fn render_bridge_script(settings: &StoredSettings) -> Result<String, String> {
    let config = BridgeConfig {
        probe_interval_ms: settings.connection_probe_interval_secs.saturating_mul(1000),
        selectors: &settings.page_selectors,
    };
    let json = serde_json::to_string(&config)
        .map_err(|error| format!("Failed to serialize bridge config: {error}"))?;
    Ok(BRIDGE_TEMPLATE.replace(CONFIG_PLACEHOLDER, &json))
}

/// Called on every finished page load of the main webview.
pub(crate) fn inject_bridge<R: Runtime>(window: &WebviewWindow<R>) {
    let Some(state) = window.app_handle().try_state::<AppState>() else {
        return;
    };
    let script = match render_bridge_script(&state.settings) {
        Ok(script) => script,
        Err(error) => {
            log::warn!("bridge not injected: {error}");
            return;
        }
    };
    if let Err(error) = window.eval(&script) {
        log::debug!("failed to inject page bridge: {error}");
    }
}

#[tauri::command]
pub(crate) fn bridge_notification(app: AppHandle, payload: NotificationPayload) {
    log::debug!(
        "bridge: notification title={:?} has_photo={} chat={:?} active_chat={:?}",
        payload.title,
        payload.contact_photo.is_some(),
        payload.chat_name,
        payload.active_chat_name
    );
    notifications::handle_notification(app, payload);
}

#[tauri::command]
pub(crate) fn bridge_title_changed(app: AppHandle, title: String) -> Result<(), String> {
    let state = app.state::<AppState>();
    let changed = state
        .shell
        .lock()
        .map_err(|_| "Shell state lock poisoned".to_string())?
        .apply_title(&title);
    if changed {
        log::debug!("bridge: title changed to {title:?}");
        tray::refresh_tray_status(&app);
    }
    Ok(())
}

#[tauri::command]
pub(crate) fn bridge_connection_status(app: AppHandle, connected: bool) -> Result<(), String> {
    let state = app.state::<AppState>();
    let changed = state
        .shell
        .lock()
        .map_err(|_| "Shell state lock poisoned".to_string())?
        .apply_connection(connected);
    if changed {
        log::debug!("bridge: connection status now {connected}");
        tray::refresh_tray_status(&app);
    }
    Ok(())
}

#[tauri::command]
pub(crate) fn bridge_chat_search_result(
    app: AppHandle,
    reply: ChatSearchReply,
) -> Result<(), String> {
    let state = app.state::<AppState>();
    let request_id = reply.request_id;
    let delivered = state
        .page_requests
        .lock()
        .map_err(|_| "Page request lock poisoned".to_string())?
        .resolve(reply);
    if !delivered {
        log::debug!("bridge: dropped stale chat search reply {request_id}");
    }
    Ok(())
}
