use tauri::App;
use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut, ShortcutState};

use crate::chat_search;

pub(crate) fn parse_shortcut(accelerator: &str) -> Result<Shortcut, String> {
    accelerator
        .trim()
        .parse::<Shortcut>()
        .map_err(|error| format!("Invalid shortcut {accelerator:?}: {error}"))
}

/// Binds the reopen action to a global shortcut. A bad or taken accelerator is logged
/// and the app keeps running without it.
pub(crate) fn register_reopen_shortcut(app: &App, accelerator: Option<&str>) {
    let Some(accelerator) = accelerator else {
        return;
    };
    let shortcut = match parse_shortcut(accelerator) {
        Ok(shortcut) => shortcut,
        Err(error) => {
            log::warn!("{error}");
            return;
        }
    };
    let result = app
        .global_shortcut()
        .on_shortcut(shortcut, |app, _shortcut, event| {
            if event.state == ShortcutState::Pressed {
                chat_search::spawn_reopen_last_chat(app);
            }
        });
    match result {
        Ok(()) => log::debug!("reopen shortcut bound to {accelerator}"),
        Err(error) => log::warn!("failed to register shortcut {accelerator}: {error}"),
    }
}
