#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod bridge;
mod chat_search;
mod consts;
mod contact_photos;
mod model;
mod notifications;
mod settings;
mod shortcut;
mod support;
mod tray;
mod ui_shell;

pub(crate) use consts::*;
pub(crate) use model::*;
pub(crate) use support::*;

use tauri::Manager;

fn main() {
    init_logging();
    install_panic_logger();
    log::info!(
        "{APP_NAME} {} starting (pid={}, dev={})",
        env!("CARGO_PKG_VERSION"),
        std::process::id(),
        is_dev_mode()
    );

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_global_shortcut::Builder::new().build())
        .invoke_handler(tauri::generate_handler![
            bridge::bridge_notification,
            bridge::bridge_title_changed,
            bridge::bridge_connection_status,
            bridge::bridge_chat_search_result
        ])
        .setup(|app| {
            log::debug!("setup: starting");

            let startup_settings = settings::load_or_init_settings(app.handle());
            if let Ok(path) = settings_file(app.handle()) {
                restrict_file_permissions(&path);
                log::debug!("setup: settings file {path:?}");
            }
            contact_photos::cleanup_contact_photos(
                app.handle(),
                startup_settings.contact_photo_retention_secs,
            );

            app.manage(AppState::new(startup_settings.clone()));

            let window = ui_shell::build_main_window(app, &startup_settings)?;
            if startup_settings.start_minimized_to_tray {
                let _ = window.hide();
            } else {
                ui_shell::show_main_window(app.handle());
            }

            tray::build_tray(app)?;
            shortcut::register_reopen_shortcut(app, startup_settings.reopen_shortcut.as_deref());

            log::debug!("setup: complete");
            Ok(())
        })
        .on_window_event(ui_shell::handle_window_event)
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
