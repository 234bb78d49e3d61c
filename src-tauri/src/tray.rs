use std::path::{Path, PathBuf};
use tauri::image::Image;
use tauri::menu::{Menu, MenuItem, PredefinedMenuItem};
use tauri::tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent};
use tauri::{App, AppHandle, Manager};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

use crate::{
    chat_search, ui_shell, AppState, TrayMenuState, APP_NAME, MAIN_TRAY_ID, TRAY_TOOLTIP_BASE,
};

const REOPEN_LABEL_IDLE: &str = "Reopen last conversation";
const REOPEN_LABEL_MAX_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TrayVariant {
    Default,
    Offline,
    Unread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TrayIconSelection {
    pub(crate) variant: TrayVariant,
    pub(crate) size: u32,
}

impl TrayIconSelection {
    pub(crate) fn pick(scale_factor: f64, is_connected: bool, unread_count: u64) -> Self {
        let variant = if !is_connected {
            TrayVariant::Offline
        } else if unread_count > 0 {
            TrayVariant::Unread
        } else {
            TrayVariant::Default
        };
        Self {
            variant,
            size: size_bucket(scale_factor),
        }
    }

    fn stem(&self) -> &'static str {
        match self.variant {
            TrayVariant::Default => "tray-icon",
            TrayVariant::Offline => "tray-icon-offline",
            TrayVariant::Unread => "tray-icon-unread",
        }
    }

    /// File names to try, most specific first; the plain default icon is always last.
    pub(crate) fn candidate_file_names(&self) -> Vec<String> {
        let stem = self.stem();
        let mut names = vec![format!("{stem}-{}.png", self.size), format!("{stem}.png")];
        if self.variant != TrayVariant::Default {
            names.push("tray-icon.png".to_string());
        }
        names
    }
}

pub(crate) fn size_bucket(scale_factor: f64) -> u32 {
    if scale_factor >= 2.0 {
        32
    } else if scale_factor >= 1.5 {
        24
    } else {
        16
    }
}

pub(crate) fn tray_tooltip(is_connected: bool, unread_count: u64) -> String {
    if !is_connected {
        format!("{TRAY_TOOLTIP_BASE} (Disconnected)")
    } else if unread_count > 0 {
        format!("{TRAY_TOOLTIP_BASE} ({unread_count} unread)")
    } else {
        TRAY_TOOLTIP_BASE.to_string()
    }
}

pub(crate) fn resolve_tray_icon_path(
    icon_dirs: &[PathBuf],
    selection: TrayIconSelection,
) -> Option<PathBuf> {
    selection
        .candidate_file_names()
        .iter()
        .flat_map(|name| icon_dirs.iter().map(move |dir| dir.join(name)))
        .find(|path| path.is_file())
}

fn tray_icon_dirs(app: &AppHandle) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(resource_dir) = app.path().resource_dir() {
        dirs.push(resource_dir.join("icons/tray"));
    }
    if let Ok(current_dir) = std::env::current_dir() {
        dirs.push(current_dir.join("icons/tray"));
        dirs.push(current_dir.join("src-tauri/icons/tray"));
    }
    dirs
}

fn load_icon(path: &Path) -> Option<Image<'static>> {
    match Image::from_path(path) {
        Ok(image) => Some(image.to_owned()),
        Err(error) => {
            log::debug!("failed to load tray icon {path:?}: {error}");
            None
        }
    }
}

fn tray_icon_for(app: &AppHandle, selection: TrayIconSelection) -> Option<Image<'static>> {
    resolve_tray_icon_path(&tray_icon_dirs(app), selection)
        .and_then(|path| load_icon(&path))
        .or_else(|| app.default_window_icon().map(|icon| icon.clone().to_owned()))
}

fn primary_scale_factor(app: &AppHandle) -> f64 {
    app.primary_monitor()
        .ok()
        .flatten()
        .map(|monitor| monitor.scale_factor())
        .unwrap_or(1.0)
}

/// Recomputes icon and tooltip from the current shell state.
pub(crate) fn refresh_tray_status(app: &AppHandle) {
    let Some(state) = app.try_state::<AppState>() else {
        return;
    };
    let (is_connected, unread_count) = match state.shell.lock() {
        Ok(shell) => (shell.is_connected, shell.unread_count),
        Err(_) => return,
    };
    let Some(tray) = app.tray_by_id(MAIN_TRAY_ID) else {
        return;
    };
    let selection = TrayIconSelection::pick(primary_scale_factor(app), is_connected, unread_count);
    if let Err(error) = tray.set_icon(tray_icon_for(app, selection)) {
        log::debug!("failed to update tray icon: {error}");
    }
    let tooltip = tray_tooltip(is_connected, unread_count);
    if let Err(error) = tray.set_tooltip(Some(&tooltip)) {
        log::debug!("failed to update tray tooltip: {error}");
    }
}

pub(crate) fn reopen_label(last_chat: Option<&str>) -> String {
    match last_chat {
        Some(name) if !name.trim().is_empty() => {
            format!("Reopen: {}", crate::truncate_message(name.trim(), REOPEN_LABEL_MAX_CHARS))
        }
        _ => REOPEN_LABEL_IDLE.to_string(),
    }
}

/// Syncs the "reopen" menu entry with the last notified chat.
pub(crate) fn refresh_reopen_item(app: &AppHandle, last_chat: Option<&str>) {
    let Some(state) = app.try_state::<AppState>() else {
        return;
    };
    let handles = state.tray_menu.lock().ok().and_then(|guard| guard.clone());
    let Some(handles) = handles else {
        return;
    };
    let _ = handles.reopen_item.set_text(reopen_label(last_chat));
    let _ = handles.reopen_item.set_enabled(last_chat.is_some());
}

fn show_about(app: &AppHandle) {
    let detail = format!(
        "{APP_NAME} v{}\n\nWhatsApp Web in a native window with tray integration and native notifications.",
        app.package_info().version
    );
    app.dialog()
        .message(detail)
        .title(format!("About {APP_NAME}"))
        .kind(MessageDialogKind::Info)
        .show(|_| {});
}

pub(crate) fn build_tray(app: &mut App) -> Result<(), Box<dyn std::error::Error>> {
    let open_item = MenuItem::with_id(app, "open_main", "Open WhatsApp", true, None::<&str>)?;
    let reopen_item =
        MenuItem::with_id(app, "reopen_last", REOPEN_LABEL_IDLE, false, None::<&str>)?;
    let separator = PredefinedMenuItem::separator(app)?;
    let reload_item = MenuItem::with_id(app, "reload", "Reload", true, None::<&str>)?;
    let about_item = MenuItem::with_id(app, "about", "About", true, None::<&str>)?;
    let quit_item = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;
    let menu = Menu::with_items(
        app,
        &[
            &open_item,
            &reopen_item,
            &separator,
            &reload_item,
            &about_item,
            &quit_item,
        ],
    )?;

    let state = app.state::<AppState>();
    if let Ok(mut tray_menu_lock) = state.tray_menu.lock() {
        *tray_menu_lock = Some(TrayMenuState {
            reopen_item: reopen_item.clone(),
        });
    }

    let mut tray_builder = TrayIconBuilder::with_id(MAIN_TRAY_ID)
        .menu(&menu)
        .tooltip(tray_tooltip(false, 0))
        .show_menu_on_left_click(false)
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                ui_shell::toggle_main_window(tray.app_handle());
            }
        })
        .on_menu_event(|app, event| match event.id().as_ref() {
            "open_main" => ui_shell::show_main_window(app),
            "reopen_last" => chat_search::spawn_reopen_last_chat(app),
            "reload" => ui_shell::reload_main_window(app),
            "about" => show_about(app),
            "quit" => app.exit(0),
            _ => {}
        });
    let initial = TrayIconSelection::pick(primary_scale_factor(app.handle()), false, 0);
    if let Some(icon) = tray_icon_for(app.handle(), initial) {
        tray_builder = tray_builder.icon(icon);
    }
    tray_builder.build(app)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scale_factor_maps_to_coarse_buckets() {
        assert_eq!(size_bucket(1.0), 16);
        assert_eq!(size_bucket(1.25), 16);
        assert_eq!(size_bucket(1.5), 24);
        assert_eq!(size_bucket(1.75), 24);
        assert_eq!(size_bucket(2.0), 32);
        assert_eq!(size_bucket(3.0), 32);
    }

    #[test]
    fn offline_overrides_unread() {
        let offline = TrayIconSelection::pick(1.0, false, 5);
        assert_eq!(offline.variant, TrayVariant::Offline);
        assert_eq!(TrayIconSelection::pick(1.0, true, 5).variant, TrayVariant::Unread);
        assert_eq!(TrayIconSelection::pick(1.0, true, 0).variant, TrayVariant::Default);

        assert_eq!(tray_tooltip(false, 5), "ZapTray - WhatsApp (Disconnected)");
        assert_eq!(tray_tooltip(true, 5), "ZapTray - WhatsApp (5 unread)");
        assert_eq!(tray_tooltip(true, 0), "ZapTray - WhatsApp");
    }

    #[test]
    fn candidate_names_fall_back_to_unscaled_then_default() {
        let selection = TrayIconSelection::pick(2.0, true, 2);
        assert_eq!(
            selection.candidate_file_names(),
            vec!["tray-icon-unread-32.png", "tray-icon-unread.png", "tray-icon.png"]
        );
        let selection = TrayIconSelection::pick(1.0, true, 0);
        assert_eq!(
            selection.candidate_file_names(),
            vec!["tray-icon-16.png", "tray-icon.png"]
        );
    }

    #[test]
    fn missing_scaled_asset_uses_default_icon() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tray-icon.png"), b"png").unwrap();
        let dirs = vec![dir.path().to_path_buf()];

        let offline = TrayIconSelection::pick(1.5, false, 0);
        assert_eq!(
            resolve_tray_icon_path(&dirs, offline),
            Some(dir.path().join("tray-icon.png"))
        );

        fs::write(dir.path().join("tray-icon-offline-24.png"), b"png").unwrap();
        assert_eq!(
            resolve_tray_icon_path(&dirs, offline),
            Some(dir.path().join("tray-icon-offline-24.png"))
        );
    }

    #[test]
    fn no_assets_resolves_to_none_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = vec![dir.path().join("missing"), dir.path().to_path_buf()];
        assert_eq!(resolve_tray_icon_path(&dirs, TrayIconSelection::pick(2.0, true, 1)), None);
    }

    #[test]
    fn bundled_tray_assets_cover_every_selection() {
        let dirs = vec![PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("icons/tray")];
        for scale in [1.0, 1.5, 2.0] {
            for (connected, unread) in [(false, 0), (true, 0), (true, 3)] {
                let selection = TrayIconSelection::pick(scale, connected, unread);
                let path = resolve_tray_icon_path(&dirs, selection).unwrap();
                assert_eq!(
                    path.file_name().unwrap().to_string_lossy(),
                    selection.candidate_file_names()[0]
                );
            }
        }
    }

    #[test]
    fn reopen_label_reflects_last_chat() {
        assert_eq!(reopen_label(None), "Reopen last conversation");
        assert_eq!(reopen_label(Some("Alice")), "Reopen: Alice");
    }
}
