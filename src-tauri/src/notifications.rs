use std::path::PathBuf;
#[cfg(all(unix, not(target_os = "macos")))]
use std::sync::atomic::{AtomicUsize, Ordering};
use tauri::{AppHandle, Manager};

use crate::{
    chat_search, contact_photos, tray, truncate_message, ui_shell, AppState,
    NotificationPayload, NotificationPlan, APP_NAME,
};

/// What ends up on screen for one relayed page notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NativeNotification {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) icon: Option<PathBuf>,
    pub(crate) subtitle: &'static str,
    pub(crate) timeout_ms: u32,
    /// Clicking should also bring the relayed conversation to the front.
    pub(crate) reopen_on_click: bool,
}

impl NativeNotification {
    pub(crate) fn from_plan(
        plan: &NotificationPlan,
        icon: Option<PathBuf>,
        timeout_ms: u32,
    ) -> Self {
        let subtitle = if icon.is_some() {
            "WhatsApp (with photo)"
        } else {
            "WhatsApp"
        };
        Self {
            title: plan.title.clone(),
            body: truncate_message(&plan.body, 220),
            icon,
            subtitle,
            timeout_ms,
            reopen_on_click: true,
        }
    }
}

/// Entry point for the `notification` bridge channel.
pub(crate) fn handle_notification(app: AppHandle, payload: NotificationPayload) {
    let focused = ui_shell::is_main_window_focused(&app);
    let state = app.state::<AppState>();
    let plan = match state.shell.lock() {
        Ok(mut shell) => shell.accept_notification(payload, focused),
        Err(_) => {
            log::warn!("shell state lock poisoned; notification dropped");
            return;
        }
    };
    let Some(plan) = plan else {
        log::debug!("main window focused; notification suppressed");
        return;
    };
    tray::refresh_reopen_item(&app, Some(plan.chat_identity.as_str()));

    let timeout_ms = state.settings.notification_timeout_ms;
    let app_for_task = app.clone();
    tauri::async_runtime::spawn(async move {
        let photo = match plan.contact_photo.as_deref() {
            Some(reference) => {
                contact_photos::cache_contact_photo(&app_for_task, reference, &plan.title).await
            }
            None => None,
        };
        let has_photo = photo.is_some();
        let icon = photo.or_else(|| default_notification_icon_path(&app_for_task));
        let notification = NativeNotification::from_plan(&plan, icon, timeout_ms);
        log::debug!(
            "notification: title={:?} has_photo={has_photo} at={}",
            notification.title,
            chrono::Local::now().format("%H:%M:%S")
        );
        display(app_for_task, notification);
    });
}

pub(crate) fn default_notification_icon_path(app: &AppHandle) -> Option<PathBuf> {
    if let Ok(resource_dir) = app.path().resource_dir() {
        let bundled = resource_dir.join("icons/icon.png");
        if bundled.exists() {
            return Some(bundled);
        }
    }
    let current_dir = std::env::current_dir().ok()?;
    [
        current_dir.join("icons/icon.png"),
        current_dir.join("src-tauri/icons/icon.png"),
    ]
    .into_iter()
    .find(|path| path.exists())
}

fn on_notification_clicked(app: &AppHandle, reopen: bool) {
    ui_shell::show_main_window(app);
    if reopen {
        chat_search::spawn_reopen_last_chat(app);
    }
}

/// Informational notification with no click-to-reopen behaviour.
pub(crate) fn show_info_notification(app: &AppHandle, title: &str, body: &str) {
    let notification = NativeNotification {
        title: title.to_string(),
        body: body.to_string(),
        icon: default_notification_icon_path(app),
        subtitle: APP_NAME,
        timeout_ms: 3_000,
        reopen_on_click: false,
    };
    display(app.clone(), notification);
}

/// Linux threads parked in `wait_for_action`. Servers that keep expired notifications
/// around (GNOME) only report a close when the user dismisses them.
#[cfg(all(unix, not(target_os = "macos")))]
static CLICK_WAITERS: AtomicUsize = AtomicUsize::new(0);
#[cfg(all(unix, not(target_os = "macos")))]
const MAX_CLICK_WAITERS: usize = 4;

/// Held by a thread waiting for a notification click; frees its slot on drop.
#[cfg(all(unix, not(target_os = "macos")))]
struct ClickWaiterSlot<'a>(&'a AtomicUsize);

#[cfg(all(unix, not(target_os = "macos")))]
impl<'a> ClickWaiterSlot<'a> {
    fn try_acquire(waiters: &'a AtomicUsize, max: usize) -> Option<Self> {
        waiters
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < max).then_some(count + 1)
            })
            .ok()
            .map(|_| Self(waiters))
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
impl Drop for ClickWaiterSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Shows the notification on a helper thread. At most `MAX_CLICK_WAITERS` threads block
/// until the server reports an action or a close; past that, notifications are shown
/// without a click action and the thread exits right away.
#[cfg(all(unix, not(target_os = "macos")))]
fn display(app: AppHandle, notification: NativeNotification) {
    std::thread::spawn(move || {
        let slot = ClickWaiterSlot::try_acquire(&CLICK_WAITERS, MAX_CLICK_WAITERS);
        let mut builder = notify_rust::Notification::new();
        builder
            .appname(APP_NAME)
            .summary(&notification.title)
            .body(&notification.body)
            .timeout(notify_rust::Timeout::Milliseconds(notification.timeout_ms));
        if slot.is_some() {
            builder.action("default", "Open");
        }
        if let Some(icon) = notification.icon.as_deref() {
            builder.icon(&icon.to_string_lossy());
        }
        let handle = match builder.show() {
            Ok(handle) => handle,
            Err(error) => {
                log::debug!("failed to show notification: {error}");
                return;
            }
        };
        let Some(_slot) = slot else {
            log::debug!("click waiters exhausted; notification shown without click action");
            return;
        };
        handle.wait_for_action(|action| {
            if action == "default" {
                on_notification_clicked(&app, notification.reopen_on_click);
            }
        });
    });
}

/// Toasts report activation through WinRT, so clicks behave as on the other platforms.
#[cfg(target_os = "windows")]
fn display(app: AppHandle, notification: NativeNotification) {
    use tauri_winrt_notification::{Duration, IconCrop, Toast};

    std::thread::spawn(move || {
        let app_id = if crate::is_dev_mode() {
            Toast::POWERSHELL_APP_ID
        } else {
            crate::APP_BUNDLE_ID
        };
        let duration = if notification.timeout_ms > 7_000 {
            Duration::Long
        } else {
            Duration::Short
        };
        let reopen = notification.reopen_on_click;
        let mut toast = Toast::new(app_id)
            .title(&notification.title)
            .text1(&notification.body)
            .text2(notification.subtitle)
            .duration(duration)
            .on_activated(move |_action| {
                on_notification_clicked(&app, reopen);
                Ok(())
            });
        if let Some(icon) = notification.icon.as_deref() {
            toast = toast.icon(icon, IconCrop::Circular, "");
        }
        if let Err(error) = toast.show() {
            log::debug!("failed to show notification: {error}");
        }
    });
}

#[cfg(target_os = "macos")]
fn display(app: AppHandle, notification: NativeNotification) {
    use mac_notification_sys::{MainButton, Notification, NotificationResponse};

    std::thread::spawn(move || {
        ensure_macos_notification_application();
        let icon = notification
            .icon
            .as_deref()
            .map(|path| path.to_string_lossy().to_string());
        let mut builder = Notification::new();
        builder
            .title(&notification.title)
            .subtitle(notification.subtitle)
            .message(&notification.body)
            .main_button(MainButton::SingleAction("Open"))
            .close_button("Dismiss")
            .default_sound()
            .wait_for_click(true)
            .asynchronous(false);
        if let Some(icon) = icon.as_deref() {
            builder.content_image(icon);
        }

        match builder.send() {
            Ok(NotificationResponse::Click) | Ok(NotificationResponse::ActionButton(_)) => {
                on_notification_clicked(&app, notification.reopen_on_click);
            }
            Ok(_) => {}
            Err(error) => log::debug!("failed to show macOS notification: {error}"),
        }
    });
}

#[cfg(target_os = "macos")]
fn ensure_macos_notification_application() {
    static INIT_NOTIFICATION_APP: std::sync::Once = std::sync::Once::new();
    INIT_NOTIFICATION_APP.call_once(|| {
        for bundle_id in [crate::APP_BUNDLE_ID, "com.apple.Terminal"] {
            match mac_notification_sys::set_application(bundle_id) {
                Ok(_) => return,
                Err(error) => {
                    log::debug!("failed to set macOS notification bundle id {bundle_id}: {error}");
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(title: &str, body: &str) -> NotificationPlan {
        NotificationPlan::from_payload(&NotificationPayload {
            title: title.to_string(),
            body: body.to_string(),
            ..NotificationPayload::default()
        })
    }

    #[test]
    fn default_icon_when_photo_missing() {
        let notification =
            NativeNotification::from_plan(&plan("Alice - WhatsApp", ""), None, 5000);
        assert_eq!(notification.title, "Alice");
        assert_eq!(notification.body, "New message");
        assert_eq!(notification.subtitle, "WhatsApp");
        assert_eq!(notification.timeout_ms, 5000);
        assert!(notification.reopen_on_click);
    }

    #[test]
    fn photo_icon_is_flagged_in_subtitle() {
        let icon = PathBuf::from("/tmp/contact-abc.png");
        let notification =
            NativeNotification::from_plan(&plan("Bob", "hi"), Some(icon.clone()), 5000);
        assert_eq!(notification.icon, Some(icon));
        assert_eq!(notification.subtitle, "WhatsApp (with photo)");
    }

    #[test]
    fn long_bodies_are_truncated_but_titles_are_not() {
        let body = "x".repeat(500);
        let title = "y".repeat(300);
        let notification = NativeNotification::from_plan(&plan(&title, &body), None, 5000);
        assert_eq!(notification.body.chars().count(), 223);
        assert_eq!(notification.title, title);
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn click_waiters_are_bounded_and_released_on_drop() {
        let waiters = AtomicUsize::new(0);
        let first = ClickWaiterSlot::try_acquire(&waiters, 2).unwrap();
        let second = ClickWaiterSlot::try_acquire(&waiters, 2).unwrap();
        assert!(ClickWaiterSlot::try_acquire(&waiters, 2).is_none());
        assert_eq!(waiters.load(Ordering::Acquire), 2);

        drop(first);
        let third = ClickWaiterSlot::try_acquire(&waiters, 2);
        assert!(third.is_some());
        drop(second);
        drop(third);
        assert_eq!(waiters.load(Ordering::Acquire), 0);
    }
}
